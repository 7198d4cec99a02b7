//! # sketch-params: Parameter Panels for Generative Sketches
//!
//! `sketch-params` lets a generative-art sketch declare typed parameters,
//! fill them from a seeded random source, and keep them in sync with the URL
//! query string and with a panel of controls the artist can edit, lock and
//! regenerate.
//!
//! ## Architecture
//!
//! The library is organized in layers, leaf-first:
//!
//! - **Definitions** ([`param`]) - typed definitions and the engine that fills
//!   and regenerates them
//! - **Serialization** ([`serializer`], [`url`]) - per-type string codecs and the
//!   query-string synchronizer
//! - **Panel** ([`panel`], [`storage`]) - per-field lock/open state, edits,
//!   resets and typed event subscriptions
//! - **Plumbing** ([`config`], [`throttle`], [`error`]) - panel settings, the
//!   edit throttle and the error taxonomy
//! - **Host** ([`host`]) - wires the panel to browser-style history and to the
//!   sketch's redraw listeners
//!
//! ## Quick Start
//!
//! ```rust
//! use sketch_params::prelude::*;
//!
//! let mut definitions = Definitions::new();
//! definitions.insert("density".into(), ParamDefinition::int().with_label("Density"));
//! definitions.insert("background".into(), ParamDefinition::color());
//!
//! let history = MemoryHistory::new("density=0.25");
//! let mut sketch = SketchHost::new(
//!     Rng::from_seed(42),
//!     &definitions,
//!     InMemoryStorage::new(),
//!     history,
//!     PanelConfig::default(),
//! )
//! .unwrap();
//!
//! assert_eq!(sketch.int("density").unwrap(), 0.25);
//! assert!(sketch.history().query().contains("background%5B0%5D="));
//! ```

pub mod color;
pub mod config;
pub mod error;
pub mod host;
pub mod panel;
pub mod param;
pub mod rng;
pub mod serializer;
pub mod storage;
pub mod throttle;
pub mod url;

#[cfg(feature = "wasm")]
pub mod wasm;

/// Prelude module for convenient imports
pub mod prelude {
    // Definitions and the engine
    pub use crate::param::{
        define_all, definitions_from_json, initial_value, reset_all, reset_key, reset_one,
        Definitions, InitializedParam, ParamDefinition, ParamKind, ParamValue, Params,
    };

    // Values and randomness
    pub use crate::color::Color;
    pub use crate::rng::{RandomSource, Rng};

    #[cfg(feature = "rand")]
    pub use crate::rng::RandAdapter;

    // Serialization and URL sync
    pub use crate::serializer::{RawValue, Serialized};
    pub use crate::url::{
        parse_query, query_from_href, sync_definitions_from_query, sync_from_query, to_query,
        NestedQuery,
    };

    // Panel
    pub use crate::panel::{
        Channel, EditOutcome, FieldView, FormSnapshot, Panel, PanelEvent, Subscription,
    };
    pub use crate::storage::{
        InMemoryStorage, KeyValueBackend, KeyValueStorage, NoopStorage, Storage,
    };

    // Host
    pub use crate::host::{History, KeyInput, MemoryHistory, SketchHost};

    pub use crate::config::PanelConfig;
    pub use crate::error::ParamsError;
}

// Re-export key types at crate root for convenience
pub use prelude::*;
