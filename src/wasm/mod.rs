//! WASM bindings for sketch-params
//!
//! This module provides the JavaScript-facing API for mounting a parameter
//! panel in a browser page via WebAssembly.

mod browser;
mod error;
mod panel;

pub use browser::{BrowserHistory, LocalStorageBackend};
pub use error::SketchError;
pub use panel::SketchPanel;

// Re-export wasm_bindgen for convenience
pub use wasm_bindgen::prelude::*;
