//! SketchPanel - Main WASM interface for sketch-params

use super::browser::{BrowserHistory, LocalStorageBackend};
use super::error::to_js;
use crate::config::PanelConfig;
use crate::error::ParamsError;
use crate::host::{KeyInput, SketchHost};
use crate::panel::Subscription;
use crate::param::definitions_from_json;
use crate::rng::Rng;
use crate::storage::{InMemoryStorage, KeyValueStorage, Storage};
use serde::Serialize;
use tracing::warn;
use wasm_bindgen::prelude::*;
use web_time::Instant;

type BrowserHost = SketchHost<Rng, Box<dyn Storage>, BrowserHistory>;

/// A parameter panel mounted into a page element
#[wasm_bindgen]
pub struct SketchPanel {
    host: BrowserHost,
    container: web_sys::Element,
    subscriptions: Vec<Option<Subscription>>,
}

#[wasm_bindgen]
impl SketchPanel {
    /// Mount a panel into the element matching `selector`.
    ///
    /// `definitions` is an object of parameter definitions. `config` may be
    /// `undefined` for defaults. Without a `seed` the sketch is seeded from
    /// the clock.
    #[wasm_bindgen(constructor)]
    pub fn new(
        selector: &str,
        definitions: JsValue,
        config: JsValue,
        seed: Option<f64>,
    ) -> Result<SketchPanel, JsValue> {
        // Initialize panic hook for better error messages
        console_error_panic_hook::set_once();

        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no global window"))?;
        let container = window
            .document()
            .and_then(|document| document.query_selector(selector).ok().flatten())
            .ok_or_else(|| to_js(ParamsError::MissingContainer(selector.to_string())))?;

        let config: PanelConfig = if config.is_undefined() || config.is_null() {
            PanelConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config)
                .map_err(|e| to_js(ParamsError::InvalidConfig(e.to_string())))?
        };

        let json: String = js_sys::JSON::stringify(&definitions)?.into();
        let definitions = definitions_from_json(&json).map_err(to_js)?;

        let storage: Box<dyn Storage> = match LocalStorageBackend::from_window(&window) {
            Some(backend) => Box::new(KeyValueStorage::with_prefix(
                backend,
                config.storage_prefix.clone(),
            )),
            None => {
                warn!("localStorage unavailable; lock and open state will not persist");
                Box::new(InMemoryStorage::new())
            }
        };

        let random = match seed {
            Some(seed) => Rng::from_seed(seed as u64),
            None => Rng::from_system_time(),
        };

        let host = SketchHost::new(
            random,
            &definitions,
            storage,
            BrowserHistory::new(window),
            config,
        )
        .map_err(to_js)?;

        Ok(Self {
            host,
            container,
            subscriptions: Vec::new(),
        })
    }

    // =========================================================================
    // Values
    // =========================================================================

    /// Current value of one param
    pub fn value(&self, key: &str) -> Result<JsValue, JsValue> {
        let value = self.host.value(key).map_err(to_js)?;
        to_js_value(value)
    }

    pub fn int(&self, key: &str) -> Result<f64, JsValue> {
        self.host.int(key).map_err(to_js)
    }

    pub fn color(&self, key: &str) -> Result<Vec<f64>, JsValue> {
        self.host
            .color(key)
            .map(|color| color.channels().to_vec())
            .map_err(to_js)
    }

    pub fn select(&self, key: &str) -> Result<String, JsValue> {
        self.host.select(key).map(str::to_string).map_err(to_js)
    }

    /// All params keyed by name
    pub fn params(&self) -> Result<JsValue, JsValue> {
        to_js_value(self.host.params())
    }

    /// Render model for every field
    pub fn fields(&self) -> Result<JsValue, JsValue> {
        to_js_value(&self.host.fields())
    }

    /// Current form data, the same shape `on_change` listeners receive.
    ///
    /// The panel's `init` fires inside the constructor, so read this instead
    /// of subscribing to it.
    pub fn snapshot(&self) -> Result<JsValue, JsValue> {
        to_js_value(&self.host.panel().snapshot())
    }

    // =========================================================================
    // Panel Operations
    // =========================================================================

    /// Apply input text; `name` is a key or `key[i]` for a color channel
    pub fn edit(&mut self, name: &str, raw: &str) -> Result<String, JsValue> {
        let outcome = self.host.edit(name, raw, Instant::now()).map_err(to_js)?;
        Ok(format!("{:?}", outcome))
    }

    pub fn edit_color_hex(&mut self, key: &str, hex: &str) -> Result<String, JsValue> {
        let outcome = self
            .host
            .edit_color_hex(key, hex, Instant::now())
            .map_err(to_js)?;
        Ok(format!("{:?}", outcome))
    }

    pub fn reset(&mut self, key: &str) -> Result<(), JsValue> {
        self.host.reset(key).map_err(to_js)
    }

    pub fn reset_all(&mut self) -> Result<usize, JsValue> {
        self.host.reset_all().map_err(to_js)
    }

    pub fn toggle_lock(&mut self, key: &str) -> Result<bool, JsValue> {
        self.host.toggle_lock(key).map_err(to_js)
    }

    pub fn toggle_open(&mut self, key: &str) -> Result<bool, JsValue> {
        self.host.toggle_open(key).map_err(to_js)
    }

    /// Flush a throttled change (call from requestAnimationFrame)
    pub fn poll(&mut self) -> bool {
        self.host.poll(Instant::now())
    }

    // =========================================================================
    // Browser Events
    // =========================================================================

    pub fn on_popstate(&mut self) {
        self.host.on_popstate();
    }

    /// Forward a `keydown`; returns true when the caller should `preventDefault`
    pub fn handle_key(
        &mut self,
        key: &str,
        code: &str,
        ctrl: bool,
        meta: bool,
        shift: bool,
    ) -> Result<bool, JsValue> {
        let input = KeyInput {
            key: key.to_string(),
            code: code.to_string(),
            ctrl,
            meta,
            shift,
        };
        self.host.handle_key(&input).map_err(to_js)
    }

    /// Forward a `click`; clicks outside the container regenerate the sketch
    pub fn handle_click(&mut self, target: &web_sys::Node) -> Result<bool, JsValue> {
        if self.container.contains(Some(target)) {
            return Ok(false);
        }
        self.host.handle_outside_click().map_err(to_js)?;
        Ok(true)
    }

    // =========================================================================
    // Listeners
    // =========================================================================

    /// Call `callback(params)` whenever the params change; returns a handle
    pub fn on_update(&mut self, callback: js_sys::Function) -> usize {
        let subscription = self.host.on_update(move |params| {
            match to_js_value(params) {
                Ok(value) => call_listener(&callback, &value),
                Err(e) => warn!(error = ?e, "could not convert params for listener"),
            }
        });
        self.remember(subscription)
    }

    /// Call `callback(snapshot)` on every panel change; returns a handle
    pub fn on_change(&mut self, callback: js_sys::Function) -> usize {
        let subscription = self.host.on_change(move |snapshot| match to_js_value(snapshot) {
            Ok(value) => call_listener(&callback, &value),
            Err(e) => warn!(error = ?e, "could not convert snapshot for listener"),
        });
        self.remember(subscription)
    }

    /// Call `callback(key)` when a single field is reset; returns a handle
    pub fn on_reset(&mut self, callback: js_sys::Function) -> usize {
        let subscription = self
            .host
            .on_reset(move |key| call_listener(&callback, &JsValue::from_str(key)));
        self.remember(subscription)
    }

    /// Call `callback()` before every regenerate; returns a handle
    pub fn on_reset_all(&mut self, callback: js_sys::Function) -> usize {
        let subscription = self.host.on_reset_all(move || {
            if let Err(e) = callback.call0(&JsValue::NULL) {
                warn!(error = ?e, "reset-all listener threw");
            }
        });
        self.remember(subscription)
    }

    pub fn unsubscribe(&mut self, handle: usize) -> bool {
        match self.subscriptions.get_mut(handle).and_then(Option::take) {
            Some(subscription) => self.host.unsubscribe(subscription),
            None => false,
        }
    }
}

impl SketchPanel {
    fn remember(&mut self, subscription: Subscription) -> usize {
        self.subscriptions.push(Some(subscription));
        self.subscriptions.len() - 1
    }
}

fn call_listener(callback: &js_sys::Function, value: &JsValue) {
    if let Err(e) = callback.call1(&JsValue::NULL, value) {
        warn!(error = ?e, "listener threw");
    }
}

/// Plain JS objects rather than `Map`s, so params read like the definitions
fn to_js_value<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| JsValue::from_str(&e.to_string()))
}
