//! Error types for WASM bindings

use crate::error::ParamsError;
use wasm_bindgen::prelude::*;

/// Error type for WASM bindings
#[wasm_bindgen]
pub struct SketchError {
    message: String,
    fatal: bool,
}

#[wasm_bindgen]
impl SketchError {
    /// Get the error message
    #[wasm_bindgen(getter)]
    pub fn message(&self) -> String {
        self.message.clone()
    }

    /// Whether the panel could not be started
    #[wasm_bindgen(getter)]
    pub fn fatal(&self) -> bool {
        self.fatal
    }
}

impl From<ParamsError> for SketchError {
    fn from(e: ParamsError) -> Self {
        Self {
            fatal: e.is_fatal(),
            message: e.to_string(),
        }
    }
}

impl From<String> for SketchError {
    fn from(message: String) -> Self {
        Self {
            message,
            fatal: false,
        }
    }
}

impl SketchError {
    /// Convert to JsValue for use as error return
    pub fn into_js(self) -> JsValue {
        JsValue::from_str(&self.message)
    }
}

/// Shorthand for `map_err` at the boundary
pub(crate) fn to_js(e: ParamsError) -> JsValue {
    SketchError::from(e).into_js()
}
