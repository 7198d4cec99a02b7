//! Browser-backed history and storage

use crate::host::History;
use crate::storage::KeyValueBackend;
use tracing::warn;
use wasm_bindgen::JsValue;

/// [`History`] over `window.history` and `window.location`.
///
/// `back`/`forward` are asynchronous in the browser. The page must forward
/// `popstate` to [`crate::host::SketchHost::on_popstate`].
#[derive(Debug, Clone)]
pub struct BrowserHistory {
    window: web_sys::Window,
}

impl BrowserHistory {
    pub fn new(window: web_sys::Window) -> Self {
        Self { window }
    }

    fn title(&self) -> String {
        self.window
            .document()
            .map(|document| document.title())
            .unwrap_or_default()
    }
}

impl History for BrowserHistory {
    fn query(&self) -> String {
        match self.window.location().search() {
            Ok(search) => search.strip_prefix('?').unwrap_or(&search).to_string(),
            Err(e) => {
                warn!(error = ?e, "location.search unavailable");
                String::new()
            }
        }
    }

    fn push(&mut self, query: &str) {
        let url = format!("?{}", query);
        let pushed = self
            .window
            .history()
            .and_then(|history| history.push_state_with_url(&JsValue::from_str(&self.title()), "", Some(&url)));
        if let Err(e) = pushed {
            warn!(error = ?e, url = url.as_str(), "history.pushState failed");
        }
    }

    fn back(&mut self) -> bool {
        if let Err(e) = self.window.history().and_then(|history| history.back()) {
            warn!(error = ?e, "history.back failed");
        }
        false
    }

    fn forward(&mut self) -> bool {
        if let Err(e) = self.window.history().and_then(|history| history.forward()) {
            warn!(error = ?e, "history.forward failed");
        }
        false
    }
}

/// [`KeyValueBackend`] over `window.localStorage`
#[derive(Debug, Clone)]
pub struct LocalStorageBackend {
    storage: web_sys::Storage,
}

impl LocalStorageBackend {
    /// `None` when local storage is disabled or blocked
    pub fn from_window(window: &web_sys::Window) -> Option<Self> {
        window
            .local_storage()
            .ok()
            .flatten()
            .map(|storage| Self { storage })
    }
}

impl KeyValueBackend for LocalStorageBackend {
    fn get_item(&self, key: &str) -> Option<String> {
        self.storage.get_item(key).ok().flatten()
    }

    fn set_item(&mut self, key: &str, value: &str) {
        if let Err(e) = self.storage.set_item(key, value) {
            warn!(error = ?e, key, "localStorage.setItem failed");
        }
    }
}
