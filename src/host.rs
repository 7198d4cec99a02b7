//! Sketch host
//!
//! [`SketchHost`] is what a sketch holds on to. It builds the params from the
//! definitions and the current URL, mounts a [`Panel`], and keeps three things
//! in step:
//!
//! - the history: every `init`/`change` that alters the query pushes an entry
//! - the panel: navigation re-syncs it from the query
//! - the sketch: `on_update` listeners run whenever the params move
//!
//! The host stays headless. Browser wiring lives in the `wasm` module, which
//! supplies a [`History`] backed by `window.history`.

use crate::color::Color;
use crate::config::PanelConfig;
use crate::error::ParamsError;
use crate::panel::{Channel, EditOutcome, FieldView, FormSnapshot, Panel, PanelEvent, Subscription};
use crate::param::{Definitions, ParamValue, Params};
use crate::rng::RandomSource;
use crate::storage::Storage;
use crate::url::{sync_definitions_from_query, to_query};
use tracing::{debug, trace};
use web_time::Instant;

/// Navigation capability, modelled on `window.history` plus `location.search`
pub trait History {
    /// Current query string, without the leading `?`
    fn query(&self) -> String;

    /// Push a new entry for `query`
    fn push(&mut self, query: &str);

    /// Step back. Returns true if the current entry changed before returning;
    /// asynchronous histories return false and report the move through
    /// [`SketchHost::on_popstate`] later.
    fn back(&mut self) -> bool;

    /// Step forward, with the same contract as [`History::back`]
    fn forward(&mut self) -> bool;
}

/// In-memory history stack
#[derive(Debug, Clone)]
pub struct MemoryHistory {
    entries: Vec<String>,
    cursor: usize,
}

impl MemoryHistory {
    pub fn new(query: impl Into<String>) -> Self {
        let query = query.into();
        let query = query.strip_prefix('?').unwrap_or(&query).to_string();
        Self {
            entries: vec![query],
            cursor: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }
}

impl Default for MemoryHistory {
    fn default() -> Self {
        Self::new("")
    }
}

impl History for MemoryHistory {
    fn query(&self) -> String {
        self.entries.get(self.cursor).cloned().unwrap_or_default()
    }

    fn push(&mut self, query: &str) {
        self.entries.truncate(self.cursor + 1);
        self.entries.push(query.to_string());
        self.cursor = self.entries.len() - 1;
    }

    fn back(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        true
    }

    fn forward(&mut self) -> bool {
        if self.cursor + 1 >= self.entries.len() {
            return false;
        }
        self.cursor += 1;
        true
    }
}

/// A key press, as much of `KeyboardEvent` as the shortcuts need
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyInput {
    /// `KeyboardEvent.key`
    pub key: String,
    /// `KeyboardEvent.code`
    pub code: String,
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
}

impl KeyInput {
    pub fn new(key: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            code: code.into(),
            ..Self::default()
        }
    }

    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn with_meta(mut self) -> Self {
        self.meta = true;
        self
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    fn is_undo_chord(&self) -> bool {
        self.key.eq_ignore_ascii_case("z") && (self.ctrl || self.meta)
    }
}

type UpdateListener = Box<dyn FnMut(&Params)>;

/// A mounted panel wired to history and to the sketch's update listeners
pub struct SketchHost<R, S, H> {
    panel: Panel<R, S>,
    history: H,
    update_listeners: Vec<(u64, UpdateListener)>,
    next_subscription: u64,
}

impl<R, S, H> SketchHost<R, S, H>
where
    R: RandomSource,
    S: Storage,
    H: History,
{
    /// Define params, overlay the current query, then mount the panel.
    ///
    /// Fails only when a definition cannot produce a value.
    pub fn new(
        mut random: R,
        definitions: &Definitions,
        storage: S,
        history: H,
        config: PanelConfig,
    ) -> Result<Self, ParamsError> {
        let params = sync_definitions_from_query(
            &mut random,
            definitions,
            &history.query(),
            config.max_array_index,
        )?;

        let mut host = Self {
            panel: Panel::new(random, storage, params, &config),
            history,
            update_listeners: Vec::new(),
            next_subscription: 0,
        };
        host.panel.enable_event_queue();
        host.panel.mount();
        host.process_events();
        Ok(host)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn params(&self) -> &Params {
        self.panel.params()
    }

    pub fn value(&self, key: &str) -> Result<&ParamValue, ParamsError> {
        self.params().value(key)
    }

    pub fn int(&self, key: &str) -> Result<f64, ParamsError> {
        let value = self.value(key)?;
        value.as_int().ok_or_else(|| wrong_kind(key, value, "int"))
    }

    pub fn color(&self, key: &str) -> Result<Color, ParamsError> {
        let value = self.value(key)?;
        value.as_color().ok_or_else(|| wrong_kind(key, value, "color"))
    }

    pub fn select(&self, key: &str) -> Result<&str, ParamsError> {
        let value = self.value(key)?;
        value.as_select().ok_or_else(|| wrong_kind(key, value, "select"))
    }

    pub fn history(&self) -> &H {
        &self.history
    }

    pub fn panel(&self) -> &Panel<R, S> {
        &self.panel
    }

    /// Direct panel access, e.g. for lock and open flags.
    ///
    /// Events raised through this handle reach the history on the next host
    /// call.
    pub fn panel_mut(&mut self) -> &mut Panel<R, S> {
        &mut self.panel
    }

    pub fn fields(&self) -> Vec<FieldView> {
        self.panel.fields()
    }

    // ========================================================================
    // Update listeners
    // ========================================================================

    /// Run `listener` with the new params whenever they change
    pub fn on_update(&mut self, listener: impl FnMut(&Params) + 'static) -> Subscription {
        self.next_subscription += 1;
        self.update_listeners
            .push((self.next_subscription, Box::new(listener)));
        Subscription::new(Channel::Update, self.next_subscription)
    }

    /// Run `listener` with the form snapshot on every panel `change`.
    ///
    /// `init` has already fired by the time a host exists, so it has no
    /// counterpart here; [`Panel::snapshot`] gives the same data.
    pub fn on_change(&mut self, listener: impl FnMut(&FormSnapshot) + 'static) -> Subscription {
        self.panel.on_change(listener)
    }

    pub fn on_reset(&mut self, listener: impl FnMut(&str) + 'static) -> Subscription {
        self.panel.on_reset(listener)
    }

    pub fn on_reset_all(&mut self, listener: impl FnMut() + 'static) -> Subscription {
        self.panel.on_reset_all(listener)
    }

    /// Remove an update listener or any panel subscription
    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        if subscription.channel() != Channel::Update {
            return self.panel.unsubscribe(subscription);
        }
        let before = self.update_listeners.len();
        self.update_listeners
            .retain(|(id, _)| *id != subscription.id());
        self.update_listeners.len() != before
    }

    // ========================================================================
    // Panel operations
    // ========================================================================

    pub fn edit(&mut self, name: &str, raw: &str, now: Instant) -> Result<EditOutcome, ParamsError> {
        let outcome = self.panel.edit(name, raw, now);
        self.process_events();
        outcome
    }

    pub fn edit_color_hex(&mut self, key: &str, hex: &str, now: Instant) -> Result<EditOutcome, ParamsError> {
        let outcome = self.panel.edit_color_hex(key, hex, now);
        self.process_events();
        outcome
    }

    pub fn reset(&mut self, key: &str) -> Result<(), ParamsError> {
        let result = self.panel.reset(key);
        self.process_events();
        result
    }

    pub fn reset_all(&mut self) -> Result<usize, ParamsError> {
        let result = self.panel.reset_all();
        self.process_events();
        result
    }

    pub fn toggle_lock(&mut self, key: &str) -> Result<bool, ParamsError> {
        self.panel.toggle_lock(key)
    }

    pub fn toggle_open(&mut self, key: &str) -> Result<bool, ParamsError> {
        self.panel.toggle_open(key)
    }

    /// Flush a throttled change; call from the frame or timer loop
    pub fn poll(&mut self, now: Instant) -> bool {
        let flushed = self.panel.poll(now);
        self.process_events();
        flushed
    }

    // ========================================================================
    // Browser events
    // ========================================================================

    /// The current history entry changed; re-sync from its query
    pub fn on_popstate(&mut self) {
        let query = self.history.query();
        debug!(query = query.as_str(), "re-syncing params after navigation");
        self.panel.sync_query(&query);
        self.notify_update();
    }

    /// Keyboard shortcuts.
    ///
    /// Ctrl/Cmd+Z navigates back, adding Shift navigates forward, and Space
    /// regenerates every unlocked field. Returns whether the key was handled.
    pub fn handle_key(&mut self, input: &KeyInput) -> Result<bool, ParamsError> {
        if input.is_undo_chord() {
            let moved = if input.shift {
                self.history.forward()
            } else {
                self.history.back()
            };
            if moved {
                self.on_popstate();
            }
            Ok(true)
        } else if input.code == "Space" {
            self.reset_all()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// A click landed outside the panel container
    pub fn handle_outside_click(&mut self) -> Result<usize, ParamsError> {
        self.reset_all()
    }

    fn process_events(&mut self) {
        for event in self.panel.drain_events() {
            match event {
                PanelEvent::Init(snapshot) | PanelEvent::Change(snapshot) => {
                    let query = to_query(self.panel.params(), &snapshot);
                    if query == self.history.query() {
                        trace!("query unchanged; nothing to push");
                        continue;
                    }
                    self.history.push(&query);
                    self.panel.sync_query(&query);
                    self.notify_update();
                }
                PanelEvent::Reset(_) | PanelEvent::ResetAll => {}
            }
        }
    }

    fn notify_update(&mut self) {
        let params = self.panel.params();
        for (_, listener) in self.update_listeners.iter_mut() {
            listener(params);
        }
    }
}

fn wrong_kind(key: &str, value: &ParamValue, expected: &str) -> ParamsError {
    ParamsError::parse_failure(key, format!("is {}, not {}", value.kind(), expected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::ParamDefinition;
    use crate::storage::InMemoryStorage;
    use crate::testing::ConstantRandom;
    use std::cell::RefCell;
    use std::rc::Rc;

    type TestHost = SketchHost<ConstantRandom, InMemoryStorage, MemoryHistory>;

    fn definitions() -> Definitions {
        let mut definitions = Definitions::new();
        definitions.insert("name".into(), ParamDefinition::int().with_value(0.5));
        definitions.insert("bg".into(), ParamDefinition::color());
        definitions.insert(
            "palette".into(),
            ParamDefinition::select(["Black & White", "Ice"]),
        );
        definitions
    }

    fn host(query: &str) -> TestHost {
        SketchHost::new(
            ConstantRandom::new(0.2),
            &definitions(),
            InMemoryStorage::new(),
            MemoryHistory::new(query),
            PanelConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_memory_history_stack() {
        let mut history = MemoryHistory::new("?a=1");
        assert_eq!(history.query(), "a=1");
        history.push("a=2");
        history.push("a=3");
        assert!(history.back());
        assert!(history.back());
        assert!(!history.back());
        assert_eq!(history.query(), "a=1");

        history.push("a=4");
        assert!(!history.forward());
        assert_eq!(history.entries(), ["a=1", "a=4"]);
    }

    #[test]
    fn test_init_pushes_full_query() {
        let host = host("name=0.1");

        assert_eq!(host.int("name").unwrap(), 0.1);
        assert_eq!(host.history().len(), 2);
        assert_eq!(
            host.history().query(),
            "name=0.1&bg%5B0%5D=0.2&bg%5B1%5D=0.2&bg%5B2%5D=0.2&bg%5B3%5D=1&palette=Black+%26+White"
        );
    }

    #[test]
    fn test_init_with_complete_query_pushes_nothing() {
        let full = host("").history().query();
        let host = host(&full);
        assert_eq!(host.history().len(), 1);
    }

    #[test]
    fn test_edit_pushes_and_notifies() {
        let mut host = host("");
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        host.on_update(move |params| {
            sink.borrow_mut().push(params.value("name").unwrap().as_int().unwrap());
        });

        let outcome = host.edit("name", "0.75", Instant::now()).unwrap();

        assert_eq!(outcome, EditOutcome::Emitted);
        assert_eq!(*seen.borrow(), vec![0.75]);
        assert!(host.history().query().starts_with("name=0.75&"));
    }

    #[test]
    fn test_undo_and_redo_shortcuts() {
        let mut host = host("");
        host.edit("name", "0.75", Instant::now()).unwrap();

        let undo = KeyInput::new("z", "KeyZ").with_ctrl();
        assert!(host.handle_key(&undo).unwrap());
        assert_eq!(host.int("name").unwrap(), 0.5);

        let redo = KeyInput::new("Z", "KeyZ").with_meta().with_shift();
        assert!(host.handle_key(&redo).unwrap());
        assert_eq!(host.int("name").unwrap(), 0.75);

        assert!(!host.handle_key(&KeyInput::new("z", "KeyZ")).unwrap());
    }

    #[test]
    fn test_space_resets_unlocked_fields() {
        let mut host = host("");
        host.toggle_lock("bg").unwrap();
        host.toggle_lock("palette").unwrap();
        let before = host.history().len();

        assert!(host.handle_key(&KeyInput::new(" ", "Space")).unwrap());

        assert_eq!(host.int("name").unwrap(), 0.2);
        assert_eq!(host.history().len(), before + 1);
    }

    #[test]
    fn test_outside_click_with_everything_locked() {
        let mut host = host("");
        for key in ["name", "bg", "palette"] {
            host.toggle_lock(key).unwrap();
        }
        let before = host.history().len();

        assert_eq!(host.handle_outside_click().unwrap(), 0);
        assert_eq!(host.history().len(), before);
    }

    #[test]
    fn test_typed_accessors() {
        let host = host("palette=Ice");

        assert_eq!(host.select("palette").unwrap(), "Ice");
        assert_eq!(host.color("bg").unwrap(), Color::new(0.2, 0.2, 0.2, 1.0));
        assert!(matches!(host.int("bg"), Err(ParamsError::ParseFailure { .. })));

        let err = host.value("missing").unwrap_err();
        assert_eq!(
            err,
            ParamsError::UnknownKey {
                key: "missing".into(),
                available: vec!["name".into(), "bg".into(), "palette".into()],
            }
        );
    }

    #[test]
    fn test_unsubscribe_update_listener() {
        let mut host = host("");
        let count = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&count);
        let subscription = host.on_update(move |_| *sink.borrow_mut() += 1);

        host.reset("name").unwrap();
        assert!(host.unsubscribe(subscription));
        host.reset("bg").unwrap();

        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn test_panel_subscriptions_through_host() {
        let mut host = host("");
        let log = Rc::new(RefCell::new(Vec::new()));

        let sink = Rc::clone(&log);
        let change = host.on_change(move |snapshot| {
            sink.borrow_mut().push(format!("change name={}", snapshot["name"]));
        });
        let sink = Rc::clone(&log);
        host.on_reset(move |key| sink.borrow_mut().push(format!("reset {}", key)));
        let sink = Rc::clone(&log);
        host.on_reset_all(move || sink.borrow_mut().push("reset all".to_string()));

        host.edit("name", "0.75", Instant::now()).unwrap();
        host.reset("bg").unwrap();
        assert!(host.unsubscribe(change));
        assert!(!host.unsubscribe(change));
        host.handle_key(&KeyInput::new(" ", "Space")).unwrap();

        assert_eq!(
            *log.borrow(),
            vec![
                "change name=0.75".to_string(),
                "reset bg".to_string(),
                "change name=0.75".to_string(),
                "reset all".to_string(),
            ]
        );
    }
}
