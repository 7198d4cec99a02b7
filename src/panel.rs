//! Panel State Controller
//!
//! Owns the live [`Params`] map together with per-field lock/open flags, turns
//! user edits and resets into new maps, and reports what happened through
//! typed subscriptions. A host that prefers polling can call
//! [`Panel::enable_event_queue`] and then [`Panel::drain_events`] instead of
//! registering closures. Without it nothing is queued.
//!
//! Edit-driven `change` events are throttled. Call [`Panel::poll`] from the
//! host's frame or timer loop to release the trailing one.

use crate::color::Color;
use crate::config::PanelConfig;
use crate::error::ParamsError;
use crate::param::{self, ParamKind, ParamValue, Params};
use crate::rng::RandomSource;
use crate::serializer::{self, coerce_number, format_number};
use crate::storage::Storage;
use crate::throttle::Throttle;
use crate::url;
use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, warn};
use web_time::Instant;

/// Form data as the panel would submit it: input name to input text.
///
/// Color fields contribute `key[0]` through `key[3]`.
pub type FormSnapshot = IndexMap<String, String>;

/// Event channels a listener can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Init,
    Change,
    Reset,
    ResetAll,
    /// Host-level update listeners
    Update,
}

/// Handle returned by the `on_*` methods; pass it to `unsubscribe`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription {
    channel: Channel,
    id: u64,
}

impl Subscription {
    pub(crate) fn new(channel: Channel, id: u64) -> Self {
        Self { channel, id }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PanelEvent {
    /// First mount, with the initial snapshot
    Init(FormSnapshot),
    /// A visible value changed
    Change(FormSnapshot),
    /// One field was regenerated
    Reset(String),
    /// Reset-all was requested; precedes the `Change` it may cause
    ResetAll,
}

impl PanelEvent {
    pub fn channel(&self) -> Channel {
        match self {
            PanelEvent::Init(_) => Channel::Init,
            PanelEvent::Change(_) => Channel::Change,
            PanelEvent::Reset(_) => Channel::Reset,
            PanelEvent::ResetAll => Channel::ResetAll,
        }
    }

    pub fn snapshot(&self) -> Option<&FormSnapshot> {
        match self {
            PanelEvent::Init(snapshot) | PanelEvent::Change(snapshot) => Some(snapshot),
            _ => None,
        }
    }
}

/// What an edit did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    /// Value updated and `change` emitted
    Emitted,
    /// Value updated; `change` waits for the throttle window
    Deferred,
    /// The input equals the current value
    Unchanged,
    /// The field's input is hidden (locked or closed)
    Hidden,
    /// The input could not be parsed; the prior value is kept
    Rejected,
}

/// Render model for one field
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "wasm", derive(tsify::Tsify))]
#[serde(rename_all = "camelCase")]
pub struct FieldView {
    pub key: String,
    pub label: String,
    pub kind: ParamKind,
    pub locked: bool,
    pub open: bool,
    pub input_visible: bool,
    pub reset_visible: bool,
    /// Input text per control: one for int/select, four for color
    pub inputs: Vec<String>,
    /// Human-readable value; `#rrggbbaa` for colors
    pub display: String,
    pub options: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
struct FieldFlags {
    locked: bool,
    open: bool,
}

impl FieldFlags {
    fn accepts_input(&self) -> bool {
        self.open && !self.locked
    }
}

type SnapshotListener = Box<dyn FnMut(&FormSnapshot)>;
type KeyListener = Box<dyn FnMut(&str)>;
type PlainListener = Box<dyn FnMut()>;

#[derive(Default)]
struct Listeners {
    init: Vec<(u64, SnapshotListener)>,
    change: Vec<(u64, SnapshotListener)>,
    reset: Vec<(u64, KeyListener)>,
    reset_all: Vec<(u64, PlainListener)>,
}

impl Listeners {
    fn notify(&mut self, event: &PanelEvent) {
        match event {
            PanelEvent::Init(snapshot) => self.init.iter_mut().for_each(|(_, f)| f(snapshot)),
            PanelEvent::Change(snapshot) => self.change.iter_mut().for_each(|(_, f)| f(snapshot)),
            PanelEvent::Reset(key) => self.reset.iter_mut().for_each(|(_, f)| f(key)),
            PanelEvent::ResetAll => self.reset_all.iter_mut().for_each(|(_, f)| f()),
        }
    }

    fn remove(&mut self, subscription: Subscription) -> bool {
        fn drop_id<T>(list: &mut Vec<(u64, T)>, id: u64) -> bool {
            let before = list.len();
            list.retain(|(existing, _)| *existing != id);
            list.len() != before
        }

        match subscription.channel {
            Channel::Init => drop_id(&mut self.init, subscription.id),
            Channel::Change => drop_id(&mut self.change, subscription.id),
            Channel::Reset => drop_id(&mut self.reset, subscription.id),
            Channel::ResetAll => drop_id(&mut self.reset_all, subscription.id),
            Channel::Update => false,
        }
    }
}

/// Interactive state for one params map
pub struct Panel<R, S> {
    random: R,
    storage: S,
    params: Params,
    flags: IndexMap<String, FieldFlags>,
    throttle: Throttle,
    max_array_index: usize,
    mounted: bool,
    listeners: Listeners,
    events: Vec<PanelEvent>,
    queue_events: bool,
    next_subscription: u64,
}

impl<R: RandomSource, S: Storage> Panel<R, S> {
    /// Build a panel, reading each field's initial flags from `storage`
    pub fn new(random: R, storage: S, params: Params, config: &PanelConfig) -> Self {
        let mut panel = Self {
            random,
            storage,
            params: Params::default(),
            flags: IndexMap::new(),
            throttle: Throttle::new(config.throttle()),
            max_array_index: config.max_array_index,
            mounted: false,
            listeners: Listeners::default(),
            events: Vec::new(),
            queue_events: false,
            next_subscription: 0,
        };
        panel.install(params);
        panel
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn random_mut(&mut self) -> &mut R {
        &mut self.random
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Emit `init` on the first call; later calls do nothing
    pub fn mount(&mut self) -> bool {
        if self.mounted {
            return false;
        }
        self.mounted = true;
        let snapshot = self.snapshot();
        self.emit(PanelEvent::Init(snapshot));
        true
    }

    /// Install a new map without emitting `change`
    pub fn replace_params(&mut self, params: Params) {
        self.install(params);
    }

    /// Overlay `query` onto the current map without emitting `change`
    pub fn sync_query(&mut self, query: &str) {
        let next = url::sync_from_query(&mut self.random, &self.params, query, self.max_array_index);
        self.install(next);
    }

    /// Current form data for every field
    pub fn snapshot(&self) -> FormSnapshot {
        self.params
            .iter()
            .flat_map(|(key, param)| serializer::serialize(param.value()).into_pairs(key))
            .collect()
    }

    pub fn field(&self, key: &str) -> Result<FieldView, ParamsError> {
        let param = self.params.get(key).ok_or_else(|| self.params.unknown_key(key))?;
        let flags = self.flags_for(key)?;
        let value = param.value();

        let (inputs, display) = match value {
            ParamValue::Int(n) => (vec![format_number(*n)], format_number(*n)),
            ParamValue::Color(c) => (c.channels().iter().map(|v| format_number(*v)).collect(), c.to_hex()),
            ParamValue::Select(s) => (vec![s.clone()], s.clone()),
        };

        Ok(FieldView {
            key: key.to_string(),
            label: param.label().to_string(),
            kind: param.kind(),
            locked: flags.locked,
            open: flags.open,
            input_visible: flags.accepts_input(),
            reset_visible: flags.open,
            inputs,
            display,
            options: param.options().to_vec(),
        })
    }

    pub fn fields(&self) -> Vec<FieldView> {
        self.params
            .keys()
            .filter_map(|key| self.field(key).ok())
            .collect()
    }

    /// Apply raw input text to a field.
    ///
    /// `name` is a field key, or `key[i]` for one channel of a color.
    pub fn edit(&mut self, name: &str, raw: &str, now: Instant) -> Result<EditOutcome, ParamsError> {
        let (key, channel) = split_channel(name);
        let kind = self
            .params
            .get(key)
            .map(|param| param.kind())
            .ok_or_else(|| self.params.unknown_key(key))?;

        if !self.flags_for(key)?.accepts_input() {
            debug!(key, "edit ignored on hidden input");
            return Ok(EditOutcome::Hidden);
        }

        let parsed = match (kind, channel) {
            (ParamKind::Int, None) => Ok(ParamValue::Int(coerce_number(raw))),
            (ParamKind::Select, None) => Ok(ParamValue::Select(raw.to_string())),
            (ParamKind::Color, Some(index)) if index < 4 => {
                let mut channels = self
                    .params
                    .value(key)?
                    .as_color()
                    .map_or([0.0, 0.0, 0.0, 1.0], |color| *color.channels());
                channels[index] = coerce_number(raw);
                Ok(ParamValue::Color(Color(channels)))
            }
            _ => Err(ParamsError::parse_failure(key, format!("no input named {}", name))),
        };

        self.apply_edit(key, parsed, now)
    }

    /// Replace a color from a `#rrggbb` or `#rrggbbaa` string
    pub fn edit_color_hex(&mut self, key: &str, hex: &str, now: Instant) -> Result<EditOutcome, ParamsError> {
        let kind = self
            .params
            .get(key)
            .map(|param| param.kind())
            .ok_or_else(|| self.params.unknown_key(key))?;

        if !self.flags_for(key)?.accepts_input() {
            debug!(key, "edit ignored on hidden input");
            return Ok(EditOutcome::Hidden);
        }

        let parsed = match (kind, Color::from_hex(hex)) {
            (ParamKind::Color, Some(color)) => Ok(ParamValue::Color(color)),
            (ParamKind::Color, None) => Err(ParamsError::parse_failure(key, format!("invalid hex color {:?}", hex))),
            (other, _) => Err(ParamsError::parse_failure(key, format!("{} field has no hex input", other))),
        };

        self.apply_edit(key, parsed, now)
    }

    fn apply_edit(
        &mut self,
        key: &str,
        parsed: Result<ParamValue, ParamsError>,
        now: Instant,
    ) -> Result<EditOutcome, ParamsError> {
        let value = match parsed {
            Ok(value) if serializer::is_usable(&value) => value,
            Ok(_) => {
                warn!(key, "edit produced an unusable value; keeping prior value");
                return Ok(EditOutcome::Rejected);
            }
            Err(e) => {
                warn!(key, error = %e, "edit could not be parsed; keeping prior value");
                return Ok(EditOutcome::Rejected);
            }
        };

        if self.params.value(key)? == &value {
            return Ok(EditOutcome::Unchanged);
        }

        self.params = self.params.with_value(key, value)?;

        if self.throttle.try_fire(now) {
            self.emit_change();
            Ok(EditOutcome::Emitted)
        } else {
            Ok(EditOutcome::Deferred)
        }
    }

    /// Release a throttled `change` if its window has elapsed
    pub fn poll(&mut self, now: Instant) -> bool {
        if self.throttle.poll(now) {
            self.emit_change();
            true
        } else {
            false
        }
    }

    pub fn has_pending_change(&self) -> bool {
        self.throttle.has_pending()
    }

    /// Regenerate one field, locked or not
    pub fn reset(&mut self, key: &str) -> Result<(), ParamsError> {
        self.params = param::reset_key(&mut self.random, &self.params, key)?;
        self.throttle.clear_pending();
        self.emit(PanelEvent::Reset(key.to_string()));
        self.emit_change();
        Ok(())
    }

    /// Regenerate every unlocked field.
    ///
    /// Returns the number of fields regenerated. `change` is emitted only when
    /// that number is non-zero.
    pub fn reset_all(&mut self) -> Result<usize, ParamsError> {
        self.emit(PanelEvent::ResetAll);

        let unlocked: Vec<&str> = self
            .params
            .keys()
            .filter(|key| self.flags.get(*key).map_or(true, |flags| !flags.locked))
            .collect();
        let count = unlocked.len();
        if count == 0 {
            debug!("reset-all skipped; every field is locked");
            return Ok(0);
        }

        let next = param::reset_all(&mut self.random, &self.params, Some(unlocked.as_slice()), true)?;
        self.params = next;
        self.throttle.clear_pending();
        self.emit_change();
        Ok(count)
    }

    pub fn is_locked(&self, key: &str) -> Result<bool, ParamsError> {
        Ok(self.flags_for(key)?.locked)
    }

    pub fn is_open(&self, key: &str) -> Result<bool, ParamsError> {
        Ok(self.flags_for(key)?.open)
    }

    pub fn set_locked(&mut self, key: &str, locked: bool) -> Result<(), ParamsError> {
        self.flags_for_mut(key)?.locked = locked;
        self.storage.on_lock_update(key, locked);
        Ok(())
    }

    pub fn toggle_lock(&mut self, key: &str) -> Result<bool, ParamsError> {
        let locked = !self.is_locked(key)?;
        self.set_locked(key, locked)?;
        Ok(locked)
    }

    pub fn set_open(&mut self, key: &str, open: bool) -> Result<(), ParamsError> {
        self.flags_for_mut(key)?.open = open;
        self.storage.on_open_update(key, open);
        Ok(())
    }

    pub fn toggle_open(&mut self, key: &str) -> Result<bool, ParamsError> {
        let open = !self.is_open(key)?;
        self.set_open(key, open)?;
        Ok(open)
    }

    // ========================================================================
    // Subscriptions
    // ========================================================================

    pub fn on_init(&mut self, listener: impl FnMut(&FormSnapshot) + 'static) -> Subscription {
        let subscription = self.subscription(Channel::Init);
        self.listeners.init.push((subscription.id, Box::new(listener)));
        subscription
    }

    pub fn on_change(&mut self, listener: impl FnMut(&FormSnapshot) + 'static) -> Subscription {
        let subscription = self.subscription(Channel::Change);
        self.listeners.change.push((subscription.id, Box::new(listener)));
        subscription
    }

    pub fn on_reset(&mut self, listener: impl FnMut(&str) + 'static) -> Subscription {
        let subscription = self.subscription(Channel::Reset);
        self.listeners.reset.push((subscription.id, Box::new(listener)));
        subscription
    }

    pub fn on_reset_all(&mut self, listener: impl FnMut() + 'static) -> Subscription {
        let subscription = self.subscription(Channel::ResetAll);
        self.listeners.reset_all.push((subscription.id, Box::new(listener)));
        subscription
    }

    /// Returns false if the subscription was already gone
    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        self.listeners.remove(subscription)
    }

    /// Queue every emitted event from now on, for [`Panel::drain_events`].
    ///
    /// The queue only empties when drained.
    pub fn enable_event_queue(&mut self) {
        self.queue_events = true;
    }

    /// Take every event queued since the last drain
    pub fn drain_events(&mut self) -> Vec<PanelEvent> {
        core::mem::take(&mut self.events)
    }

    pub fn pending_events(&self) -> &[PanelEvent] {
        &self.events
    }

    fn subscription(&mut self, channel: Channel) -> Subscription {
        self.next_subscription += 1;
        Subscription::new(channel, self.next_subscription)
    }

    fn emit_change(&mut self) {
        let snapshot = self.snapshot();
        self.emit(PanelEvent::Change(snapshot));
    }

    fn emit(&mut self, event: PanelEvent) {
        self.listeners.notify(&event);
        if self.queue_events {
            self.events.push(event);
        }
    }

    fn install(&mut self, params: Params) {
        for key in params.keys() {
            if !self.flags.contains_key(key) {
                let flags = FieldFlags {
                    locked: self.storage.initial_lock_state(key),
                    open: self.storage.initial_open_state(key),
                };
                self.flags.insert(key.to_string(), flags);
            }
        }
        self.flags.retain(|key, _| params.contains_key(key));
        self.params = params;
    }

    fn flags_for(&self, key: &str) -> Result<FieldFlags, ParamsError> {
        self.flags.get(key).copied().ok_or_else(|| self.params.unknown_key(key))
    }

    fn flags_for_mut(&mut self, key: &str) -> Result<&mut FieldFlags, ParamsError> {
        match self.flags.get_index_of(key) {
            Some(index) => Ok(&mut self.flags[index]),
            None => Err(self.params.unknown_key(key)),
        }
    }
}

/// `"bg[2]"` to `("bg", Some(2))`; anything else is a plain key
fn split_channel(name: &str) -> (&str, Option<usize>) {
    let parsed = name
        .strip_suffix(']')
        .and_then(|rest| rest.split_once('['))
        .and_then(|(key, index)| index.parse().ok().map(|index| (key, index)));

    match parsed {
        Some((key, index)) => (key, Some(index)),
        None => (name, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::{define_all, Definitions, ParamDefinition};
    use crate::storage::InMemoryStorage;
    use crate::testing::ConstantRandom;
    use core::time::Duration;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn panel_with(definitions: Definitions, value: f64) -> Panel<ConstantRandom, InMemoryStorage> {
        let mut random = ConstantRandom::new(value);
        let params = define_all(&mut random, &definitions).unwrap();
        let mut panel = Panel::new(random, InMemoryStorage::new(), params, &PanelConfig::default());
        panel.enable_event_queue();
        panel
    }

    fn two_ints() -> Definitions {
        let mut definitions = Definitions::new();
        definitions.insert("name".into(), ParamDefinition::int().with_value(0.5));
        definitions.insert("name2".into(), ParamDefinition::int().with_value(0.5));
        definitions
    }

    fn changes(events: &[PanelEvent]) -> Vec<&FormSnapshot> {
        events
            .iter()
            .filter_map(|event| match event {
                PanelEvent::Change(snapshot) => Some(snapshot),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_split_channel() {
        assert_eq!(split_channel("bg[2]"), ("bg", Some(2)));
        assert_eq!(split_channel("bg"), ("bg", None));
        assert_eq!(split_channel("bg[x]"), ("bg[x]", None));
    }

    #[test]
    fn test_init_fires_once() {
        let mut panel = panel_with(two_ints(), 0.2);
        let count = Rc::new(RefCell::new(0));
        let seen = Rc::clone(&count);
        panel.on_init(move |snapshot| {
            assert_eq!(snapshot.get("name").map(String::as_str), Some("0.5"));
            *seen.borrow_mut() += 1;
        });

        assert!(panel.mount());
        assert!(!panel.mount());
        assert_eq!(*count.borrow(), 1);
        assert_eq!(panel.drain_events().len(), 1);
    }

    #[test]
    fn test_invalid_int_edit_is_rejected() {
        let mut panel = panel_with(two_ints(), 0.2);
        panel.mount();
        panel.drain_events();

        let outcome = panel.edit("name", "abc", Instant::now()).unwrap();

        assert_eq!(outcome, EditOutcome::Rejected);
        assert_eq!(panel.params().value("name").unwrap(), &ParamValue::Int(0.5));
        assert_eq!(panel.field("name").unwrap().inputs, vec!["0.5".to_string()]);
        assert!(panel.drain_events().is_empty());
    }

    #[test]
    fn test_valid_edit_emits_change() {
        let mut panel = panel_with(two_ints(), 0.2);
        let outcome = panel.edit("name", "0.75", Instant::now()).unwrap();

        assert_eq!(outcome, EditOutcome::Emitted);
        let events = panel.drain_events();
        let changes = changes(&events);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].get("name").map(String::as_str), Some("0.75"));

        assert_eq!(panel.edit("name", "0.75", Instant::now()).unwrap(), EditOutcome::Unchanged);
    }

    #[test]
    fn test_throttled_edits_flush_on_poll() {
        let mut panel = panel_with(two_ints(), 0.2);
        let start = Instant::now();

        assert_eq!(panel.edit("name", "0.1", start).unwrap(), EditOutcome::Emitted);
        assert_eq!(
            panel.edit("name", "0.2", start + Duration::from_millis(10)).unwrap(),
            EditOutcome::Deferred
        );
        assert_eq!(
            panel.edit("name", "0.3", start + Duration::from_millis(20)).unwrap(),
            EditOutcome::Deferred
        );
        assert!(!panel.poll(start + Duration::from_millis(30)));
        assert!(panel.poll(start + Duration::from_millis(60)));

        let events = panel.drain_events();
        let changes = changes(&events);
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[1].get("name").map(String::as_str), Some("0.3"));
    }

    #[test]
    fn test_lock_then_reset_all() {
        let mut panel = panel_with(two_ints(), 0.2);
        panel.set_locked("name", true).unwrap();
        panel.drain_events();

        let count = panel.reset_all().unwrap();

        assert_eq!(count, 1);
        assert_eq!(panel.params().value("name").unwrap(), &ParamValue::Int(0.5));
        assert_eq!(panel.params().value("name2").unwrap(), &ParamValue::Int(0.2));

        let events = panel.drain_events();
        assert_eq!(events[0], PanelEvent::ResetAll);
        let changes = changes(&events);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].get("name").map(String::as_str), Some("0.5"));
        assert_eq!(changes[0].get("name2").map(String::as_str), Some("0.2"));
    }

    #[test]
    fn test_locked_field_draws_no_randomness() {
        let mut panel = panel_with(two_ints(), 0.2);
        panel.set_locked("name", true).unwrap();
        let before = panel.random_mut().calls();

        panel.reset_all().unwrap();

        assert_eq!(panel.random_mut().calls() - before, 1);
    }

    #[test]
    fn test_reset_all_with_everything_locked() {
        let mut panel = panel_with(two_ints(), 0.2);
        panel.set_locked("name", true).unwrap();
        panel.set_locked("name2", true).unwrap();

        assert_eq!(panel.reset_all().unwrap(), 0);
        assert_eq!(panel.drain_events(), vec![PanelEvent::ResetAll]);
    }

    #[test]
    fn test_reset_on_locked_field() {
        let mut panel = panel_with(two_ints(), 0.2);
        panel.set_locked("name", true).unwrap();
        let keys = Rc::new(RefCell::new(Vec::new()));
        let seen = Rc::clone(&keys);
        panel.on_reset(move |key| seen.borrow_mut().push(key.to_string()));

        panel.reset("name").unwrap();

        assert_eq!(panel.params().value("name").unwrap(), &ParamValue::Int(0.2));
        assert_eq!(panel.params().value("name2").unwrap(), &ParamValue::Int(0.5));
        assert_eq!(*keys.borrow(), vec!["name".to_string()]);
        assert_eq!(changes(&panel.drain_events()).len(), 1);
    }

    #[test]
    fn test_locked_field_hides_input() {
        let mut panel = panel_with(two_ints(), 0.2);
        panel.set_locked("name", true).unwrap();

        let view = panel.field("name").unwrap();
        assert!(!view.input_visible);
        assert!(view.reset_visible);
        assert_eq!(panel.edit("name", "0.9", Instant::now()).unwrap(), EditOutcome::Hidden);
        assert_eq!(panel.storage().is_locked("name"), Some(true));
    }

    #[test]
    fn test_closing_hides_input_and_reset() {
        let mut panel = panel_with(two_ints(), 0.2);
        assert!(!panel.toggle_open("name").unwrap());

        let view = panel.field("name").unwrap();
        assert!(!view.open);
        assert!(!view.input_visible);
        assert!(!view.reset_visible);
        assert_eq!(panel.storage().is_open("name"), Some(false));
    }

    #[test]
    fn test_flags_read_from_storage() {
        let mut storage = InMemoryStorage::new();
        storage.on_lock_update("name", true);
        let mut random = ConstantRandom::new(0.2);
        let params = define_all(&mut random, &two_ints()).unwrap();
        let panel = Panel::new(random, storage, params, &PanelConfig::default());

        assert!(panel.is_locked("name").unwrap());
        assert!(!panel.is_locked("name2").unwrap());
        assert!(panel.is_open("name").unwrap());
    }

    #[test]
    fn test_color_channel_and_hex_edits() {
        let mut definitions = Definitions::new();
        definitions.insert("bg".into(), ParamDefinition::color());
        let mut panel = panel_with(definitions, 0.0);
        let start = Instant::now();

        assert_eq!(panel.edit("bg[1]", "0.5", start).unwrap(), EditOutcome::Emitted);
        assert_eq!(
            panel.params().value("bg").unwrap(),
            &ParamValue::Color(Color::new(0.0, 0.5, 0.0, 1.0))
        );

        let later = start + Duration::from_secs(1);
        assert_eq!(panel.edit_color_hex("bg", "#zzz", later).unwrap(), EditOutcome::Rejected);
        assert_eq!(panel.edit("bg[7]", "1", later).unwrap(), EditOutcome::Rejected);

        assert_eq!(panel.edit_color_hex("bg", "#ffffff", later).unwrap(), EditOutcome::Emitted);
        let view = panel.field("bg").unwrap();
        assert_eq!(view.display, "#ffffffff");
        assert_eq!(view.inputs.len(), 4);
    }

    #[test]
    fn test_non_numeric_color_channel_is_rejected() {
        let mut definitions = Definitions::new();
        definitions.insert("bg".into(), ParamDefinition::color());
        let mut panel = panel_with(definitions, 0.3);
        panel.mount();
        panel.drain_events();

        let outcome = panel.edit("bg[1]", "abc", Instant::now()).unwrap();

        assert_eq!(outcome, EditOutcome::Rejected);
        assert_eq!(
            panel.params().value("bg").unwrap(),
            &ParamValue::Color(Color::new(0.3, 0.3, 0.3, 1.0))
        );
        assert_eq!(panel.snapshot().get("bg[1]").map(String::as_str), Some("0.3"));
        assert!(panel.drain_events().is_empty());
    }

    #[test]
    fn test_snapshot_expands_colors() {
        let mut definitions = Definitions::new();
        definitions.insert("name".into(), ParamDefinition::int().with_value(0.5));
        definitions.insert("bg".into(), ParamDefinition::color());
        let panel = panel_with(definitions, 0.25);

        let keys: Vec<_> = panel.snapshot().keys().cloned().collect();
        assert_eq!(keys, ["name", "bg[0]", "bg[1]", "bg[2]", "bg[3]"]);
    }

    #[test]
    fn test_unsubscribe() {
        let mut panel = panel_with(two_ints(), 0.2);
        let count = Rc::new(RefCell::new(0));
        let seen = Rc::clone(&count);
        let subscription = panel.on_reset_all(move || *seen.borrow_mut() += 1);

        panel.reset_all().unwrap();
        assert!(panel.unsubscribe(subscription));
        assert!(!panel.unsubscribe(subscription));
        panel.reset_all().unwrap();

        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn test_callbacks_alone_queue_nothing() {
        let mut random = ConstantRandom::new(0.2);
        let params = define_all(&mut random, &two_ints()).unwrap();
        let mut panel = Panel::new(random, InMemoryStorage::new(), params, &PanelConfig::default());
        let count = Rc::new(RefCell::new(0));
        let seen = Rc::clone(&count);
        panel.on_change(move |_| *seen.borrow_mut() += 1);

        panel.mount();
        for _ in 0..1000 {
            panel.reset("name").unwrap();
        }

        assert_eq!(*count.borrow(), 1000);
        assert!(panel.pending_events().is_empty());
        assert!(panel.drain_events().is_empty());
    }

    #[test]
    fn test_unknown_key() {
        let mut panel = panel_with(two_ints(), 0.2);
        assert!(matches!(
            panel.edit("missing", "1", Instant::now()),
            Err(ParamsError::UnknownKey { .. })
        ));
        assert!(panel.toggle_lock("missing").is_err());
    }

    #[test]
    fn test_replace_params_emits_nothing() {
        let mut panel = panel_with(two_ints(), 0.2);
        panel.mount();
        panel.drain_events();

        panel.sync_query("name=0.9");

        assert_eq!(panel.params().value("name").unwrap(), &ParamValue::Int(0.9));
        assert!(panel.drain_events().is_empty());
    }
}
