//! Parameter Definitions and the Definition Engine
//!
//! Authors describe parameters declaratively with [`ParamDefinition`]. The
//! engine turns a set of definitions into [`Params`], where every entry holds a
//! concrete value of its declared type:
//!
//! - [`define_all`] fills only the gaps, so authored values survive
//! - [`reset_all`] regenerates every key, or just the keys the caller includes
//! - [`reset_key`] regenerates exactly one key
//!
//! Every operation returns a new map. Callers swap it in wholesale instead of
//! mutating entries, which keeps each UI event atomic.
//!
//! # Example
//!
//! ```
//! use sketch_params::prelude::*;
//!
//! let mut random = Rng::from_seed(7);
//! let mut definitions = Definitions::new();
//! definitions.insert("size".into(), ParamDefinition::int().with_label("Size"));
//! definitions.insert("palette".into(), ParamDefinition::select(["Ice", "Fire"]));
//!
//! let params = define_all(&mut random, &definitions).unwrap();
//! assert_eq!(params.get("size").unwrap().label(), "Size");
//! assert_eq!(params.get("palette").unwrap().label(), "palette");
//! ```

use crate::color::Color;
use crate::error::ParamsError;
use crate::rng::{pick_with, RandomSource};
use crate::serializer;
use core::fmt;
use core::str::FromStr;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// The supported parameter types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "wasm", derive(tsify::Tsify))]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    /// A number, drawn from `[0, 1)` when generated
    Int,
    /// An HSVA color
    Color,
    /// One string out of a fixed option list
    Select,
}

impl ParamKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamKind::Int => "int",
            ParamKind::Color => "color",
            ParamKind::Select => "select",
        }
    }
}

impl FromStr for ParamKind {
    type Err = ParamsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "int" => Ok(ParamKind::Int),
            "color" => Ok(ParamKind::Color),
            "select" => Ok(ParamKind::Select),
            other => Err(ParamsError::UnknownParamType(other.to_string())),
        }
    }
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A concrete parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(f64),
    Color(Color),
    Select(String),
}

impl ParamValue {
    pub fn kind(&self) -> ParamKind {
        match self {
            ParamValue::Int(_) => ParamKind::Int,
            ParamValue::Color(_) => ParamKind::Color,
            ParamValue::Select(_) => ParamKind::Select,
        }
    }

    pub fn as_int(&self) -> Option<f64> {
        match self {
            ParamValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_color(&self) -> Option<Color> {
        match self {
            ParamValue::Color(c) => Some(*c),
            _ => None,
        }
    }

    pub fn as_select(&self) -> Option<&str> {
        match self {
            ParamValue::Select(s) => Some(s),
            _ => None,
        }
    }
}

impl From<f64> for ParamValue {
    fn from(n: f64) -> Self {
        ParamValue::Int(n)
    }
}

impl From<Color> for ParamValue {
    fn from(c: Color) -> Self {
        ParamValue::Color(c)
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Select(s.to_string())
    }
}

/// Author-supplied description of one parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamDefinition {
    #[serde(rename = "type")]
    pub kind: ParamKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Carried for the host; generation never reads it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<ParamValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<ParamValue>,

    /// Choices for `select`; ignored for other kinds
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl ParamDefinition {
    pub fn new(kind: ParamKind) -> Self {
        Self {
            kind,
            label: None,
            default_value: None,
            value: None,
            options: Vec::new(),
        }
    }

    pub fn int() -> Self {
        Self::new(ParamKind::Int)
    }

    pub fn color() -> Self {
        Self::new(ParamKind::Color)
    }

    pub fn select<I, S>(options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            options: options.into_iter().map(Into::into).collect(),
            ..Self::new(ParamKind::Select)
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<ParamValue>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_default_value(mut self, value: impl Into<ParamValue>) -> Self {
        self.default_value = Some(value.into());
        self
    }
}

/// Ordered definition set, keyed by the identifier used in URLs and storage
pub type Definitions = IndexMap<String, ParamDefinition>;

/// Load definitions from a JSON object, preserving authoring order.
///
/// An unrecognized `type` is reported as [`ParamsError::UnknownParamType`].
pub fn definitions_from_json(json: &str) -> Result<Definitions, ParamsError> {
    let raw: IndexMap<String, serde_json::Value> = serde_json::from_str(json)?;
    let mut definitions = Definitions::with_capacity(raw.len());

    for (key, entry) in raw {
        match entry.get("type").and_then(|t| t.as_str()) {
            Some(kind) => {
                ParamKind::from_str(kind)?;
            }
            None => {
                return Err(ParamsError::InvalidDefinitions(format!(
                    "{}: missing \"type\"",
                    key
                )))
            }
        }
        let definition: ParamDefinition = serde_json::from_value(entry)?;
        definitions.insert(key, definition);
    }

    Ok(definitions)
}

/// A parameter whose label and value are guaranteed present
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializedParam {
    #[serde(rename = "type")]
    kind: ParamKind,
    label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    default_value: Option<ParamValue>,
    value: ParamValue,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    options: Vec<String>,
}

impl InitializedParam {
    pub fn kind(&self) -> ParamKind {
        self.kind
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn value(&self) -> &ParamValue {
        &self.value
    }

    pub fn default_value(&self) -> Option<&ParamValue> {
        self.default_value.as_ref()
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// Back to a definition, with the current value kept as the authored one
    pub fn to_definition(&self) -> ParamDefinition {
        ParamDefinition {
            kind: self.kind,
            label: Some(self.label.clone()),
            default_value: self.default_value.clone(),
            value: Some(self.value.clone()),
            options: self.options.clone(),
        }
    }
}

/// The full set of initialized params for one sketch instance
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Params {
    entries: IndexMap<String, InitializedParam>,
}

impl Params {
    pub fn get(&self, key: &str) -> Option<&InitializedParam> {
        self.entries.get(key)
    }

    /// Value for `key`, or [`ParamsError::UnknownKey`] listing what exists
    pub fn value(&self, key: &str) -> Result<&ParamValue, ParamsError> {
        self.entries
            .get(key)
            .map(InitializedParam::value)
            .ok_or_else(|| self.unknown_key(key))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &InitializedParam)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_definitions(&self) -> Definitions {
        self.entries
            .iter()
            .map(|(k, p)| (k.clone(), p.to_definition()))
            .collect()
    }

    /// New map with one value replaced. The value is coerced to the key's kind.
    pub fn with_value(&self, key: &str, value: ParamValue) -> Result<Params, ParamsError> {
        let mut next = self.clone();
        next.set_value(key, value)?;
        Ok(next)
    }

    /// In-place assignment, reserved for maps that were just built and are not
    /// yet visible to anyone else
    pub(crate) fn set_value(&mut self, key: &str, value: ParamValue) -> Result<(), ParamsError> {
        let kind = self
            .entries
            .get(key)
            .map(InitializedParam::kind)
            .ok_or_else(|| self.unknown_key(key))?;
        let value = serializer::coerce(kind, key, value)?;
        if let Some(param) = self.entries.get_mut(key) {
            param.value = value;
        }
        Ok(())
    }

    pub(crate) fn unknown_key(&self, key: &str) -> ParamsError {
        ParamsError::UnknownKey {
            key: key.to_string(),
            available: self.entries.keys().cloned().collect(),
        }
    }
}

/// A fresh, type-appropriate random value
pub fn initial_value<R>(
    random: &mut R,
    key: &str,
    param: &ParamDefinition,
) -> Result<ParamValue, ParamsError>
where
    R: RandomSource + ?Sized,
{
    match param.kind {
        ParamKind::Int => Ok(ParamValue::Int(random.value())),
        ParamKind::Color => {
            let hue = random.value();
            let saturation = random.value();
            let value = random.value();
            Ok(ParamValue::Color(Color::hsv(hue, saturation, value)))
        }
        ParamKind::Select => pick_with(random, &param.options)
            .map(|option| ParamValue::Select(option.clone()))
            .ok_or_else(|| ParamsError::NoValueDefined {
                key: key.to_string(),
            }),
    }
}

/// Initialize one parameter.
///
/// With `force`, or when no value exists, a fresh random value is drawn.
/// Otherwise the existing value is kept (coerced to the declared kind). A value
/// that cannot be coerced counts as missing.
pub fn reset_one<R>(
    random: &mut R,
    key: &str,
    param: &ParamDefinition,
    force: bool,
) -> Result<InitializedParam, ParamsError>
where
    R: RandomSource + ?Sized,
{
    let existing = match (&param.value, force) {
        (Some(value), false) => match serializer::coerce(param.kind, key, value.clone()) {
            Ok(value) if serializer::is_usable(&value) => Some(value),
            Ok(_) | Err(_) => {
                warn!(key, kind = %param.kind, "discarding authored value that does not match its type");
                None
            }
        },
        _ => None,
    };

    let value = match existing {
        Some(value) => value,
        None => initial_value(random, key, param)?,
    };

    Ok(InitializedParam {
        kind: param.kind,
        label: param
            .label
            .clone()
            .filter(|label| !label.is_empty())
            .unwrap_or_else(|| key.to_string()),
        default_value: param.default_value.clone(),
        value,
        options: param.options.clone(),
    })
}

/// Build a full map, filling only the missing values
pub fn define_all<R>(random: &mut R, definitions: &Definitions) -> Result<Params, ParamsError>
where
    R: RandomSource + ?Sized,
{
    let mut entries = IndexMap::with_capacity(definitions.len());
    for (key, definition) in definitions {
        entries.insert(key.clone(), reset_one(random, key, definition, false)?);
    }
    Ok(Params { entries })
}

/// Rebuild every key.
///
/// A key goes through [`reset_one`] with `force` when `include_keys` is `None`
/// or lists it. Any other key is copied as is. Since a [`Params`] never has a
/// missing value, nothing outside `include_keys` is ever filled.
pub fn reset_all<R>(
    random: &mut R,
    params: &Params,
    include_keys: Option<&[&str]>,
    force: bool,
) -> Result<Params, ParamsError>
where
    R: RandomSource + ?Sized,
{
    let mut entries = IndexMap::with_capacity(params.len());
    for (key, param) in &params.entries {
        let included = include_keys.map_or(true, |keys| keys.contains(&key.as_str()));
        let next = if included {
            reset_one(random, key, &param.to_definition(), force)?
        } else {
            param.clone()
        };
        entries.insert(key.clone(), next);
    }
    Ok(Params { entries })
}

/// Force-regenerate exactly one key
pub fn reset_key<R>(random: &mut R, params: &Params, key: &str) -> Result<Params, ParamsError>
where
    R: RandomSource + ?Sized,
{
    if !params.contains_key(key) {
        return Err(params.unknown_key(key));
    }
    reset_all(random, params, Some(core::slice::from_ref(&key)), true)
}
