//! URL Synchronizer
//!
//! Keeps a [`Params`] map in agreement with a query string:
//!
//! - [`parse_query`] turns `name=v` and `name[i]=v` pairs into a
//!   [`NestedQuery`]. Anything else is dropped.
//! - [`sync_from_query`] overlays parsed values onto a copy of the map. Keys the
//!   URL does not mention keep their values, and a value that fails to parse
//!   leaves its key alone.
//! - [`to_query`] goes the other way, for pushing state back into history.
//!
//! Nothing here returns an error for bad input. Problems are reported through
//! `tracing` and the rest of the query still applies.

use crate::error::ParamsError;
use crate::param::{define_all, Definitions, Params};
use crate::rng::RandomSource;
use crate::serializer::{self, RawValue};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;
use tracing::{debug, trace, warn};

static PLAIN_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\[.]+$").expect("plain key pattern is valid"));

static ARRAY_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([^.\[]+)\[(\d*)\]").expect("array key pattern is valid"));

/// `application/x-www-form-urlencoded` leaves only these unescaped
const FORM_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'*')
    .remove(b'-')
    .remove(b'.')
    .remove(b'_');

/// Query keys grouped by their top-level name
pub type NestedQuery = IndexMap<String, RawValue>;

/// The query part of a full URL, without `?` or fragment
pub fn query_from_href(href: &str) -> &str {
    let without_fragment = href.split('#').next().unwrap_or("");
    without_fragment
        .split_once('?')
        .map(|(_, query)| query)
        .unwrap_or("")
}

/// Decoded key/value pairs in order of appearance, duplicates included
pub fn decode_pairs(query: &str) -> Vec<(String, String)> {
    query
        .strip_prefix('?')
        .unwrap_or(query)
        .split('&')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let (key, value) = segment.split_once('=').unwrap_or((segment, ""));
            (decode_component(key), decode_component(value))
        })
        .collect()
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

fn encode_component(raw: &str) -> String {
    utf8_percent_encode(raw, FORM_ENCODE_SET)
        .to_string()
        .replace("%20", "+")
}

/// Encode pairs as a query string (without the leading `?`)
pub fn encode_pairs<'a, I>(pairs: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    pairs
        .into_iter()
        .map(|(key, value)| format!("{}={}", encode_component(key), encode_component(value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Parse a query string into its nested form.
///
/// Later pairs win. `name[]` appends, `name[n]` sets position `n` (leaving
/// holes below it), and a plain `name` replaces any list gathered so far.
pub fn parse_query(query: &str, max_array_index: usize) -> NestedQuery {
    let mut nested = NestedQuery::new();

    for (key, value) in decode_pairs(query) {
        if let Err(e) = insert_segment(&mut nested, &key, value, max_array_index) {
            debug!(error = %e, "dropping query segment");
        }
    }

    nested
}

fn insert_segment(
    nested: &mut NestedQuery,
    key: &str,
    value: String,
    max_array_index: usize,
) -> Result<(), ParamsError> {
    if key.is_empty() {
        return Ok(());
    }

    if PLAIN_KEY.is_match(key) {
        nested.insert(key.to_string(), RawValue::Scalar(value));
        return Ok(());
    }

    let captures = ARRAY_KEY
        .captures(key)
        .ok_or_else(|| ParamsError::MalformedUrlSegment(key.to_string()))?;
    let name = &captures[1];
    let index = &captures[2];

    let position = if index.is_empty() {
        None
    } else {
        let position = index
            .parse::<usize>()
            .ok()
            .filter(|position| *position <= max_array_index)
            .ok_or_else(|| ParamsError::MalformedUrlSegment(key.to_string()))?;
        Some(position)
    };

    let mut items = match nested.get_mut(name) {
        Some(RawValue::List(items)) => core::mem::take(items),
        _ => Vec::new(),
    };

    match position {
        None => items.push(Some(value)),
        Some(position) => {
            if items.len() <= position {
                items.resize(position + 1, None);
            }
            items[position] = Some(value);
        }
    }

    // Re-inserting an existing key keeps its position
    nested.insert(name.to_string(), RawValue::List(items));
    Ok(())
}

/// Overlay a query onto a copy of `params`.
///
/// The copy is built through the fill-only path first, so a map that somehow
/// lacks values would be completed rather than rejected.
pub fn sync_from_query<R>(
    random: &mut R,
    params: &Params,
    query: &str,
    max_array_index: usize,
) -> Params
where
    R: RandomSource + ?Sized,
{
    let mut next = match define_all(random, &params.to_definitions()) {
        Ok(next) => next,
        Err(e) => {
            warn!(error = %e, "could not rebuild params before URL sync");
            params.clone()
        }
    };
    apply_nested(&mut next, &parse_query(query, max_array_index), query);
    next
}

/// Startup path: define from scratch, then overlay the query
pub fn sync_definitions_from_query<R>(
    random: &mut R,
    definitions: &Definitions,
    query: &str,
    max_array_index: usize,
) -> Result<Params, ParamsError>
where
    R: RandomSource + ?Sized,
{
    let mut params = define_all(random, definitions)?;
    apply_nested(&mut params, &parse_query(query, max_array_index), query);
    Ok(params)
}

fn apply_nested(params: &mut Params, nested: &NestedQuery, query: &str) {
    for (key, raw) in nested {
        let Some(kind) = params.get(key).map(|param| param.kind()) else {
            trace!(key = key.as_str(), "query key has no matching param");
            continue;
        };

        let applied = serializer::parse(kind, key, raw).and_then(|value| {
            if serializer::is_usable(&value) {
                params.set_value(key, value)
            } else {
                Err(ParamsError::parse_failure(key, format!("unusable value {:?}", raw)))
            }
        });

        if let Err(e) = applied {
            warn!(key = key.as_str(), query, error = %e, "failed to initialize param from URL");
        }
    }
}

/// Serialize every param, then let `overrides` (a form snapshot) replace or
/// extend individual keys
pub fn to_query<I, K, V>(params: &Params, overrides: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut pairs: IndexMap<String, String> = IndexMap::new();

    for (key, param) in params.iter() {
        for (name, value) in serializer::serialize(param.value()).into_pairs(key) {
            pairs.insert(name, value);
        }
    }

    for (name, value) in overrides {
        pairs.insert(name.as_ref().to_string(), value.as_ref().to_string());
    }

    encode_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
}
