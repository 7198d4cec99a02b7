//! Per-type conversion between parameter values and URL strings
//!
//! Parsing is deliberately forgiving. Numbers follow JavaScript `Number()`
//! coercion, so garbage becomes `NaN` (int) or `0` (color channel) instead of
//! an error. The only hard failures are shape mismatches, such as a scalar where
//! a color expects a list. Callers catch those per key.

use crate::color::Color;
use crate::error::ParamsError;
use crate::param::{ParamKind, ParamValue};

/// A value as it appears in a parsed query string
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// `name=value`
    Scalar(String),
    /// `name[0]=a&name[2]=c`; unset positions are holes
    List(Vec<Option<String>>),
}

impl RawValue {
    pub fn scalar(value: impl Into<String>) -> Self {
        RawValue::Scalar(value.into())
    }

    pub fn list<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RawValue::List(values.into_iter().map(|v| Some(v.into())).collect())
    }
}

/// A value ready to be written into a query string
#[derive(Debug, Clone, PartialEq)]
pub enum Serialized {
    Scalar(String),
    /// Expanded by the caller into `key[0]`, `key[1]`, ...
    List(Vec<String>),
}

impl Serialized {
    /// Query pairs for this value under `key`
    pub fn into_pairs(self, key: &str) -> Vec<(String, String)> {
        match self {
            Serialized::Scalar(value) => vec![(key.to_string(), value)],
            Serialized::List(values) => values
                .into_iter()
                .enumerate()
                .map(|(i, value)| (format!("{}[{}]", key, i), value))
                .collect(),
        }
    }

    fn into_raw(self) -> RawValue {
        match self {
            Serialized::Scalar(value) => RawValue::Scalar(value),
            Serialized::List(values) => RawValue::List(values.into_iter().map(Some).collect()),
        }
    }
}

/// Parse a raw value for a parameter of the given kind
pub fn parse(kind: ParamKind, key: &str, raw: &RawValue) -> Result<ParamValue, ParamsError> {
    match kind {
        ParamKind::Int => Ok(ParamValue::Int(match raw {
            RawValue::Scalar(value) => coerce_number(value),
            // Number(["0.1"]) is 0.1, Number(["a", "b"]) is NaN
            RawValue::List(items) => {
                let joined: Vec<&str> = items.iter().map(|s| s.as_deref().unwrap_or("")).collect();
                coerce_number(&joined.join(","))
            }
        })),
        ParamKind::Color => match raw {
            RawValue::List(items) => {
                let channel = |i: usize| match items.get(i) {
                    Some(Some(value)) => {
                        let n = coerce_number(value);
                        if n.is_nan() {
                            0.0
                        } else {
                            n
                        }
                    }
                    _ if i == 3 => 1.0,
                    _ => 0.0,
                };
                Ok(ParamValue::Color(Color::new(
                    channel(0),
                    channel(1),
                    channel(2),
                    channel(3),
                )))
            }
            RawValue::Scalar(value) => Err(ParamsError::parse_failure(
                key,
                format!("color expects indexed channels, got scalar {:?}", value),
            )),
        },
        ParamKind::Select => match raw {
            RawValue::Scalar(value) => Ok(ParamValue::Select(value.clone())),
            RawValue::List(_) => Err(ParamsError::parse_failure(
                key,
                "select expects a single option, got a list",
            )),
        },
    }
}

/// Serialize a value for the URL
pub fn serialize(value: &ParamValue) -> Serialized {
    match value {
        ParamValue::Int(n) => Serialized::Scalar(format_number(*n)),
        ParamValue::Color(color) => {
            Serialized::List(color.channels().iter().map(|c| format_number(*c)).collect())
        }
        ParamValue::Select(option) => Serialized::Scalar(option.clone()),
    }
}

/// Whether a parsed value may replace the current one
pub fn is_usable(value: &ParamValue) -> bool {
    match value {
        ParamValue::Int(n) => !n.is_nan(),
        ParamValue::Color(color) => color.channels().iter().all(|channel| !channel.is_nan()),
        ParamValue::Select(_) => true,
    }
}

/// Convert a value of the wrong variant into `kind` by round-tripping it
/// through its string form
pub fn coerce(kind: ParamKind, key: &str, value: ParamValue) -> Result<ParamValue, ParamsError> {
    if value.kind() == kind {
        return Ok(value);
    }
    parse(kind, key, &serialize(&value).into_raw())
}

/// JavaScript `Number()` coercion of a string
pub fn coerce_number(raw: &str) -> f64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return 0.0;
    }

    for (prefix, radix) in [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)] {
        if let Some(digits) = trimmed.strip_prefix(prefix) {
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_alphanumeric()) {
                return f64::NAN;
            }
            return u64::from_str_radix(digits, radix)
                .map(|n| n as f64)
                .unwrap_or(f64::NAN);
        }
    }

    let unsigned = trimmed
        .strip_prefix('+')
        .or_else(|| trimmed.strip_prefix('-'))
        .unwrap_or(trimmed);
    if unsigned == "Infinity" {
        return if trimmed.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }

    // Rust also accepts "inf" and "nan", which Number() does not
    let numeric = unsigned
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'));
    if !numeric {
        return f64::NAN;
    }

    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

/// Decimal form matching JavaScript `Number.prototype.toString` for the
/// values that show up in sketches
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let spelled = if n > 0.0 { "Infinity" } else { "-Infinity" };
        spelled.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_coerce_number_like_js() {
        assert_eq!(coerce_number("0.5"), 0.5);
        assert_eq!(coerce_number("  42 "), 42.0);
        assert_eq!(coerce_number(""), 0.0);
        assert_eq!(coerce_number("   "), 0.0);
        assert_eq!(coerce_number("-1e3"), -1000.0);
        assert_eq!(coerce_number(".5"), 0.5);
        assert_eq!(coerce_number("0x1A"), 26.0);
        assert_eq!(coerce_number("0b101"), 5.0);
        assert_eq!(coerce_number("-Infinity"), f64::NEG_INFINITY);
        assert!(coerce_number("abc").is_nan());
        assert!(coerce_number("0.5a").is_nan());
        assert!(coerce_number("inf").is_nan());
        assert!(coerce_number("NaN").is_nan());
        assert!(coerce_number("0x").is_nan());
        assert!(coerce_number("0x+1").is_nan());
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0.1), "0.1");
        assert_eq!(format_number(1.0), "1");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(0.56), "0.56");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(f64::INFINITY), "Infinity");
    }

    #[test]
    fn test_parse_int() {
        let value = parse(ParamKind::Int, "name", &RawValue::scalar("0.1")).unwrap();
        assert_eq!(value, ParamValue::Int(0.1));

        let garbage = parse(ParamKind::Int, "name", &RawValue::scalar("abc")).unwrap();
        assert!(!is_usable(&garbage));
    }

    #[test]
    fn test_parse_int_from_list() {
        let single = parse(ParamKind::Int, "name", &RawValue::list(["0.3"])).unwrap();
        assert_eq!(single, ParamValue::Int(0.3));

        let many = parse(ParamKind::Int, "name", &RawValue::list(["1", "2"])).unwrap();
        assert!(!is_usable(&many));
    }

    #[test]
    fn test_parse_color() {
        let raw = RawValue::list(["0.1", "0.2", "0.3", "0.4"]);
        let value = parse(ParamKind::Color, "background", &raw).unwrap();
        assert_eq!(value, ParamValue::Color(Color::new(0.1, 0.2, 0.3, 0.4)));
    }

    #[test]
    fn test_parse_color_falls_back_to_zero() {
        let raw = RawValue::List(vec![
            Some("0.1".into()),
            Some("oops".into()),
            None,
            Some("0.4".into()),
        ]);
        let value = parse(ParamKind::Color, "background", &raw).unwrap();
        assert_eq!(value, ParamValue::Color(Color::new(0.1, 0.0, 0.0, 0.4)));
    }

    #[test]
    fn test_color_with_nan_channel_is_unusable() {
        assert!(is_usable(&ParamValue::Color(Color::new(0.3, 0.0, 0.3, 1.0))));
        assert!(!is_usable(&ParamValue::Color(Color::new(0.3, f64::NAN, 0.3, 1.0))));
    }

    #[test]
    fn test_parse_color_missing_alpha_is_opaque() {
        let raw = RawValue::list(["0.5", "0.5", "0.5"]);
        let value = parse(ParamKind::Color, "background", &raw).unwrap();
        assert_eq!(value, ParamValue::Color(Color::new(0.5, 0.5, 0.5, 1.0)));
    }

    #[test]
    fn test_parse_color_from_scalar_fails() {
        let result = parse(ParamKind::Color, "background", &RawValue::scalar("#ff0000"));
        assert!(matches!(result, Err(ParamsError::ParseFailure { ref key, .. }) if key == "background"));
    }

    #[test]
    fn test_select_is_identity() {
        let value = parse(ParamKind::Select, "palette", &RawValue::scalar("Not an option")).unwrap();
        assert_eq!(value, ParamValue::Select("Not an option".into()));
        assert_eq!(serialize(&value), Serialized::Scalar("Not an option".into()));
        assert!(parse(ParamKind::Select, "palette", &RawValue::list(["a"])).is_err());
    }

    #[test]
    fn test_serialized_pairs() {
        let pairs = serialize(&ParamValue::Color(Color::new(0.1, 0.2, 0.3, 1.0))).into_pairs("bg");
        assert_eq!(
            pairs,
            vec![
                ("bg[0]".to_string(), "0.1".to_string()),
                ("bg[1]".to_string(), "0.2".to_string()),
                ("bg[2]".to_string(), "0.3".to_string()),
                ("bg[3]".to_string(), "1".to_string()),
            ]
        );
    }

    #[test]
    fn test_coerce_wrong_variant() {
        let value = coerce(ParamKind::Int, "n", ParamValue::Select("0.25".into())).unwrap();
        assert_eq!(value, ParamValue::Int(0.25));
        assert!(coerce(ParamKind::Color, "c", ParamValue::Int(0.5)).is_err());
    }

    proptest! {
        #[test]
        fn prop_int_round_trip(n in proptest::num::f64::NORMAL | proptest::num::f64::ZERO) {
            let raw = match serialize(&ParamValue::Int(n)) {
                Serialized::Scalar(s) => RawValue::Scalar(s),
                other => panic!("unexpected {:?}", other),
            };
            let parsed = parse(ParamKind::Int, "n", &raw).unwrap();
            // -0.0 is written as "0"
            prop_assert_eq!(parsed, ParamValue::Int(if n == 0.0 { 0.0 } else { n }));
        }

        #[test]
        fn prop_color_round_trip(h in 0.0f64..1.0, s in 0.0f64..1.0, v in 0.0f64..1.0, a in 0.0f64..=1.0) {
            let value = ParamValue::Color(Color::new(h, s, v, a));
            let raw = serialize(&value).into_raw();
            prop_assert_eq!(parse(ParamKind::Color, "c", &raw).unwrap(), value);
        }
    }
}
