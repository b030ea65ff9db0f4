//! Equality strategies deciding whether a cell drifted from its baseline.
//!
//! The strategy is chosen from the shape of the baseline each time a
//! transaction begins: array baselines compare as sequences, everything
//! else as scalars under the registry's [`ScalarEquality`] policy.

use crate::config::ScalarEquality;
use crate::graph::Value;

/// Comparison used by a cell for the current transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EqualityStrategy {
    Scalar(ScalarEquality),
    Sequence,
}

impl Default for EqualityStrategy {
    fn default() -> Self {
        EqualityStrategy::Scalar(ScalarEquality::default())
    }
}

impl EqualityStrategy {
    /// Pick the strategy for a freshly captured baseline.
    pub fn for_baseline(baseline: &Value, policy: ScalarEquality) -> Self {
        if baseline.is_array() {
            EqualityStrategy::Sequence
        } else {
            EqualityStrategy::Scalar(policy)
        }
    }

    /// Whether `current` still equals `baseline`.
    pub fn equals(&self, current: &Value, baseline: &Value) -> bool {
        match self {
            EqualityStrategy::Scalar(policy) => scalar_eq(current, baseline, *policy),
            EqualityStrategy::Sequence => sequence_eq(current, baseline),
        }
    }
}

/// Scalar comparison under the given policy.
pub fn scalar_eq(a: &Value, b: &Value, policy: ScalarEquality) -> bool {
    match policy {
        ScalarEquality::Strict => a == b,
        ScalarEquality::Loose => loose_eq(a, b),
    }
}

/// Sequence comparison: `undefined`/`null` count as empty, lengths must
/// match and elements compare strictly.
///
/// A non-array, non-nullish value never equals a sequence.
pub fn sequence_eq(a: &Value, b: &Value) -> bool {
    match (as_sequence(a), as_sequence(b)) {
        (Some(a), Some(b)) => a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x == y),
        _ => false,
    }
}

fn as_sequence(value: &Value) -> Option<&[Value]> {
    match value {
        Value::Array(items) => Some(items),
        Value::Undefined | Value::Null => Some(&[]),
        _ => None,
    }
}

/// Coercive equality between plain values.
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    use Value::*;

    match (a, b) {
        (Undefined | Null, Undefined | Null) => true,
        (Undefined | Null, _) | (_, Undefined | Null) => false,
        (Bool(x), Bool(y)) => x == y,
        (Number(x), Number(y)) => x == y,
        (String(x), String(y)) => x == y,
        (Array(_), Array(_)) | (Object(_), Object(_)) => a == b,
        (Array(_), Object(_)) | (Object(_), Array(_)) => false,
        (Number(n), String(s)) | (String(s), Number(n)) => *n == string_to_number(s),
        (Bool(flag), other) | (other, Bool(flag)) => loose_eq(&Number(bool_to_number(*flag)), other),
        (Array(_) | Object(_), primitive) | (primitive, Array(_) | Object(_)) => {
            let composite = if matches!(a, Array(_) | Object(_)) { a } else { b };
            loose_eq(&String(to_display_string(composite)), primitive)
        }
    }
}

fn bool_to_number(flag: bool) -> f64 {
    if flag {
        1.0
    } else {
        0.0
    }
}

/// Numeric value of a string: decimal with optional sign and exponent,
/// unsigned `0x` / `0o` / `0b` integers, or `Infinity`. Blank is zero,
/// anything else NaN.
fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim();
    let radix = match trimmed.get(..2) {
        Some("0x" | "0X") => Some(16),
        Some("0o" | "0O") => Some(8),
        Some("0b" | "0B") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        return parse_radix(&trimmed[2..], radix);
    }

    match trimmed {
        "" => 0.0,
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        _ if trimmed.bytes().any(|b| b.is_ascii_alphabetic() && b != b'e' && b != b'E') => f64::NAN,
        _ => trimmed.parse().unwrap_or(f64::NAN),
    }
}

fn parse_radix(digits: &str, radix: u32) -> f64 {
    if digits.is_empty() {
        return f64::NAN;
    }
    digits
        .chars()
        .try_fold(0.0, |acc: f64, c| {
            c.to_digit(radix)
                .map(|d| acc * f64::from(radix) + f64::from(d))
        })
        .unwrap_or(f64::NAN)
}

/// Shortest round-trip form; exponent notation outside `[1e-6, 1e21)`.
fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_owned();
    }
    if n == f64::INFINITY {
        return "Infinity".to_owned();
    }
    if n == f64::NEG_INFINITY {
        return "-Infinity".to_owned();
    }
    if n == 0.0 {
        return "0".to_owned();
    }

    let magnitude = n.abs();
    if (1e-6..1e21).contains(&magnitude) {
        return n.to_string();
    }
    let formatted = format!("{n:e}");
    match formatted.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{mantissa}e+{exponent}")
        }
        _ => formatted,
    }
}

/// String form used when a composite meets a primitive.
fn to_display_string(value: &Value) -> String {
    match value {
        Value::Undefined | Value::Null => String::new(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(n) => number_to_string(*n),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(to_display_string)
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_owned(),
    }
}
