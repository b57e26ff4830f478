use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::{Map, Number, Value};

/// A single attribute scalar.
///
/// Integers that fit in an `i64` are `Int`; larger unsigned integers are `UInt` so they
/// are kept exactly. Everything else numeric is `Float`, NaN and infinities included.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
}

impl Scalar {
    /// Length of the scalar's string form, in chars.
    pub fn char_len(&self) -> usize {
        match self {
            Self::String(s) => s.chars().count(),
            other => other.to_string().chars().count(),
        }
    }

    /// Returns a copy whose string form is at most `max` chars.
    ///
    /// Strings are cut down. A bool or number keeps its type while its rendered
    /// form fits, and is replaced by the cut-down rendering otherwise.
    pub fn truncated(&self, max: usize) -> Self {
        match self {
            Self::String(s) => Self::String(truncate_chars(s, max).to_owned()),
            other => {
                let rendered = other.to_string();
                if rendered.chars().count() <= max {
                    other.clone()
                } else {
                    Self::String(truncate_chars(&rendered, max).to_owned())
                }
            }
        }
    }
}

fn number_to_scalar(n: &Number) -> Scalar {
    if let Some(i) = n.as_i64() {
        Scalar::Int(i)
    } else if let Some(u) = n.as_u64() {
        Scalar::UInt(u)
    } else {
        // as_f64 is always Some without arbitrary_precision
        Scalar::Float(n.as_f64().unwrap_or(f64::NAN))
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::UInt(u) => write!(f, "{u}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) => f.write_str(s),
        }
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::UInt(u) => serializer.serialize_u64(*u),
            // JSON has no NaN/inf; keep them as their string form rather than null
            Self::Float(x) if !x.is_finite() => serializer.collect_str(x),
            Self::Float(x) => serializer.serialize_f64(*x),
            Self::String(s) => serializer.serialize_str(s),
        }
    }
}

/// A normalized, stored attribute value: a scalar or a flat sequence of scalars.
///
/// `None` entries in an array are holes carried over from the caller's input.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Scalar(Scalar),
    Array(Vec<Option<Scalar>>),
}

/// A caller-supplied value before validation.
///
/// Anything can be offered to a store: JSON documents, typed scalars, vectors, options.
/// Only the validator decides what gets stored.
#[derive(Debug, Clone, PartialEq)]
pub enum Candidate {
    /// Null / `None`.
    Absent,
    Scalar(Scalar),
    Array(Vec<Candidate>),
    /// An opaque object. Never stored.
    Object(Map<String, Value>),
}

impl Serialize for Candidate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Absent => serializer.serialize_none(),
            Self::Scalar(s) => s.serialize(serializer),
            Self::Array(items) => serializer.collect_seq(items),
            Self::Object(map) => map.serialize(serializer),
        }
    }
}

/// Cuts `s` to at most `max` chars without splitting a UTF-8 sequence.
pub(crate) fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

macro_rules! scalar_from {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$t> for Scalar {
                fn from(v: $t) -> Self {
                    Self::$variant(v.into())
                }
            }
        )*
    };
}

scalar_from! {
    bool => Bool,
    i32 => Int,
    u32 => Int,
    i64 => Int,
    f32 => Float,
    f64 => Float,
    String => String,
    &str => String,
}

impl From<u64> for Scalar {
    fn from(v: u64) -> Self {
        i64::try_from(v).map(Self::Int).unwrap_or(Self::UInt(v))
    }
}

impl From<usize> for Scalar {
    fn from(v: usize) -> Self {
        Self::from(v as u64)
    }
}

macro_rules! via_scalar {
    ($($t:ty),* $(,)?) => {
        $(
            impl From<$t> for AttributeValue {
                fn from(v: $t) -> Self {
                    Self::Scalar(Scalar::from(v))
                }
            }

            impl From<$t> for Candidate {
                fn from(v: $t) -> Self {
                    Self::Scalar(Scalar::from(v))
                }
            }
        )*
    };
}

via_scalar!(bool, i32, u32, i64, u64, usize, f32, f64, String, &str);

impl From<Scalar> for AttributeValue {
    fn from(v: Scalar) -> Self {
        Self::Scalar(v)
    }
}

impl<T: Into<Scalar>> From<Vec<T>> for AttributeValue {
    fn from(items: Vec<T>) -> Self {
        Self::Array(items.into_iter().map(|v| Some(v.into())).collect())
    }
}

impl From<Scalar> for Candidate {
    fn from(v: Scalar) -> Self {
        Self::Scalar(v)
    }
}

impl From<AttributeValue> for Candidate {
    fn from(v: AttributeValue) -> Self {
        match v {
            AttributeValue::Scalar(s) => Self::Scalar(s),
            AttributeValue::Array(items) => Self::Array(
                items
                    .into_iter()
                    .map(|item| item.map(Self::Scalar).unwrap_or(Self::Absent))
                    .collect(),
            ),
        }
    }
}

impl From<Value> for Candidate {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => Self::Absent,
            Value::Bool(b) => Self::Scalar(Scalar::Bool(b)),
            Value::Number(n) => Self::Scalar(number_to_scalar(&n)),
            Value::String(s) => Self::Scalar(Scalar::String(s)),
            Value::Array(items) => Self::Array(items.into_iter().map(Self::from).collect()),
            Value::Object(map) => Self::Object(map),
        }
    }
}

impl<T: Into<Candidate>> From<Option<T>> for Candidate {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Self::Absent)
    }
}

impl<T: Into<Candidate>> From<Vec<T>> for Candidate {
    fn from(items: Vec<T>) -> Self {
        Self::Array(items.into_iter().map(Into::into).collect())
    }
}
