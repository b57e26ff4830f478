//! Shape check and normalization for a single candidate attribute value.
//!
//! A [`Candidate`] may be absent, an opaque object, a scalar, or a sequence of anything.
//! Only scalars and flat sequences of scalars are accepted. Accepted values are always
//! rebuilt into a fresh [`AttributeValue`], so nothing the caller holds is shared with
//! what gets stored.

use std::num::NonZeroUsize;

use crate::value::{AttributeValue, Candidate, Scalar};

/// Why a candidate value was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The value was null/absent. Expected and not worth reporting loudly.
    Absent,
    /// The value was an object, or a sequence holding an object or a sequence.
    Malformed,
}

/// Validates `value` and returns its normalized copy.
///
/// When `max_len` is set, every scalar (and every array element) is cut down
/// to that many chars. Absent elements inside an array are kept as holes.
pub fn validate(value: &Candidate, max_len: Option<NonZeroUsize>) -> Result<AttributeValue, Rejection> {
    let limit = |s: &Scalar| match max_len {
        Some(max) => s.truncated(max.get()),
        None => s.clone(),
    };

    match value {
        Candidate::Absent => Err(Rejection::Absent),
        Candidate::Object(_) => Err(Rejection::Malformed),
        Candidate::Scalar(s) => Ok(AttributeValue::Scalar(limit(s))),
        Candidate::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Candidate::Absent => out.push(None),
                    Candidate::Scalar(s) => out.push(Some(limit(s))),
                    Candidate::Array(_) | Candidate::Object(_) => return Err(Rejection::Malformed),
                }
            }
            Ok(AttributeValue::Array(out))
        }
    }
}
