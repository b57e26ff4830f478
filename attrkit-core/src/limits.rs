use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

use crate::error::{AttrKitError, CoreResult};
use crate::keys::{ENV_ATTRIBUTE_COUNT_LIMIT, ENV_ATTRIBUTE_VALUE_LENGTH_LIMIT};

/// Count and length bounds applied by an attribute store.
///
/// `None` means unbounded. Limits are fixed once a store is built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeLimits {
    /// Maximum number of distinct keys.
    pub count: Option<NonZeroUsize>,
    /// Maximum length, in chars, of each scalar or array element.
    pub length: Option<NonZeroUsize>,
}

impl AttributeLimits {
    pub const UNBOUNDED: Self = Self {
        count: None,
        length: None,
    };

    /// Build limits from plain integers. Zero is not a valid limit.
    pub fn new(count: Option<usize>, length: Option<usize>) -> CoreResult<Self> {
        Ok(Self {
            count: positive("attribute count limit", count)?,
            length: positive("attribute length limit", length)?,
        })
    }

    /// Overrides limits from `OTEL_ATTRIBUTE_COUNT_LIMIT` / `OTEL_ATTRIBUTE_VALUE_LENGTH_LIMIT`.
    pub fn with_process_env(self) -> CoreResult<Self> {
        self.with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Overrides limits with values found through `lookup`.
    ///
    /// Missing or empty variables leave the configured limit in place.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> CoreResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(count) = parse_var(&lookup, ENV_ATTRIBUTE_COUNT_LIMIT)? {
            self.count = Some(count);
        }
        if let Some(length) = parse_var(&lookup, ENV_ATTRIBUTE_VALUE_LENGTH_LIMIT)? {
            self.length = Some(length);
        }
        Ok(self)
    }
}

fn positive(what: &str, value: Option<usize>) -> CoreResult<Option<NonZeroUsize>> {
    match value {
        None => Ok(None),
        Some(n) => NonZeroUsize::new(n)
            .map(Some)
            .ok_or_else(|| AttrKitError::Validation(format!("{what} must be positive"))),
    }
}

fn parse_var<F>(lookup: &F, key: &str) -> CoreResult<Option<NonZeroUsize>>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw,
        _ => return Ok(None),
    };
    raw.trim()
        .parse::<NonZeroUsize>()
        .map(Some)
        .map_err(|e| AttrKitError::Validation(format!("invalid {key} '{raw}': {e}")))
}
