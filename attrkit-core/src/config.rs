use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::{fs, num::NonZeroUsize, path::Path};

use crate::limits::AttributeLimits;
use crate::value::Candidate;

/// Attribute configuration an entity is built from.
///
/// `attributes` keeps the order pairs were supplied in (document order for files), and
/// that order decides which keys survive when there are more than the count limit allows.
/// In files it is written as a map.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct AttributeOptions {
    #[serde(
        default,
        serialize_with = "attributes_to_map",
        deserialize_with = "attributes_from_map"
    )]
    pub attributes: Vec<(String, Candidate)>,
    /// Unset means no bound on the number of keys. Zero is rejected when parsing.
    #[serde(default)]
    pub attribute_count_limit: Option<NonZeroUsize>,
    /// Unset means values are never truncated.
    #[serde(default)]
    pub attribute_length_limit: Option<NonZeroUsize>,
}

impl AttributeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a pair. A repeated key is kept and overwrites the earlier one when loaded.
    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<Candidate>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    pub fn count_limit(mut self, limit: NonZeroUsize) -> Self {
        self.attribute_count_limit = Some(limit);
        self
    }

    pub fn length_limit(mut self, limit: NonZeroUsize) -> Self {
        self.attribute_length_limit = Some(limit);
        self
    }

    pub fn with_limits(mut self, limits: AttributeLimits) -> Self {
        self.attribute_count_limit = limits.count;
        self.attribute_length_limit = limits.length;
        self
    }

    pub fn limits(&self) -> AttributeLimits {
        AttributeLimits {
            count: self.attribute_count_limit,
            length: self.attribute_length_limit,
        }
    }
}

fn attributes_to_map<S: Serializer>(
    attrs: &[(String, Candidate)],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_map(attrs.iter().map(|(k, v)| (k, v)))
}

fn attributes_from_map<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<(String, Candidate)>, D::Error> {
    let map = Map::<String, Value>::deserialize(deserializer)?;
    Ok(map.into_iter().map(|(k, v)| (k, Candidate::from(v))).collect())
}

/// Per-entity attribute options. Missing sections → unbounded, empty.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub span: AttributeOptions,
    #[serde(default)]
    pub event: AttributeOptions,
    #[serde(default)]
    pub link: AttributeOptions,
    #[serde(default)]
    pub resource: AttributeOptions,
}

impl Config {
    /// Load a Config from a file path (JSON or TOML by extension). If the
    /// extension is missing or unrecognized, try JSON first, then TOML.
    pub fn from_path<P: AsRef<Path>>(path: P) -> crate::error::CoreResult<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(crate::error::AttrKitError::from)?;
        let s =
            std::str::from_utf8(&bytes).map_err(|e| crate::error::AttrKitError::Other(e.into()))?;
        let cfg: Self = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str::<Self>(s)
                .map_err(|e| crate::error::AttrKitError::Other(e.into()))?,
            Some("toml") => toml::from_str::<Self>(s)
                .map_err(|e| crate::error::AttrKitError::Other(e.into()))?,
            _ => serde_json::from_str::<Self>(s)
                .map_err(|e| crate::error::AttrKitError::Other(e.into()))
                .or_else(|_| {
                    toml::from_str::<Self>(s)
                        .map_err(|e| crate::error::AttrKitError::Other(e.into()))
                })?,
        };
        Ok(cfg)
    }
}
