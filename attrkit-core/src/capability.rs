//! Attribute roles that telemetry entities compose.
//!
//! An entity holds one role privately and forwards to it:
//! - [`Readable`] for records that are fixed once built (events, links, resources).
//! - [`Writable`] for records that still accept attributes (a span while recording).
//!
//! The role owns its [`AttributeStore`] and never hands it out. Because the role field is
//! private to the entity, `Writable::set_attributes` is reachable only through the entity's
//! own methods.

use std::sync::Arc;

use crate::config::AttributeOptions;
use crate::diagnostics::DropSink;
use crate::store::{AttributeStore, Attributes};
use crate::value::Candidate;

/// Read access to an entity's attributes.
pub trait AttributeReadable {
    /// Independent copy of the current attributes.
    fn attributes(&self) -> Attributes;

    /// Attributes refused so far, including at construction.
    fn dropped_attributes(&self) -> u64;
}

/// Read access plus the ability to add attributes after construction.
pub trait AttributeWritable: AttributeReadable {
    fn set_attributes<I, K, V>(&self, pairs: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Candidate>;
}

fn build_store(label: &'static str, options: AttributeOptions, sink: Option<Arc<dyn DropSink>>) -> AttributeStore {
    let limits = options.limits();
    let mut store = AttributeStore::empty(limits).labelled(label);
    if let Some(sink) = sink {
        store = store.reporting_to(sink);
    }
    store.set(options.attributes);
    store
}

/// Read-only attribute role.
#[derive(Debug)]
pub struct Readable {
    store: AttributeStore,
}

impl Readable {
    pub fn new(label: &'static str, options: AttributeOptions) -> Self {
        Self {
            store: build_store(label, options, None),
        }
    }

    pub fn with_sink(label: &'static str, options: AttributeOptions, sink: Arc<dyn DropSink>) -> Self {
        Self {
            store: build_store(label, options, Some(sink)),
        }
    }
}

impl AttributeReadable for Readable {
    fn attributes(&self) -> Attributes {
        self.store.snapshot()
    }

    fn dropped_attributes(&self) -> u64 {
        self.store.dropped_fields()
    }
}

/// Writable attribute role.
#[derive(Debug)]
pub struct Writable {
    store: AttributeStore,
}

impl Writable {
    pub fn new(label: &'static str, options: AttributeOptions) -> Self {
        Self {
            store: build_store(label, options, None),
        }
    }

    pub fn with_sink(label: &'static str, options: AttributeOptions, sink: Arc<dyn DropSink>) -> Self {
        Self {
            store: build_store(label, options, Some(sink)),
        }
    }
}

impl AttributeReadable for Writable {
    fn attributes(&self) -> Attributes {
        self.store.snapshot()
    }

    fn dropped_attributes(&self) -> u64 {
        self.store.dropped_fields()
    }
}

impl AttributeWritable for Writable {
    fn set_attributes<I, K, V>(&self, pairs: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Candidate>,
    {
        self.store.set(pairs);
    }
}
