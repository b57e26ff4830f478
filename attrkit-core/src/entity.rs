//! Minimal telemetry entities built on the attribute roles.
//!
//! These carry just enough state to show how an owner composes a role; span lifecycle,
//! context and export live elsewhere.

use std::sync::Arc;

use crate::capability::{AttributeReadable, AttributeWritable, Readable, Writable};
use crate::config::AttributeOptions;
use crate::diagnostics::DropSink;
use crate::store::Attributes;
use crate::value::Candidate;

/// Forwards `AttributeReadable` to the entity's `attrs` role.
macro_rules! forward_readable {
    ($($ty:ty),* $(,)?) => {
        $(
            impl AttributeReadable for $ty {
                fn attributes(&self) -> Attributes {
                    self.attrs.attributes()
                }

                fn dropped_attributes(&self) -> u64 {
                    self.attrs.dropped_attributes()
                }
            }
        )*
    };
}

/// An in-flight span. Accepts attributes and events until [`Span::end`].
#[derive(Debug)]
pub struct Span {
    name: String,
    attrs: Writable,
    events: Vec<Event>,
    ended: bool,
}

impl Span {
    pub fn new(name: impl Into<String>, options: AttributeOptions) -> Self {
        Self {
            name: name.into(),
            attrs: Writable::new("span", options),
            events: Vec::new(),
            ended: false,
        }
    }

    pub fn with_sink(name: impl Into<String>, options: AttributeOptions, sink: Arc<dyn DropSink>) -> Self {
        Self {
            name: name.into(),
            attrs: Writable::with_sink("span", options, sink),
            events: Vec::new(),
            ended: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_recording(&self) -> bool {
        !self.ended
    }

    pub fn set_attribute(&self, key: &str, value: impl Into<Candidate>) -> &Self {
        self.set_attributes([(key, value)])
    }

    /// Ignored once the span has ended; such calls are not counted as drops.
    pub fn set_attributes<I, K, V>(&self, pairs: I) -> &Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Candidate>,
    {
        if self.is_recording() {
            self.attrs.set_attributes(pairs);
        } else {
            tracing::trace!(span = %self.name, "ignoring attributes on ended span");
        }
        self
    }

    pub fn add_event(&mut self, event: Event) -> &mut Self {
        if self.is_recording() {
            self.events.push(event);
        }
        self
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn end(&mut self) {
        self.ended = true;
    }
}

/// A timestamped occurrence within a span. Attributes are fixed at construction.
#[derive(Debug)]
pub struct Event {
    name: String,
    attrs: Readable,
}

impl Event {
    pub fn new(name: impl Into<String>, options: AttributeOptions) -> Self {
        Self {
            name: name.into(),
            attrs: Readable::new("event", options),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A reference from one span to another.
#[derive(Debug)]
pub struct Link {
    target: String,
    attrs: Readable,
}

impl Link {
    pub fn new(target: impl Into<String>, options: AttributeOptions) -> Self {
        Self {
            target: target.into(),
            attrs: Readable::new("link", options),
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

/// The entity producing telemetry (service, host, ...).
#[derive(Debug)]
pub struct Resource {
    attrs: Readable,
}

impl Resource {
    pub fn new(options: AttributeOptions) -> Self {
        Self {
            attrs: Readable::new("resource", options),
        }
    }

    pub fn with_sink(options: AttributeOptions, sink: Arc<dyn DropSink>) -> Self {
        Self {
            attrs: Readable::with_sink("resource", options, sink),
        }
    }
}

forward_readable!(Span, Event, Link, Resource);
