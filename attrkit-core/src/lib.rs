//! Bounded, validated attribute storage for telemetry entities.
//!
//! Spans, events, links and resources keep their metadata in an [`AttributeStore`],
//! which enforces value shape, a key count limit and a value length limit, and counts
//! everything it refuses instead of failing.

pub mod capability;
pub mod config;
pub mod diagnostics;
pub mod entity;
pub mod error;
pub mod keys;
pub mod limits;
pub mod store;
pub mod validator;
pub mod value;
#[cfg(test)]
pub mod test_capture;

pub use capability::{AttributeReadable, AttributeWritable, Readable, Writable};
pub use config::{AttributeOptions, Config};
pub use diagnostics::{DropReport, DropSink, NoopSink, TracingSink};
pub use error::{AttrKitError, CoreResult};
pub use limits::AttributeLimits;
pub use store::{AttributeStore, Attributes};
pub use value::{AttributeValue, Candidate, Scalar};
