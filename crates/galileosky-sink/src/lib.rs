//! Persistent sink for assembled telemetry records.
//!
//! The protocol and network crates never write to disk themselves; they
//! hand a finished [`serde_json::Value`] to whatever implements [`Sink`].
//! The default implementation, [`JsonlSink`], appends one JSON object per
//! line to a configurable path, mirroring the original listener's
//! `JsonFileStorage` — including its habit of diverting anything it fails
//! to format to a sibling `*_errors.jsonl` file instead of losing it.

mod error;
mod jsonl;

pub use error::{SinkError, SinkResult};
pub use jsonl::JsonlSink;

use serde_json::Value;

/// Single-method contract a session hands finished records to.
///
/// `save` takes ownership of the record rather than a reference: most
/// implementations serialize it immediately, and the async boundary makes
/// borrowing awkward for no benefit. A failed save is logged by the caller
/// and never aborts the session — see the error-handling policy in the
/// crate's design notes.
#[async_trait::async_trait]
pub trait Sink: Send + Sync {
    async fn save(&self, record: Value) -> SinkResult<()>;
}
