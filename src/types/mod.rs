//! Core types for spans, segments, and store bookkeeping.

pub mod ids;
pub mod segment;
pub mod span;

// The rest of the crate addresses these as `types::X`, not via the submodules.
pub use ids::{BUILD_SPAN_PREFIX, Checkpoint, ListenerId, SourceName, SpanId};
pub use segment::LogSegment;
pub use span::Span;
