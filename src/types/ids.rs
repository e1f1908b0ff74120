//! Newtype wrappers for the store's identifiers.
//!
//! These types keep span ids, source names, and checkpoints from being mixed
//! up at call sites (e.g., passing a source name where a span id is expected)
//! and make the query surface self-documenting.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix shared by the span ids of build logs.
///
/// Each build of a source logs under its own span, conventionally id'd
/// `"build:<source>:<n>"`, so grouping a source's builds only needs this
/// prefix test.
pub const BUILD_SPAN_PREFIX: &str = "build:";

/// Identifier of one log source's stream.
///
/// The empty string is a legal id; the global, unattributed stream uses it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpanId(pub String);

impl SpanId {
    pub fn new(s: impl Into<String>) -> Self {
        SpanId(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this id names a build span (`"build:..."`).
    pub fn is_build(&self) -> bool {
        self.0.starts_with(BUILD_SPAN_PREFIX)
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SpanId {
    fn from(s: String) -> Self {
        SpanId(s)
    }
}

impl From<&str> for SpanId {
    fn from(s: &str) -> Self {
        SpanId(s.to_string())
    }
}

/// Human-readable name of a log source, shared by all of that source's spans.
///
/// An empty name marks unattributed output; rendering emits no prefix for it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceName(pub String);

impl SourceName {
    pub fn new(s: impl Into<String>) -> Self {
        SourceName(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SourceName {
    fn from(s: String) -> Self {
        SourceName(s)
    }
}

impl From<&str> for SourceName {
    fn from(s: &str) -> Self {
        SourceName(s.to_string())
    }
}

/// Monotonic high-water mark into the ingestion stream.
///
/// `checkpoint()` hands these out; incremental readers pass them back to read
/// only what arrived since. Checkpoints stay valid across retention trims: a
/// checkpoint from before a trim resolves to the oldest retained segment.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Checkpoint(pub u64);

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Checkpoint {
    fn from(n: u64) -> Self {
        Checkpoint(n)
    }
}

/// Handle returned by listener registration, used to deregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
