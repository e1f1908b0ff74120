//! Registered log sources and their index ranges.

use super::ids::SourceName;

/// A registered log source: its display name plus the range of indices its
/// segments occupy in the store's array.
///
/// Both indices are `None` until the span's first segment is accepted. During
/// ingestion the range only extends forward; only an eviction rebuild
/// renumbers it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub source_name: SourceName,
    pub first_segment_index: Option<usize>,
    pub last_segment_index: Option<usize>,
}

impl Span {
    /// A freshly registered span with no segments yet.
    pub fn new(source_name: SourceName) -> Self {
        Span {
            source_name,
            first_segment_index: None,
            last_segment_index: None,
        }
    }

    /// Whether at least one segment has been accepted for this span.
    pub fn has_segments(&self) -> bool {
        self.first_segment_index.is_some()
    }
}
