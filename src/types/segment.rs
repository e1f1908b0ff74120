//! Stored log fragments.

use super::ids::SpanId;

/// One atomic chunk of log text attributed to a span.
///
/// Segments are immutable once stored; their position in the store's array is
/// their permanent index. A segment is "complete" when its text carries a
/// trailing newline; an incomplete segment leaves its line open for the span's
/// next segment to extend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSegment {
    pub span_id: SpanId,
    /// Opaque timestamp text, rendered as-is and never parsed.
    pub time: String,
    pub text: String,
    /// Derived when the segment is accepted, never recomputed afterwards:
    /// true when the span's previous segment left its line unterminated.
    pub continues_line: bool,
}

impl LogSegment {
    /// Whether the text terminates its line.
    pub fn is_complete(&self) -> bool {
        self.text.ends_with('\n')
    }

    /// Whether this segment opens a new line rather than extending one.
    pub fn starts_line(&self) -> bool {
        !self.continues_line
    }

    /// Byte length of the text, the unit of retention accounting.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}
