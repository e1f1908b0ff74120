//! Line reconstruction over the segment arena.
//!
//! Segments are stored in arrival order, not line order, so producing
//! line-oriented text means walking the arena and stitching each line back
//! together: a segment that starts a line is printed, then the walk runs ahead
//! through that span's later segments until the line completes. Segments that
//! continue a line are skipped by the outer walk since the run-ahead that
//! printed their line start already consumed them. Worst-case quadratic, fine
//! for the store sizes retention allows.

use std::collections::{BTreeMap, BTreeSet};

use crate::render::prefix::push_source_prefix;
use crate::types::{LogSegment, Span, SpanId};

/// Controls for a single reconstruction pass.
#[derive(Debug, Clone, Default)]
pub(crate) struct LineOptions {
    /// Restrict output to these spans. `None` renders everything.
    pub(crate) filter: Option<BTreeSet<SpanId>>,
    /// Prepend the fixed-width source attribution to each line.
    pub(crate) show_prefix: bool,
    /// Leave the very first line bare even when prefixes are on. Used when the
    /// output continues a line the consumer has already printed.
    pub(crate) skip_first_line_prefix: bool,
}

impl LineOptions {
    pub(crate) fn attributed() -> Self {
        LineOptions {
            filter: None,
            show_prefix: true,
            skip_first_line_prefix: false,
        }
    }

    fn includes(&self, span_id: &SpanId) -> bool {
        match &self.filter {
            Some(wanted) => wanted.contains(span_id),
            None => true,
        }
    }
}

/// Half-open segment index range covered by the filtered spans, or the whole
/// arena when there is no filter. Spans that hold no segments contribute
/// nothing; if none of the filtered spans hold segments the range is empty.
pub(crate) fn span_index_bounds(
    spans: &BTreeMap<SpanId, Span>,
    filter: Option<&BTreeSet<SpanId>>,
    segment_count: usize,
) -> (usize, usize) {
    let Some(wanted) = filter else {
        return (0, segment_count);
    };
    let mut bounds: Option<(usize, usize)> = None;
    for span_id in wanted {
        let Some(span) = spans.get(span_id) else {
            continue;
        };
        let (Some(first), Some(last)) = (span.first_segment_index, span.last_segment_index) else {
            continue;
        };
        bounds = Some(match bounds {
            None => (first, last + 1),
            Some((lo, hi)) => (lo.min(first), hi.max(last + 1)),
        });
    }
    bounds.unwrap_or((0, 0))
}

/// Reconstructs line-oriented text from `segments`.
///
/// Every line belonging to an included span comes out contiguous, in the
/// order the lines were started. When a line is still open and a different
/// line has to start, a newline is injected so the two do not blend together;
/// the open line itself stays unterminated if nothing ever completes it.
pub(crate) fn assemble_lines(
    segments: &[LogSegment],
    spans: &BTreeMap<SpanId, Span>,
    opts: &LineOptions,
) -> String {
    let mut out = String::new();
    let mut first_line = true;
    let mut last_line_completed = false;

    for (i, segment) in segments.iter().enumerate() {
        if !segment.starts_line() {
            continue;
        }
        if !opts.includes(&segment.span_id) {
            continue;
        }
        let Some(span) = spans.get(&segment.span_id) else {
            // Inconsistent derived state; leave the segment out rather than
            // emit text that cannot be attributed.
            continue;
        };

        if !first_line && !last_line_completed {
            out.push('\n');
        }

        if opts.show_prefix
            && !span.source_name.is_empty()
            && !(opts.skip_first_line_prefix && first_line)
        {
            push_source_prefix(&mut out, &span.source_name);
        }
        first_line = false;

        out.push_str(&segment.text);
        if segment.is_complete() {
            last_line_completed = true;
            continue;
        }
        last_line_completed = false;

        // Run ahead to pull in the rest of this line. The span's last segment
        // index bounds the scan; segments of other spans in between are
        // skipped, and a segment of the same span that starts a fresh line
        // ends the scan without being consumed.
        let run_to = span.last_segment_index.unwrap_or(i).min(segments.len() - 1);
        for next in segments.iter().take(run_to + 1).skip(i + 1) {
            if next.span_id != segment.span_id {
                continue;
            }
            if next.starts_line() {
                break;
            }
            out.push_str(&next.text);
            if next.is_complete() {
                last_line_completed = true;
                break;
            }
        }
    }
    out
}
