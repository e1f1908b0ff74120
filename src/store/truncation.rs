//! Retention and derived-state rebuilds.
//!
//! The arena is allowed to overshoot its cap, then cut back to half of it in
//! one pass, so trims are rare and large instead of constant and small. The
//! cut is planned per source: each source's weight is its byte count scaled
//! by recency rank, and the weightiest source is halved on paper until enough
//! bytes are marked. Sources that only spoke early (one-shot setup output)
//! are thus outlived by smaller recent sources, while a source that dominates
//! the store gets cut even if it is the newest.
//!
//! After any surgery on the arena the derived state is rebuilt from scratch:
//! span index ranges, continuation flags, and the byte total.

use std::collections::BTreeMap;

use tracing::debug;

use crate::notify::UpdateAction;
use crate::types::{LogSegment, SourceName, Span, SpanId};

use super::LogStore;

/// Replays the continuation rule over `segments` and rewrites every span's
/// index range to match. Spans with no surviving segments keep their
/// registration; their range just becomes empty. Returns the byte total.
pub(super) fn rebuild_derived(
    segments: &mut [LogSegment],
    spans: &mut BTreeMap<SpanId, Span>,
) -> usize {
    for span in spans.values_mut() {
        span.first_segment_index = None;
        span.last_segment_index = None;
    }

    let mut total = 0usize;
    for i in 0..segments.len() {
        total += segments[i].len();
        let span_id = segments[i].span_id.clone();
        let Some(span) = spans.get_mut(&span_id) else {
            continue;
        };
        let continues_line = match span.last_segment_index {
            Some(last) => !segments[last].is_complete(),
            None => false,
        };
        segments[i].continues_line = continues_line;
        if span.first_segment_index.is_none() {
            span.first_segment_index = Some(i);
        }
        span.last_segment_index = Some(i);
    }
    total
}

/// One source's share of the store during trim planning.
///
/// `byte_count` doubles as the keep budget once planning is done, and goes
/// negative during the keep walk the moment the source overdraws; signed so
/// the overdraft persists for the rest of the walk.
#[derive(Debug)]
struct SourceWeight {
    name: SourceName,
    start_time: String,
    byte_count: i64,
}

impl LogStore {
    fn truncation_target(&self) -> usize {
        self.max_len / 2
    }

    /// Trims the arena if it has grown past the cap.
    ///
    /// Planning halves the weightiest source repeatedly until the marked
    /// bytes reach `len - target`; the walk then keeps each source's newest
    /// segments up to its remaining budget and drops the rest. Checkpoints
    /// taken before the trim stay valid: the offset absorbs the dropped
    /// segment count.
    pub(super) fn ensure_max_len(&mut self) {
        if self.max_len == 0 || self.len <= self.max_len {
            return;
        }

        let mut weights = self.source_weights();

        let mut left_to_cut = (self.len - self.truncation_target()) as i64;
        while left_to_cut > 0 {
            let Some(heaviest) = heaviest_index(&weights) else {
                break;
            };
            let byte_count = weights[heaviest].byte_count;
            // Rounds up, so a one-byte source still makes progress.
            let amount = (byte_count - byte_count / 2).min(left_to_cut);
            left_to_cut -= amount;
            weights[heaviest].byte_count -= amount;
        }

        let mut dropped_spans: Vec<SpanId> = Vec::new();
        let mut kept: Vec<LogSegment> = Vec::new();
        let mut trimmed = 0u64;
        for segment in std::mem::take(&mut self.segments).into_iter().rev() {
            let name = self.source_of(&segment.span_id);
            let Some(weight) = weights.iter_mut().find(|w| w.name == name) else {
                kept.push(segment);
                continue;
            };
            weight.byte_count -= segment.len() as i64;
            if weight.byte_count < 0 {
                trimmed += 1;
                if !dropped_spans.contains(&segment.span_id) {
                    dropped_spans.push(segment.span_id.clone());
                }
                continue;
            }
            kept.push(segment);
        }
        kept.reverse();
        self.segments = kept;

        self.len = rebuild_derived(&mut self.segments, &mut self.spans);
        self.checkpoint_offset += trimmed;

        debug!(
            trimmed_segments = trimmed,
            remaining_bytes = self.len,
            target = self.truncation_target(),
            "trimmed log over retention cap"
        );

        self.notify(UpdateAction::Truncate, dropped_spans);
    }

    /// Byte count and earliest segment time per source, newest source first.
    /// Ties break on the name so planning is deterministic.
    fn source_weights(&self) -> Vec<SourceWeight> {
        let mut weights: Vec<SourceWeight> = Vec::new();
        for segment in &self.segments {
            let name = self.source_of(&segment.span_id);
            match weights.iter_mut().find(|w| w.name == name) {
                Some(weight) => weight.byte_count += segment.len() as i64,
                None => weights.push(SourceWeight {
                    name,
                    start_time: segment.time.clone(),
                    byte_count: segment.len() as i64,
                }),
            }
        }
        weights.sort_by(|a, b| {
            b.start_time
                .cmp(&a.start_time)
                .then_with(|| b.name.cmp(&a.name))
        });
        weights
    }

    fn source_of(&self, span_id: &SpanId) -> SourceName {
        self.spans
            .get(span_id)
            .map(|span| span.source_name.clone())
            .unwrap_or_default()
    }
}

/// Index of the source to cut next: byte count scaled by recency rank, where
/// the newest source has rank 1. Sources already cut to nothing never win.
fn heaviest_index(weights: &[SourceWeight]) -> Option<usize> {
    let mut heaviest: Option<usize> = None;
    let mut heaviest_value: i64 = 0;
    for (i, weight) in weights.iter().enumerate() {
        let value = (i as i64 + 1) * weight.byte_count;
        if value > heaviest_value {
            heaviest = Some(i);
            heaviest_value = value;
        }
    }
    heaviest
}
