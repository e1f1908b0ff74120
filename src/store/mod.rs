//! The log store: a span table, an append-only segment arena, and the
//! queries over them.
//!
//! Fragments of log output arrive tagged with a span id. The store registers
//! each span once, appends segments in arrival order, and derives at insert
//! time whether a segment starts a new line or continues the span's previous
//! one. Reads reconstruct line-oriented text without mutating anything, so
//! they are safe to repeat and interleave freely between appends.
//!
//! # Model
//!
//! - One store per session, owned by whoever drives ingestion. No interior
//!   locking; there is a single logical writer and reads borrow `&self`.
//! - Segments are referenced by index, never by pointer. Spans hold an index
//!   range into the arena. Retention trims the arena and renumbers, with a
//!   checkpoint offset preserving the meaning of previously handed-out
//!   checkpoints.
//! - Listeners are dispatched synchronously under `&mut self` after every
//!   mutation, which statically rules out re-entrant mutation from inside a
//!   callback.

mod truncation;


use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, trace, warn};

use crate::ingest::{LogList, SegmentInput};
use crate::notify::{ListenerRegistry, LogUpdate, UpdateAction};
use crate::render::{LineOptions, assemble_lines, span_index_bounds};
use crate::types::{Checkpoint, ListenerId, LogSegment, SourceName, Span, SpanId};

/// Default retention cap, in bytes of stored segment text.
pub const DEFAULT_MAX_LOG_LEN: usize = 2_000_000;

/// Options for [`LogStore::continuing_string_with`].
#[derive(Debug, Clone, Default)]
pub struct ContinuingOptions {
    /// Restrict output to spans belonging to these sources. `None` includes
    /// every span.
    pub sources: Option<BTreeSet<SourceName>>,
    /// Leave the source attribution prefix off every line.
    pub suppress_prefix: bool,
}

/// In-memory session store for multi-source logs.
#[derive(Debug)]
pub struct LogStore {
    spans: BTreeMap<SpanId, Span>,
    segments: Vec<LogSegment>,
    /// Total bytes of segment text, tracked so retention checks are O(1).
    len: usize,
    /// Retention cap in bytes. Zero disables retention entirely.
    max_len: usize,
    /// Count of segments discarded by retention or span removal. Added to
    /// arena indices so checkpoints stay monotonic across trims.
    checkpoint_offset: u64,
    listeners: ListenerRegistry,
}

impl LogStore {
    pub fn new() -> Self {
        Self::with_max_len(DEFAULT_MAX_LOG_LEN)
    }

    /// A store with a custom retention cap. Passing `0` disables retention,
    /// which is useful for tests and for consumers that bound memory
    /// externally via [`LogStore::remove_spans`].
    pub fn with_max_len(max_len: usize) -> Self {
        LogStore {
            spans: BTreeMap::new(),
            segments: Vec::new(),
            len: 0,
            max_len,
            checkpoint_offset: 0,
            listeners: ListenerRegistry::new(),
        }
    }

    // ─── Ingestion ───

    /// Registers a span if it is not already present. Re-registering an
    /// existing id is a no-op; the original source name is kept.
    pub fn ensure_span(&mut self, id: impl Into<SpanId>, source_name: impl Into<SourceName>) {
        self.spans
            .entry(id.into())
            .or_insert_with(|| Span::new(source_name.into()));
    }

    /// Applies one ingestion batch: registers the batch's spans, then appends
    /// its segments in arrival order.
    ///
    /// A segment whose span id resolves to nothing is dropped and the rest of
    /// the batch continues; an unresolved span means the transport delivered
    /// segments ahead of their registration, which the store cannot repair
    /// locally. Each accepted segment's continuation state is derived here,
    /// once, from whether the span's previous segment ended in a newline.
    ///
    /// Listeners observe one append notification per call, followed by a
    /// truncate notification if the batch pushed the store over its
    /// retention cap.
    pub fn append(&mut self, list: LogList) {
        trace!(
            spans = list.spans.len(),
            segments = list.segments.len(),
            "appending batch"
        );

        for (id, meta) in list.spans {
            self.ensure_span(id, meta.source_name);
        }

        let mut touched: Vec<SpanId> = Vec::new();
        for input in list.segments {
            let Some(span) = self.spans.get_mut(&input.span_id) else {
                warn!(
                    span_id = %input.span_id,
                    text_len = input.text.len(),
                    "dropping segment for unregistered span"
                );
                continue;
            };

            let index = self.segments.len();
            let continues_line = match span.last_segment_index {
                Some(last) => !self.segments[last].is_complete(),
                None => false,
            };
            if span.first_segment_index.is_none() {
                span.first_segment_index = Some(index);
            }
            span.last_segment_index = Some(index);

            if !touched.contains(&input.span_id) {
                touched.push(input.span_id.clone());
            }
            self.len += input.text.len();
            self.segments.push(LogSegment {
                span_id: input.span_id,
                time: input.time,
                text: input.text,
                continues_line,
            });
        }

        self.notify(UpdateAction::Append, touched);
        self.ensure_max_len();
    }

    /// Drops the named spans and every segment belonging to them, then
    /// renumbers the surviving arena. Other spans' registrations survive even
    /// if the renumbering leaves them without segments.
    ///
    /// Listeners observe a truncate notification carrying the ids that were
    /// actually removed.
    pub fn remove_spans(&mut self, span_ids: &[SpanId]) {
        if span_ids.is_empty() {
            return;
        }

        let mut removed_spans: Vec<SpanId> = Vec::new();
        for id in span_ids {
            if self.spans.remove(id).is_some() {
                removed_spans.push(id.clone());
            }
        }

        let before = self.segments.len();
        let spans = &self.spans;
        self.segments
            .retain(|segment| spans.contains_key(&segment.span_id));
        let removed_segments = before - self.segments.len();

        self.len = truncation::rebuild_derived(&mut self.segments, &mut self.spans);
        self.checkpoint_offset += removed_segments as u64;

        debug!(
            spans = removed_spans.len(),
            segments = removed_segments,
            "removed spans"
        );
        self.notify(UpdateAction::Truncate, removed_spans);
    }

    // ─── Span table ───

    pub fn span(&self, id: &SpanId) -> Option<&Span> {
        self.spans.get(id)
    }

    /// All registered spans, in id order.
    pub fn spans(&self) -> impl Iterator<Item = (&SpanId, &Span)> {
        self.spans.iter()
    }

    /// The spans belonging to one source, in id order.
    pub fn spans_for_source(&self, name: &SourceName) -> impl Iterator<Item = (&SpanId, &Span)> {
        self.spans
            .iter()
            .filter(move |(_, span)| span.source_name == *name)
    }

    pub fn has_segments_for(&self, id: &SpanId) -> bool {
        self.span(id).is_some_and(Span::has_segments)
    }

    /// Build spans sharing `span_id`'s source, ordered by when each first
    /// produced output. Spans that have produced nothing yet sort first.
    /// Returns nothing if `span_id` is unregistered.
    pub fn ordered_build_span_ids(&self, span_id: &SpanId) -> Vec<SpanId> {
        let Some(start_span) = self.spans.get(span_id) else {
            return Vec::new();
        };
        let mut builds: Vec<(Option<usize>, SpanId)> = self
            .spans
            .iter()
            .filter(|(id, span)| id.is_build() && span.source_name == start_span.source_name)
            .map(|(id, span)| (span.first_segment_index, id.clone()))
            .collect();
        builds.sort_by_key(|(first, _)| match first {
            None => (0, 0),
            Some(i) => (1, *i),
        });
        builds.into_iter().map(|(_, id)| id).collect()
    }

    // ─── Introspection ───

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Total bytes of stored segment text.
    pub fn log_len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Whether the most recently appended segment left its line open.
    pub fn is_last_segment_incomplete(&self) -> bool {
        self.segments
            .last()
            .is_some_and(|segment| !segment.is_complete())
    }

    // ─── Checkpoints ───

    /// The current position in the ingestion stream. Checkpoints count
    /// segments ever ingested, so they never move backwards, even across
    /// retention trims.
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.checkpoint_offset + self.segments.len() as u64)
    }

    /// Maps a checkpoint to an arena index, clamped to the retained range.
    /// A checkpoint from before the oldest retained segment maps to 0.
    fn checkpoint_to_index(&self, c: Checkpoint) -> usize {
        let index = c.0.saturating_sub(self.checkpoint_offset) as usize;
        index.min(self.segments.len())
    }

    /// Exports the store's content from `from` onward as an ingestion
    /// payload. Every span registration is included so the receiver can
    /// resolve each segment; continuation state is re-derived on receipt.
    pub fn to_log_list(&self, from: Checkpoint) -> LogList {
        let mut list = LogList::new();
        for (id, span) in &self.spans {
            list.push_span(id.clone(), span.source_name.clone());
        }
        let start = self.checkpoint_to_index(from);
        for segment in &self.segments[start..] {
            list.segments.push(SegmentInput {
                span_id: segment.span_id.clone(),
                time: segment.time.clone(),
                text: segment.text.clone(),
            });
        }
        list
    }

    // ─── Rendering ───

    /// The full merged timeline, every span, with source attribution.
    pub fn render_all(&self) -> String {
        assemble_lines(&self.segments, &self.spans, &LineOptions::attributed())
    }

    /// The timeline of one source, without attribution.
    ///
    /// `key` is matched against span ids first; if no span has that id, every
    /// span whose source name equals `key` is included. An unknown key
    /// renders to an empty string.
    pub fn render_for(&self, key: &str) -> String {
        let wanted = self.spans_matching(key);
        if wanted.is_empty() {
            return String::new();
        }
        let opts = LineOptions {
            filter: Some(wanted),
            show_prefix: false,
            skip_first_line_prefix: false,
        };
        assemble_lines(&self.segments, &self.spans, &opts)
    }

    /// Everything appended since `from`, rendered for an append-only sink.
    ///
    /// Output printed up to the checkpoint cannot be recalled, so this makes
    /// the stitching decisions for the caller: if the last printed segment
    /// left a line open and the next output continues that same span, the
    /// first line comes out without its prefix; if the next output is from a
    /// different span, a newline is emitted first so the two never share a
    /// line.
    ///
    /// Typical usage:
    ///
    /// ```text
    /// print(store.continuing_string(last));
    /// last = store.checkpoint();
    /// ```
    pub fn continuing_string(&self, from: Checkpoint) -> String {
        self.continuing_string_with(from, &ContinuingOptions::default())
    }

    /// [`LogStore::continuing_string`] restricted to a set of sources and/or
    /// with attribution prefixes suppressed. The stitching decisions consider
    /// only segments visible through the filter, mirroring what the filtered
    /// consumer actually printed.
    pub fn continuing_string_with(&self, from: Checkpoint, opts: &ContinuingOptions) -> String {
        let start = self.checkpoint_to_index(from);
        let sources = opts.sources.as_ref();

        let preceding = self.prev_index_for_sources(start, sources);
        let upcoming = self.next_index_for_sources(start, sources);

        let mut same_span_continuation = false;
        let mut changes_span = false;
        if let (Some(prev), Some(next)) = (preceding, upcoming) {
            let prev_segment = &self.segments[prev];
            if !prev_segment.is_complete() {
                if prev_segment.span_id == self.segments[next].span_id {
                    same_span_continuation = true;
                } else {
                    changes_span = true;
                }
            }
        }

        // Reconstruct over the suffix alone so continuation state reflects
        // what this call will print, not what earlier calls already did.
        let mut segments: Vec<LogSegment> = self.segments[start..].to_vec();
        let mut spans = self.spans.clone();
        truncation::rebuild_derived(&mut segments, &mut spans);

        let filter = sources.map(|wanted| {
            spans
                .iter()
                .filter(|(_, span)| wanted.contains(&span.source_name))
                .map(|(id, _)| id.clone())
                .collect::<BTreeSet<_>>()
        });
        let rendered = assemble_lines(
            &segments,
            &spans,
            &LineOptions {
                filter,
                show_prefix: !opts.suppress_prefix,
                skip_first_line_prefix: same_span_continuation,
            },
        );

        if changes_span {
            let mut out = String::with_capacity(rendered.len() + 1);
            out.push('\n');
            out.push_str(&rendered);
            return out;
        }
        rendered
    }

    /// At most the last `n` lines of the whole store, with attribution.
    pub fn tail(&self, n: usize) -> String {
        self.tail_helper(n, None, true)
    }

    /// At most the last `n` lines of one span, without attribution. An
    /// unregistered span renders to an empty string.
    pub fn tail_span(&self, n: usize, span_id: &SpanId) -> String {
        if !self.spans.contains_key(span_id) {
            return String::new();
        }
        self.tail_helper(n, Some(BTreeSet::from([span_id.clone()])), false)
    }

    fn tail_helper(&self, n: usize, filter: Option<BTreeSet<SpanId>>, show_prefix: bool) -> String {
        if n == 0 {
            return String::new();
        }

        let (start, end) = span_index_bounds(&self.spans, filter.as_ref(), self.segments.len());

        // Walk backward until n line starts are in view.
        let mut remaining = n;
        let mut current = end;
        while remaining > 0 && current > start {
            current -= 1;
            let segment = &self.segments[current];
            if !Self::in_filter(filter.as_ref(), &segment.span_id) {
                continue;
            }
            if segment.starts_line() {
                remaining -= 1;
            }
        }

        if remaining > 0 {
            // Fewer than n lines exist; the whole view is the tail.
            return assemble_lines(
                &self.segments,
                &self.spans,
                &LineOptions {
                    filter,
                    show_prefix,
                    skip_first_line_prefix: false,
                },
            );
        }

        // Keep the window's segments, minus continuations of lines that
        // started before the window; their line starts are out of view.
        let mut started: BTreeSet<SpanId> = BTreeSet::new();
        let mut window: Vec<LogSegment> = Vec::new();
        for segment in &self.segments[current..end] {
            if !Self::in_filter(filter.as_ref(), &segment.span_id) {
                continue;
            }
            if !segment.starts_line() && !started.contains(&segment.span_id) {
                continue;
            }
            window.push(segment.clone());
            started.insert(segment.span_id.clone());
        }

        let mut spans = self.spans.clone();
        truncation::rebuild_derived(&mut window, &mut spans);
        assemble_lines(
            &window,
            &spans,
            &LineOptions {
                filter: None,
                show_prefix,
                skip_first_line_prefix: false,
            },
        )
    }

    // ─── Listeners ───

    /// Registers a callback invoked synchronously after every mutation, in
    /// registration order. The returned handle removes it again.
    pub fn add_listener(&mut self, callback: impl FnMut(&LogUpdate) + 'static) -> ListenerId {
        self.listeners.add(callback)
    }

    /// Removes a listener. Unknown or already-removed handles are a no-op.
    pub fn remove_listener(&mut self, id: ListenerId) {
        self.listeners.remove(id);
    }

    // ─── Internals ───

    fn notify(&mut self, action: UpdateAction, span_ids: Vec<SpanId>) {
        let update = LogUpdate { action, span_ids };
        self.listeners.notify(&update);
    }

    /// Spans selected by a render key: the span with that exact id, or
    /// failing that, every span of the source with that name.
    fn spans_matching(&self, key: &str) -> BTreeSet<SpanId> {
        let as_id = SpanId::new(key);
        if self.spans.contains_key(&as_id) {
            return BTreeSet::from([as_id]);
        }
        self.spans_for_source(&SourceName::new(key))
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Greatest segment index before `index` visible through the source
    /// filter. Without a filter this is simply `index - 1`.
    fn prev_index_for_sources(
        &self,
        index: usize,
        sources: Option<&BTreeSet<SourceName>>,
    ) -> Option<usize> {
        let Some(wanted) = sources else {
            return index.checked_sub(1);
        };
        (0..index).rev().find(|&i| self.source_matches(i, wanted))
    }

    /// Smallest segment index at or after `index` visible through the source
    /// filter.
    fn next_index_for_sources(
        &self,
        index: usize,
        sources: Option<&BTreeSet<SourceName>>,
    ) -> Option<usize> {
        let Some(wanted) = sources else {
            return (index < self.segments.len()).then_some(index);
        };
        (index..self.segments.len()).find(|&i| self.source_matches(i, wanted))
    }

    fn source_matches(&self, index: usize, wanted: &BTreeSet<SourceName>) -> bool {
        self.spans
            .get(&self.segments[index].span_id)
            .is_some_and(|span| wanted.contains(&span.source_name))
    }

    fn in_filter(filter: Option<&BTreeSet<SpanId>>, span_id: &SpanId) -> bool {
        filter.is_none_or(|wanted| wanted.contains(span_id))
    }
}

impl Default for LogStore {
    fn default() -> Self {
        Self::new()
    }
}
