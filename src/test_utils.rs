//! Shared test utilities and arbitrary generators for property-based testing.

use chrono::DateTime;
use proptest::prelude::*;

use crate::ingest::{LogList, SegmentInput};
use crate::types::{SourceName, SpanId};

pub fn arb_span_id() -> impl Strategy<Value = SpanId> {
    prop_oneof![
        "[a-z]{1,8}:[a-z0-9]{1,8}".prop_map(SpanId::from),
        "build:[0-9]{1,4}".prop_map(SpanId::from),
        Just(SpanId::new("")),
    ]
}

pub fn arb_source_name() -> impl Strategy<Value = SourceName> {
    prop_oneof![
        "[a-z][a-z0-9-]{0,15}".prop_map(SourceName::from),
        Just(SourceName::new("")),
    ]
}

/// RFC 3339 timestamps; lexicographic order matches chronological order.
pub fn arb_time() -> impl Strategy<Value = String> {
    (1_500_000_000i64..1_900_000_000i64).prop_map(|secs| {
        DateTime::from_timestamp(secs, 0)
            .expect("timestamp in range")
            .to_rfc3339()
    })
}

/// One segment's worth of text: either a complete line or an open fragment.
pub fn arb_chunk_text() -> impl Strategy<Value = String> {
    prop_oneof![
        "[ -~]{0,20}\n".prop_map(String::from),
        "[ -~]{1,20}".prop_map(String::from),
    ]
}

/// A well-formed ingestion batch: every segment references a span registered
/// in the same batch, so nothing gets dropped at the gate.
pub fn arb_log_list() -> impl Strategy<Value = LogList> {
    (
        prop::collection::btree_map(arb_span_id(), arb_source_name(), 1..4),
        prop::collection::vec(
            (any::<prop::sample::Index>(), arb_time(), arb_chunk_text()),
            0..8,
        ),
    )
        .prop_map(|(spans, raw_segments)| {
            let ids: Vec<SpanId> = spans.keys().cloned().collect();
            let mut list = LogList::new();
            for (id, name) in spans {
                list.push_span(id, name);
            }
            for (pick, time, text) in raw_segments {
                list.segments.push(SegmentInput {
                    span_id: ids[pick.index(ids.len())].clone(),
                    time,
                    text,
                });
            }
            list
        })
}
