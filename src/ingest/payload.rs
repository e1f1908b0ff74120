//! The `LogList` ingestion payload.
//!
//! A payload carries span metadata keyed by span id plus an ordered batch of
//! segments. The transport accumulates these incrementally and feeds them to
//! the store, which applies them in arrival order. The same shape is produced
//! by the store's incremental export, so one store's output can seed another.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{SourceName, SpanId};

/// Span metadata as it appears on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpanMeta {
    #[serde(default)]
    pub source_name: SourceName,
}

/// One wire segment, before continuation state is derived.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentInput {
    #[serde(default)]
    pub span_id: SpanId,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub text: String,
}

/// An ingestion batch: spans to register plus segments in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogList {
    #[serde(default)]
    pub spans: BTreeMap<SpanId, SpanMeta>,
    #[serde(default)]
    pub segments: Vec<SegmentInput>,
}

impl LogList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers span metadata; the first registration of an id wins.
    pub fn push_span(&mut self, id: impl Into<SpanId>, source_name: impl Into<SourceName>) {
        self.spans.entry(id.into()).or_insert_with(|| SpanMeta {
            source_name: source_name.into(),
        });
    }

    /// Appends `text` for `id` as line-granular segments.
    ///
    /// Each piece keeps its trailing newline; text without a final newline
    /// yields a final incomplete segment; empty text yields nothing.
    pub fn push_text(&mut self, id: &SpanId, time: &str, text: &str) {
        for piece in text.split_inclusive('\n') {
            self.segments.push(SegmentInput {
                span_id: id.clone(),
                time: time.to_string(),
                text: piece.to_string(),
            });
        }
    }

    /// A one-span payload: registers the span and splits `text` into segments.
    pub fn for_span(
        id: impl Into<SpanId>,
        source_name: impl Into<SourceName>,
        time: &str,
        text: &str,
    ) -> Self {
        let id = id.into();
        let mut list = LogList::new();
        list.push_span(id.clone(), source_name);
        list.push_text(&id, time, text);
        list
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty() && self.segments.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const T: &str = "2019-04-10T15:37:37Z";

    #[test]
    fn push_text_splits_at_newlines() {
        let id = SpanId::new("pod:fe");
        let mut list = LogList::new();
        list.push_text(&id, T, "one\ntwo\n");

        let texts: Vec<&str> = list.segments.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["one\n", "two\n"]);
        assert!(list.segments.iter().all(|s| s.span_id == id && s.time == T));
    }

    #[test]
    fn push_text_keeps_final_incomplete_piece() {
        let id = SpanId::new("pod:fe");
        let mut list = LogList::new();
        list.push_text(&id, T, "one\ntwo");

        let texts: Vec<&str> = list.segments.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["one\n", "two"]);
    }

    #[test]
    fn push_text_with_empty_text_adds_nothing() {
        let id = SpanId::new("pod:fe");
        let mut list = LogList::new();
        list.push_text(&id, T, "");
        assert!(list.segments.is_empty());
    }

    #[test]
    fn for_span_registers_and_splits() {
        let list = LogList::for_span("build:fe:1", "fe", T, "a\nb\n");

        assert_eq!(list.spans.len(), 1);
        assert_eq!(
            list.spans[&SpanId::new("build:fe:1")].source_name,
            SourceName::new("fe")
        );
        assert_eq!(list.segments.len(), 2);
    }

    #[test]
    fn first_span_registration_wins() {
        let mut list = LogList::new();
        list.push_span("pod:fe", "fe");
        list.push_span("pod:fe", "renamed");

        assert_eq!(
            list.spans[&SpanId::new("pod:fe")].source_name,
            SourceName::new("fe")
        );
    }

    #[test]
    fn wire_format_uses_camel_case() {
        let list = LogList::for_span("pod:fe", "fe", T, "hi\n");
        let json = serde_json::to_string(&list).unwrap();

        assert!(json.contains("\"sourceName\""));
        assert!(json.contains("\"spanId\""));
        assert!(!json.contains("source_name"));
    }

    proptest! {
        #[test]
        fn serde_roundtrip(
            id in "[a-z:]{0,12}",
            name in "[a-z-]{0,8}",
            text in "[a-z \n]{0,40}"
        ) {
            let list = LogList::for_span(id.as_str(), name.as_str(), T, &text);
            let json = serde_json::to_string(&list).unwrap();
            let parsed: LogList = serde_json::from_str(&json).unwrap();
            prop_assert_eq!(list, parsed);
        }

        #[test]
        fn split_pieces_reassemble_to_input(text in "[a-z \n]{0,60}") {
            let id = SpanId::new("pod:fe");
            let mut list = LogList::new();
            list.push_text(&id, T, &text);

            let rejoined: String = list.segments.iter().map(|s| s.text.as_str()).collect();
            prop_assert_eq!(rejoined, text);
        }

        #[test]
        fn every_piece_but_last_is_newline_terminated(text in "[a-z \n]{1,60}") {
            let id = SpanId::new("pod:fe");
            let mut list = LogList::new();
            list.push_text(&id, T, &text);

            for piece in &list.segments[..list.segments.len().saturating_sub(1)] {
                prop_assert!(piece.text.ends_with('\n'));
            }
        }
    }
}
