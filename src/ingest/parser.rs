//! Lenient decoder for ingestion payloads.
//!
//! Transport payloads are decoded permissively: absent fields default to
//! empty, unknown fields are ignored, and `null` entries in the segment array
//! are skipped. Only structurally invalid JSON is an error, and that error
//! stays with the transport caller; the store itself never sees it.

use serde::Deserialize;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::types::{SourceName, SpanId};

use super::payload::{LogList, SegmentInput, SpanMeta};

/// Error type for payload decoding failures.
#[derive(Debug, Error)]
pub enum ParseError {
    /// JSON deserialization failed (syntax error or mismatched types).
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

// Raw wire structures. Every field defaults so partially populated payloads
// decode; there is no value validation because every string value is legal.

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLogList {
    #[serde(default)]
    spans: BTreeMap<String, RawSpan>,
    #[serde(default)]
    segments: Vec<Option<RawSegment>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSpan {
    #[serde(default)]
    source_name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSegment {
    #[serde(default)]
    span_id: String,
    #[serde(default)]
    time: String,
    #[serde(default)]
    text: String,
}

/// Decodes an ingestion payload.
///
/// Returns the typed [`LogList`], or an error if `payload` is not valid JSON
/// of the expected shape. `null` entries in the segment array (seen from
/// flaky transports) are dropped rather than rejected.
pub fn parse_log_list(payload: &[u8]) -> Result<LogList, ParseError> {
    let raw: RawLogList = serde_json::from_slice(payload)?;

    let spans = raw
        .spans
        .into_iter()
        .map(|(id, span)| {
            (
                SpanId::new(id),
                SpanMeta {
                    source_name: SourceName::new(span.source_name),
                },
            )
        })
        .collect();

    let segments = raw
        .segments
        .into_iter()
        .flatten()
        .map(|seg| SegmentInput {
            span_id: SpanId::new(seg.span_id),
            time: seg.time,
            text: seg.text,
        })
        .collect();

    Ok(LogList { spans, segments })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_payload() {
        let payload = br#"{
            "spans": {
                "build:fe:1": { "sourceName": "fe" },
                "pod:fe-abc": { "sourceName": "fe" }
            },
            "segments": [
                { "spanId": "build:fe:1", "time": "2019-04-10T15:37:37Z", "text": "building\n" },
                { "spanId": "pod:fe-abc", "time": "2019-04-10T15:37:38Z", "text": "serving" }
            ]
        }"#;

        let list = parse_log_list(payload).unwrap();

        assert_eq!(list.spans.len(), 2);
        assert_eq!(
            list.spans[&SpanId::new("build:fe:1")].source_name,
            SourceName::new("fe")
        );
        assert_eq!(list.segments.len(), 2);
        assert_eq!(list.segments[0].text, "building\n");
        assert_eq!(list.segments[1].span_id, SpanId::new("pod:fe-abc"));
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let payload = br#"{
            "spans": { "s1": {} },
            "segments": [ { "spanId": "s1" }, {} ]
        }"#;

        let list = parse_log_list(payload).unwrap();

        assert!(list.spans[&SpanId::new("s1")].source_name.is_empty());
        assert_eq!(list.segments[0].time, "");
        assert_eq!(list.segments[0].text, "");
        assert_eq!(list.segments[1].span_id, SpanId::new(""));
    }

    #[test]
    fn null_segments_are_skipped() {
        let payload = br#"{
            "segments": [
                null,
                { "spanId": "s1", "text": "kept\n" },
                null
            ]
        }"#;

        let list = parse_log_list(payload).unwrap();

        assert_eq!(list.segments.len(), 1);
        assert_eq!(list.segments[0].text, "kept\n");
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let payload = br#"{
            "spans": { "s1": { "sourceName": "fe", "level": "warn" } },
            "segments": [
                { "spanId": "s1", "text": "hi\n", "anchor": true, "fields": {} }
            ],
            "fromCheckpoint": 3
        }"#;

        let list = parse_log_list(payload).unwrap();

        assert_eq!(list.spans.len(), 1);
        assert_eq!(list.segments.len(), 1);
    }

    #[test]
    fn empty_object_is_an_empty_list() {
        let list = parse_log_list(b"{}").unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn segments_without_span_metadata_pass_through() {
        // Span resolution is the store's job, not the decoder's.
        let payload = br#"{ "segments": [ { "spanId": "never-registered", "text": "x" } ] }"#;

        let list = parse_log_list(payload).unwrap();

        assert!(list.spans.is_empty());
        assert_eq!(list.segments.len(), 1);
    }

    #[test]
    fn malformed_json_returns_error() {
        let result = parse_log_list(b"not valid json");
        assert!(matches!(result, Err(ParseError::Json(_))));
    }

    #[test]
    fn mistyped_shape_returns_error() {
        let result = parse_log_list(br#"{ "segments": "not an array" }"#);
        assert!(matches!(result, Err(ParseError::Json(_))));
    }
}
