//! Ingestion boundary: the wire payload and its lenient decoder.

pub mod parser;
pub mod payload;

pub use parser::{ParseError, parse_log_list};
pub use payload::{LogList, SegmentInput, SpanMeta};
