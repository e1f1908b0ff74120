//! Turning the segment arena back into human-readable text.

mod lines;
mod prefix;

pub(crate) use lines::{LineOptions, assemble_lines, span_index_bounds};
