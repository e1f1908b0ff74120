//! logmux - An incremental, multi-source log store with line-oriented views.
//!
//! This library ingests log fragments tagged by span, merges them into one
//! ordered arena, and reconstructs attributed, filtered, continuing, and
//! tailed text views on demand.

pub mod ingest;
pub mod notify;
pub mod store;
pub mod types;

mod render;

#[cfg(test)]
mod test_utils;
