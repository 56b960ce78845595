//! Local fan-out sinks for stored articles.
//!
//! Each sink keeps its own copy of what it receives and has no influence on
//! version history. [`SinkConfig`] is what the server reads from its
//! configuration file; [`ConfiguredSink`] is what it builds from it.

mod config;
mod json_file;
mod json_lines;
mod memory;

pub use config::{ConfiguredSink, SinkConfig};
pub use json_file::JsonFileSink;
pub use json_lines::JsonLinesSink;
pub use memory::MemorySink;
