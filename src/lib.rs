//! Core library for the `chatbench` CLI.
//!
//! The crate opens many concurrent WebSocket clients against a chat server,
//! has each stream timestamps at a fixed cadence, times the echoes it gets
//! back and reports per-client and aggregate delay and delivery statistics.
//! The primary user-facing interface is the `chatbench` command-line
//! application; library APIs may evolve as the CLI grows.
pub mod args;
pub mod bench;
pub mod config;
pub mod entry;
pub mod error;
pub mod logger;
pub mod prompt;
pub mod report;
mod shutdown;
pub mod timestamp;
pub mod transport;
