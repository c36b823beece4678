//! # logview
//!
//! A time-indexed NDJSON log server: given a filter over a potentially huge
//! append-only log file, it locates the first record at or after a
//! requested timestamp in sub-linear time, streams matches chronologically
//! with early termination, and tails the same file for live updates.
//!
//! The design core is the offset locator ([`locator`]) and the streaming
//! reader built on top of it ([`reader`]); [`http`] composes them with the
//! file tailer ([`tail`]) into the bulk, plain-text, SSE, and streaming-HTML
//! endpoints.

pub mod cache;
pub mod config;
pub mod error;
pub mod filter;
pub mod http;
pub mod locator;
pub mod reader;
pub mod record;
pub mod tail;

pub use cache::OffsetCache;
pub use config::Config;
pub use error::LogViewError;
pub use filter::FilterSpec;
pub use record::Record;
pub use tail::Tailer;
