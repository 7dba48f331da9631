//! Bounded "last N lines" over arbitrarily large byte streams.
//!
//! This crate holds the streaming core of ztail: a fixed-capacity
//! [`LineWindow`] that retains only the most recent lines inside one
//! wraparound byte region, a [`LineSplitter`] that turns raw chunks into
//! lines while carrying partial lines across chunk boundaries, and a
//! [`StreamingPipeline`] that overlaps reading/decompression with
//! splitting on a second thread.
//!
//! The crate is codec-agnostic: any [`std::io::Read`] works as a source,
//! whether it reads a plain file, stdin, or a decompressor.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod pipeline;
pub mod splitter;
pub mod window;

pub use config::{PipelineConfig, WindowConfig};
pub use error::PipelineError;
pub use pipeline::StreamingPipeline;
pub use splitter::LineSplitter;
pub use window::LineWindow;
