//! PdfPress client
//!
//! Streams a local PDF to a PdfPress server, reports upload progress while the
//! body is in flight, and saves the compressed copy next to a size summary.

pub mod args;
pub mod report;
pub mod upload;

pub use args::Args;
pub use upload::{track_progress, CompressClient, CompressionOutcome};
