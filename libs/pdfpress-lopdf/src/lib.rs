//! lopdf adapter for the PdfPress document rewriter
//!
//! Implements the `DocumentRewriter` port by reloading a PDF with lopdf and
//! re-serializing its whole object graph: unreferenced objects and empty
//! streams are dropped, objects are renumbered, streams are compressed, and the
//! result is written as a single full revision with a classic cross-reference
//! table.

mod rewriter;

pub use rewriter::{LopdfRewriter, RewriteOptions};
