//! Per-request pipeline state machine
//!
//! ```text
//! Received -> Materializing -> Rewriting -> Delivering -> Completed
//!     \             \              \             \
//!      +-------------+--------------+-------------+--> Failed(kind)
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use tracing::{debug, warn};

use crate::compression::error::{CompressionError, ErrorKind};
use crate::compression::ids::RequestId;

/// Stage of a single request in the compression pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "reason")]
pub enum PipelineState {
    Received,
    Materializing,
    Rewriting,
    Delivering,
    Completed,
    Failed(ErrorKind),
}

impl PipelineState {
    /// Whether the run has finished
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed(_))
    }

    /// Whether `next` is a legal successor of this state
    pub fn can_advance_to(&self, next: PipelineState) -> bool {
        use PipelineState::*;

        match (self, next) {
            (Received, Materializing)
            | (Materializing, Rewriting)
            | (Rewriting, Delivering)
            | (Delivering, Completed) => true,
            (current, Failed(_)) => !current.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Received => f.write_str("received"),
            Self::Materializing => f.write_str("materializing"),
            Self::Rewriting => f.write_str("rewriting"),
            Self::Delivering => f.write_str("delivering"),
            Self::Completed => f.write_str("completed"),
            Self::Failed(kind) => write!(f, "failed({kind})"),
        }
    }
}

/// One pass of one request through the pipeline
#[derive(Debug)]
pub struct PipelineRun {
    request_id: RequestId,
    state: PipelineState,
    started_at: DateTime<Utc>,
}

impl PipelineRun {
    /// Start a run in the `Received` state
    pub fn new(request_id: RequestId) -> Self {
        Self {
            request_id,
            state: PipelineState::Received,
            started_at: Utc::now(),
        }
    }

    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn started_at(&self) -> &DateTime<Utc> {
        &self.started_at
    }

    /// Move to the next state
    ///
    /// Illegal transitions are ignored and logged; the run keeps its state.
    pub fn advance(&mut self, next: PipelineState) {
        if !self.state.can_advance_to(next) {
            warn!(
                request_id = %self.request_id,
                from = %self.state,
                to = %next,
                "Ignoring illegal pipeline transition"
            );
            return;
        }

        debug!(
            request_id = %self.request_id,
            from = %self.state,
            to = %next,
            "Pipeline transition"
        );
        self.state = next;
    }

    /// Move to `Failed` with the kind of `err`
    pub fn fail(&mut self, err: &CompressionError) {
        self.advance(PipelineState::Failed(err.kind()));
    }

    /// Milliseconds since the run started
    pub fn elapsed_ms(&self) -> i64 {
        (Utc::now() - self.started_at).num_milliseconds()
    }
}
