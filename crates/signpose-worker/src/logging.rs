//! Structured logging for one render run.
//!
//! A run owns an `info_span!("render_run")` carrying `run_id` and the
//! current `stage`; every stage event is emitted inside it with `frames`
//! and `elapsed_ms` fields.

use std::fmt;
use std::time::Instant;

use signpose_models::RunId;
use tracing::{error, field, info, info_span, Span};

use crate::error::PipelineError;

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validate,
    Aggregate,
    Smooth,
    Render,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Validate => "validate",
            Stage::Aggregate => "aggregate",
            Stage::Smooth => "smooth",
            Stage::Render => "render",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct RunLogger {
    span: Span,
    started: Instant,
}

impl RunLogger {
    pub fn new(run_id: &RunId) -> Self {
        Self {
            span: info_span!("render_run", run_id = %run_id, stage = field::Empty),
            started: Instant::now(),
        }
    }

    /// Span to instrument the run with.
    pub fn span(&self) -> Span {
        self.span.clone()
    }

    /// Enter `stage`: records it on the run span and starts its clock.
    pub fn stage(&self, stage: Stage) -> StageTimer {
        self.span.record("stage", stage.as_str());
        StageTimer {
            stage,
            started: Instant::now(),
        }
    }

    pub fn finished(&self, frames: usize, skipped: usize) {
        self.span.in_scope(|| {
            info!(
                frames,
                skipped,
                elapsed_ms = self.started.elapsed().as_millis() as u64,
                "Render run finished"
            );
        });
    }

    pub fn failed(&self, err: &PipelineError) {
        self.span.in_scope(|| {
            error!(
                kind = %err.kind(),
                elapsed_ms = self.started.elapsed().as_millis() as u64,
                "Render run failed: {}", err
            );
        });
    }
}

/// Clock for one stage; `done` reports how many frames it produced.
#[must_use = "call `done` when the stage completes"]
#[derive(Debug)]
pub struct StageTimer {
    stage: Stage,
    started: Instant,
}

impl StageTimer {
    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn done(self, frames: usize) {
        info!(
            stage = %self.stage,
            frames,
            elapsed_ms = self.started.elapsed().as_millis() as u64,
            "Stage done"
        );
    }
}
