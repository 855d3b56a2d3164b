//! Step bookkeeping for release pipelines
//!
//! A pipeline is a fixed sequence of steps. Hard steps stop the pipeline on
//! failure, soft steps only downgrade to a warning, and skip flags remove a
//! step entirely. [`StepRecorder`] keeps the outcome of each one so the CLI
//! and the publication summary can show what happened.

use crate::core::error::ReleaseError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::future::Future;
use std::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Outcome of a single step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Passed,
    Failed,
    Warned,
    Skipped,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Passed => "passed",
            StepStatus::Failed => "failed",
            StepStatus::Warned => "warned",
            StepStatus::Skipped => "skipped",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub name: String,
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub duration_ms: u64,
}

/// Result of a whole pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub pipeline: String,
    pub started_at: DateTime<Utc>,
    pub steps: Vec<StepReport>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip)]
    pub suggested_actions: Vec<&'static str>,
}

impl PipelineReport {
    pub fn step(&self, name: &str) -> Option<&StepReport> {
        self.steps.iter().find(|s| s.name == name)
    }

    pub fn status_of(&self, name: &str) -> Option<StepStatus> {
        self.step(name).map(|s| s.status)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &StepReport> {
        self.steps.iter().filter(|s| s.status == StepStatus::Warned)
    }
}

/// Records step outcomes while a pipeline runs
pub struct StepRecorder {
    pipeline: String,
    run_id: Uuid,
    started_at: DateTime<Utc>,
    steps: Vec<StepReport>,
}

impl StepRecorder {
    pub fn new(pipeline: &str) -> Self {
        Self {
            pipeline: pipeline.to_string(),
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            steps: Vec::new(),
        }
    }

    /// Run a step whose failure aborts the pipeline
    pub async fn hard<T, F>(&mut self, name: &str, step: F) -> Result<T, ReleaseError>
    where
        F: Future<Output = Result<T, ReleaseError>>,
    {
        let start = Instant::now();
        match step.await {
            Ok(value) => {
                self.push(name, StepStatus::Passed, None, start);
                Ok(value)
            }
            Err(e) => {
                error!("{} failed: {}", name, e);
                self.push(name, StepStatus::Failed, Some(e.to_string()), start);
                Err(e)
            }
        }
    }

    /// Run a step whose failure is only reported as a warning
    pub async fn soft<T, F>(&mut self, name: &str, step: F) -> Option<T>
    where
        F: Future<Output = Result<T, ReleaseError>>,
    {
        let start = Instant::now();
        match step.await {
            Ok(value) => {
                self.push(name, StepStatus::Passed, None, start);
                Some(value)
            }
            Err(e) => {
                warn!("{} had issues (continuing anyway): {}", name, e);
                self.push(name, StepStatus::Warned, Some(e.to_string()), start);
                None
            }
        }
    }

    pub fn skipped(&mut self, name: &str, reason: &str) {
        info!("Skipping {} ({})", name, reason);
        self.steps.push(StepReport {
            name: name.to_string(),
            status: StepStatus::Skipped,
            message: Some(reason.to_string()),
            duration_ms: 0,
        });
    }

    pub fn steps(&self) -> &[StepReport] {
        &self.steps
    }

    pub fn finish(self, outcome: Result<(), ReleaseError>) -> PipelineReport {
        let (error, error_code, suggested_actions) = match &outcome {
            Ok(()) => (None, None, Vec::new()),
            Err(e) => (
                Some(e.to_string()),
                Some(e.code().to_string()),
                e.suggested_actions(),
            ),
        };

        PipelineReport {
            run_id: self.run_id,
            pipeline: self.pipeline,
            started_at: self.started_at,
            steps: self.steps,
            success: outcome.is_ok(),
            error,
            error_code,
            suggested_actions,
        }
    }

    fn push(&mut self, name: &str, status: StepStatus, message: Option<String>, start: Instant) {
        self.steps.push(StepReport {
            name: name.to_string(),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        });
    }
}
