//! Sequential job runner.
//!
//! Jobs run one at a time in dependency order. When a job fails, every job
//! that depends on it (directly or transitively) is skipped; unrelated jobs
//! still run.

use std::collections::HashMap;
use std::fmt;
use std::time::Instant;

use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::context::JobContext;
use crate::dag::JobGraph;
use crate::error::{Error, Result};
use crate::job::Job;
use provision_core::Arguments;

/// How a job ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobStatus {
    Succeeded,
    Failed { error: String },
    Skipped { blocked_by: String },
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed { error } => write!(f, "failed: {error}"),
            Self::Skipped { blocked_by } => write!(f, "skipped (blocked by '{blocked_by}')"),
        }
    }
}

/// Result of one job in a run.
#[derive(Debug, Clone, Serialize)]
pub struct JobOutcome {
    pub title: String,
    pub status: JobStatus,
    /// Unset for skipped jobs.
    pub started_at: Option<DateTime<Utc>>,
    pub duration_ms: u64,
}

impl JobOutcome {
    fn skipped(title: &str, blocked_by: &str) -> Self {
        Self {
            title: title.to_string(),
            status: JobStatus::Skipped {
                blocked_by: blocked_by.to_string(),
            },
            started_at: None,
            duration_ms: 0,
        }
    }
}

/// Outcomes of a run, in execution order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub outcomes: Vec<JobOutcome>,
}

impl RunReport {
    /// Whether every job succeeded.
    pub fn is_success(&self) -> bool {
        self.outcomes
            .iter()
            .all(|o| o.status == JobStatus::Succeeded)
    }

    pub fn outcome(&self, title: &str) -> Option<&JobOutcome> {
        self.outcomes.iter().find(|o| o.title == title)
    }

    pub fn failed(&self) -> Vec<&JobOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, JobStatus::Failed { .. }))
            .collect_vec()
    }

    pub fn skipped(&self) -> Vec<&JobOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, JobStatus::Skipped { .. }))
            .collect_vec()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for outcome in &self.outcomes {
            writeln!(
                f,
                "{:<20} {} ({} ms)",
                outcome.title, outcome.status, outcome.duration_ms
            )?;
        }
        Ok(())
    }
}

/// A validated set of jobs.
#[derive(Debug)]
pub struct Pipeline {
    jobs: HashMap<String, Job>,
    graph: JobGraph,
    order: Vec<String>,
}

impl Pipeline {
    /// Build the dependency graph and fix the execution order.
    ///
    /// # Errors
    ///
    /// Returns the graph errors for duplicate titles, unknown or repeated
    /// dependencies, self-dependencies and cycles.
    pub fn new(jobs: Vec<Job>) -> Result<Self> {
        let mut graph = JobGraph::new();
        for job in &jobs {
            graph.add_job(job.title.clone())?;
        }
        for job in &jobs {
            for dependency in &job.depends_on {
                graph.add_dependency(&job.title, dependency)?;
            }
        }
        let order = graph.execution_order()?;

        Ok(Self {
            jobs: jobs.into_iter().map(|j| (j.title.clone(), j)).collect(),
            graph,
            order,
        })
    }

    /// Jobs in execution order.
    pub fn jobs(&self) -> impl Iterator<Item = &Job> {
        self.order.iter().filter_map(|title| self.jobs.get(title))
    }

    pub const fn graph(&self) -> &JobGraph {
        &self.graph
    }

    /// Run every job once.
    ///
    /// `overrides` replaces the values of arguments a job declares.
    ///
    /// # Errors
    ///
    /// Job failures are recorded in the report, not returned. An error is
    /// returned only if the graph itself is inconsistent.
    pub async fn run(&self, ctx: &mut JobContext, overrides: &Arguments) -> Result<RunReport> {
        let mut report = RunReport::default();
        let mut blocked: HashMap<String, String> = HashMap::new();

        info!(jobs = self.order.len(), "Starting pipeline");
        for title in &self.order {
            let job = self
                .jobs
                .get(title)
                .ok_or_else(|| Error::unknown_job(title))?;

            if let Some(blocked_by) = blocked.get(title) {
                warn!(job = %title, blocked_by = %blocked_by, "Job skipped");
                report.outcomes.push(JobOutcome::skipped(title, blocked_by));
                continue;
            }

            info!(job = %title, "Starting job");
            let started_at = Utc::now();
            let start = Instant::now();
            let result = job.run(ctx, overrides).await;
            let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

            let status = match result {
                Ok(()) => {
                    info!(job = %title, duration_ms, "Job succeeded");
                    JobStatus::Succeeded
                }
                Err(e) => {
                    error!(job = %title, duration_ms, error = %e, "Job failed");
                    for dependent in self.graph.dependents_of(title)? {
                        blocked.entry(dependent).or_insert_with(|| title.clone());
                    }
                    JobStatus::Failed {
                        error: e.to_string(),
                    }
                }
            };

            report.outcomes.push(JobOutcome {
                title: title.clone(),
                status,
                started_at: Some(started_at),
                duration_ms,
            });
        }

        info!(
            succeeded = report.outcomes.len() - report.failed().len() - report.skipped().len(),
            failed = report.failed().len(),
            skipped = report.skipped().len(),
            "Pipeline finished"
        );
        Ok(report)
    }
}
