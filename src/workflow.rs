//! Workflow run data
//!
//! Run and job records in the shape returned by the GitHub Actions REST API
//! (`/actions/runs/{id}` and `/actions/runs/{id}/jobs`). Timestamps are kept
//! as raw strings and parsed per job, so one malformed job cannot reject the
//! whole run.

use crate::error::{Result, RunsonError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// A single job of a workflow run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowJob {
    pub name: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub conclusion: Option<String>,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub completed_at: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
}

impl WorkflowJob {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_times(mut self, started_at: &str, completed_at: &str) -> Self {
        self.started_at = Some(started_at.to_string());
        self.completed_at = Some(completed_at.to_string());
        self
    }

    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    /// Conclusion if finished, otherwise the live status
    pub fn display_status(&self) -> &str {
        self.conclusion
            .as_deref()
            .or(self.status.as_deref())
            .unwrap_or("unknown")
    }

    /// Observed run time of the job.
    ///
    /// A job that never started has zero duration. A started job without a
    /// completion time, an unparseable timestamp, or an end before the start
    /// is an `InvalidDuration` error.
    pub fn duration(&self) -> Result<Duration> {
        let started = match self.started_at.as_deref() {
            Some(ts) => parse_timestamp(&self.name, "started_at", ts)?,
            None => return Ok(Duration::ZERO),
        };
        let completed = match self.completed_at.as_deref() {
            Some(ts) => parse_timestamp(&self.name, "completed_at", ts)?,
            None => {
                return Err(RunsonError::InvalidDuration {
                    job: self.name.clone(),
                    reason: "job started but has no completion time".to_string(),
                })
            }
        };

        (completed - started)
            .to_std()
            .map_err(|_| RunsonError::InvalidDuration {
                job: self.name.clone(),
                reason: format!("completed_at {} precedes started_at {}", completed, started),
            })
    }
}

fn parse_timestamp(job: &str, field: &str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RunsonError::InvalidDuration {
            job: job.to_string(),
            reason: format!("malformed {} '{}': {}", field, value, e),
        })
}

/// A workflow run and its jobs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRun {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub run_number: Option<u64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub conclusion: Option<String>,
    #[serde(default)]
    pub run_started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub jobs: Vec<WorkflowJob>,
}

/// Body of the jobs endpoint, or a bare job array
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum JobsDocument {
    Page { jobs: Vec<WorkflowJob> },
    List(Vec<WorkflowJob>),
}

impl WorkflowRun {
    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Replace the run's jobs with the contents of a jobs document.
    pub fn with_jobs_json(mut self, content: &str) -> Result<Self> {
        self.jobs = match serde_json::from_str::<JobsDocument>(content)? {
            JobsDocument::Page { jobs } => jobs,
            JobsDocument::List(jobs) => jobs,
        };
        Ok(self)
    }

    pub fn display_status(&self) -> &str {
        self.conclusion
            .as_deref()
            .or(self.status.as_deref())
            .unwrap_or("unknown")
    }

    /// Wall-clock time from run start to last update, when both are known.
    pub fn wall_clock(&self) -> Option<Duration> {
        match (self.run_started_at, self.updated_at) {
            (Some(start), Some(end)) => (end - start).to_std().ok(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_duration() {
        let job = WorkflowJob::new("build").with_times("2025-12-26T10:00:00Z", "2025-12-26T10:12:04Z");
        assert_eq!(job.duration().unwrap(), Duration::from_secs(724));
    }

    #[test]
    fn test_end_before_start() {
        let job = WorkflowJob::new("build").with_times("2025-12-26T10:12:04Z", "2025-12-26T10:00:00Z");
        assert!(matches!(
            job.duration(),
            Err(RunsonError::InvalidDuration { .. })
        ));
    }

    #[test]
    fn test_not_started_and_unfinished() {
        let queued = WorkflowJob::new("queued");
        assert_eq!(queued.duration().unwrap(), Duration::ZERO);

        let mut running = WorkflowJob::new("running");
        running.started_at = Some("2025-12-26T10:00:00Z".to_string());
        assert!(running.duration().is_err());
    }

    #[test]
    fn test_malformed_timestamp() {
        let job = WorkflowJob::new("build").with_times("yesterday", "2025-12-26T10:00:00Z");
        assert!(matches!(
            job.duration(),
            Err(RunsonError::InvalidDuration { .. })
        ));
    }

    #[test]
    fn test_parse_run_and_jobs() {
        let run = WorkflowRun::from_json_str(
            r#"{"id": 42, "name": "CI", "run_number": 7, "status": "completed",
                "conclusion": "success",
                "run_started_at": "2025-12-26T10:00:00Z",
                "updated_at": "2025-12-26T10:30:00Z",
                "html_url": "https://github.com/o/r/actions/runs/42"}"#,
        )
        .unwrap();
        assert_eq!(run.display_status(), "success");
        assert_eq!(run.wall_clock(), Some(Duration::from_secs(1800)));
        assert!(run.jobs.is_empty());

        let run = run
            .with_jobs_json(
                r#"{"total_count": 1, "jobs": [{"name": "test", "status": "completed",
                    "conclusion": null, "started_at": "2025-12-26T10:00:00Z",
                    "completed_at": "2025-12-26T10:01:00Z", "labels": ["ubuntu-latest"]}]}"#,
            )
            .unwrap();
        assert_eq!(run.jobs.len(), 1);
        assert_eq!(run.jobs[0].display_status(), "completed");
        assert_eq!(run.jobs[0].labels, vec!["ubuntu-latest"]);

        let run = run.with_jobs_json(r#"[{"name": "a"}, {"name": "b"}]"#).unwrap();
        assert_eq!(run.jobs.len(), 2);
    }
}
