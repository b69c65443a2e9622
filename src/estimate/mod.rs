//! Workflow run cost estimation
//!
//! Maps every job of a workflow run to a priced runner and produces a low /
//! high cost bound per job plus run totals.
//!
//! ## Pricing rules
//!
//! - runs-on jobs are priced at the cheapest catalog instance matching the
//!   runner's criteria (on-demand rate).
//! - GitHub-hosted jobs use the published per-minute rate tables.
//! - `cost_high` rounds a runs-on job's duration up to the configured
//!   billing increment; everything else has `cost_low == cost_high`.
//!
//! A job whose runner cannot be priced is kept in the output as unpriced with
//! zero cost. Only inconsistent timestamps drop a job's record, and those
//! jobs are listed in `RunEstimate::failures`.

pub mod hosted;
pub mod labels;

use crate::catalog::{Instance, InstanceCatalog};
use crate::criteria::SelectionCriteria;
use crate::error::{DegradesToUnpriced, Result, RunsonError};
use crate::matching::{match_instances, MatchOptions};
use crate::runners::{resolve_all, RunnersFile};
use crate::workflow::{WorkflowJob, WorkflowRun};
use hosted::{larger_rate, standard_rate, HostedLabel};
use labels::{classify_labels, RunnerLabel, RunsOnLabel};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;
use tracing::{debug, warn};

/// Estimation parameters
#[derive(Debug, Clone, Copy, Default)]
pub struct EstimateOptions {
    /// Granularity the upper bound rounds runs-on job durations up to.
    /// `None` (or zero) disables rounding.
    pub billing_increment: Option<Duration>,
}

impl EstimateOptions {
    pub fn with_billing_increment(mut self, increment: Duration) -> Self {
        self.billing_increment = Some(increment);
        self
    }
}

/// What a job ran on
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResolvedInstance {
    /// Catalog instance picked for a runs-on runner
    Catalog { instance: Instance, spot: bool },
    /// Synthetic GitHub-hosted runner priced per minute
    GithubHosted { label: HostedLabel, per_minute: f64 },
}

impl ResolvedInstance {
    pub fn hourly_rate(&self) -> f64 {
        match self {
            ResolvedInstance::Catalog { instance, .. } => instance.price_on_demand,
            ResolvedInstance::GithubHosted { per_minute, .. } => per_minute * 60.0,
        }
    }

    /// Human readable pricing basis
    pub fn detail(&self) -> String {
        match self {
            ResolvedInstance::Catalog { instance, spot } => format!(
                "{}{} @ ${:.2}/hr",
                if *spot { "spot, " } else { "" },
                instance.api_name,
                instance.price_on_demand
            ),
            ResolvedInstance::GithubHosted {
                label: HostedLabel::Standard { os },
                per_minute,
            } => format!("GitHub-hosted {} @ ${:.3}/min", os, per_minute),
            ResolvedInstance::GithubHosted {
                label: HostedLabel::Larger { cores, arch, .. },
                per_minute,
            } => format!("{}-core {} @ ${:.3}/min", cores, arch, per_minute),
        }
    }

    fn rounds_to_increment(&self) -> bool {
        matches!(self, ResolvedInstance::Catalog { .. })
    }
}

/// Cost bounds for one job
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobCostRecord {
    pub job_name: String,
    pub status: String,
    pub duration: Duration,
    pub runner_label: String,
    /// Runner name (or inline spec) for runs-on jobs
    pub runner: Option<String>,
    pub resolved_instance: Option<ResolvedInstance>,
    pub cost_low: f64,
    pub cost_high: f64,
    /// Why the job could not be priced
    pub unpriced: Option<String>,
}

impl JobCostRecord {
    pub fn is_priced(&self) -> bool {
        self.unpriced.is_none()
    }
}

/// A job whose record could not be built
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobFailure {
    pub job_name: String,
    pub reason: String,
}

/// Estimate for a whole run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunEstimate {
    pub workflow_name: String,
    pub run_number: Option<u64>,
    pub status: String,
    pub wall_clock: Option<Duration>,
    pub jobs: Vec<JobCostRecord>,
    pub failures: Vec<JobFailure>,
    pub total_low: f64,
    pub total_high: f64,
}

impl RunEstimate {
    pub fn unpriced_count(&self) -> usize {
        self.jobs.iter().filter(|j| !j.is_priced()).count()
    }
}

/// Cost bounds for a duration at an hourly rate.
pub fn cost_bounds(duration: Duration, hourly_rate: f64, increment: Option<Duration>) -> (f64, f64) {
    let secs = duration.as_secs_f64();
    let low = secs / 3600.0 * hourly_rate;
    let high = match increment.map(|i| i.as_secs_f64()) {
        Some(step) if step > 0.0 => (secs / step).ceil() * step / 3600.0 * hourly_rate,
        _ => low,
    };
    (low, high)
}

#[derive(Debug, Clone)]
struct ResolvedRunner {
    criteria: SelectionCriteria,
    spot: bool,
}

/// Prices workflow runs against a catalog and runner configuration
#[derive(Debug)]
pub struct CostEstimator<'a> {
    catalog: &'a InstanceCatalog,
    runners: BTreeMap<String, ResolvedRunner>,
    runner_names: BTreeSet<String>,
    options: EstimateOptions,
}

impl<'a> CostEstimator<'a> {
    /// Resolve every configured runner up front; a malformed entry fails
    /// the request before any job is priced.
    pub fn new(
        catalog: &'a InstanceCatalog,
        config: &RunnersFile,
        options: EstimateOptions,
    ) -> Result<Self> {
        let resolved = resolve_all(config)?;
        let runners: BTreeMap<String, ResolvedRunner> = resolved
            .into_iter()
            .map(|(name, criteria)| {
                let spot = config.get(&name).map_or(true, |e| e.spot_enabled());
                (name, ResolvedRunner { criteria, spot })
            })
            .collect();
        let runner_names = runners.keys().cloned().collect();

        Ok(Self {
            catalog,
            runners,
            runner_names,
            options,
        })
    }

    /// Estimate every job of a run. Never fails as a whole.
    pub fn estimate(&self, run: &WorkflowRun) -> RunEstimate {
        let mut jobs = Vec::with_capacity(run.jobs.len());
        let mut failures = Vec::new();

        for job in &run.jobs {
            match self.estimate_job(job) {
                Ok(record) => jobs.push(record),
                Err(e) => {
                    warn!("Skipping job '{}': {}", job.name, e);
                    failures.push(JobFailure {
                        job_name: job.name.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        let total_low = jobs.iter().map(|j| j.cost_low).sum();
        let total_high = jobs.iter().map(|j| j.cost_high).sum();

        RunEstimate {
            workflow_name: run.name.clone().unwrap_or_else(|| "Unknown".to_string()),
            run_number: run.run_number,
            status: run.display_status().to_string(),
            wall_clock: run.wall_clock(),
            jobs,
            failures,
            total_low,
            total_high,
        }
    }

    /// Build one job's record. Fails only on invalid timing data; runner
    /// resolution failures produce an unpriced record.
    pub fn estimate_job(&self, job: &WorkflowJob) -> Result<JobCostRecord> {
        let duration = job.duration()?;
        let mut record = JobCostRecord {
            job_name: job.name.clone(),
            status: job.display_status().to_string(),
            duration,
            runner_label: job.labels.join(","),
            runner: None,
            resolved_instance: None,
            cost_low: 0.0,
            cost_high: 0.0,
            unpriced: None,
        };

        match self.price_labels(&job.labels) {
            Ok((label, runner, resolved)) => {
                let increment = if resolved.rounds_to_increment() {
                    self.options.billing_increment
                } else {
                    None
                };
                let (low, high) = cost_bounds(duration, resolved.hourly_rate(), increment);
                debug!("Job '{}' priced as {} ({:.4}-{:.4})", job.name, resolved.detail(), low, high);
                record.runner_label = label;
                record.runner = runner;
                record.cost_low = low;
                record.cost_high = high;
                record.resolved_instance = Some(resolved);
            }
            Err(e) if e.degrades_to_unpriced() => {
                warn!("Job '{}' is unpriced: {}", job.name, e);
                record.unpriced = Some(e.to_string());
            }
            Err(e) => return Err(e),
        }

        Ok(record)
    }

    /// Resolve labels to (chosen label, runner display name, priced instance).
    fn price_labels(&self, labels: &[String]) -> Result<(String, Option<String>, ResolvedInstance)> {
        let (label, classified) = classify_labels(labels, &self.runner_names)?;
        match classified {
            RunnerLabel::RunsOn(runs_on) => {
                let (display, resolved) = self.price_runs_on(&label, &runs_on)?;
                Ok((label, Some(display), resolved))
            }
            RunnerLabel::Hosted(hosted) => {
                let per_minute = match hosted {
                    HostedLabel::Standard { os } => standard_rate(os),
                    HostedLabel::Larger { os, arch, cores } => larger_rate(os, arch, cores)
                        .ok_or_else(|| RunsonError::UnknownRunnerLabel {
                            label: label.clone(),
                            reason: format!("no published rate for {}-core {} {}", cores, os, arch),
                        })?,
                };
                Ok((
                    label,
                    None,
                    ResolvedInstance::GithubHosted {
                        label: hosted,
                        per_minute,
                    },
                ))
            }
        }
    }

    fn price_runs_on(&self, label: &str, runs_on: &RunsOnLabel) -> Result<(String, ResolvedInstance)> {
        let base = match &runs_on.runner {
            Some(name) => match self.runners.get(name) {
                Some(runner) => Some(runner),
                None if runs_on.inline.is_empty() => {
                    return Err(RunsonError::UnknownRunner {
                        name: name.clone(),
                        available: self.runner_names.iter().cloned().collect(),
                    })
                }
                None => None,
            },
            None => None,
        };

        let display = match (&runs_on.runner, runs_on.inline.is_empty()) {
            (Some(name), true) => name.clone(),
            (Some(name), false) => format!("{}*", name),
            (None, _) => runs_on.inline.describe(),
        };

        let criteria = runs_on.inline.apply(
            base.map(|r| r.criteria.clone()).unwrap_or_default(),
        );
        if criteria.is_unrestricted() {
            return Err(RunsonError::UnresolvedRunner {
                labels: vec![label.to_string()],
                reason: "runs-on label names no runner and no inline spec".to_string(),
            });
        }
        let spot = runs_on
            .inline
            .spot
            .unwrap_or_else(|| base.map_or(true, |r| r.spot));

        let matched = match_instances(&criteria, self.catalog, MatchOptions::default());
        let cheapest = matched.cheapest().ok_or_else(|| RunsonError::UnresolvedRunner {
            labels: vec![label.to_string()],
            reason: format!("no catalog instance matches runner {}", display),
        })?;

        Ok((
            display,
            ResolvedInstance::Catalog {
                instance: cheapest.clone(),
                spot,
            },
        ))
    }
}
