//! Runner label classification
//!
//! Jobs carry the runner they asked for as labels. runs-on.com jobs use a
//! single structured label:
//!
//! ```text
//! runs-on=123456/runner=arm-8/cpu=8+16/ram=32/family=r8g+m8g/spot=false
//! ```
//!
//! `runner=` names a configured runner; the other keys are inline overrides.
//! Anything else is checked against the GitHub-hosted label shapes.

use crate::criteria::{Requirement, SelectionCriteria};
use crate::error::{Result, RunsonError};
use crate::estimate::hosted::{parse_hosted_label, HostedLabel};
use std::collections::BTreeSet;

/// Inline fields of a runs-on label that override the named runner
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InlineSpec {
    pub cpu: Option<Requirement>,
    pub ram: Option<Requirement>,
    pub families: Option<Vec<String>>,
    pub spot: Option<bool>,
}

impl InlineSpec {
    pub fn is_empty(&self) -> bool {
        self.cpu.is_none() && self.ram.is_none() && self.families.is_none() && self.spot.is_none()
    }

    /// Apply field by field; families replace the base list.
    pub fn apply(&self, mut criteria: SelectionCriteria) -> SelectionCriteria {
        if let Some(cpu) = self.cpu {
            criteria.cpu = Some(cpu);
        }
        if let Some(ram) = self.ram {
            criteria.ram_gb = Some(ram);
        }
        if let Some(families) = &self.families {
            criteria = criteria.with_families(families.iter().cloned());
        }
        criteria
    }

    /// Short form for display, e.g. `cpu=8/ram=16:64/family=m7*+c7*`
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(cpu) = &self.cpu {
            parts.push(format!("cpu={}", cpu));
        }
        if let Some(ram) = &self.ram {
            parts.push(format!("ram={}", ram));
        }
        if let Some(families) = &self.families {
            if families.len() <= 3 {
                parts.push(format!("family={}", families.join("+")));
            } else {
                parts.push(format!("family={}+...", families[..2].join("+")));
            }
        }
        if parts.is_empty() {
            "inline".to_string()
        } else {
            parts.join("/")
        }
    }
}

/// A parsed runs-on label
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunsOnLabel {
    pub runner: Option<String>,
    pub inline: InlineSpec,
}

/// How a job's labels identify its runner
#[derive(Debug, Clone, PartialEq)]
pub enum RunnerLabel {
    RunsOn(RunsOnLabel),
    Hosted(HostedLabel),
}

/// Classify a job's labels.
///
/// The first runs-on label wins (a `runs-on=` label, a bare `runner=`
/// label, or a label equal to a configured runner name); otherwise the
/// first GitHub-hosted label. Returns the chosen label text alongside.
pub fn classify_labels(
    labels: &[String],
    configured: &BTreeSet<String>,
) -> Result<(String, RunnerLabel)> {
    for label in labels {
        if let Some(parsed) = parse_runs_on_label(label)? {
            return Ok((label.clone(), RunnerLabel::RunsOn(parsed)));
        }
        if configured.contains(label.trim()) {
            let parsed = RunsOnLabel {
                runner: Some(label.trim().to_string()),
                inline: InlineSpec::default(),
            };
            return Ok((label.clone(), RunnerLabel::RunsOn(parsed)));
        }
    }

    for label in labels {
        if let Some(hosted) = parse_hosted_label(label) {
            return Ok((label.clone(), RunnerLabel::Hosted(hosted)));
        }
    }

    Err(RunsonError::UnresolvedRunner {
        labels: labels.to_vec(),
        reason: if labels.is_empty() {
            "job has no runner labels".to_string()
        } else {
            "no runs-on or GitHub-hosted runner label".to_string()
        },
    })
}

/// Parse a runs-on label. Returns `Ok(None)` for labels of other shapes and
/// `UnknownRunnerLabel` for a runs-on label with a malformed inline value.
pub fn parse_runs_on_label(label: &str) -> Result<Option<RunsOnLabel>> {
    let label = label.trim();
    if !(label.starts_with("runs-on=") || label.starts_with("runner=")) {
        return Ok(None);
    }

    let mut parsed = RunsOnLabel::default();
    for part in label.split(|c| c == '/' || c == ',') {
        let Some((key, value)) = part.split_once('=') else {
            continue;
        };
        let value = value.trim();
        match key.trim().to_ascii_lowercase().as_str() {
            "runner" if !value.is_empty() => parsed.runner = Some(value.to_string()),
            "cpu" => parsed.inline.cpu = Some(parse_inline_requirement(label, "cpu", value)?),
            "ram" => parsed.inline.ram = Some(parse_inline_requirement(label, "ram", value)?),
            "family" => {
                let families: Vec<String> = value
                    .split('+')
                    .map(str::trim)
                    .filter(|f| !f.is_empty())
                    .map(|f| {
                        if f.contains('.') || f.ends_with('*') {
                            f.to_string()
                        } else {
                            format!("{}*", f)
                        }
                    })
                    .collect();
                if !families.is_empty() {
                    parsed.inline.families = Some(families);
                }
            }
            "spot" => parsed.inline.spot = Some(!value.eq_ignore_ascii_case("false")),
            _ => {}
        }
    }
    Ok(Some(parsed))
}

/// `8` is exact, `8+32` is a range. cpu bounds must be whole.
fn parse_inline_requirement(label: &str, field: &str, value: &str) -> Result<Requirement> {
    let invalid = |reason: String| RunsonError::UnknownRunnerLabel {
        label: label.to_string(),
        reason,
    };
    let number = |s: &str| -> Result<f64> {
        s.trim()
            .parse::<f64>()
            .map_err(|_| invalid(format!("invalid {} value '{}'", field, value)))
    };

    let requirement = match value.split_once('+') {
        Some((min, max)) => Requirement::range(field, number(min)?, number(max)?),
        None => Requirement::exact(field, number(value)?),
    };
    requirement
        .and_then(|r| if field == "cpu" { r.whole(field) } else { Ok(r) })
        .map_err(|e| invalid(e.to_string()))
}
