//! Selection criteria
//!
//! Normalized query describing the resource and policy constraints an
//! instance must satisfy. Criteria are plain values: they are built per
//! query and never mutated once handed to the matcher.

use crate::catalog::{Architecture, Instance};
use crate::error::{Result, RunsonError};
use crate::matching::matches_any_pattern;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// Minimum RAM (GB) for runners that keep their workspace on tmpfs
pub const TMPFS_MIN_RAM_GB: f64 = 32.0;

/// A cpu or ram requirement: an exact value or an inclusive range.
///
/// A range may be open-ended (`max` is infinite) when produced by the
/// tmpfs floor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Requirement {
    Exact(f64),
    Range { min: f64, max: f64 },
}

impl Requirement {
    pub fn exact(field: &str, value: f64) -> Result<Self> {
        if !(value > 0.0) {
            return Err(RunsonError::invalid_criteria(
                field,
                format!("value must be positive, got {}", value),
            ));
        }
        Ok(Requirement::Exact(value))
    }

    pub fn range(field: &str, min: f64, max: f64) -> Result<Self> {
        if !(min > 0.0) || !(max > 0.0) {
            return Err(RunsonError::invalid_criteria(
                field,
                format!("range bounds must be positive, got [{}, {}]", min, max),
            ));
        }
        if min > max {
            return Err(RunsonError::invalid_criteria(
                field,
                format!("range minimum {} exceeds maximum {}", min, max),
            ));
        }
        Ok(Requirement::Range { min, max })
    }

    /// Open range `[min, ∞)`
    pub fn at_least(min: f64) -> Self {
        Requirement::Range {
            min,
            max: f64::INFINITY,
        }
    }

    pub fn matches(&self, value: f64) -> bool {
        match *self {
            Requirement::Exact(v) => value == v,
            Requirement::Range { min, max } => min <= value && value <= max,
        }
    }

    /// Parse the CLI form: `8` (exact) or `8:16` (range).
    /// Reject bounds that are not whole numbers (vCPU counts). An open
    /// upper bound is allowed.
    pub fn whole(self, field: &str) -> Result<Self> {
        let (min, max) = match self {
            Requirement::Exact(v) => (v, v),
            Requirement::Range { min, max } => (min, max),
        };
        let is_whole = |v: f64| v.is_infinite() || v.fract() == 0.0;
        if !is_whole(min) || !is_whole(max) {
            return Err(RunsonError::invalid_criteria(
                field,
                format!("expected a whole number, got {}", self),
            ));
        }
        Ok(self)
    }

    pub fn parse_cli(field: &str, value: &str) -> Result<Self> {
        let parse_num = |s: &str| -> Result<f64> {
            s.trim().parse::<f64>().map_err(|_| {
                RunsonError::invalid_criteria(field, format!("invalid number in '{}'", value))
            })
        };

        match value.split_once(':') {
            Some((min, max)) => {
                if min.trim().is_empty() || max.trim().is_empty() {
                    return Err(RunsonError::invalid_criteria(
                        field,
                        format!("invalid range format '{}' (use 'min:max')", value),
                    ));
                }
                Requirement::range(field, parse_num(min)?, parse_num(max)?)
            }
            None => Requirement::exact(field, parse_num(value)?),
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Requirement::Exact(v) => write!(f, "{}", v),
            Requirement::Range { min, max } if max.is_infinite() => write!(f, "{}+", min),
            Requirement::Range { min, max } => write!(f, "{}:{}", min, max),
        }
    }
}

/// Constraints for instance selection. Unspecified fields impose nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SelectionCriteria {
    pub cpu: Option<Requirement>,
    pub ram_gb: Option<Requirement>,
    pub family_patterns: Vec<String>,
    pub architectures: BTreeSet<Architecture>,
    pub budget_max: Option<f64>,
    pub ebs_min: Option<u32>,
}

impl SelectionCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cpu(mut self, cpu: Requirement) -> Self {
        self.cpu = Some(cpu);
        self
    }

    pub fn with_ram(mut self, ram: Requirement) -> Self {
        self.ram_gb = Some(ram);
        self
    }

    pub fn with_families<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.family_patterns = normalize_patterns(patterns);
        self
    }

    pub fn with_architectures(mut self, arches: impl IntoIterator<Item = Architecture>) -> Self {
        self.architectures = arches.into_iter().collect();
        self
    }

    pub fn with_budget(mut self, budget_max: f64) -> Self {
        self.budget_max = Some(budget_max);
        self
    }

    pub fn with_ebs_min(mut self, ebs_min: u32) -> Self {
        self.ebs_min = Some(ebs_min);
        self
    }

    /// Apply the tmpfs RAM floor. Only an unconstrained RAM field is
    /// replaced; an explicit requirement is kept as given.
    pub fn with_tmpfs_floor(mut self) -> Self {
        if self.ram_gb.is_none() {
            self.ram_gb = Some(Requirement::at_least(TMPFS_MIN_RAM_GB));
        }
        self
    }

    /// True when no field constrains the selection.
    pub fn is_unrestricted(&self) -> bool {
        self.cpu.is_none()
            && self.ram_gb.is_none()
            && self.family_patterns.is_empty()
            && self.architectures.is_empty()
            && self.budget_max.is_none()
            && self.ebs_min.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(budget) = self.budget_max {
            if !(budget >= 0.0) {
                return Err(RunsonError::invalid_criteria(
                    "budget",
                    format!("budget must be non-negative, got {}", budget),
                ));
            }
        }
        Ok(())
    }

    /// Check every constraint against one instance. With `ignore_families`
    /// the family patterns are skipped (pick-family mode).
    pub fn matches(&self, instance: &Instance, ignore_families: bool) -> bool {
        if !ignore_families
            && !self.family_patterns.is_empty()
            && !matches_any_pattern(&instance.api_name, &self.family_patterns)
        {
            return false;
        }
        if let Some(cpu) = &self.cpu {
            if !cpu.matches(instance.vcpus as f64) {
                return false;
            }
        }
        if let Some(ram) = &self.ram_gb {
            if !ram.matches(instance.memory_gb) {
                return false;
            }
        }
        if !self.architectures.is_empty() && !self.architectures.contains(&instance.architecture) {
            return false;
        }
        if let Some(budget) = self.budget_max {
            if instance.price_on_demand > budget {
                return false;
            }
        }
        if let Some(ebs_min) = self.ebs_min {
            if instance.ebs_mbps < ebs_min {
                return false;
            }
        }
        true
    }
}

fn normalize_patterns<I, S>(patterns: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut seen = BTreeSet::new();
    patterns
        .into_iter()
        .map(|p| p.into().trim().to_string())
        .filter(|p| !p.is_empty())
        .filter(|p| seen.insert(p.clone()))
        .collect()
}
