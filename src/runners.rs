//! Runner configuration and criteria resolution
//!
//! Typed view of the `runners:` section of a runs-on.com `runs-on.yml`
//! file, and the resolver that turns one named entry into selection
//! criteria.

use crate::criteria::{Requirement, SelectionCriteria};
use crate::error::{ConfigError, Result, RunsonError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// `cpu` / `ram` as written in YAML: a scalar or a list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequirementValue {
    Scalar(f64),
    List(Vec<f64>),
}

/// `spot` as written in YAML: a flag or an allocation strategy name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SpotSetting {
    Enabled(bool),
    Strategy(String),
}

impl SpotSetting {
    pub fn is_enabled(&self) -> bool {
        match self {
            SpotSetting::Enabled(enabled) => *enabled,
            SpotSetting::Strategy(strategy) => !strategy.eq_ignore_ascii_case("false"),
        }
    }
}

/// One entry of the `runners:` mapping
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunnerEntry {
    #[serde(default)]
    pub cpu: Option<RequirementValue>,
    #[serde(default)]
    pub ram: Option<RequirementValue>,
    #[serde(default)]
    pub family: Vec<String>,
    #[serde(default)]
    pub extras: Option<String>,
    #[serde(default)]
    pub spot: Option<SpotSetting>,
}

impl RunnerEntry {
    /// Spot is on unless the entry turns it off.
    pub fn spot_enabled(&self) -> bool {
        self.spot.as_ref().map_or(true, SpotSetting::is_enabled)
    }

    /// `extras` tokens, split on `+`, `,` or whitespace.
    pub fn extras_tokens(&self) -> Vec<&str> {
        self.extras
            .as_deref()
            .unwrap_or("")
            .split(|c: char| c == '+' || c == ',' || c.is_whitespace())
            .filter(|t| !t.is_empty())
            .collect()
    }

    pub fn wants_tmpfs(&self) -> bool {
        self.extras_tokens()
            .iter()
            .any(|t| t.eq_ignore_ascii_case("tmpfs"))
    }
}

/// The runner configuration document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunnersFile {
    #[serde(default)]
    pub runners: BTreeMap<String, RunnerEntry>,
}

impl RunnersFile {
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        // an empty document is an empty configuration
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let parsed: Option<RunnersFile> = serde_yaml::from_str(content)
            .map_err(|e| ConfigError::ParseError(format!("runner configuration: {}", e)))?;
        Ok(parsed.unwrap_or_default())
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()).into());
        }
        let content = std::fs::read_to_string(path)?;
        let file = Self::from_yaml_str(&content)?;
        debug!("Loaded {} runners from {}", file.runners.len(), path.display());
        Ok(file)
    }

    pub fn get(&self, name: &str) -> Option<&RunnerEntry> {
        self.runners.get(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.runners.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.runners.is_empty()
    }

    /// Every family pattern used by any runner, deduplicated and sorted.
    pub fn all_patterns(&self) -> Vec<String> {
        let mut patterns: Vec<String> = self
            .runners
            .values()
            .flat_map(|r| r.family.iter())
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .collect();
        patterns.sort();
        patterns.dedup();
        patterns
    }
}

/// Parse a YAML `cpu`/`ram` value.
pub fn parse_requirement(field: &str, value: &RequirementValue) -> Result<Requirement> {
    match value {
        RequirementValue::Scalar(v) => Requirement::exact(field, *v),
        RequirementValue::List(values) => match values.as_slice() {
            [v] => Requirement::exact(field, *v),
            [min, max] => Requirement::range(field, *min, *max),
            other => Err(RunsonError::invalid_criteria(
                field,
                format!("expected a value or [min, max], got {} elements", other.len()),
            )),
        },
    }
}

/// Build criteria from one runner entry.
pub fn criteria_for_entry(entry: &RunnerEntry) -> Result<SelectionCriteria> {
    let mut criteria = SelectionCriteria::new().with_families(entry.family.iter().cloned());
    if let Some(cpu) = &entry.cpu {
        criteria = criteria.with_cpu(parse_requirement("cpu", cpu)?.whole("cpu")?);
    }
    if let Some(ram) = &entry.ram {
        criteria = criteria.with_ram(parse_requirement("ram", ram)?);
    }
    if entry.wants_tmpfs() {
        criteria = criteria.with_tmpfs_floor();
    }
    Ok(criteria)
}

/// Resolve a named runner into selection criteria.
pub fn resolve(name: &str, runners: &RunnersFile) -> Result<SelectionCriteria> {
    let entry = runners.get(name).ok_or_else(|| RunsonError::UnknownRunner {
        name: name.to_string(),
        available: runners.names(),
    })?;
    let criteria = criteria_for_entry(entry).map_err(|e| match e {
        RunsonError::InvalidCriteria { field, reason } => RunsonError::InvalidCriteria {
            field: format!("{}.{}", name, field),
            reason,
        },
        other => other,
    })?;
    debug!("Resolved runner {}: {:?}", name, criteria);
    Ok(criteria)
}

/// Resolve every configured runner, failing on the first malformed entry.
pub fn resolve_all(runners: &RunnersFile) -> Result<BTreeMap<String, SelectionCriteria>> {
    runners
        .runners
        .keys()
        .map(|name| resolve(name, runners).map(|c| (name.clone(), c)))
        .collect()
}

/// Find repository root by looking for a `.github` directory.
pub fn find_repo_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(".github").is_dir())
        .map(Path::to_path_buf)
}

/// Default location of the runner configuration for a working directory.
pub fn default_runners_path(start: &Path) -> Option<PathBuf> {
    find_repo_root(start)
        .map(|root| root.join(".github").join("runs-on.yml"))
        .filter(|path| path.exists())
}

#[cfg(test)]
mod tests {
    use super::*;

    const RUNS_ON_YML: &str = r#"
images:
  ubuntu:
    platform: linux
runners:
  small:
    cpu: 2
    family: ["m7*", "c7*"]
  mem-range:
    cpu: [8, 16]
    ram: [16, 64]
    family: ["r8*"]
    spot: false
  tmpfs-builder:
    cpu: 8
    family: ["r8g*"]
    extras: s3-cache+tmpfs
"#;

    #[test]
    fn test_parse_runners() {
        let file = RunnersFile::from_yaml_str(RUNS_ON_YML).unwrap();
        assert_eq!(file.names(), vec!["mem-range", "small", "tmpfs-builder"]);
        assert!(file.get("small").unwrap().spot_enabled());
        assert!(!file.get("mem-range").unwrap().spot_enabled());
        assert_eq!(file.all_patterns(), vec!["c7*", "m7*", "r8*", "r8g*"]);
    }

    #[test]
    fn test_resolve_scalar_and_range() {
        let file = RunnersFile::from_yaml_str(RUNS_ON_YML).unwrap();

        let small = resolve("small", &file).unwrap();
        assert_eq!(small.cpu, Some(Requirement::Exact(2.0)));
        assert_eq!(small.ram_gb, None);
        assert_eq!(small.family_patterns, vec!["m7*", "c7*"]);

        let ranged = resolve("mem-range", &file).unwrap();
        assert_eq!(ranged.cpu, Some(Requirement::Range { min: 8.0, max: 16.0 }));
        assert_eq!(ranged.ram_gb, Some(Requirement::Range { min: 16.0, max: 64.0 }));
    }

    #[test]
    fn test_tmpfs_extra_sets_ram_floor() {
        let file = RunnersFile::from_yaml_str(RUNS_ON_YML).unwrap();
        let criteria = resolve("tmpfs-builder", &file).unwrap();
        let ram = criteria.ram_gb.unwrap();
        assert!(ram.matches(32.0));
        assert!(!ram.matches(16.0));
    }

    #[test]
    fn test_unknown_runner() {
        let file = RunnersFile::from_yaml_str(RUNS_ON_YML).unwrap();
        let err = resolve("huge", &file).unwrap_err();
        match err {
            RunsonError::UnknownRunner { name, available } => {
                assert_eq!(name, "huge");
                assert_eq!(available.len(), 3);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_invalid_ranges() {
        let file = RunnersFile::from_yaml_str(
            "runners:\n  bad:\n    cpu: [16, 8]\n  zero:\n    ram: 0\n  long:\n    cpu: [1, 2, 3]\n",
        )
        .unwrap();
        for name in ["bad", "zero", "long"] {
            assert!(matches!(
                resolve(name, &file),
                Err(RunsonError::InvalidCriteria { .. })
            ));
        }
        assert!(resolve_all(&file).is_err());
    }

    #[test]
    fn test_fractional_cpu_rejected() {
        let file = RunnersFile::from_yaml_str(
            "runners:\n  half:\n    cpu: 2.5\n  span:\n    cpu: [2, 4.5]\n  mem:\n    cpu: 2.0\n    ram: 0.5\n",
        )
        .unwrap();
        for name in ["half", "span"] {
            match resolve(name, &file) {
                Err(RunsonError::InvalidCriteria { field, .. }) => assert_eq!(field, "cpu"),
                other => panic!("unexpected result for {}: {:?}", name, other),
            }
        }
        let mem = resolve("mem", &file).unwrap();
        assert_eq!(mem.cpu, Some(Requirement::Exact(2.0)));
        assert_eq!(mem.ram_gb, Some(Requirement::Exact(0.5)));
    }

    #[test]
    fn test_empty_and_malformed_documents() {
        assert!(RunnersFile::from_yaml_str("").unwrap().is_empty());
        assert!(matches!(
            RunnersFile::from_yaml_str("runners: [1, 2]"),
            Err(RunsonError::Config(ConfigError::ParseError(_)))
        ));
    }

    #[test]
    fn test_default_runners_path() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let nested = temp_dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        assert!(default_runners_path(&nested).is_none());

        std::fs::create_dir_all(temp_dir.path().join(".github")).unwrap();
        std::fs::write(temp_dir.path().join(".github").join("runs-on.yml"), RUNS_ON_YML).unwrap();
        let found = default_runners_path(&nested).unwrap();
        assert!(found.ends_with(".github/runs-on.yml"));
    }
}
