//! Instance catalog
//!
//! In-memory table of known EC2 instance types and their static attributes.
//! The catalog is loaded once at startup from the bundled pricing dataset and
//! is read-only afterwards.

use crate::error::{Result, RunsonError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// CPU architecture of an instance type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    Arm64,
    Amd64,
}

impl FromStr for Architecture {
    type Err = RunsonError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "arm64" | "aarch64" | "arm" => Ok(Architecture::Arm64),
            "amd64" | "x86_64" | "x64" | "x86" => Ok(Architecture::Amd64),
            other => Err(RunsonError::invalid_criteria(
                "architecture",
                format!("unknown architecture '{}' (expected arm64 or amd64)", other),
            )),
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Architecture::Arm64 => write!(f, "arm64"),
            Architecture::Amd64 => write!(f, "amd64"),
        }
    }
}

/// A priced EC2 instance type
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Instance {
    pub api_name: String,
    pub vcpus: u32,
    pub memory_gb: f64,
    pub architecture: Architecture,
    pub price_on_demand: f64,
    pub price_spot: Option<f64>,
    pub ebs_mbps: u32,
}

impl Instance {
    /// Create an instance with no spot price and no EBS bandwidth figure.
    pub fn new(
        api_name: impl Into<String>,
        vcpus: u32,
        memory_gb: f64,
        architecture: Architecture,
        price_on_demand: f64,
    ) -> Self {
        Self {
            api_name: api_name.into(),
            vcpus,
            memory_gb,
            architecture,
            price_on_demand,
            price_spot: None,
            ebs_mbps: 0,
        }
    }

    pub fn with_spot(mut self, price_spot: f64) -> Self {
        self.price_spot = Some(price_spot);
        self
    }

    pub fn with_ebs(mut self, ebs_mbps: u32) -> Self {
        self.ebs_mbps = ebs_mbps;
        self
    }

    /// Family prefix, e.g. `r8g` for `r8g.2xlarge`
    pub fn family_prefix(&self) -> &str {
        family_prefix(&self.api_name)
    }

    pub fn category(&self) -> &'static str {
        instance_category(&self.api_name)
    }
}

/// Raw dataset record as it appears in the pricing JSON
#[derive(Debug, Clone, Deserialize)]
pub struct InstanceRecord {
    pub api_name: String,
    pub vcpus: u32,
    pub memory_gb: f64,
    pub price_on_demand: f64,
    #[serde(default)]
    pub price_spot: Option<f64>,
    #[serde(default)]
    pub ebs_mbps: Option<u32>,
    #[serde(default)]
    pub architecture: Option<String>,
}

impl TryFrom<InstanceRecord> for Instance {
    type Error = RunsonError;

    fn try_from(record: InstanceRecord) -> Result<Self> {
        let api_name = record.api_name.trim().to_string();
        if api_name.is_empty() {
            return Err(RunsonError::CatalogLoad(
                "record with empty api_name".to_string(),
            ));
        }
        check_size_suffix(&api_name)?;
        if record.vcpus == 0 {
            return Err(RunsonError::CatalogLoad(format!(
                "{}: vcpus must be positive",
                api_name
            )));
        }
        if !(record.memory_gb > 0.0) {
            return Err(RunsonError::CatalogLoad(format!(
                "{}: memory_gb must be positive, got {}",
                api_name, record.memory_gb
            )));
        }
        if !(record.price_on_demand >= 0.0) {
            return Err(RunsonError::CatalogLoad(format!(
                "{}: price_on_demand must be non-negative, got {}",
                api_name, record.price_on_demand
            )));
        }
        if let Some(spot) = record.price_spot {
            if !(spot >= 0.0) {
                return Err(RunsonError::CatalogLoad(format!(
                    "{}: price_spot must be non-negative, got {}",
                    api_name, spot
                )));
            }
        }

        let architecture = match record.architecture.as_deref() {
            Some(arch) => arch.parse().map_err(|_| {
                RunsonError::CatalogLoad(format!("{}: unknown architecture '{}'", api_name, arch))
            })?,
            None => infer_architecture(&api_name),
        };

        Ok(Instance {
            api_name,
            vcpus: record.vcpus,
            memory_gb: record.memory_gb,
            architecture,
            price_on_demand: record.price_on_demand,
            price_spot: record.price_spot,
            ebs_mbps: record.ebs_mbps.unwrap_or(0),
        })
    }
}

/// API names are `family.size`; a name without a size cannot be told apart
/// from a family selector.
fn check_size_suffix(api_name: &str) -> Result<()> {
    match api_name.split_once('.') {
        Some((family, size)) if !family.is_empty() && !size.is_empty() => Ok(()),
        _ => Err(RunsonError::CatalogLoad(format!(
            "{}: api_name has no size suffix (expected family.size)",
            api_name
        ))),
    }
}

/// Read-only table of instance types keyed by API name
#[derive(Debug, Clone, Default)]
pub struct InstanceCatalog {
    // keyed by lowercased api_name
    instances: BTreeMap<String, Instance>,
}

impl InstanceCatalog {
    /// Build a catalog, rejecting duplicate API names.
    pub fn from_instances(instances: impl IntoIterator<Item = Instance>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for instance in instances {
            check_size_suffix(&instance.api_name)?;
            let key = instance.api_name.to_ascii_lowercase();
            if map.contains_key(&key) {
                return Err(RunsonError::DuplicateInstance {
                    api_name: instance.api_name,
                });
            }
            map.insert(key, instance);
        }
        Ok(Self { instances: map })
    }

    pub fn from_records(records: Vec<InstanceRecord>) -> Result<Self> {
        let instances = records
            .into_iter()
            .map(Instance::try_from)
            .collect::<Result<Vec<_>>>()?;
        Self::from_instances(instances)
    }

    /// Parse a catalog from the JSON pricing dataset.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let records: Vec<InstanceRecord> = serde_json::from_str(content)
            .map_err(|e| RunsonError::CatalogLoad(format!("malformed pricing data: {}", e)))?;
        Self::from_records(records)
    }

    /// Load the pricing dataset from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RunsonError::CatalogLoad(format!("cannot read {}: {}", path.display(), e))
        })?;
        let catalog = Self::from_json_str(&content)?;
        debug!(
            "Loaded {} instance types from {}",
            catalog.len(),
            path.display()
        );
        Ok(catalog)
    }

    /// Look up an instance by API name (case-insensitive).
    pub fn find(&self, api_name: &str) -> Option<&Instance> {
        self.instances.get(&api_name.to_ascii_lowercase())
    }

    /// All instances, in API name order.
    pub fn all(&self) -> impl Iterator<Item = &Instance> + '_ {
        self.instances.values()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

/// Portion of the API name before the size suffix.
///
/// `r7i.2xlarge` -> `r7i`, `m6a.4xlarge` -> `m6a`
pub fn family_prefix(api_name: &str) -> &str {
    match api_name.split_once('.') {
        Some((family, _)) => family,
        None => api_name,
    }
}

/// Infer CPU architecture from the AWS family naming convention.
///
/// Graviton families carry a `g` after the generation digit (`r8g`, `m7gd`,
/// `t4g`) or are the first-generation `a1`. AMD (`m6a`) and Intel (`m6i`,
/// `c5`) families are both x86-64.
pub fn infer_architecture(api_name: &str) -> Architecture {
    let family = family_prefix(api_name).to_ascii_lowercase();
    if family.starts_with("a1") {
        return Architecture::Arm64;
    }
    // skip the category letters and generation digits
    let suffix = family
        .trim_start_matches(|c: char| c.is_ascii_alphabetic())
        .trim_start_matches(|c: char| c.is_ascii_digit());
    if family.len() >= 2 && suffix.contains('g') {
        Architecture::Arm64
    } else {
        Architecture::Amd64
    }
}

/// Compute category for reporting, based on the family letter.
pub fn instance_category(api_name: &str) -> &'static str {
    let family = family_prefix(api_name).to_ascii_lowercase();
    if family.starts_with("inf") || family.starts_with("trn") {
        return "ml-inference";
    }
    if family.starts_with("a1") {
        return "general";
    }
    match family.chars().next() {
        Some('c') => "compute",
        Some('m') => "general",
        Some('r') | Some('x') | Some('u') => "memory",
        Some('t') => "burstable",
        Some('i') | Some('h') | Some('d') => "storage",
        Some('z') => "high-freq",
        Some('g') | Some('p') => "gpu",
        Some('f') => "fpga",
        Some('v') => "video",
        _ => "other",
    }
}
