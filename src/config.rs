use crate::error::{ConfigError, RunsonError};
use crate::report::SortKey;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Tool settings (not the runs-on.yml runner configuration)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub catalog: CatalogSettings,
    pub estimate: EstimateSettings,
    pub family: FamilySettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSettings {
    /// Pricing dataset (JSON array of instance records)
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimateSettings {
    /// Upper-bound rounding for runs-on jobs, in seconds (0 disables)
    pub billing_increment_secs: u64,
    /// Runner configuration; defaults to `.github/runs-on.yml` of the repo
    pub runners_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FamilySettings {
    pub default_sort: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            catalog: CatalogSettings {
                path: dirs::data_dir()
                    .map(|d| d.join("runsonctl").join("instances.json"))
                    .unwrap_or_else(|| PathBuf::from("instances.json")),
            },
            estimate: EstimateSettings {
                billing_increment_secs: 60,
                runners_path: None,
            },
            family: FamilySettings {
                default_sort: "price".to_string(),
            },
        }
    }
}

impl Settings {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = if let Some(p) = path {
            p.to_path_buf()
        } else {
            // Try .runsonctl.toml in current dir, then ~/.config/runsonctl/config.toml
            let local = PathBuf::from(".runsonctl.toml");
            if local.exists() {
                local
            } else {
                dirs::config_dir()
                    .map(|d| d.join("runsonctl").join("config.toml"))
                    .unwrap_or_else(|| PathBuf::from(".runsonctl.toml"))
            }
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config: {}", config_path.display()))?;
            let settings: Settings = toml::from_str(&content).with_context(|| {
                let mut err = format!("Failed to parse config: {}", config_path.display());
                err.push_str("\n  Common issues:");
                err.push_str("\n    - Invalid TOML syntax");
                err.push_str("\n    - Missing required sections ([catalog], [estimate], [family])");
                err.push_str("\n    - Incorrect value types");
                err.push_str("\n  Tip: Run 'runsonctl init' to create a new config file");
                err
            })?;
            settings
                .validate()
                .with_context(|| format!("Invalid config: {}", config_path.display()))?;
            Ok(settings)
        } else {
            if path.is_some() {
                tracing::warn!(
                    "Config file not found: {}; using defaults. Run 'runsonctl init' to create one.",
                    config_path.display()
                );
            }
            Ok(Settings::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> std::result::Result<(), RunsonError> {
        if self.family.default_sort.parse::<SortKey>().is_err() {
            return Err(ConfigError::InvalidValue {
                field: "family.default_sort".to_string(),
                reason: format!(
                    "unknown sort column '{}' (valid: price, spot, vcpus, memory, api_name, arch, ebs)",
                    self.family.default_sort
                ),
            }
            .into());
        }
        Ok(())
    }

    pub fn billing_increment(&self) -> Option<Duration> {
        match self.estimate.billing_increment_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

pub fn init_config(output: &Path) -> Result<()> {
    let settings = Settings::default();
    settings.save(output)?;
    println!("Created config file: {}", output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_settings_default() {
        let settings = Settings::default();
        assert_eq!(settings.estimate.billing_increment_secs, 60);
        assert_eq!(settings.billing_increment(), Some(Duration::from_secs(60)));
        assert_eq!(settings.family.default_sort, "price");
        assert!(settings.catalog.path.ends_with("instances.json"));
    }

    #[test]
    fn test_settings_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test_config.toml");

        let mut settings = Settings::default();
        settings.estimate.billing_increment_secs = 0;
        assert!(settings.save(&config_path).is_ok());
        assert!(config_path.exists());

        let loaded = Settings::load(Some(&config_path)).unwrap();
        assert_eq!(loaded.estimate.billing_increment_secs, 0);
        assert_eq!(loaded.billing_increment(), None);
        assert_eq!(loaded.catalog.path, settings.catalog.path);
    }

    #[test]
    fn test_settings_load_nonexistent() {
        let temp_dir = TempDir::new().unwrap();
        let fake_path = temp_dir.path().join("nonexistent.toml");

        let settings = Settings::load(Some(&fake_path)).unwrap();
        assert_eq!(settings.estimate.billing_increment_secs, 60);
    }

    #[test]
    fn test_settings_load_invalid_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("invalid.toml");
        std::fs::write(&config_path, "invalid toml content {").unwrap();

        assert!(Settings::load(Some(&config_path)).is_err());
    }

    #[test]
    fn test_settings_reject_unknown_sort() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("bad_sort.toml");

        let mut settings = Settings::default();
        settings.family.default_sort = "colour".to_string();
        settings.save(&config_path).unwrap();

        let err = Settings::load(Some(&config_path)).unwrap_err();
        let config_err = err
            .chain()
            .find_map(|cause| cause.downcast_ref::<RunsonError>())
            .unwrap();
        assert!(matches!(
            config_err,
            RunsonError::Config(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_init_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("init_test.toml");

        assert!(init_config(&config_path).is_ok());
        let settings = Settings::load(Some(&config_path)).unwrap();
        assert_eq!(settings.family.default_sort, "price");
    }
}
