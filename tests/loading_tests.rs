//! File loading tests: pricing dataset, runner configuration, workflow data
//! and tool settings.

use runsonctl::catalog::{Architecture, InstanceCatalog};
use runsonctl::config::Settings;
use runsonctl::criteria::Requirement;
use runsonctl::error::{ConfigError, RunsonError};
use runsonctl::runners::{default_runners_path, find_repo_root, resolve, RunnersFile};
use runsonctl::workflow::WorkflowRun;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_catalog_load_from_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("instances.json");
    fs::write(
        &path,
        r#"[
            {"api_name": "m7g.large", "vcpus": 2, "memory_gb": 8, "price_on_demand": 0.0816, "price_spot": 0.03},
            {"api_name": "m7i.large", "vcpus": 2, "memory_gb": 8, "price_on_demand": 0.1008, "ebs_mbps": 10000},
            {"api_name": "x2gd.medium", "vcpus": 1, "memory_gb": 16, "price_on_demand": 0.0835, "architecture": "x86_64"}
        ]"#,
    )
    .unwrap();

    let catalog = InstanceCatalog::load(&path).unwrap();
    assert_eq!(catalog.len(), 3);

    let m7g = catalog.find("M7G.LARGE").unwrap();
    assert_eq!(m7g.architecture, Architecture::Arm64);
    assert_eq!(m7g.price_spot, Some(0.03));
    assert_eq!(m7g.ebs_mbps, 0);

    // explicit architecture wins over the name
    assert_eq!(catalog.find("x2gd.medium").unwrap().architecture, Architecture::Amd64);
}

#[test]
fn test_catalog_load_failures() {
    let temp_dir = TempDir::new().unwrap();

    let missing = temp_dir.path().join("missing.json");
    assert!(matches!(
        InstanceCatalog::load(&missing),
        Err(RunsonError::CatalogLoad(_))
    ));

    let malformed = temp_dir.path().join("malformed.json");
    fs::write(&malformed, "{not json").unwrap();
    assert!(matches!(
        InstanceCatalog::load(&malformed),
        Err(RunsonError::CatalogLoad(_))
    ));

    let duplicate = temp_dir.path().join("duplicate.json");
    fs::write(
        &duplicate,
        r#"[
            {"api_name": "m7g.large", "vcpus": 2, "memory_gb": 8, "price_on_demand": 0.0816},
            {"api_name": "m7g.large", "vcpus": 2, "memory_gb": 8, "price_on_demand": 0.09}
        ]"#,
    )
    .unwrap();
    match InstanceCatalog::load(&duplicate) {
        Err(RunsonError::DuplicateInstance { api_name }) => assert_eq!(api_name, "m7g.large"),
        other => panic!("expected DuplicateInstance, got {:?}", other),
    }
}

#[test]
fn test_runners_file_discovery() {
    let temp_dir = TempDir::new().unwrap();
    let repo = temp_dir.path().join("repo");
    let nested = repo.join("crates").join("app");
    fs::create_dir_all(&nested).unwrap();
    fs::create_dir_all(repo.join(".github")).unwrap();

    assert_eq!(find_repo_root(&nested), Some(repo.clone()));
    // .github exists but holds no runs-on.yml
    assert_eq!(default_runners_path(&nested), None);

    let config = repo.join(".github").join("runs-on.yml");
    fs::write(
        &config,
        "runners:\n  build:\n    cpu: [4, 8]\n    ram: 16\n    family: [\"m7\", \"c7\"]\n    extras: s3-cache+tmpfs\n",
    )
    .unwrap();
    assert_eq!(default_runners_path(&nested), Some(config.clone()));

    let runners = RunnersFile::load(&config).unwrap();
    let criteria = resolve("build", &runners).unwrap();
    assert_eq!(criteria.cpu, Some(Requirement::Range { min: 4.0, max: 8.0 }));
    // explicit ram survives the tmpfs floor
    assert_eq!(criteria.ram_gb, Some(Requirement::Exact(16.0)));
    assert_eq!(criteria.family_patterns, vec!["m7", "c7"]);
}

#[test]
fn test_runners_file_errors() {
    let temp_dir = TempDir::new().unwrap();

    let missing = temp_dir.path().join("runs-on.yml");
    assert!(matches!(
        RunnersFile::load(&missing),
        Err(RunsonError::Config(ConfigError::NotFound(_)))
    ));

    fs::write(&missing, "runners: [not, a, mapping]").unwrap();
    assert!(matches!(
        RunnersFile::load(&missing),
        Err(RunsonError::Config(ConfigError::ParseError(_)))
    ));

    fs::write(&missing, "").unwrap();
    assert!(RunnersFile::load(&missing).unwrap().is_empty());
}

#[test]
fn test_workflow_run_load() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("run.json");
    fs::write(
        &path,
        r#"{"id": 1, "name": "CI", "run_number": 3, "status": "completed", "conclusion": null,
            "jobs": [{"name": "build", "started_at": null, "completed_at": null, "labels": ["ubuntu-latest"]}]}"#,
    )
    .unwrap();

    let run = WorkflowRun::load(&path).unwrap();
    assert_eq!(run.display_status(), "completed");
    assert_eq!(run.jobs.len(), 1);
    assert_eq!(run.wall_clock(), None);
}

#[test]
fn test_settings_roundtrip_through_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join(".runsonctl.toml");
    fs::write(
        &path,
        r#"
[catalog]
path = "/data/instances.json"

[estimate]
billing_increment_secs = 0
runners_path = "ci/runs-on.yml"

[family]
default_sort = "vcpus"
"#,
    )
    .unwrap();

    let settings = Settings::load(Some(&path)).unwrap();
    assert_eq!(settings.catalog.path.to_str(), Some("/data/instances.json"));
    assert_eq!(settings.billing_increment(), None);
    assert_eq!(settings.family.default_sort, "vcpus");
    assert_eq!(
        settings.estimate.runners_path.as_deref().and_then(|p| p.to_str()),
        Some("ci/runs-on.yml")
    );
}
