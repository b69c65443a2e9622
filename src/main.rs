use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use runsonctl::catalog::{Architecture, InstanceCatalog};
use runsonctl::config::{self, Settings};
use runsonctl::criteria::{Requirement, SelectionCriteria};
use runsonctl::estimate::{CostEstimator, EstimateOptions};
use runsonctl::exit_codes::exit_code_for_anyhow;
use runsonctl::globs::minimize_globs;
use runsonctl::matching::{match_instances, MatchOptions};
use runsonctl::report::{self, SortKey};
use runsonctl::runners::{self, RunnersFile};
use runsonctl::workflow::WorkflowRun;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "runsonctl")]
#[command(
    about = "Instance matching and cost estimation for runs-on.com CI runners",
    long_about = "runsonctl picks EC2 instance types for runs-on.com runners and prices workflow runs.\n\nSupports:\n  - Matching instances by cpu, ram, family, architecture, budget and EBS bandwidth\n  - Minimal family globs for runs-on.yml\n  - Per-job cost estimates for runs-on and GitHub-hosted runners"
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Find instance types matching runner constraints
    Family {
        /// Family patterns (r8g, m7*, c7i.large)
        selectors: Vec<String>,
        /// Use the family patterns and sizes of a configured runner
        #[arg(long)]
        runner: Option<String>,
        /// vCPUs: exact (8) or range (8:16)
        #[arg(long)]
        cpu: Option<String>,
        /// Memory in GB: exact (32) or range (16:64)
        #[arg(long)]
        mem: Option<String>,
        /// Architecture (arm64, amd64); repeatable
        #[arg(long)]
        arch: Vec<String>,
        /// Maximum on-demand price per hour
        #[arg(long)]
        budget: Option<f64>,
        /// Minimum EBS bandwidth in Mbps
        #[arg(long)]
        ebs_min: Option<u32>,
        /// Require enough RAM to build on tmpfs
        #[arg(long)]
        for_tmpfs: bool,
        /// Ignore family patterns and show every family with the same shape
        #[arg(long)]
        pick_family: bool,
        /// Print minimized family globs instead of instance names
        #[arg(long)]
        globs: bool,
        /// Output format (list, yaml, json)
        #[arg(short, long, default_value = "list")]
        output: String,
        /// Sort column (price, spot, vcpus, memory, api_name, arch, ebs)
        #[arg(long)]
        sort: Option<String>,
        /// Instance pricing dataset (JSON)
        #[arg(long)]
        catalog: Option<PathBuf>,
        /// Runner configuration (runs-on.yml)
        #[arg(long)]
        runners: Option<PathBuf>,
    },
    /// Estimate the cost of a workflow run
    Estimate {
        /// Workflow run JSON (GitHub API shape)
        run: PathBuf,
        /// Jobs JSON, when the run document does not embed them
        #[arg(long)]
        jobs: Option<PathBuf>,
        /// Runner configuration (runs-on.yml)
        #[arg(long)]
        runners: Option<PathBuf>,
        /// Instance pricing dataset (JSON)
        #[arg(long)]
        catalog: Option<PathBuf>,
        /// Billing increment in seconds for the upper bound (0 disables)
        #[arg(long)]
        billing_increment: Option<u64>,
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        output: String,
    },
    /// Initialize runsonctl configuration
    Init {
        /// Output path for config file
        #[arg(short, long, default_value = ".runsonctl.toml")]
        output: PathBuf,
    },
}

struct FamilyArgs {
    selectors: Vec<String>,
    runner: Option<String>,
    cpu: Option<String>,
    mem: Option<String>,
    arch: Vec<String>,
    budget: Option<f64>,
    ebs_min: Option<u32>,
    for_tmpfs: bool,
    pick_family: bool,
    globs: bool,
    output: String,
    sort: Option<String>,
    catalog: Option<PathBuf>,
    runners: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    // Setup logging - only warnings and errors unless verbose
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(exit_code_for_anyhow(&e));
    }
}

fn run(cli: Cli) -> Result<()> {
    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Family {
            selectors,
            runner,
            cpu,
            mem,
            arch,
            budget,
            ebs_min,
            for_tmpfs,
            pick_family,
            globs,
            output,
            sort,
            catalog,
            runners,
        } => {
            let args = FamilyArgs {
                selectors,
                runner,
                cpu,
                mem,
                arch,
                budget,
                ebs_min,
                for_tmpfs,
                pick_family,
                globs,
                output,
                sort,
                catalog,
                runners,
            };
            handle_family(args, &settings)?;
        }
        Commands::Estimate {
            run,
            jobs,
            runners,
            catalog,
            billing_increment,
            output,
        } => {
            handle_estimate(
                &run,
                jobs.as_deref(),
                runners.as_deref(),
                catalog.as_deref(),
                billing_increment,
                &output,
                &settings,
            )?;
        }
        Commands::Init { output } => {
            config::init_config(&output)?;
        }
    }

    Ok(())
}

fn load_catalog(explicit: Option<&Path>, settings: &Settings) -> Result<InstanceCatalog> {
    let path = explicit.unwrap_or(settings.catalog.path.as_path());
    let catalog = InstanceCatalog::load(path).with_context(|| {
        format!(
            "Failed to load instance catalog: {}\n  Tip: pass --catalog or set [catalog] path in the config file",
            path.display()
        )
    })?;
    info!("Loaded {} instance types from {}", catalog.len(), path.display());
    Ok(catalog)
}

/// Runner configuration from `--runners`, the settings file, or the
/// repository's `.github/runs-on.yml`. `None` when none of them exist.
fn load_runners(explicit: Option<&Path>, settings: &Settings) -> Result<Option<RunnersFile>> {
    let path = match explicit.or(settings.estimate.runners_path.as_deref()) {
        Some(path) => Some(path.to_path_buf()),
        None => {
            let cwd = std::env::current_dir().context("Failed to read current directory")?;
            runners::default_runners_path(&cwd)
        }
    };

    match path {
        Some(path) => {
            let file = RunnersFile::load(&path)
                .with_context(|| format!("Failed to load runner configuration: {}", path.display()))?;
            debug!("Using runner configuration {}", path.display());
            Ok(Some(file))
        }
        None => {
            debug!("No runner configuration found");
            Ok(None)
        }
    }
}

fn handle_family(args: FamilyArgs, settings: &Settings) -> Result<()> {
    let catalog = load_catalog(args.catalog.as_deref(), settings)?;
    let runner_file = load_runners(args.runners.as_deref(), settings)?.unwrap_or_default();

    // Base criteria: the named runner's, otherwise empty
    let mut criteria = match &args.runner {
        Some(name) => runners::resolve(name, &runner_file)?,
        None => SelectionCriteria::new(),
    };

    if let Some(cpu) = &args.cpu {
        criteria = criteria.with_cpu(Requirement::parse_cli("cpu", cpu)?.whole("cpu")?);
    }
    if let Some(mem) = &args.mem {
        criteria = criteria.with_ram(Requirement::parse_cli("mem", mem)?);
    }
    if !args.arch.is_empty() {
        let arches = args
            .arch
            .iter()
            .map(|a| a.parse::<Architecture>())
            .collect::<runsonctl::Result<Vec<_>>>()?;
        criteria = criteria.with_architectures(arches);
    }
    if let Some(budget) = args.budget {
        criteria = criteria.with_budget(budget);
    }
    if let Some(ebs_min) = args.ebs_min {
        criteria = criteria.with_ebs_min(ebs_min);
    }
    if args.for_tmpfs {
        criteria = criteria.with_tmpfs_floor();
    }

    // Pattern source: pick-family > --runner > selectors > every runner's patterns
    if !args.pick_family && args.runner.is_none() {
        let patterns = if !args.selectors.is_empty() {
            args.selectors.clone()
        } else {
            runner_file.all_patterns()
        };
        if patterns.is_empty() {
            bail!(
                "No family patterns to match.\n  Pass family selectors (e.g. 'r8g m7*'), --runner NAME, or --pick-family,\n  or define runners with 'family' in .github/runs-on.yml"
            );
        }
        criteria = criteria.with_families(patterns);
    }
    criteria.validate()?;
    debug!("Family criteria: {:?}", criteria);

    let options = MatchOptions {
        pick_family: args.pick_family,
    };
    let mut result = match_instances(&criteria, &catalog, options);

    let mut annotations = runners::resolve_all(&runner_file)?;
    if let Some(name) = &args.runner {
        annotations.retain(|runner, _| runner == name);
    }
    result.annotate(&annotations);

    let sort_key: SortKey = args
        .sort
        .as_deref()
        .unwrap_or(settings.family.default_sort.as_str())
        .parse()?;

    if args.globs {
        let globs = minimize_globs(result.names(), &catalog);
        match args.output.as_str() {
            "json" => println!("{}", serde_json::to_string_pretty(&globs)?),
            "list" | "yaml" => print!("{}", report::glob_yaml(&globs, &result)),
            other => bail!("Unknown output format '{}' (valid: list, yaml, json)", other),
        }
        return Ok(());
    }

    match args.output.as_str() {
        "list" => println!("{}", report::family_table(&result, sort_key)),
        "yaml" => print!("{}", report::family_yaml(&result, sort_key)),
        "json" => {
            let entries = report::sorted_entries(&result, sort_key);
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        other => bail!("Unknown output format '{}' (valid: list, yaml, json)", other),
    }

    Ok(())
}

fn handle_estimate(
    run_path: &Path,
    jobs_path: Option<&Path>,
    runners_path: Option<&Path>,
    catalog_path: Option<&Path>,
    billing_increment: Option<u64>,
    output: &str,
    settings: &Settings,
) -> Result<()> {
    let mut run = WorkflowRun::load(run_path)
        .with_context(|| format!("Failed to read workflow run: {}", run_path.display()))?;
    if let Some(jobs_path) = jobs_path {
        let content = std::fs::read_to_string(jobs_path)
            .with_context(|| format!("Failed to read jobs: {}", jobs_path.display()))?;
        run = run
            .with_jobs_json(&content)
            .with_context(|| format!("Failed to parse jobs: {}", jobs_path.display()))?;
    }

    let catalog = load_catalog(catalog_path, settings)?;
    let runner_file = load_runners(runners_path, settings)?.unwrap_or_default();

    let increment = match billing_increment {
        Some(0) => None,
        Some(secs) => Some(Duration::from_secs(secs)),
        None => settings.billing_increment(),
    };
    let options = EstimateOptions {
        billing_increment: increment,
    };

    let estimator = CostEstimator::new(&catalog, &runner_file, options)?;
    let estimate = estimator.estimate(&run);

    match output {
        "json" => println!("{}", serde_json::to_string_pretty(&estimate)?),
        "text" => print!("{}", report::estimate_text(&estimate)),
        other => bail!("Unknown output format '{}' (valid: text, json)", other),
    }

    Ok(())
}

