//! runsonctl library
//!
//! Instance matching and cost estimation for runs-on.com CI runners: pick
//! EC2 instance types that satisfy a runner's cpu/ram/family constraints,
//! compress the result into family globs, and price finished workflow runs.

pub mod catalog;
pub mod config;
pub mod criteria;
pub mod error;
pub mod estimate;
pub mod exit_codes;
pub mod globs;
pub mod matching;
pub mod report;
pub mod runners;
pub mod utils;
pub mod workflow;

// Re-export commonly used types
pub use catalog::{Architecture, Instance, InstanceCatalog};
pub use criteria::{Requirement, SelectionCriteria};
pub use error::{Result, RunsonError};
pub use estimate::{CostEstimator, EstimateOptions, JobCostRecord, RunEstimate};
pub use globs::minimize_globs;
pub use matching::{match_instances, MatchOptions, MatchResult};
pub use runners::RunnersFile;
pub use workflow::{WorkflowJob, WorkflowRun};
