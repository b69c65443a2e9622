//! Family matcher
//!
//! Applies selection criteria to the instance catalog and produces an
//! ordered match result, optionally annotated with the configured runners
//! each instance would satisfy.

use crate::catalog::{Instance, InstanceCatalog};
use crate::criteria::SelectionCriteria;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Check whether an instance API name matches one family pattern.
///
/// - `r7` or `r7*` matches every name starting with `r7` (r7i, r7a, r7g, ...)
/// - `r7a.large` (a dotted name with no trailing `*`) matches only that name
///
/// Comparison is ASCII case-insensitive.
pub fn matches_family_pattern(api_name: &str, pattern: &str) -> bool {
    if api_name.is_empty() {
        return false;
    }
    let wildcard = pattern.ends_with('*');
    let prefix = pattern.trim_end_matches('*').to_ascii_lowercase();
    let name = api_name.to_ascii_lowercase();

    if !wildcard && prefix.contains('.') {
        return name == prefix;
    }
    name.starts_with(&prefix)
}

/// True if the name matches any pattern. An empty pattern list matches nothing;
/// callers treat "no patterns" as unrestricted before calling this.
pub fn matches_any_pattern<S: AsRef<str>>(api_name: &str, patterns: &[S]) -> bool {
    patterns
        .iter()
        .any(|p| matches_family_pattern(api_name, p.as_ref()))
}

/// Options that change how criteria are applied
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchOptions {
    /// Ignore family patterns and show every family with the same shape
    pub pick_family: bool,
}

/// One matched instance plus the runners that would select it
#[derive(Debug, Clone, Serialize)]
pub struct MatchedInstance<'a> {
    #[serde(flatten)]
    pub instance: &'a Instance,
    pub category: &'static str,
    pub matched_by: BTreeSet<String>,
}

/// Instances satisfying a query, cheapest first
#[derive(Debug, Clone, Default, Serialize)]
pub struct MatchResult<'a> {
    pub entries: Vec<MatchedInstance<'a>>,
}

impl<'a> MatchResult<'a> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn instances(&self) -> impl Iterator<Item = &'a Instance> + '_ {
        self.entries.iter().map(|e| e.instance)
    }

    /// First entry of the ordered result
    pub fn cheapest(&self) -> Option<&'a Instance> {
        self.entries.first().map(|e| e.instance)
    }

    pub fn names(&self) -> BTreeSet<String> {
        self.instances().map(|i| i.api_name.clone()).collect()
    }

    /// Number of entries selected by at least one configured runner
    pub fn annotated_count(&self) -> usize {
        self.entries.iter().filter(|e| !e.matched_by.is_empty()).count()
    }

    /// Union each runner's matches onto the result. Each runner is checked
    /// independently against its own full criteria.
    pub fn annotate(&mut self, runners: &BTreeMap<String, SelectionCriteria>) {
        for entry in &mut self.entries {
            entry
                .matched_by
                .extend(find_matching_runners(entry.instance, runners));
        }
    }
}

/// Price ordering used for every match result: on-demand price ascending,
/// ties broken by API name.
pub fn price_order(a: &Instance, b: &Instance) -> Ordering {
    a.price_on_demand
        .total_cmp(&b.price_on_demand)
        .then_with(|| a.api_name.cmp(&b.api_name))
}

/// Select every catalog instance satisfying the criteria.
pub fn match_instances<'a>(
    criteria: &SelectionCriteria,
    catalog: &'a InstanceCatalog,
    options: MatchOptions,
) -> MatchResult<'a> {
    let mut matched: Vec<&'a Instance> = catalog
        .all()
        .filter(|inst| criteria.matches(inst, options.pick_family))
        .collect();
    matched.sort_by(|a, b| price_order(a, b));

    debug!(
        "Matched {} of {} instances (pick_family: {})",
        matched.len(),
        catalog.len(),
        options.pick_family
    );

    MatchResult {
        entries: matched
            .into_iter()
            .map(|instance| MatchedInstance {
                instance,
                category: instance.category(),
                matched_by: BTreeSet::new(),
            })
            .collect(),
    }
}

/// Names of the runners whose criteria select this instance.
pub fn find_matching_runners(
    instance: &Instance,
    runners: &BTreeMap<String, SelectionCriteria>,
) -> Vec<String> {
    runners
        .iter()
        .filter(|(_, criteria)| criteria.matches(instance, false))
        .map(|(name, _)| name.clone())
        .collect()
}
