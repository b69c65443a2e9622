//! Glob minimizer
//!
//! Derives the smallest set of family selector patterns that selects exactly
//! a given set of instances from the catalog. Patterns are grouped by family
//! prefix: a family is collapsed to a wildcard only when the wildcard cannot
//! pick up an unmatched sibling, otherwise its matched members are listed by
//! full name.

use crate::catalog::{family_prefix, InstanceCatalog};
use crate::matching::matches_family_pattern;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

#[derive(Debug, Default)]
struct PrefixGroup {
    /// matched instances whose family is this prefix
    matched: BTreeSet<String>,
    /// every catalog instance the `prefix*` wildcard selects
    wildcard_total: BTreeSet<String>,
}

/// Compute minimal patterns reproducing `matched_names` against `catalog`.
///
/// Re-running the matcher with the returned patterns as family patterns
/// (other criteria unchanged) yields exactly the matched names that exist in
/// the catalog. Output is sorted and free of duplicates.
pub fn minimize_globs<I, S>(matched_names: I, catalog: &InstanceCatalog) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    // canonical catalog spelling; unknown names cannot be reproduced
    let matched: BTreeSet<String> = matched_names
        .into_iter()
        .filter_map(|name| catalog.find(name.as_ref()).map(|i| i.api_name.clone()))
        .collect();

    let mut groups: BTreeMap<String, PrefixGroup> = BTreeMap::new();
    for name in &matched {
        groups
            .entry(family_prefix(name).to_string())
            .or_default()
            .matched
            .insert(name.clone());
    }

    for (prefix, group) in groups.iter_mut() {
        let wildcard = format!("{}*", prefix);
        for inst in catalog.all() {
            if matches_family_pattern(&inst.api_name, &wildcard) {
                group.wildcard_total.insert(inst.api_name.clone());
            }
        }
    }

    let mut patterns = BTreeSet::new();
    for (prefix, group) in &groups {
        // r8g* also selects r8gd, so an unmatched longer family forces literals
        if group.wildcard_total.is_subset(&matched) {
            patterns.insert(format!("{}*", prefix));
        } else {
            patterns.extend(group.matched.iter().cloned());
        }
    }

    let result = drop_covered(patterns);
    debug!(
        "Minimized {} instances into {} patterns",
        matched.len(),
        result.len()
    );
    result
}

/// Remove patterns whose selection is contained in another emitted wildcard.
fn drop_covered(patterns: BTreeSet<String>) -> Vec<String> {
    let wildcards: Vec<&str> = patterns
        .iter()
        .filter(|p| p.ends_with('*'))
        .map(|p| p.as_str())
        .collect();

    patterns
        .iter()
        .filter(|pattern| {
            let covered = if pattern.ends_with('*') {
                let stem = pattern.trim_end_matches('*');
                wildcards
                    .iter()
                    .any(|w| *w != pattern.as_str() && stem.starts_with(w.trim_end_matches('*')))
            } else {
                wildcards.iter().any(|w| matches_family_pattern(pattern, w))
            };
            !covered
        })
        .cloned()
        .collect()
}
