//! Property-based tests for runsonctl
//!
//! These tests use proptest to generate random inputs and verify
//! that matching and costing properties hold across a wide range of scenarios.

use proptest::prelude::*;
use runsonctl::catalog::{infer_architecture, Architecture, Instance, InstanceCatalog};
use runsonctl::criteria::{Requirement, SelectionCriteria};
use runsonctl::estimate::cost_bounds;
use runsonctl::matching::{match_instances, matches_family_pattern, MatchOptions};
use runsonctl::utils::format_duration;
use std::time::Duration;

const FAMILIES: &[&str] = &["r8g", "r8i", "r7g", "m7g", "m7i", "c7a"];
const SIZES: &[(&str, u32, f64)] = &[
    ("large", 2, 8.0),
    ("xlarge", 4, 16.0),
    ("2xlarge", 8, 32.0),
    ("4xlarge", 16, 64.0),
    ("8xlarge", 32, 128.0),
];

fn catalog_strategy() -> impl Strategy<Value = InstanceCatalog> {
    prop::collection::vec(0.01f64..5.0, FAMILIES.len() * SIZES.len()).prop_map(|prices| {
        let instances = FAMILIES
            .iter()
            .flat_map(|family| SIZES.iter().map(move |size| (*family, *size)))
            .zip(prices)
            .map(|((family, (size, vcpus, memory)), price)| {
                let name = format!("{}.{}", family, size);
                let arch = infer_architecture(&name);
                // round prices to cents so ties occur
                Instance::new(name, vcpus, memory, arch, (price * 100.0).round() / 100.0)
            });
        InstanceCatalog::from_instances(instances).unwrap()
    })
}

proptest! {
    #[test]
    fn test_exact_cpu_selects_only_that_count(
        catalog in catalog_strategy(),
        cpu in prop::sample::select(vec![2u32, 4, 8, 16, 32, 64])
    ) {
        let criteria = SelectionCriteria::new().with_cpu(Requirement::Exact(cpu as f64));
        let result = match_instances(&criteria, &catalog, MatchOptions::default());

        prop_assert!(result.instances().all(|i| i.vcpus == cpu));
        let expected = catalog.all().filter(|i| i.vcpus == cpu).count();
        prop_assert_eq!(result.len(), expected);
    }

    #[test]
    fn test_range_membership(
        catalog in catalog_strategy(),
        a in 1u32..40,
        b in 1u32..40
    ) {
        let (min, max) = if a <= b { (a, b) } else { (b, a) };
        let criteria = SelectionCriteria::new()
            .with_cpu(Requirement::range("cpu", min as f64, max as f64).unwrap());
        let result = match_instances(&criteria, &catalog, MatchOptions::default());

        prop_assert!(result.instances().all(|i| min <= i.vcpus && i.vcpus <= max));
    }

    #[test]
    fn test_results_ordered_by_price_then_name(catalog in catalog_strategy()) {
        let result = match_instances(&SelectionCriteria::new(), &catalog, MatchOptions::default());
        let entries: Vec<&Instance> = result.instances().collect();

        for pair in entries.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            prop_assert!(
                a.price_on_demand < b.price_on_demand
                    || (a.price_on_demand == b.price_on_demand && a.api_name < b.api_name),
                "{} ({}) before {} ({})", a.api_name, a.price_on_demand, b.api_name, b.price_on_demand
            );
        }
    }

    #[test]
    fn test_budget_is_upper_bound(catalog in catalog_strategy(), budget in 0.0f64..5.0) {
        let criteria = SelectionCriteria::new().with_budget(budget);
        let result = match_instances(&criteria, &catalog, MatchOptions::default());

        prop_assert!(result.instances().all(|i| i.price_on_demand <= budget));
    }

    #[test]
    fn test_family_pattern_is_prefix_match(
        family in prop::sample::select(FAMILIES.to_vec()),
        size in prop::sample::select(vec!["large", "xlarge", "2xlarge"])
    ) {
        let name = format!("{}.{}", family, size);
        prop_assert!(matches_family_pattern(&name, family));
        let glob = format!("{}*", family);
        prop_assert!(matches_family_pattern(&name, &glob));
        prop_assert!(matches_family_pattern(&name.to_ascii_uppercase(), family));
        prop_assert!(matches_family_pattern(&name, &name));
        // a literal name never matches a longer sibling
        let other = format!("{}.metal", family);
        prop_assert!(!matches_family_pattern(&other, &name));
    }

    #[test]
    fn test_cost_bounds_ordered(
        secs in 0u64..100_000,
        rate in 0.0f64..10.0,
        step in prop::option::of(1u64..3600)
    ) {
        let increment = step.map(Duration::from_secs);
        let (low, high) = cost_bounds(Duration::from_secs(secs), rate, increment);

        prop_assert!(low >= 0.0);
        prop_assert!(high >= low - 1e-12);
        if let Some(step) = step {
            // never more than one increment above the observed cost
            prop_assert!(high - low <= step as f64 / 3600.0 * rate + 1e-9);
        } else {
            prop_assert_eq!(low, high);
        }
    }

    #[test]
    fn test_format_duration_never_empty(seconds in 0u64..1_000_000u64) {
        let result = format_duration(seconds);
        prop_assert!(!result.is_empty());
        prop_assert!(result.ends_with('s'));
    }
}

#[test]
fn test_architecture_inference() {
    assert_eq!(infer_architecture("r8g.2xlarge"), Architecture::Arm64);
    assert_eq!(infer_architecture("m7gd.large"), Architecture::Arm64);
    assert_eq!(infer_architecture("t4g.nano"), Architecture::Arm64);
    assert_eq!(infer_architecture("a1.medium"), Architecture::Arm64);
    assert_eq!(infer_architecture("m6a.large"), Architecture::Amd64);
    assert_eq!(infer_architecture("c5.large"), Architecture::Amd64);
    assert_eq!(infer_architecture("g5.xlarge"), Architecture::Amd64);
}
