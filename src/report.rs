//! Terminal rendering for family and estimate results
//!
//! Tables use comfy-table; inline emphasis uses console styles, which turn
//! themselves off when stdout is not a terminal.

use crate::error::{Result, RunsonError};
use crate::estimate::RunEstimate;
use crate::matching::{matches_family_pattern, price_order, MatchResult, MatchedInstance};
use crate::utils::{format_price_range, format_range, format_std_duration};
use comfy_table::{Cell, Color, Table};
use console::style;
use std::fmt::Write;
use std::str::FromStr;

/// Column used to order family listings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Price,
    Spot,
    Vcpus,
    Memory,
    ApiName,
    Arch,
    Ebs,
}

impl FromStr for SortKey {
    type Err = RunsonError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "price" => Ok(SortKey::Price),
            "spot" => Ok(SortKey::Spot),
            "vcpus" => Ok(SortKey::Vcpus),
            "memory" => Ok(SortKey::Memory),
            "api_name" => Ok(SortKey::ApiName),
            "arch" => Ok(SortKey::Arch),
            "ebs" => Ok(SortKey::Ebs),
            other => Err(RunsonError::invalid_criteria(
                "sort",
                format!(
                    "unknown sort column '{}' (valid: price, spot, vcpus, memory, api_name, arch, ebs)",
                    other
                ),
            )),
        }
    }
}

/// Entries of a match result in display order. Price order is the result's
/// own order; other keys are stable sorts on top of it.
pub fn sorted_entries<'r, 'a>(result: &'r MatchResult<'a>, key: SortKey) -> Vec<&'r MatchedInstance<'a>> {
    let mut entries: Vec<_> = result.entries.iter().collect();
    match key {
        SortKey::Price => entries.sort_by(|a, b| price_order(a.instance, b.instance)),
        SortKey::Spot => entries.sort_by(|a, b| {
            let spot = |e: &MatchedInstance| e.instance.price_spot.unwrap_or(f64::INFINITY);
            spot(*a).total_cmp(&spot(*b))
        }),
        SortKey::Vcpus => entries.sort_by_key(|e| e.instance.vcpus),
        SortKey::Memory => entries.sort_by(|a, b| a.instance.memory_gb.total_cmp(&b.instance.memory_gb)),
        SortKey::ApiName => entries.sort_by(|a, b| a.instance.api_name.cmp(&b.instance.api_name)),
        SortKey::Arch => entries.sort_by_key(|e| e.instance.architecture),
        SortKey::Ebs => entries.sort_by_key(|e| e.instance.ebs_mbps),
    }
    entries
}

/// Table of matched instances with their matched-by annotation
pub fn family_table(result: &MatchResult, key: SortKey) -> String {
    if result.is_empty() {
        return style("No matching instances found.").yellow().to_string();
    }

    let mut table = Table::new();
    table.set_header(vec![
        "API Name", "Price", "Spot", "Arch", "Memory", "vCPUs", "EBS Mbps", "Matched By",
    ]);

    for entry in sorted_entries(result, key) {
        let inst = entry.instance;
        let matched = entry.matched_by.iter().cloned().collect::<Vec<_>>().join(", ");
        let name_cell = if entry.matched_by.is_empty() {
            Cell::new(&inst.api_name)
        } else {
            Cell::new(&inst.api_name).fg(Color::Green)
        };
        let spot = inst
            .price_spot
            .map(|p| format!("${:.4}", p))
            .unwrap_or_else(|| "N/A".to_string());
        let ebs = if inst.ebs_mbps > 0 {
            inst.ebs_mbps.to_string()
        } else {
            "N/A".to_string()
        };

        table.add_row(vec![
            name_cell,
            Cell::new(format!("${:.4}", inst.price_on_demand)),
            Cell::new(spot),
            Cell::new(inst.architecture.to_string()),
            Cell::new(format!("{:.0}GB", inst.memory_gb)),
            Cell::new(inst.vcpus),
            Cell::new(ebs),
            Cell::new(matched).fg(Color::Cyan),
        ]);
    }

    format!(
        "{}\n\n{}",
        table,
        style(format!(
            "Total: {} instances ({} matched by configured runners)",
            result.len(),
            result.annotated_count()
        ))
        .dim()
    )
}

/// YAML list of instance names for pasting into runs-on.yml
pub fn family_yaml(result: &MatchResult, key: SortKey) -> String {
    if result.is_empty() {
        return "[]".to_string();
    }
    let entries = sorted_entries(result, key);
    let width = entries
        .iter()
        .map(|e| e.instance.api_name.len() + 2)
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    for entry in entries {
        let inst = entry.instance;
        let ebs = if inst.ebs_mbps > 0 {
            format!("{} Mbps", inst.ebs_mbps)
        } else {
            "N/A".to_string()
        };
        let _ = writeln!(
            out,
            "- {:<width$}  # {}, {}, {:.0}GB, {} CPU, {}, ${:.4}/hr",
            format!("\"{}\"", inst.api_name),
            entry.category,
            inst.architecture,
            inst.memory_gb,
            inst.vcpus,
            ebs,
            inst.price_on_demand,
            width = width
        );
    }
    out
}

/// Minimized patterns as YAML with per-pattern stats, cheapest first
pub fn glob_yaml(globs: &[String], result: &MatchResult) -> String {
    if globs.is_empty() {
        return "[]".to_string();
    }

    let min_price = |glob: &str| -> f64 {
        selected_by(result, glob)
            .iter()
            .map(|e| e.instance.price_on_demand)
            .fold(f64::INFINITY, f64::min)
    };

    let mut ordered: Vec<&String> = globs.iter().collect();
    ordered.sort_by(|a, b| {
        min_price(a.as_str())
            .total_cmp(&min_price(b.as_str()))
            .then_with(|| a.cmp(b))
    });
    let width = globs.iter().map(|g| g.len() + 2).max().unwrap_or(0);

    let mut out = String::new();
    for glob in ordered {
        let quoted = format!("\"{}\"", glob);
        let entries = selected_by(result, glob);
        let Some(first) = entries.first() else {
            let _ = writeln!(out, "- {:<width$}  # unknown", quoted, width = width);
            continue;
        };

        let mut arches: Vec<String> = entries.iter().map(|e| e.instance.architecture.to_string()).collect();
        arches.sort();
        arches.dedup();
        let cpus: Vec<u32> = entries.iter().map(|e| e.instance.vcpus).collect();
        let mems: Vec<u32> = entries.iter().map(|e| e.instance.memory_gb.round() as u32).collect();
        let ebs: Vec<u32> = entries
            .iter()
            .map(|e| e.instance.ebs_mbps)
            .filter(|v| *v > 0)
            .collect();
        let prices: Vec<f64> = entries.iter().map(|e| e.instance.price_on_demand).collect();

        let _ = writeln!(
            out,
            "- {:<width$}  # {}, {}, {}, {}, {}, {}",
            quoted,
            first.category,
            arches.join("/"),
            format_range(&cpus, " CPU"),
            format_range(&mems, "GB"),
            format_range(&ebs, " Mbps"),
            format_price_range(&prices),
            width = width
        );
    }
    out
}

fn selected_by<'r, 'a>(result: &'r MatchResult<'a>, glob: &str) -> Vec<&'r MatchedInstance<'a>> {
    result
        .entries
        .iter()
        .filter(|e| matches_family_pattern(&e.instance.api_name, glob))
        .collect()
}

/// Per-job cost table plus totals
pub fn estimate_text(estimate: &RunEstimate) -> String {
    let mut out = String::new();
    let rule = "━".repeat(80);

    let _ = writeln!(out, "{}", style(&rule).bold());
    let run_number = estimate
        .run_number
        .map(|n| format!(" (#{})", n))
        .unwrap_or_default();
    let _ = writeln!(out, "  {}{}", style(&estimate.workflow_name).bold(), style(run_number).dim());
    let _ = writeln!(out, "{}", style(&rule).bold());
    let status = match estimate.status.as_str() {
        "success" => style(estimate.status.as_str()).green(),
        "failure" => style(estimate.status.as_str()).red(),
        "in_progress" => style(estimate.status.as_str()).yellow(),
        other => style(other),
    };
    let _ = writeln!(out, "  Status: {}", status);
    if let Some(wall_clock) = estimate.wall_clock {
        let _ = writeln!(out, "  Duration: {}", format_std_duration(wall_clock));
    }
    let _ = writeln!(out);

    let mut table = Table::new();
    table.set_header(vec!["", "Job", "Duration", "Runner", "Cost", "Detail"]);
    for job in &estimate.jobs {
        let status_cell = match job.status.as_str() {
            "success" => Cell::new("✓").fg(Color::Green),
            "failure" => Cell::new("✗").fg(Color::Red),
            "in_progress" => Cell::new("●").fg(Color::Yellow),
            "queued" => Cell::new("○"),
            _ => Cell::new("?"),
        };
        let runner = job.runner.clone().unwrap_or_else(|| {
            if job.runner_label.is_empty() {
                "unknown".to_string()
            } else {
                job.runner_label.clone()
            }
        });
        let (cost, detail) = match (&job.resolved_instance, &job.unpriced) {
            (Some(resolved), None) => {
                let cost = if (job.cost_high - job.cost_low).abs() > f64::EPSILON {
                    format!("${:.3}-${:.3}", job.cost_low, job.cost_high)
                } else {
                    format!("${:.3}", job.cost_low)
                };
                (Cell::new(cost).fg(Color::Green), resolved.detail())
            }
            (_, Some(reason)) => (Cell::new("?").fg(Color::Yellow), format!("unpriced: {}", reason)),
            (None, None) => (Cell::new("-"), String::new()),
        };
        let name: String = job.job_name.chars().take(40).collect();

        table.add_row(vec![
            status_cell,
            Cell::new(name),
            Cell::new(format_std_duration(job.duration)),
            Cell::new(runner),
            cost,
            Cell::new(detail),
        ]);
    }
    for failure in &estimate.failures {
        table.add_row(vec![
            Cell::new("!").fg(Color::Red),
            Cell::new(&failure.job_name),
            Cell::new("-"),
            Cell::new("-"),
            Cell::new("-"),
            Cell::new(&failure.reason).fg(Color::Red),
        ]);
    }
    let _ = writeln!(out, "{}", table);

    let _ = writeln!(out);
    let _ = writeln!(out, "{}", style(&rule).bold());
    let _ = writeln!(out, "  {}", style("TOTAL COST ESTIMATE").bold());
    let _ = writeln!(out, "{}", style(&rule).bold());
    let _ = writeln!(
        out,
        "\n  {} {}",
        style(format!("${:.2}", estimate.total_low)).green().bold(),
        style("(lower bound)").dim()
    );
    if (estimate.total_high - estimate.total_low).abs() > f64::EPSILON {
        let _ = writeln!(
            out,
            "  {}",
            style(format!("${:.2} (upper bound, billing increments)", estimate.total_high)).dim()
        );
    }
    let unpriced = estimate.unpriced_count() + estimate.failures.len();
    if unpriced > 0 {
        let _ = writeln!(
            out,
            "  {}",
            style(format!("{} job(s) not priced; totals exclude them", unpriced)).yellow()
        );
    }
    out
}
