//! GitHub-hosted runner pricing
//!
//! Fixed per-minute rate tables published by GitHub:
//! <https://docs.github.com/en/billing/reference/actions-runner-pricing>
//!
//! Larger runners are looked up by exact `(os, arch, cores)`; there is no
//! interpolation for unlisted core counts.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HostedOs {
    Linux,
    Windows,
    Macos,
}

impl fmt::Display for HostedOs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostedOs::Linux => write!(f, "linux"),
            HostedOs::Windows => write!(f, "windows"),
            HostedOs::Macos => write!(f, "macos"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HostedArch {
    X64,
    Arm64,
}

impl fmt::Display for HostedArch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostedArch::X64 => write!(f, "x64"),
            HostedArch::Arm64 => write!(f, "arm64"),
        }
    }
}

/// A label naming a GitHub-hosted runner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostedLabel {
    Standard { os: HostedOs },
    Larger { os: HostedOs, arch: HostedArch, cores: u32 },
}

/// Standard (2-core) runner rate in dollars per minute
pub fn standard_rate(os: HostedOs) -> f64 {
    match os {
        HostedOs::Linux => 0.008,
        HostedOs::Windows => 0.016,
        HostedOs::Macos => 0.08,
    }
}

use HostedArch::{Arm64, X64};
use HostedOs::{Linux, Macos, Windows};

/// Larger runner rates in dollars per minute
const LARGER_RUNNER_RATES: &[(HostedOs, HostedArch, u32, f64)] = &[
    (Linux, X64, 2, 0.008),
    (Linux, X64, 4, 0.016),
    (Linux, X64, 8, 0.032),
    (Linux, X64, 16, 0.064),
    (Linux, X64, 32, 0.128),
    (Linux, X64, 64, 0.256),
    (Linux, X64, 96, 0.384),
    (Linux, Arm64, 2, 0.005),
    (Linux, Arm64, 4, 0.010),
    (Linux, Arm64, 8, 0.020),
    (Linux, Arm64, 16, 0.040),
    (Linux, Arm64, 32, 0.080),
    (Linux, Arm64, 64, 0.160),
    (Windows, X64, 4, 0.032),
    (Windows, X64, 8, 0.064),
    (Windows, X64, 16, 0.128),
    (Windows, X64, 32, 0.256),
    (Windows, X64, 64, 0.512),
    (Windows, X64, 96, 0.768),
    (Windows, Arm64, 2, 0.010),
    (Windows, Arm64, 4, 0.020),
    (Windows, Arm64, 8, 0.040),
    (Windows, Arm64, 16, 0.080),
    (Windows, Arm64, 32, 0.160),
    (Windows, Arm64, 64, 0.320),
    (Macos, X64, 12, 0.120),
    (Macos, Arm64, 5, 0.160),
];

/// Larger runner rate in dollars per minute, exact table match only
pub fn larger_rate(os: HostedOs, arch: HostedArch, cores: u32) -> Option<f64> {
    LARGER_RUNNER_RATES
        .iter()
        .find(|(o, a, c, _)| *o == os && *a == arch && *c == cores)
        .map(|(_, _, _, rate)| *rate)
}

// Linux_x64_8Core_32gbRam, ubuntu-24.04-arm64-4-core, ubuntu-latest-16-cores
static LARGER_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(ubuntu|linux|windows|macos)[-_](?:[^-_]+[-_])*?(?:(x64|arm64)[-_])?(\d+)[-_]?cores?(?:$|[-_])",
    )
    .expect("larger runner label pattern is valid")
});

fn parse_os(name: &str) -> Option<HostedOs> {
    match name {
        "ubuntu" | "linux" => Some(Linux),
        "windows" => Some(Windows),
        "macos" => Some(Macos),
        _ => None,
    }
}

/// Recognize a GitHub-hosted runner label.
///
/// Labels carrying a core count are larger runners; other labels starting
/// with a known OS name are standard runners.
pub fn parse_hosted_label(label: &str) -> Option<HostedLabel> {
    let lower = label.trim().to_ascii_lowercase();

    if let Some(caps) = LARGER_LABEL.captures(&lower) {
        let os = parse_os(&caps[1])?;
        let arch = match caps.get(2).map(|m| m.as_str()) {
            Some("arm64") => Arm64,
            _ => X64,
        };
        // an absurd count still names a larger runner; it just has no rate
        let cores = caps[3].parse().unwrap_or(u32::MAX);
        return Some(HostedLabel::Larger { os, arch, cores });
    }

    let os_name = lower.split(|c| c == '-' || c == '_').next()?;
    let os = if os_name.starts_with("linux") {
        Linux
    } else {
        parse_os(os_name)?
    };
    Some(HostedLabel::Standard { os })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_labels() {
        for (label, os) in [
            ("ubuntu-latest", Linux),
            ("ubuntu-24.04", Linux),
            ("ubuntu-24.04-arm", Linux),
            ("windows-2022", Windows),
            ("macos-14", Macos),
            ("linux", Linux),
        ] {
            assert_eq!(
                parse_hosted_label(label),
                Some(HostedLabel::Standard { os }),
                "{}",
                label
            );
        }
    }

    #[test]
    fn test_larger_labels() {
        assert_eq!(
            parse_hosted_label("Linux_x64_8Core_32gbRam_300gbSSD"),
            Some(HostedLabel::Larger { os: Linux, arch: X64, cores: 8 })
        );
        assert_eq!(
            parse_hosted_label("Windows_x64_16Core_64gbRam"),
            Some(HostedLabel::Larger { os: Windows, arch: X64, cores: 16 })
        );
        assert_eq!(
            parse_hosted_label("ubuntu-24.04-arm64-4-core"),
            Some(HostedLabel::Larger { os: Linux, arch: Arm64, cores: 4 })
        );
        assert_eq!(
            parse_hosted_label("ubuntu-latest-16-cores"),
            Some(HostedLabel::Larger { os: Linux, arch: X64, cores: 16 })
        );
        // overflowing count stays a larger runner without a rate
        let huge = parse_hosted_label("ubuntu-latest-99999999999-cores");
        assert_eq!(huge, Some(HostedLabel::Larger { os: Linux, arch: X64, cores: u32::MAX }));
        assert_eq!(larger_rate(Linux, X64, u32::MAX), None);
    }

    #[test]
    fn test_unrecognized_labels() {
        assert_eq!(parse_hosted_label("self-hosted"), None);
        assert_eq!(parse_hosted_label("gpu"), None);
        assert_eq!(parse_hosted_label(""), None);
    }

    #[test]
    fn test_rate_tables() {
        assert_eq!(standard_rate(Linux), 0.008);
        assert_eq!(larger_rate(Linux, X64, 8), Some(0.032));
        assert_eq!(larger_rate(Linux, Arm64, 64), Some(0.160));
        assert_eq!(larger_rate(Macos, Arm64, 5), Some(0.160));
        // no nearest-neighbour fallback
        assert_eq!(larger_rate(Linux, X64, 6), None);
        assert_eq!(larger_rate(Windows, X64, 2), None);
    }
}
