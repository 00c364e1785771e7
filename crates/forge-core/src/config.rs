//! Engine guardrails and environment-driven defaults.

use crate::models::SynthesisOptions;

// Synthesis guards
pub const DEFAULT_MAX_EDGE_CASES: usize = 3;
pub const MAX_EDGE_CASE_CAP: usize = 10;
pub const REFINE_CAP_INCREMENT: usize = 2;
pub const MAX_INTEGRATION_STEPS: usize = 5;
pub const MAX_MOCK_DEPENDENCIES: usize = 3;
pub const MAX_EXTRA_VALUES: usize = 8;

// Scoring thresholds and penalties
pub const HIGH_COMPLEXITY_THRESHOLD: u32 = 10;
pub const MODERATE_COMPLEXITY_THRESHOLD: u32 = 5;
pub const HIGH_COMPLEXITY_PENALTY: u32 = 15;
pub const MODERATE_COMPLEXITY_PENALTY: u32 = 5;
pub const SECURITY_PENALTY: u32 = 25;
pub const PERFORMANCE_PENALTY: u32 = 20;

// Quality hints
pub const LONG_FUNCTION_LINES: usize = 30;
pub const LONG_LINE_LIMIT: usize = 80;
pub const MAX_LISTED_LONG_LINES: usize = 3;

// Batch analysis
pub const DEFAULT_WORKERS: usize = 4;
pub const MAX_WORKERS: usize = 32;
pub const MAX_SOURCE_BYTES: u64 = 2 * 1024 * 1024;

pub fn clamp_int(value: i64, minimum: i64, maximum: i64) -> i64 {
    value.max(minimum).min(maximum)
}

pub fn clamp_edge_cases(value: i64) -> usize {
    clamp_int(value, 0, MAX_EDGE_CASE_CAP as i64) as usize
}

pub fn clamp_workers(value: i64) -> usize {
    clamp_int(value, 1, MAX_WORKERS as i64) as usize
}

/// Parse an on/off toggle. Anything other than an explicit off value keeps
/// the flag on; unset falls back to `default`.
pub fn parse_flag(raw: Option<&str>, default: bool) -> bool {
    match raw {
        Some(val) => {
            let v = val.trim().to_lowercase();
            !matches!(v.as_str(), "0" | "false" | "no" | "off")
        }
        None => default,
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    parse_flag(std::env::var(name).ok().as_deref(), default)
}

fn env_int(name: &str) -> Option<i64> {
    std::env::var(name).ok()?.trim().parse::<i64>().ok()
}

/// Process-level settings read from `FORGE_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub max_edge_cases: usize,
    pub include_mocks: bool,
    pub include_performance: bool,
    pub workers: usize,
    pub exclude_sensitive: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_edge_cases: DEFAULT_MAX_EDGE_CASES,
            include_mocks: true,
            include_performance: true,
            workers: DEFAULT_WORKERS,
            exclude_sensitive: true,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_edge_cases: env_int("FORGE_MAX_EDGE_CASES")
                .map(clamp_edge_cases)
                .unwrap_or(defaults.max_edge_cases),
            include_mocks: env_flag("FORGE_INCLUDE_MOCKS", defaults.include_mocks),
            include_performance: env_flag(
                "FORGE_INCLUDE_PERFORMANCE",
                defaults.include_performance,
            ),
            workers: env_int("FORGE_WORKERS")
                .map(clamp_workers)
                .unwrap_or(defaults.workers),
            exclude_sensitive: env_flag("FORGE_EXCLUDE_SENSITIVE", defaults.exclude_sensitive),
        }
    }

    pub fn synthesis_options(&self) -> SynthesisOptions {
        SynthesisOptions {
            max_edge_cases_per_entity: self.max_edge_cases,
            include_mocks: self.include_mocks,
            include_performance: self.include_performance,
            ..SynthesisOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_edge_cases_bounds() {
        assert_eq!(clamp_edge_cases(-4), 0);
        assert_eq!(clamp_edge_cases(3), 3);
        assert_eq!(clamp_edge_cases(500), MAX_EDGE_CASE_CAP);
    }

    #[test]
    fn test_clamp_workers_never_zero() {
        assert_eq!(clamp_workers(0), 1);
        assert_eq!(clamp_workers(64), MAX_WORKERS);
    }

    #[test]
    fn test_parse_flag_values() {
        assert!(!parse_flag(Some("off"), true));
        assert!(!parse_flag(Some(" FALSE "), true));
        assert!(parse_flag(Some("yes"), false));
        assert!(parse_flag(None, true));
        assert!(!parse_flag(None, false));
    }

    #[test]
    fn test_default_config_matches_synthesis_defaults() {
        let options = EngineConfig::default().synthesis_options();
        assert_eq!(options, SynthesisOptions::default());
    }
}
