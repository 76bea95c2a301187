//! Policy configuration and loading.
//!
//! The policy holds every enumerated constant the engine checks against. It is
//! an immutable value handed to each component, so tests can swap in their own.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::model::{canonical_code, CourseType};

/// Data policy: what counts as a valid course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    /// Program identifiers a course may belong to (upper-case).
    #[serde(default = "default_program_codes")]
    pub program_codes: BTreeSet<String>,
    /// Accepted course types.
    #[serde(default = "default_course_types")]
    pub course_types: BTreeSet<CourseType>,
    /// Credit value every course is expected to carry. Deviations are logged.
    #[serde(default = "default_expected_credits")]
    pub expected_credits: i64,
    /// Bias thresholds for the fairness analyzer.
    #[serde(default)]
    pub fairness: FairnessThresholds,
}

/// Thresholds that turn fairness statistics into bias flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FairnessThresholds {
    /// A program below this share of all courses (in percent) is flagged.
    #[serde(default = "default_low_coverage_pct")]
    pub low_coverage_pct: f64,
    /// Largest tolerated gap between per-program average credits.
    #[serde(default = "default_credit_imbalance")]
    pub credit_imbalance: f64,
}

fn default_program_codes() -> BTreeSet<String> {
    ["MS_DAE", "MS_DS", "MS_CS", "MS_DA", "MS_IS"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_course_types() -> BTreeSet<CourseType> {
    [CourseType::Core, CourseType::Elective].into_iter().collect()
}
fn default_expected_credits() -> i64 {
    4
}
fn default_low_coverage_pct() -> f64 {
    10.0
}
fn default_credit_imbalance() -> f64 {
    1.0
}

impl Default for FairnessThresholds {
    fn default() -> Self {
        Self {
            low_coverage_pct: default_low_coverage_pct(),
            credit_imbalance: default_credit_imbalance(),
        }
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            program_codes: default_program_codes(),
            course_types: default_course_types(),
            expected_credits: default_expected_credits(),
            fairness: FairnessThresholds::default(),
        }
    }
}

impl Policy {
    /// Build a policy from explicit program codes, keeping the other defaults.
    pub fn with_programs<I, S>(programs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            program_codes: programs
                .into_iter()
                .map(|p| canonical_code(p.as_ref()))
                .collect(),
            ..Self::default()
        }
    }

    pub fn is_valid_program(&self, program_code: &str) -> bool {
        self.program_codes.contains(program_code)
    }

    pub fn is_valid_type(&self, course_type: CourseType) -> bool {
        self.course_types.contains(&course_type)
    }

    /// Re-key program codes to their canonical form.
    fn canonicalize(&mut self) {
        self.program_codes = self
            .program_codes
            .iter()
            .map(|p| canonical_code(p))
            .collect();
    }
}

/// Top-level courseweave configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseweaveConfig {
    #[serde(default)]
    pub policy: Policy,
    /// Output directory for reports.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Run the post-validation analyses on the blocking pool concurrently.
    #[serde(default = "default_true")]
    pub parallel: bool,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./courseweave-reports")
}
fn default_true() -> bool {
    true
}

impl Default for CourseweaveConfig {
    fn default() -> Self {
        Self {
            policy: Policy::default(),
            output_dir: default_output_dir(),
            parallel: true,
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        let Some(end) = result[start..].find('}') else {
            break;
        };
        let var_name = &result[start + 2..start + end];
        let value = std::env::var(var_name).unwrap_or_default();
        result = format!("{}{}{}", &result[..start], value, &result[start + end + 1..]);
    }
    result
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `courseweave.toml` in the current directory
/// 2. `~/.config/courseweave/config.toml`
///
/// Environment variable overrides: `COURSEWEAVE_EXPECTED_CREDITS`,
/// `COURSEWEAVE_PROGRAM_CODES` (comma-separated).
pub fn load_config() -> Result<CourseweaveConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<CourseweaveConfig> {
    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => {
            let local = PathBuf::from("courseweave.toml");
            if local.exists() {
                Some(local)
            } else {
                dirs_path()
                    .map(|home| home.join("config.toml"))
                    .filter(|global| global.exists())
            }
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            parse_config_str(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => CourseweaveConfig::default(),
    };

    apply_env_overrides(&mut config)?;
    config.policy.canonicalize();
    Ok(config)
}

/// Parse a TOML config string, resolving `${VAR}` references in string values.
pub fn parse_config_str(content: &str) -> Result<CourseweaveConfig> {
    let mut config: CourseweaveConfig = toml::from_str(content)?;
    config.output_dir = PathBuf::from(resolve_env_vars(&config.output_dir.to_string_lossy()));
    config.policy.program_codes = config
        .policy
        .program_codes
        .iter()
        .map(|p| resolve_env_vars(p))
        .filter(|p| !p.trim().is_empty())
        .collect();
    config.policy.canonicalize();
    Ok(config)
}

fn apply_env_overrides(config: &mut CourseweaveConfig) -> Result<()> {
    if let Ok(credits) = std::env::var("COURSEWEAVE_EXPECTED_CREDITS") {
        config.policy.expected_credits = credits
            .trim()
            .parse()
            .with_context(|| format!("invalid COURSEWEAVE_EXPECTED_CREDITS: '{credits}'"))?;
    }
    if let Ok(programs) = std::env::var("COURSEWEAVE_PROGRAM_CODES") {
        let codes: BTreeSet<String> = programs
            .split(',')
            .map(canonical_code)
            .filter(|p| !p.is_empty())
            .collect();
        anyhow::ensure!(
            !codes.is_empty(),
            "COURSEWEAVE_PROGRAM_CODES must name at least one program"
        );
        config.policy.program_codes = codes;
    }
    Ok(())
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("courseweave"))
}
