//! Program representation and credit distribution analysis.
//!
//! Coverage is computed for every program in the policy; credit distribution
//! for every program present in the data. Bias flags are soft findings: they
//! are reported, never raised.
//!
//! Extended per-program metrics go through [`GroupMetric`]. A metric that
//! fails for any program is dropped from the report and logged.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Policy;
use crate::error::MetricError;
use crate::model::{Course, CourseType};

/// Share of all courses belonging to one program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramCoverage {
    pub count: usize,
    /// Percentage of the total, rounded to two decimals.
    pub percentage: f64,
}

/// Credit spread within one program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditDistribution {
    /// Rounded to two decimals.
    pub avg_credits: f64,
    pub min_credits: i64,
    pub max_credits: i64,
}

/// Category of a bias flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BiasKind {
    LowCoverage,
    MissingProgram,
    CreditImbalance,
}

impl BiasKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BiasKind::LowCoverage => "LOW_COVERAGE",
            BiasKind::MissingProgram => "MISSING_PROGRAM",
            BiasKind::CreditImbalance => "CREDIT_IMBALANCE",
        }
    }
}

impl fmt::Display for BiasKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BiasKind {
    type Err = BiasFlagParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOW_COVERAGE" => Ok(BiasKind::LowCoverage),
            "MISSING_PROGRAM" => Ok(BiasKind::MissingProgram),
            "CREDIT_IMBALANCE" => Ok(BiasKind::CreditImbalance),
            other => Err(BiasFlagParseError(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized bias flag: {0}")]
pub struct BiasFlagParseError(String);

/// A bias finding. Serialized as its message string, e.g.
/// `"MISSING_PROGRAM: MS_IS has no courses in dataset"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct BiasFlag {
    pub kind: BiasKind,
    pub message: String,
}

impl BiasFlag {
    fn new(kind: BiasKind, detail: impl fmt::Display) -> Self {
        Self {
            kind,
            message: format!("{kind}: {detail}"),
        }
    }
}

impl fmt::Display for BiasFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl From<BiasFlag> for String {
    fn from(flag: BiasFlag) -> Self {
        flag.message
    }
}

impl TryFrom<String> for BiasFlag {
    type Error = BiasFlagParseError;

    fn try_from(message: String) -> Result<Self, Self::Error> {
        let prefix = message.split_once(':').map_or(message.as_str(), |(k, _)| k);
        let kind = prefix.trim().parse()?;
        Ok(Self { kind, message })
    }
}

/// A metric evaluated once per program group.
pub trait GroupMetric: Send + Sync {
    /// Key under which results appear in `extended_metrics`.
    fn name(&self) -> &str;

    /// Evaluate the metric for one program's courses.
    fn compute(&self, program: &str, group: &[&Course]) -> Result<f64, MetricError>;
}

/// Fraction of a program's courses that are `Core`.
pub struct CoreShare;

impl GroupMetric for CoreShare {
    fn name(&self) -> &str {
        "core_share"
    }

    fn compute(&self, program: &str, group: &[&Course]) -> Result<f64, MetricError> {
        if group.is_empty() {
            return Err(MetricError::Undefined {
                group: program.to_string(),
                reason: "no courses".into(),
            });
        }
        let core = group
            .iter()
            .filter(|c| c.course_type == CourseType::Core)
            .count();
        Ok(round2(core as f64 / group.len() as f64))
    }
}

/// Number of courses in a program.
pub struct CourseCount;

impl GroupMetric for CourseCount {
    fn name(&self) -> &str {
        "course_count"
    }

    fn compute(&self, _program: &str, group: &[&Course]) -> Result<f64, MetricError> {
        Ok(group.len() as f64)
    }
}

/// Fairness findings for one snapshot. Regenerated in full every run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FairnessReport {
    pub generated_at: DateTime<Utc>,
    pub program_coverage: BTreeMap<String, ProgramCoverage>,
    pub credit_distribution: BTreeMap<String, CreditDistribution>,
    pub bias_flags: Vec<BiasFlag>,
    /// metric name -> program -> value, for metrics that computed cleanly.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extended_metrics: BTreeMap<String, BTreeMap<String, f64>>,
    /// Metrics left out because they failed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub omitted_metrics: Vec<String>,
}

impl FairnessReport {
    pub fn has_flags(&self) -> bool {
        !self.bias_flags.is_empty()
    }

    pub fn flags_of(&self, kind: BiasKind) -> impl Iterator<Item = &BiasFlag> {
        self.bias_flags.iter().filter(move |f| f.kind == kind)
    }
}

/// Computes [`FairnessReport`]s under a policy.
pub struct FairnessAnalyzer {
    policy: Policy,
    metrics: Vec<Box<dyn GroupMetric>>,
}

impl FairnessAnalyzer {
    /// Analyzer with the built-in extended metrics.
    pub fn new(policy: Policy) -> Self {
        Self::with_metrics(policy, vec![Box::new(CourseCount), Box::new(CoreShare)])
    }

    pub fn with_metrics(policy: Policy, metrics: Vec<Box<dyn GroupMetric>>) -> Self {
        Self { policy, metrics }
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn analyze(&self, courses: &[Course]) -> FairnessReport {
        let thresholds = &self.policy.fairness;
        let mut bias_flags = Vec::new();

        let mut groups: BTreeMap<&str, Vec<&Course>> = BTreeMap::new();
        for course in courses {
            groups
                .entry(course.program_code.as_str())
                .or_default()
                .push(course);
        }

        let total = courses.len();
        let mut program_coverage = BTreeMap::new();
        for program in &self.policy.program_codes {
            let count = groups.get(program.as_str()).map_or(0, Vec::len);
            let percentage = if total == 0 {
                0.0
            } else {
                round2(count as f64 / total as f64 * 100.0)
            };
            program_coverage.insert(program.clone(), ProgramCoverage { count, percentage });

            if count == 0 {
                let flag = BiasFlag::new(
                    BiasKind::MissingProgram,
                    format!("{program} has no courses in dataset"),
                );
                tracing::error!("bias flag: {flag}");
                bias_flags.push(flag);
            } else if percentage < thresholds.low_coverage_pct {
                let flag = BiasFlag::new(
                    BiasKind::LowCoverage,
                    format!("{program} has only {percentage:.2}% of courses ({count} courses)"),
                );
                tracing::warn!("bias flag: {flag}");
                bias_flags.push(flag);
            }
        }

        let mut credit_distribution = BTreeMap::new();
        for (program, group) in &groups {
            let sum: i128 = group.iter().map(|c| i128::from(c.credits)).sum();
            let min = group.iter().map(|c| c.credits).min().unwrap_or(0);
            let max = group.iter().map(|c| c.credits).max().unwrap_or(0);
            credit_distribution.insert(
                program.to_string(),
                CreditDistribution {
                    avg_credits: round2(sum as f64 / group.len() as f64),
                    min_credits: min,
                    max_credits: max,
                },
            );
        }

        let averages = credit_distribution.values().map(|d| d.avg_credits);
        let lowest = averages.clone().fold(f64::INFINITY, f64::min);
        let highest = averages.fold(f64::NEG_INFINITY, f64::max);
        if !credit_distribution.is_empty() && highest - lowest > thresholds.credit_imbalance {
            let flag = BiasFlag::new(
                BiasKind::CreditImbalance,
                format!("credit average ranges from {lowest:.2} to {highest:.2} across programs"),
            );
            tracing::warn!("bias flag: {flag}");
            bias_flags.push(flag);
        }

        let (extended_metrics, omitted_metrics) = self.extended_metrics(&groups);

        tracing::info!("fairness analysis complete: {} flag(s)", bias_flags.len());
        FairnessReport {
            generated_at: Utc::now(),
            program_coverage,
            credit_distribution,
            bias_flags,
            extended_metrics,
            omitted_metrics,
        }
    }

    /// Best-effort metrics. Never fails; failures become omissions.
    fn extended_metrics(
        &self,
        groups: &BTreeMap<&str, Vec<&Course>>,
    ) -> (BTreeMap<String, BTreeMap<String, f64>>, Vec<String>) {
        let mut computed = BTreeMap::new();
        let mut omitted = Vec::new();

        for metric in &self.metrics {
            let by_group: Result<BTreeMap<String, f64>, MetricError> = if groups.is_empty() {
                Err(MetricError::EmptyInput)
            } else {
                groups
                    .iter()
                    .map(|(program, group)| {
                        metric
                            .compute(program, group)
                            .map(|value| (program.to_string(), value))
                    })
                    .collect()
            };

            match by_group {
                Ok(values) => {
                    tracing::info!("{} by program: {:?}", metric.name(), values);
                    computed.insert(metric.name().to_string(), values);
                }
                Err(e) => {
                    tracing::warn!("{} skipped: {e}", metric.name());
                    omitted.push(metric.name().to_string());
                }
            }
        }

        (computed, omitted)
    }
}

/// Analyze with the built-in metric set.
pub fn analyze_fairness(courses: &[Course], policy: &Policy) -> FairnessReport {
    FairnessAnalyzer::new(policy.clone()).analyze(courses)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course(code: &str, program: &str, credits: i64, kind: CourseType) -> Course {
        Course::new(code, code, credits, program, kind)
    }

    fn distribution(counts: &[(&str, usize)]) -> Vec<Course> {
        let mut out = Vec::new();
        for (program, n) in counts {
            for i in 0..*n {
                out.push(course(&format!("{program}-{i}"), program, 4, CourseType::Core));
            }
        }
        out
    }

    #[test]
    fn ten_percent_is_not_low_coverage() {
        let policy = Policy::with_programs(["MS_CS", "MS_DS"]);
        let report = analyze_fairness(&distribution(&[("MS_CS", 1), ("MS_DS", 9)]), &policy);

        assert_eq!(report.program_coverage["MS_CS"].percentage, 10.0);
        assert_eq!(report.program_coverage["MS_DS"].percentage, 90.0);
        assert!(report.bias_flags.is_empty());
    }

    #[test]
    fn absent_programs_are_missing_not_low() {
        let report = analyze_fairness(
            &distribution(&[("MS_CS", 1), ("MS_DS", 9)]),
            &Policy::default(),
        );
        let missing: Vec<_> = report.flags_of(BiasKind::MissingProgram).collect();
        assert_eq!(missing.len(), 3);
        assert!(missing[0].message.starts_with("MISSING_PROGRAM: "));
        assert_eq!(report.flags_of(BiasKind::LowCoverage).count(), 0);
        assert_eq!(report.program_coverage["MS_IS"].count, 0);
    }

    #[test]
    fn low_coverage_below_threshold() {
        let policy = Policy::with_programs(["MS_CS", "MS_DS"]);
        let report = analyze_fairness(&distribution(&[("MS_CS", 1), ("MS_DS", 19)]), &policy);
        let low: Vec<_> = report.flags_of(BiasKind::LowCoverage).collect();
        assert_eq!(low.len(), 1);
        assert!(low[0].message.contains("MS_CS"));
        assert!(low[0].message.contains("5.00%"));
    }

    #[test]
    fn empty_dataset_flags_every_program_missing() {
        let report = analyze_fairness(&[], &Policy::default());
        assert_eq!(report.flags_of(BiasKind::MissingProgram).count(), 5);
        assert!(report
            .program_coverage
            .values()
            .all(|c| c.percentage == 0.0));
        assert!(report.credit_distribution.is_empty());
        assert_eq!(report.omitted_metrics, vec!["course_count", "core_share"]);
    }

    #[test]
    fn credit_distribution_and_imbalance() {
        let policy = Policy::with_programs(["P1", "P2"]);
        let courses = vec![
            course("A", "P1", 4, CourseType::Core),
            course("B", "P1", 4, CourseType::Elective),
            course("C", "P2", 2, CourseType::Core),
            course("D", "P2", 3, CourseType::Core),
        ];
        let report = analyze_fairness(&courses, &policy);

        let p2 = &report.credit_distribution["P2"];
        assert_eq!(p2.avg_credits, 2.5);
        assert_eq!(p2.min_credits, 2);
        assert_eq!(p2.max_credits, 3);
        let imbalance: Vec<_> = report.flags_of(BiasKind::CreditImbalance).collect();
        assert_eq!(imbalance.len(), 1);
        assert!(imbalance[0].message.contains("2.50 to 4.00"));
    }

    #[test]
    fn gap_of_exactly_one_is_not_imbalance() {
        let policy = Policy::with_programs(["P1", "P2"]);
        let courses = vec![
            course("A", "P1", 4, CourseType::Core),
            course("B", "P2", 3, CourseType::Core),
        ];
        let report = analyze_fairness(&courses, &policy);
        assert_eq!(report.flags_of(BiasKind::CreditImbalance).count(), 0);
    }

    #[test]
    fn credit_sum_beyond_i64_is_averaged() {
        let courses = vec![
            course("A", "MS_CS", i64::MAX, CourseType::Core),
            course("B", "MS_CS", i64::MAX, CourseType::Core),
            course("C", "MS_DS", 4, CourseType::Core),
        ];
        let report = analyze_fairness(&courses, &Policy::with_programs(["MS_CS", "MS_DS"]));

        let cs = &report.credit_distribution["MS_CS"];
        assert_eq!(cs.avg_credits, i64::MAX as f64);
        assert_eq!(cs.max_credits, i64::MAX);
        assert_eq!(report.flags_of(BiasKind::CreditImbalance).count(), 1);
    }

    #[test]
    fn extended_metrics_by_program() {
        let policy = Policy::with_programs(["P1"]);
        let courses = vec![
            course("A", "P1", 4, CourseType::Core),
            course("B", "P1", 4, CourseType::Core),
            course("C", "P1", 4, CourseType::Elective),
            course("D", "P1", 4, CourseType::Elective),
        ];
        let report = analyze_fairness(&courses, &policy);
        assert_eq!(report.extended_metrics["core_share"]["P1"], 0.5);
        assert_eq!(report.extended_metrics["course_count"]["P1"], 4.0);
        assert!(report.omitted_metrics.is_empty());
    }

    struct Broken;

    impl GroupMetric for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn compute(&self, program: &str, _group: &[&Course]) -> Result<f64, MetricError> {
            Err(MetricError::Undefined {
                group: program.to_string(),
                reason: "always fails".into(),
            })
        }
    }

    #[test]
    fn failing_metric_is_omitted_not_fatal() {
        let policy = Policy::with_programs(["P1"]);
        let analyzer =
            FairnessAnalyzer::with_metrics(policy, vec![Box::new(Broken), Box::new(CoreShare)]);
        let report = analyzer.analyze(&[course("A", "P1", 4, CourseType::Core)]);

        assert_eq!(report.omitted_metrics, vec!["broken"]);
        assert!(report.extended_metrics.contains_key("core_share"));
        assert!(!report.extended_metrics.contains_key("broken"));
    }

    #[test]
    fn bias_flags_serialize_as_strings() {
        let report = analyze_fairness(&[], &Policy::with_programs(["P1"]));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(
            json["bias_flags"][0],
            "MISSING_PROGRAM: P1 has no courses in dataset"
        );

        let back: FairnessReport = serde_json::from_value(json).unwrap();
        assert_eq!(back.bias_flags[0].kind, BiasKind::MissingProgram);
    }

    #[test]
    fn unknown_flag_string_is_rejected() {
        assert!(BiasFlag::try_from("SOMETHING_ELSE: x".to_string()).is_err());
    }
}
