//! Run summary report with JSON persistence and a markdown rendering.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::audit::AnomalyResult;
use crate::fairness::{BiasFlag, FairnessReport};
use crate::normalize::NormalizationReport;
use crate::statistics::StatisticsReport;

/// Serialize any report as pretty JSON, creating parent directories.
pub fn save_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to serialize report")?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, json)
        .with_context(|| format!("failed to write report to {}", path.display()))?;
    Ok(())
}

/// Load a report previously written with [`save_json`].
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read report from {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse report JSON in {}", path.display()))
}

/// Overall outcome of a run that got past validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Success,
    AnomaliesDetected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnomalySummary {
    pub missing_count: usize,
    pub circular_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BiasSummary {
    pub flags_count: usize,
    pub flags: Vec<BiasFlag>,
}

/// One-page summary of a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub id: Uuid,
    pub pipeline_run_at: DateTime<Utc>,
    pub status: RunStatus,
    pub normalization: NormalizationReport,
    pub data_stats: StatisticsReport,
    pub anomalies: AnomalySummary,
    pub bias_summary: BiasSummary,
}

impl PipelineReport {
    pub fn new(
        id: Uuid,
        normalization: &NormalizationReport,
        stats: &StatisticsReport,
        anomalies: &AnomalyResult,
        fairness: &FairnessReport,
    ) -> Self {
        let status = if anomalies.is_clean() {
            RunStatus::Success
        } else {
            RunStatus::AnomaliesDetected
        };
        Self {
            id,
            pipeline_run_at: Utc::now(),
            status,
            normalization: normalization.clone(),
            data_stats: stats.clone(),
            anomalies: AnomalySummary {
                missing_count: anomalies.missing_prerequisites.len(),
                circular_count: anomalies.circular_prerequisites.len(),
            },
            bias_summary: BiasSummary {
                flags_count: fairness.bias_flags.len(),
                flags: fairness.bias_flags.clone(),
            },
        }
    }

    pub fn save_json(&self, path: &Path) -> Result<()> {
        save_json(self, path)
    }

    pub fn load_json(path: &Path) -> Result<Self> {
        load_json(path)
    }

    /// Markdown summary suitable for an alert body.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();
        let status = match self.status {
            RunStatus::Success => "SUCCESS",
            RunStatus::AnomaliesDetected => "ANOMALIES DETECTED",
        };

        md.push_str(&format!("## Courseweave run {status}\n\n"));
        md.push_str(&format!(
            "**Run:** `{}` at {}\n\n",
            self.id,
            self.pipeline_run_at.format("%Y-%m-%d %H:%M UTC")
        ));

        md.push_str("| Metric | Value |\n");
        md.push_str("|--------|-------|\n");
        md.push_str(&format!(
            "| Courses | {} ({} dropped) |\n",
            self.data_stats.courses.total_courses,
            self.normalization.courses_dropped()
        ));
        md.push_str(&format!(
            "| Prerequisite pairs | {} ({} dropped) |\n",
            self.data_stats.prerequisites.total_prereq_pairs,
            self.normalization.prerequisites_dropped()
        ));
        md.push_str(&format!(
            "| Missing prerequisites | {} |\n",
            self.anomalies.missing_count
        ));
        md.push_str(&format!(
            "| Circular edges | {} |\n",
            self.anomalies.circular_count
        ));
        md.push_str(&format!("| Bias flags | {} |\n", self.bias_summary.flags_count));

        if !self.bias_summary.flags.is_empty() {
            md.push_str("\n### Bias flags\n\n");
            for flag in &self.bias_summary.flags {
                md.push_str(&format!("- {flag}\n"));
            }
        }

        md
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Policy;
    use crate::fairness::analyze_fairness;
    use crate::model::{Course, CourseType, PrerequisiteEdge};
    use crate::statistics::generate_statistics;

    fn make_report(anomalies: AnomalyResult) -> PipelineReport {
        let courses = vec![
            Course::new("A", "A", 4, "P1", CourseType::Core),
            Course::new("B", "B", 4, "P1", CourseType::Core),
        ];
        let prereqs = vec![PrerequisiteEdge::new("B", "A")];
        let policy = Policy::with_programs(["P1", "P2"]);
        PipelineReport::new(
            Uuid::nil(),
            &NormalizationReport::default(),
            &generate_statistics(&courses, &prereqs),
            &anomalies,
            &analyze_fairness(&courses, &policy),
        )
    }

    #[test]
    fn status_follows_anomalies() {
        assert_eq!(make_report(AnomalyResult::default()).status, RunStatus::Success);

        let anomalies = AnomalyResult {
            missing_prerequisites: vec![],
            circular_prerequisites: vec![PrerequisiteEdge::new("A", "A")],
        };
        let report = make_report(anomalies);
        assert_eq!(report.status, RunStatus::AnomaliesDetected);
        assert_eq!(report.anomalies.circular_count, 1);
    }

    #[test]
    fn status_serializes_screaming() {
        let json = serde_json::to_value(make_report(AnomalyResult::default())).unwrap();
        assert_eq!(json["status"], "SUCCESS");
        assert_eq!(json["bias_summary"]["flags_count"], 1);
        assert_eq!(
            json["bias_summary"]["flags"][0],
            "MISSING_PROGRAM: P2 has no courses in dataset"
        );
    }

    #[test]
    fn json_roundtrip() {
        let report = make_report(AnomalyResult::default());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("pipeline_report.json");

        report.save_json(&path).unwrap();
        let loaded = PipelineReport::load_json(&path).unwrap();
        assert_eq!(loaded, report);
    }

    #[test]
    fn load_missing_file_has_context() {
        let err = load_json::<PipelineReport>(Path::new("/nonexistent/report.json")).unwrap_err();
        assert!(format!("{err:#}").contains("failed to read report"));
    }

    #[test]
    fn markdown_output() {
        let md = make_report(AnomalyResult::default()).to_markdown();
        assert!(md.contains("SUCCESS"));
        assert!(md.contains("| Courses | 2 (0 dropped) |"));
        assert!(md.contains("MISSING_PROGRAM: P2"));
    }
}
