//! Pipeline orchestrator.
//!
//! Runs normalization and validation in order, then fans the three analyses
//! (cycle detection, completion audit, fairness) out to the blocking pool and
//! joins them before computing statistics. Validation failure stops the run.
//! Anomalies and bias flags are returned as values.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::audit::{find_missing_prerequisites, AnomalyResult};
use crate::config::{CourseweaveConfig, Policy};
use crate::error::EngineError;
use crate::fairness::{FairnessAnalyzer, FairnessReport};
use crate::graph::find_cycles;
use crate::model::{
    Course, PrerequisiteEdge, RawCourse, RawDataset, RawPrerequisite, RecordSet,
};
use crate::normalize::{normalize, Normalized};
use crate::report::PipelineReport;
use crate::source::CompletionSource;
use crate::statistics::{generate_statistics, StatisticsReport};
use crate::validate::{validate_records, ValidationOutcome, Violation};

/// Pipeline stages, in execution order. The three analysis stages run
/// concurrently when the engine is parallel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Normalize,
    Validate,
    FetchCompletions,
    DetectCycles,
    AuditCompletions,
    AnalyzeFairness,
    Statistics,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Normalize => "normalize",
            Stage::Validate => "validate",
            Stage::FetchCompletions => "fetch-completions",
            Stage::DetectCycles => "detect-cycles",
            Stage::AuditCompletions => "audit-completions",
            Stage::AnalyzeFairness => "analyze-fairness",
            Stage::Statistics => "statistics",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stage callbacks. This is where a caller hangs alerting.
pub trait PipelineObserver: Send + Sync {
    fn on_stage_start(&self, stage: Stage);
    fn on_stage_complete(&self, stage: Stage, summary: &str);
    fn on_validation_failed(&self, violations: &[Violation]);
    fn on_run_complete(&self, outcome: &PipelineOutcome);
}

/// Observer that ignores everything.
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {
    fn on_stage_start(&self, _: Stage) {}
    fn on_stage_complete(&self, _: Stage, _: &str) {}
    fn on_validation_failed(&self, _: &[Violation]) {}
    fn on_run_complete(&self, _: &PipelineOutcome) {}
}

/// Everything a successful run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineOutcome {
    pub run_id: Uuid,
    pub normalized: Normalized,
    pub anomalies: AnomalyResult,
    pub fairness: FairnessReport,
    pub statistics: StatisticsReport,
    pub duration_ms: u64,
}

impl PipelineOutcome {
    pub fn has_hard_anomalies(&self) -> bool {
        !self.anomalies.is_clean()
    }

    pub fn pipeline_report(&self) -> PipelineReport {
        PipelineReport::new(
            self.run_id,
            &self.normalized.report,
            &self.statistics,
            &self.anomalies,
            &self.fairness,
        )
    }
}

/// The data-quality engine. Holds only the immutable policy; every run
/// rebuilds its state from the inputs.
pub struct QualityEngine {
    policy: Arc<Policy>,
    fairness: Arc<FairnessAnalyzer>,
    parallel: bool,
}

impl QualityEngine {
    pub fn new(policy: Policy) -> Self {
        let fairness = FairnessAnalyzer::new(policy.clone());
        Self {
            policy: Arc::new(policy),
            fairness: Arc::new(fairness),
            parallel: true,
        }
    }

    pub fn from_config(config: &CourseweaveConfig) -> Self {
        Self::new(config.policy.clone()).with_parallel(config.parallel)
    }

    /// Replace the fairness analyzer, e.g. to plug in extra metrics. The
    /// analyzer carries its own policy.
    pub fn with_fairness(mut self, analyzer: FairnessAnalyzer) -> Self {
        self.fairness = Arc::new(analyzer);
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Normalize and validate without running the analyses.
    pub fn check(&self, dataset: &RawDataset) -> (Normalized, ValidationOutcome) {
        let normalized = normalize(&dataset.courses.rows, &dataset.prerequisites.rows, &self.policy);
        let validation = self.validate_snapshot(dataset, &normalized);
        (normalized, validation)
    }

    /// Run the full pipeline over one snapshot.
    pub async fn run(
        &self,
        dataset: &RawDataset,
        completions: &dyn CompletionSource,
        observer: &dyn PipelineObserver,
    ) -> Result<PipelineOutcome, EngineError> {
        let start = Instant::now();
        let run_id = Uuid::new_v4();
        tracing::info!("starting run {run_id}");

        observer.on_stage_start(Stage::Normalize);
        let normalized = normalize(&dataset.courses.rows, &dataset.prerequisites.rows, &self.policy);
        observer.on_stage_complete(
            Stage::Normalize,
            &format!(
                "{} courses, {} prerequisites kept",
                normalized.courses.len(),
                normalized.prerequisites.len()
            ),
        );

        observer.on_stage_start(Stage::Validate);
        let validation = self.validate_snapshot(dataset, &normalized);
        if !validation.success {
            observer.on_validation_failed(&validation.violations);
        }
        validation.into_result()?;
        observer.on_stage_complete(Stage::Validate, "all checks passed");

        observer.on_stage_start(Stage::FetchCompletions);
        let records = completions
            .fetch()
            .await
            .map_err(|e| EngineError::CompletionSource {
                source_name: completions.name().to_string(),
                message: format!("{e:#}"),
            })?;
        observer.on_stage_complete(
            Stage::FetchCompletions,
            &format!("{} records from {}", records.len(), completions.name()),
        );

        for stage in [Stage::DetectCycles, Stage::AuditCompletions, Stage::AnalyzeFairness] {
            observer.on_stage_start(stage);
        }
        let courses: Arc<[Course]> = normalized.courses.clone().into();
        let prereqs: Arc<[PrerequisiteEdge]> = normalized.prerequisites.clone().into();
        let (circular, missing, fairness) = if self.parallel {
            let cycles = {
                let courses = Arc::clone(&courses);
                let prereqs = Arc::clone(&prereqs);
                tokio::task::spawn_blocking(move || find_cycles(&courses, &prereqs))
            };
            let audit = {
                let prereqs = Arc::clone(&prereqs);
                tokio::task::spawn_blocking(move || find_missing_prerequisites(&records, &prereqs))
            };
            let fairness = {
                let analyzer = Arc::clone(&self.fairness);
                let courses = Arc::clone(&courses);
                tokio::task::spawn_blocking(move || analyzer.analyze(&courses))
            };
            tokio::try_join!(cycles, audit, fairness)?
        } else {
            (
                find_cycles(&courses, &prereqs),
                find_missing_prerequisites(&records, &prereqs),
                self.fairness.analyze(&courses),
            )
        };
        observer.on_stage_complete(
            Stage::DetectCycles,
            &format!("{} cyclic edge(s)", circular.len()),
        );
        observer.on_stage_complete(
            Stage::AuditCompletions,
            &format!("{} missing prerequisite(s)", missing.len()),
        );
        observer.on_stage_complete(
            Stage::AnalyzeFairness,
            &format!("{} bias flag(s)", fairness.bias_flags.len()),
        );

        observer.on_stage_start(Stage::Statistics);
        let statistics = generate_statistics(&normalized.courses, &normalized.prerequisites);
        observer.on_stage_complete(
            Stage::Statistics,
            &format!("{} courses", statistics.courses.total_courses),
        );

        let outcome = PipelineOutcome {
            run_id,
            normalized,
            anomalies: AnomalyResult {
                missing_prerequisites: missing,
                circular_prerequisites: circular,
            },
            fairness,
            statistics,
            duration_ms: start.elapsed().as_millis() as u64,
        };

        if outcome.has_hard_anomalies() {
            tracing::error!(
                "run {run_id} finished with {} hard anomalies",
                outcome.anomalies.hard_anomaly_count()
            );
        } else {
            tracing::info!("run {run_id} finished clean in {}ms", outcome.duration_ms);
        }
        observer.on_run_complete(&outcome);
        Ok(outcome)
    }

    /// Validate the canonical rows under the column set the raw input carried,
    /// so a column missing from the source is still reported.
    fn validate_snapshot(&self, dataset: &RawDataset, normalized: &Normalized) -> ValidationOutcome {
        let courses = RecordSet::new(
            dataset.courses.columns.iter().cloned(),
            normalized.courses.iter().map(RawCourse::from).collect(),
        );
        let prereqs = RecordSet::new(
            dataset.prerequisites.columns.iter().cloned(),
            normalized
                .prerequisites
                .iter()
                .map(RawPrerequisite::from)
                .collect(),
        );
        validate_records(&courses, &prereqs, &self.policy)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::model::CompletionRecord;
    use crate::source::InMemoryCompletions;

    fn course(code: &str) -> RawCourse {
        RawCourse {
            course_code: Some(code.into()),
            course_name: Some(format!("course {code}")),
            credits: Some(4),
            program_code: Some("P1".into()),
            course_type: Some("Core".into()),
        }
    }

    fn edge(from: &str, to: &str) -> RawPrerequisite {
        RawPrerequisite {
            course_code: Some(from.into()),
            required_course_code: Some(to.into()),
        }
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl PipelineObserver for Recorder {
        fn on_stage_start(&self, stage: Stage) {
            self.events.lock().unwrap().push(format!("start {stage}"));
        }
        fn on_stage_complete(&self, stage: Stage, _: &str) {
            self.events.lock().unwrap().push(format!("done {stage}"));
        }
        fn on_validation_failed(&self, violations: &[Violation]) {
            self.events
                .lock()
                .unwrap()
                .push(format!("failed {}", violations.len()));
        }
        fn on_run_complete(&self, _: &PipelineOutcome) {
            self.events.lock().unwrap().push("complete".into());
        }
    }

    #[tokio::test]
    async fn clean_run() {
        let engine = QualityEngine::new(Policy::with_programs(["P1"]));
        let dataset = RawDataset::new(vec![course("A"), course("B")], vec![edge("B", "A")]);
        let completions =
            InMemoryCompletions::new(vec![CompletionRecord::new("s1", "A"), CompletionRecord::new("s1", "B")]);

        let outcome = engine.run(&dataset, &completions, &NoopObserver).await.unwrap();
        assert!(!outcome.has_hard_anomalies());
        assert_eq!(outcome.statistics.courses.total_courses, 2);
        assert!(outcome.fairness.bias_flags.is_empty());
    }

    #[tokio::test]
    async fn sequential_matches_parallel() {
        let dataset = RawDataset::new(
            vec![course("A"), course("B")],
            vec![edge("A", "B"), edge("B", "A")],
        );
        let completions = InMemoryCompletions::new(vec![CompletionRecord::new("s1", "A")]);

        let parallel = QualityEngine::new(Policy::with_programs(["P1"]));
        let sequential = QualityEngine::new(Policy::with_programs(["P1"])).with_parallel(false);
        let a = parallel.run(&dataset, &completions, &NoopObserver).await.unwrap();
        let b = sequential.run(&dataset, &completions, &NoopObserver).await.unwrap();
        assert_eq!(a.anomalies, b.anomalies);
        assert_eq!(a.anomalies.circular_prerequisites.len(), 2);
        assert_eq!(a.anomalies.missing_prerequisites.len(), 1);
    }

    #[tokio::test]
    async fn observer_sees_every_stage() {
        let engine = QualityEngine::new(Policy::with_programs(["P1"]));
        let dataset = RawDataset::new(vec![course("A")], vec![]);
        let recorder = Recorder::default();
        engine
            .run(&dataset, &InMemoryCompletions::default(), &recorder)
            .await
            .unwrap();

        let events = recorder.events.into_inner().unwrap();
        assert_eq!(events.first().map(String::as_str), Some("start normalize"));
        assert_eq!(events.last().map(String::as_str), Some("complete"));
        assert!(events.contains(&"done detect-cycles".to_string()));
        assert_eq!(events.iter().filter(|e| e.starts_with("done ")).count(), 7);
    }

    #[tokio::test]
    async fn missing_source_column_fails_validation() {
        let engine = QualityEngine::new(Policy::with_programs(["P1"]));
        let mut dataset = RawDataset::new(vec![course("A")], vec![]);
        dataset.courses.columns.remove("course_type");
        let recorder = Recorder::default();

        let err = engine
            .run(&dataset, &InMemoryCompletions::default(), &recorder)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation { count: 1, .. }));
        let events = recorder.events.into_inner().unwrap();
        assert_eq!(events.last().map(String::as_str), Some("failed 1"));
    }

    struct Unreachable;

    #[async_trait::async_trait]
    impl CompletionSource for Unreachable {
        fn name(&self) -> &str {
            "students-db"
        }
        async fn fetch(&self) -> anyhow::Result<Vec<CompletionRecord>> {
            anyhow::bail!("timed out")
        }
    }

    #[tokio::test]
    async fn source_failure_is_reported() {
        let engine = QualityEngine::new(Policy::with_programs(["P1"]));
        let dataset = RawDataset::new(vec![course("A")], vec![]);
        let err = engine.run(&dataset, &Unreachable, &NoopObserver).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "completion source 'students-db' failed: timed out"
        );
    }

    #[tokio::test]
    async fn huge_credit_values_do_not_overflow() {
        let mut a = course("A");
        let mut b = course("B");
        a.credits = Some(5_000_000_000_000_000_000);
        b.credits = Some(5_000_000_000_000_000_000);
        let dataset = RawDataset::new(vec![a, b], vec![]);

        let engine = QualityEngine::new(Policy::with_programs(["P1"])).with_parallel(false);
        let outcome = engine
            .run(&dataset, &InMemoryCompletions::default(), &NoopObserver)
            .await
            .unwrap();
        assert_eq!(outcome.statistics.courses.avg_credits, 5e18);
        assert_eq!(outcome.fairness.credit_distribution["P1"].avg_credits, 5e18);
        assert!(outcome.fairness.bias_flags.is_empty());
    }

    #[test]
    fn check_only_normalizes_and_validates() {
        let engine = QualityEngine::new(Policy::with_programs(["P1"]));
        let dataset = RawDataset::new(vec![course("A"), course("a")], vec![]);
        let (normalized, validation) = engine.check(&dataset);
        assert!(validation.success);
        assert_eq!(normalized.report.duplicate_codes, 1);
    }
}
