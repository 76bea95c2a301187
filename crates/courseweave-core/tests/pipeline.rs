use courseweave_core::config::Policy;
use courseweave_core::engine::{NoopObserver, QualityEngine};
use courseweave_core::error::EngineError;
use courseweave_core::fairness::BiasKind;
use courseweave_core::graph::find_cycles;
use courseweave_core::loader::load_dataset_dir;
use courseweave_core::model::{CompletionRecord, RawCourse, RawDataset, RawPrerequisite};
use courseweave_core::normalize::normalize;
use courseweave_core::report::{PipelineReport, RunStatus};
use courseweave_core::source::{InMemoryCompletions, JsonFileCompletions};
use courseweave_core::validate::{validate, Check};

fn raw_course(code: &str, credits: i64, program: &str, kind: &str) -> RawCourse {
    RawCourse {
        course_code: Some(code.into()),
        course_name: Some(format!("Course {code}")),
        credits: Some(credits),
        program_code: Some(program.into()),
        course_type: Some(kind.into()),
    }
}

fn raw_edge(from: &str, to: &str) -> RawPrerequisite {
    RawPrerequisite {
        course_code: Some(from.into()),
        required_course_code: Some(to.into()),
    }
}

#[test]
fn mutual_prerequisites_validate_but_form_a_cycle() {
    let policy = Policy::with_programs(["P1"]);
    let normalized = normalize(
        &[raw_course("A", 4, "P1", "Core"), raw_course("B", 4, "P1", "Core")],
        &[raw_edge("A", "B"), raw_edge("B", "A")],
        &policy,
    );

    let outcome = validate(&normalized.courses, &normalized.prerequisites, &policy);
    assert!(outcome.success, "{:?}", outcome.violations);

    let cycles = find_cycles(&normalized.courses, &normalized.prerequisites);
    let pairs: Vec<(&str, &str)> = cycles
        .iter()
        .map(|e| (e.course_code.as_str(), e.required_course_code.as_str()))
        .collect();
    assert_eq!(pairs, vec![("A", "B"), ("B", "A")]);
}

#[test]
fn null_name_row_is_dropped_and_others_untouched() {
    let policy = Policy::default();
    let mut nameless = raw_course("IE6700", 4, "MS_DAE", "Core");
    nameless.course_name = None;
    let courses = vec![
        raw_course("IE6400", 4, "MS_DAE", "Core"),
        nameless,
        raw_course("CS5800", 4, "MS_CS", "Elective"),
    ];

    let normalized = normalize(&courses, &[], &policy);
    let codes: Vec<&str> = normalized
        .courses
        .iter()
        .map(|c| c.course_code.as_str())
        .collect();
    assert_eq!(codes, vec!["IE6400", "CS5800"]);
    assert_eq!(normalized.courses[0].course_name, "Course IE6400");
    assert_eq!(normalized.courses[1].program_code, "MS_CS");
    assert_eq!(normalized.report.null_fields, 1);
}

#[tokio::test]
async fn mutual_prerequisites_end_to_end() {
    let engine = QualityEngine::new(Policy::with_programs(["P1"]));
    let dataset = RawDataset::new(
        vec![raw_course("A", 4, "P1", "Core"), raw_course("B", 4, "P1", "Core")],
        vec![raw_edge("A", "B"), raw_edge("B", "A")],
    );

    let outcome = engine
        .run(&dataset, &InMemoryCompletions::default(), &NoopObserver)
        .await
        .unwrap();
    assert_eq!(outcome.anomalies.circular_prerequisites.len(), 2);
    assert!(outcome.anomalies.missing_prerequisites.is_empty());

    let report = outcome.pipeline_report();
    assert_eq!(report.status, RunStatus::AnomaliesDetected);
    assert_eq!(report.anomalies.circular_count, 2);
}

#[tokio::test]
async fn self_reference_aborts_the_run() {
    let engine = QualityEngine::new(Policy::with_programs(["P1"]));
    let dataset = RawDataset::new(
        vec![raw_course("A", 4, "P1", "Core")],
        vec![raw_edge("A", "a")],
    );

    let err = engine
        .run(&dataset, &InMemoryCompletions::default(), &NoopObserver)
        .await
        .unwrap_err();
    let EngineError::Validation { count, violations } = &err else {
        panic!("expected a validation failure, got {err}");
    };
    assert_eq!(*count, 1);
    assert_eq!(violations[0].check, Check::NoSelfReference);
    assert_eq!(err.to_string(), "data validation failed with 1 violation(s)");
}

#[tokio::test]
async fn messy_directory_run() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("courses.json"),
        r#"[
            {"course_code": " ie6400 ", "course_name": "Foundations", "credits": 4, "program_code": "ms_dae", "course_type": "core"},
            {"course_code": "IE7275", "course_name": "Data Mining", "credits": "4", "program_code": "MS_DAE", "course_type": "Core"},
            {"course_code": "IE6400", "course_name": "Duplicate", "credits": 4, "program_code": "MS_DAE", "course_type": "Core"},
            {"course_code": "MBA6000", "course_name": "Strategy", "credits": 4, "program_code": "MBA", "course_type": "Core"},
            {"course_code": "CS5800", "course_name": "Algorithms", "credits": 4, "program_code": "MS_CS", "course_type": "Seminar"}
        ]"#,
    )
    .unwrap();
    std::fs::write(
        dir.path().join("prerequisites.json"),
        r#"[
            {"course_code": "IE7275", "required_course_code": "ie6400"},
            {"course_code": "IE7275", "required_course_code": "IE6400"},
            {"course_code": "IE7275", "required_course_code": "MBA6000"},
            {"course_code": null, "required_course_code": "IE6400"}
        ]"#,
    )
    .unwrap();
    let completions = dir.path().join("completions.json");
    std::fs::write(
        &completions,
        r#"[
            {"student_id": "s1", "course_code": "IE7275"},
            {"student_id": "s2", "course_code": "IE6400"},
            {"student_id": "s2", "course_code": "IE7275"}
        ]"#,
    )
    .unwrap();

    let dataset = load_dataset_dir(dir.path()).unwrap();
    let engine = QualityEngine::new(Policy::default());
    let outcome = engine
        .run(&dataset, &JsonFileCompletions::new(&completions), &NoopObserver)
        .await
        .unwrap();

    let report = &outcome.normalized.report;
    assert_eq!(report.courses_out, 2);
    assert_eq!(report.duplicate_codes, 1);
    assert_eq!(report.unknown_programs, 1);
    assert_eq!(report.unknown_types, 1);
    assert_eq!(report.prerequisites_out, 1);
    assert_eq!(report.duplicate_pairs, 1);
    assert_eq!(report.orphan_edges, 1);
    assert_eq!(report.null_endpoints, 1);

    let missing = &outcome.anomalies.missing_prerequisites;
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].student_id, "s1");
    assert_eq!(missing[0].missing_prereq, "IE6400");

    assert_eq!(
        outcome.fairness.flags_of(BiasKind::MissingProgram).count(),
        4
    );

    let dir_out = tempfile::tempdir().unwrap();
    let path = dir_out.path().join("pipeline_report.json");
    outcome.pipeline_report().save_json(&path).unwrap();
    let loaded = PipelineReport::load_json(&path).unwrap();
    assert_eq!(loaded.status, RunStatus::AnomaliesDetected);
    assert_eq!(loaded.data_stats.courses.total_courses, 2);
}

#[tokio::test]
async fn completions_are_optional() {
    let engine = QualityEngine::new(Policy::with_programs(["P1"])).with_parallel(false);
    let dataset = RawDataset::new(
        vec![raw_course("A", 4, "P1", "Core"), raw_course("B", 4, "P1", "Elective")],
        vec![raw_edge("B", "A")],
    );
    let completions = InMemoryCompletions::new(vec![CompletionRecord::new("s1", "A")]);

    let outcome = engine.run(&dataset, &completions, &NoopObserver).await.unwrap();
    assert!(!outcome.has_hard_anomalies());
    assert_eq!(outcome.pipeline_report().status, RunStatus::Success);
}
