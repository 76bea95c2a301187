//! The `courseweave validate` command.

use std::path::PathBuf;

use anyhow::Result;

use courseweave_core::config::load_config_from;
use courseweave_core::engine::QualityEngine;
use courseweave_core::loader;

use super::DataArgs;

pub fn execute(data: DataArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let paths = data.resolve()?;
    let dataset = loader::load_dataset(&paths)?;

    let engine = QualityEngine::from_config(&config);
    let (normalized, validation) = engine.check(&dataset);
    let report = &normalized.report;

    println!(
        "Courses: {} rows, {} kept ({} dropped)",
        report.courses_in,
        report.courses_out,
        report.courses_dropped()
    );
    let course_drops = [
        ("null field", report.null_fields),
        ("duplicate code", report.duplicate_codes),
        ("unknown program", report.unknown_programs),
        ("unknown type", report.unknown_types),
    ];
    for (reason, count) in course_drops.iter().filter(|(_, n)| *n > 0) {
        println!("  {reason}: {count}");
    }
    if !report.rejected_programs.is_empty() {
        println!("  rejected programs: {:?}", report.rejected_programs);
    }
    if !report.rejected_types.is_empty() {
        println!("  rejected types: {:?}", report.rejected_types);
    }
    if report.credit_deviations > 0 {
        println!(
            "  WARNING: {} course(s) deviate from {} credits",
            report.credit_deviations,
            engine.policy().expected_credits
        );
    }

    println!(
        "Prerequisites: {} rows, {} kept ({} dropped)",
        report.prerequisites_in,
        report.prerequisites_out,
        report.prerequisites_dropped()
    );
    let edge_drops = [
        ("null endpoint", report.null_endpoints),
        ("duplicate pair", report.duplicate_pairs),
        ("unknown course", report.orphan_edges),
    ];
    for (reason, count) in edge_drops.iter().filter(|(_, n)| *n > 0) {
        println!("  {reason}: {count}");
    }

    if validation.success {
        println!("All validation checks passed.");
    } else {
        println!();
        for v in &validation.violations {
            println!("  VIOLATION {v}");
        }
    }
    validation.into_result()?;
    Ok(())
}
