//! The `courseweave run` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use courseweave_core::config::load_config_from;
use courseweave_core::engine::{PipelineObserver, PipelineOutcome, QualityEngine, Stage};
use courseweave_core::loader;
use courseweave_core::report::save_json;
use courseweave_core::source::{CompletionSource, InMemoryCompletions, JsonFileCompletions};
use courseweave_core::validate::Violation;
use courseweave_report::html::write_html_report;

use super::DataArgs;

const FORMATS: [&str; 3] = ["json", "html", "markdown"];

/// Console stage reporter.
struct ConsoleObserver;

impl PipelineObserver for ConsoleObserver {
    fn on_stage_start(&self, stage: Stage) {
        eprintln!("  Starting: {stage}");
    }

    fn on_stage_complete(&self, stage: Stage, summary: &str) {
        eprintln!("  Done: {stage} ({summary})");
    }

    fn on_validation_failed(&self, violations: &[Violation]) {
        eprintln!("\nValidation failed:");
        for v in violations {
            eprintln!("  {v}");
        }
    }

    fn on_run_complete(&self, outcome: &PipelineOutcome) {
        eprintln!("\nComplete: run {} ({}ms)", outcome.run_id, outcome.duration_ms);
    }
}

pub async fn execute(
    data: DataArgs,
    completions: Option<PathBuf>,
    output: Option<PathBuf>,
    format: String,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let formats: Vec<&str> = if format == "all" {
        FORMATS.to_vec()
    } else {
        format.split(',').map(str::trim).collect()
    };
    if let Some(unknown) = formats.iter().find(|f| !FORMATS.contains(*f)) {
        anyhow::bail!("unknown format '{unknown}' (expected json, html, markdown or all)");
    }

    let config = load_config_from(config_path.as_deref())?;
    let paths = data.resolve()?;
    let dataset = loader::load_dataset(&paths)?;

    let source: Box<dyn CompletionSource> = match completions.or(paths.completions) {
        Some(path) => Box::new(JsonFileCompletions::new(path)),
        None => Box::new(InMemoryCompletions::default()),
    };

    eprintln!(
        "Running pipeline over {} course rows and {} prerequisite rows\n",
        dataset.courses.len(),
        dataset.prerequisites.len()
    );

    let engine = QualityEngine::from_config(&config);
    let outcome = engine.run(&dataset, source.as_ref(), &ConsoleObserver).await?;

    print_summary(&outcome);

    let output = output.unwrap_or_else(|| config.output_dir.clone());
    std::fs::create_dir_all(&output)?;
    let report = outcome.pipeline_report();

    for fmt in &formats {
        match *fmt {
            "json" => {
                save_json(&outcome.statistics, &output.join("stats_report.json"))?;
                save_json(&outcome.fairness, &output.join("bias_report.json"))?;
                save_json(&outcome.anomalies, &output.join("anomaly_report.json"))?;
                let path = output.join("pipeline_report.json");
                report.save_json(&path)?;
                eprintln!("Reports saved to: {}", output.display());
            }
            "html" => {
                let path = output.join("pipeline_report.html");
                write_html_report(&outcome, &path)?;
                eprintln!("HTML report: {}", path.display());
            }
            "markdown" => {
                let path = output.join("pipeline_report.md");
                std::fs::write(&path, report.to_markdown())
                    .with_context(|| format!("failed to write {}", path.display()))?;
                eprintln!("Markdown summary: {}", path.display());
            }
            _ => {}
        }
    }

    if outcome.has_hard_anomalies() {
        anyhow::bail!(
            "{} hard anomalies detected ({} circular edges, {} missing prerequisites)",
            outcome.anomalies.hard_anomaly_count(),
            report.anomalies.circular_count,
            report.anomalies.missing_count
        );
    }

    Ok(())
}

fn print_summary(outcome: &PipelineOutcome) {
    use comfy_table::{Cell, Table};

    let stats = &outcome.statistics;
    let norm = &outcome.normalized.report;

    let mut table = Table::new();
    table.set_header(vec!["Program", "Courses", "Share", "Avg credits"]);
    for (program, coverage) in &outcome.fairness.program_coverage {
        let avg = outcome
            .fairness
            .credit_distribution
            .get(program)
            .map(|d| format!("{:.2}", d.avg_credits))
            .unwrap_or_else(|| "-".into());
        table.add_row(vec![
            Cell::new(program),
            Cell::new(coverage.count),
            Cell::new(format!("{:.2}%", coverage.percentage)),
            Cell::new(avg),
        ]);
    }
    println!("\n{table}");

    println!(
        "Courses: {} kept, {} dropped | Prerequisites: {} kept, {} dropped",
        stats.courses.total_courses,
        norm.courses_dropped(),
        stats.prerequisites.total_prereq_pairs,
        norm.prerequisites_dropped()
    );
    println!(
        "Anomalies: {} circular edge(s), {} missing prerequisite(s)",
        outcome.anomalies.circular_prerequisites.len(),
        outcome.anomalies.missing_prerequisites.len()
    );
    for edge in &outcome.anomalies.circular_prerequisites {
        println!("  cycle: {edge}");
    }
    for m in &outcome.anomalies.missing_prerequisites {
        println!(
            "  missing: {} completed {} without {}",
            m.student_id, m.enrolled_course, m.missing_prereq
        );
    }
    if outcome.fairness.bias_flags.is_empty() {
        println!("Bias flags: none");
    } else {
        println!("Bias flags:");
        for flag in &outcome.fairness.bias_flags {
            println!("  {flag}");
        }
    }
}
