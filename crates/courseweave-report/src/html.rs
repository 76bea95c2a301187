//! HTML report generator.
//!
//! Produces a self-contained HTML file with all CSS/JS inlined.

use std::path::Path;

use anyhow::{Context, Result};

use courseweave_core::engine::PipelineOutcome;
use courseweave_core::fairness::ProgramCoverage;
use courseweave_core::report::RunStatus;

/// Escape a string for safe HTML insertion.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Generate an HTML report from a pipeline outcome.
pub fn generate_html(outcome: &PipelineOutcome) -> String {
    let report = outcome.pipeline_report();
    let norm = &outcome.normalized.report;
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str(&format!(
        "<title>courseweave run {}</title>\n",
        outcome.run_id
    ));
    html.push_str("<style>\n");
    html.push_str(CSS);
    html.push_str("</style>\n");
    html.push_str("</head>\n<body>\n");

    let (status_class, status_text) = match report.status {
        RunStatus::Success => ("pass", "SUCCESS"),
        RunStatus::AnomaliesDetected => ("fail", "ANOMALIES DETECTED"),
    };
    html.push_str("<header>\n");
    html.push_str("<h1>courseweave report</h1>\n");
    html.push_str(&format!(
        "<p class=\"meta\">Run <code>{}</code> | {} | {}ms | <span class=\"badge {}\">{}</span></p>\n",
        outcome.run_id,
        report.pipeline_run_at.format("%Y-%m-%d %H:%M:%S UTC"),
        outcome.duration_ms,
        status_class,
        status_text
    ));
    html.push_str("</header>\n");

    html.push_str("<section class=\"dashboard\">\n");
    html.push_str("<h2>Summary</h2>\n");
    html.push_str("<table class=\"summary\">\n");
    html.push_str("<thead><tr><th>Metric</th><th>Value</th></tr></thead>\n<tbody>\n");
    let rows = [
        ("Courses kept", format!("{} of {}", norm.courses_out, norm.courses_in)),
        (
            "Prerequisites kept",
            format!("{} of {}", norm.prerequisites_out, norm.prerequisites_in),
        ),
        ("Average credits", format!("{:.2}", outcome.statistics.courses.avg_credits)),
        (
            "Most required course",
            outcome
                .statistics
                .prerequisites
                .most_required_course
                .clone()
                .unwrap_or_else(|| "-".into()),
        ),
        ("Circular edges", report.anomalies.circular_count.to_string()),
        ("Missing prerequisites", report.anomalies.missing_count.to_string()),
        ("Bias flags", report.bias_summary.flags_count.to_string()),
    ];
    for (label, value) in rows {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td></tr>\n",
            label,
            html_escape(&value)
        ));
    }
    html.push_str("</tbody></table>\n");
    html.push_str("</section>\n");

    html.push_str("<section class=\"normalization\">\n");
    html.push_str("<h2>Normalization</h2>\n");
    html.push_str("<table>\n<thead><tr><th>Dropped</th><th>Rows</th></tr></thead>\n<tbody>\n");
    let drops = [
        ("Courses with a null field", norm.null_fields),
        ("Duplicate course codes", norm.duplicate_codes),
        ("Unknown programs", norm.unknown_programs),
        ("Unknown course types", norm.unknown_types),
        ("Prerequisites with a null endpoint", norm.null_endpoints),
        ("Duplicate prerequisite pairs", norm.duplicate_pairs),
        ("Prerequisites on unknown courses", norm.orphan_edges),
    ];
    for (label, count) in drops {
        let class = if count > 0 { " class=\"warn\"" } else { "" };
        html.push_str(&format!("<tr{class}><td>{label}</td><td>{count}</td></tr>\n"));
    }
    html.push_str("</tbody></table>\n");
    if norm.credit_deviations > 0 {
        html.push_str(&format!(
            "<p class=\"meta\">{} kept course(s) carry non-standard credits.</p>\n",
            norm.credit_deviations
        ));
    }
    html.push_str("</section>\n");

    html.push_str("<section class=\"fairness\">\n");
    html.push_str("<h2>Program coverage</h2>\n");
    if !outcome.fairness.program_coverage.is_empty() {
        html.push_str(&generate_bar_chart(&outcome.fairness.program_coverage));
    }
    html.push_str("<table>\n<thead><tr><th>Program</th><th>Courses</th><th>Share</th><th>Avg credits</th><th>Min</th><th>Max</th></tr></thead>\n<tbody>\n");
    for (program, coverage) in &outcome.fairness.program_coverage {
        let credits = outcome.fairness.credit_distribution.get(program);
        let cell = |value: Option<String>| value.unwrap_or_else(|| "-".into());
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{:.2}%</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            html_escape(program),
            coverage.count,
            coverage.percentage,
            cell(credits.map(|d| format!("{:.2}", d.avg_credits))),
            cell(credits.map(|d| d.min_credits.to_string())),
            cell(credits.map(|d| d.max_credits.to_string())),
        ));
    }
    html.push_str("</tbody></table>\n");
    if !report.bias_summary.flags.is_empty() {
        html.push_str("<h3>Bias flags</h3>\n<ul class=\"flags\">\n");
        for flag in &report.bias_summary.flags {
            html.push_str(&format!("<li>{}</li>\n", html_escape(&flag.message)));
        }
        html.push_str("</ul>\n");
    }
    html.push_str("</section>\n");

    html.push_str("<section class=\"anomalies\">\n");
    html.push_str("<h2>Anomalies</h2>\n");
    if outcome.anomalies.is_clean() {
        html.push_str("<p class=\"pass\">No circular prerequisites or missing prerequisites.</p>\n");
    }
    if !outcome.anomalies.circular_prerequisites.is_empty() {
        html.push_str("<h3>Circular prerequisites</h3>\n");
        html.push_str("<table>\n<thead><tr><th>Course</th><th>Requires</th></tr></thead>\n<tbody>\n");
        for edge in &outcome.anomalies.circular_prerequisites {
            html.push_str(&format!(
                "<tr class=\"fail\"><td>{}</td><td>{}</td></tr>\n",
                html_escape(&edge.course_code),
                html_escape(&edge.required_course_code)
            ));
        }
        html.push_str("</tbody></table>\n");
    }
    if !outcome.anomalies.missing_prerequisites.is_empty() {
        html.push_str("<h3>Missing prerequisites</h3>\n");
        html.push_str("<table class=\"results-table\" id=\"missing\">\n");
        html.push_str("<thead><tr><th onclick=\"sortTable(0)\">Student</th><th onclick=\"sortTable(1)\">Completed</th><th onclick=\"sortTable(2)\">Missing</th></tr></thead>\n<tbody>\n");
        for m in &outcome.anomalies.missing_prerequisites {
            html.push_str(&format!(
                "<tr class=\"fail\"><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                html_escape(&m.student_id),
                html_escape(&m.enrolled_course),
                html_escape(&m.missing_prereq)
            ));
        }
        html.push_str("</tbody></table>\n");
    }
    html.push_str("</section>\n");

    html.push_str("<section class=\"raw-data\">\n");
    html.push_str("<details>\n<summary>Raw JSON Data</summary>\n");
    html.push_str("<pre><code>");
    html.push_str(
        &serde_json::to_string_pretty(&report)
            .unwrap_or_default()
            .replace('<', "&lt;")
            .replace('>', "&gt;"),
    );
    html.push_str("</code></pre>\n");
    html.push_str("</details>\n</section>\n");

    html.push_str(&format!(
        "<footer class=\"meta\">Rendered {}</footer>\n",
        chrono::Utc::now().format("%Y-%m-%d %H:%M UTC")
    ));

    html.push_str("<script>\n");
    html.push_str(JS);
    html.push_str("</script>\n");

    html.push_str("</body>\n</html>");
    html
}

/// Write an HTML report to a file.
pub fn write_html_report(outcome: &PipelineOutcome, path: &Path) -> Result<()> {
    let html = generate_html(outcome);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, html)
        .with_context(|| format!("failed to write HTML report to {}", path.display()))?;
    Ok(())
}

fn generate_bar_chart<'a>(
    coverage: impl IntoIterator<Item = (&'a String, &'a ProgramCoverage)>,
) -> String {
    let bar_height = 24;
    let max_width = 400;
    let padding = 8;
    let label_width = 120;

    let programs: Vec<(&String, f64)> = coverage
        .into_iter()
        .map(|(p, c)| (p, c.percentage))
        .collect();

    let total_height = programs.len() * (bar_height + padding) + padding;

    let mut svg = format!(
        "<svg width=\"{}\" height=\"{}\" xmlns=\"http://www.w3.org/2000/svg\">\n",
        label_width + max_width + 60,
        total_height
    );

    for (i, (program, pct)) in programs.iter().enumerate() {
        let y = i * (bar_height + padding) + padding;
        let width = (pct / 100.0 * max_width as f64) as usize;

        let color = if *pct == 0.0 {
            "#ef4444"
        } else if *pct < 10.0 {
            "#eab308"
        } else {
            "#22c55e"
        };

        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"13\" fill=\"currentColor\" text-anchor=\"end\" dominant-baseline=\"middle\">{}</text>\n",
            label_width - 10,
            y + bar_height / 2,
            html_escape(program)
        ));
        svg.push_str(&format!(
            "  <rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"{}\" rx=\"4\"/>\n",
            label_width, y, width, bar_height, color
        ));
        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"12\" fill=\"currentColor\" dominant-baseline=\"middle\">{:.2}%</text>\n",
            label_width + width + 8,
            y + bar_height / 2,
            pct
        ));
    }

    svg.push_str("</svg>\n");
    svg
}

const CSS: &str = r#"
:root { --bg: #fff; --fg: #1a1a1a; --border: #e5e7eb; --pass: #dcfce7; --fail: #fde2e2; --warn: #fef9c3; }
@media (prefers-color-scheme: dark) {
  :root { --bg: #111827; --fg: #f9fafb; --border: #374151; --pass: #064e3b; --fail: #7f1d1d; --warn: #713f12; }
}
body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; margin: 0; padding: 2rem; background: var(--bg); color: var(--fg); }
h1, h2 { margin-top: 2rem; }
.meta { color: #6b7280; }
.badge { padding: 0.15rem 0.5rem; border-radius: 4px; font-weight: bold; }
table { border-collapse: collapse; width: 100%; margin: 1rem 0; }
th, td { border: 1px solid var(--border); padding: 0.5rem 1rem; text-align: left; }
th { background: var(--border); }
#missing th { cursor: pointer; }
.pass { background: var(--pass); }
.fail { background: var(--fail); }
.warn { background: var(--warn); }
ul.flags li { margin: 0.25rem 0; }
pre { overflow-x: auto; padding: 1rem; background: var(--border); border-radius: 8px; }
code { font-family: 'JetBrains Mono', 'Fira Code', monospace; font-size: 0.85rem; }
details { margin: 1rem 0; }
summary { cursor: pointer; font-weight: bold; }
svg { margin: 1rem 0; }
"#;

const JS: &str = r#"
function sortTable(col) {
  const table = document.getElementById('missing');
  if (!table) return;
  const tbody = table.querySelector('tbody');
  const rows = Array.from(tbody.querySelectorAll('tr'));
  const asc = table.dataset.sortCol == col && table.dataset.sortDir == 'asc' ? false : true;
  rows.sort((a, b) => {
    const va = a.cells[col].textContent;
    const vb = b.cells[col].textContent;
    return asc ? va.localeCompare(vb) : vb.localeCompare(va);
  });
  table.dataset.sortCol = col;
  table.dataset.sortDir = asc ? 'asc' : 'desc';
  rows.forEach(r => tbody.appendChild(r));
}
"#;
