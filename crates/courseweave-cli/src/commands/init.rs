//! The `courseweave init` command.

use std::path::Path;

use anyhow::{Context, Result};

pub fn execute() -> Result<()> {
    write_if_missing(Path::new("courseweave.toml"), SAMPLE_CONFIG)?;

    std::fs::create_dir_all("data").context("failed to create data/")?;
    write_if_missing(Path::new("data/courses.json"), SAMPLE_COURSES)?;
    write_if_missing(Path::new("data/prerequisites.json"), SAMPLE_PREREQUISITES)?;
    write_if_missing(Path::new("data/completions.json"), SAMPLE_COMPLETIONS)?;

    println!("\nNext steps:");
    println!("  1. Edit courseweave.toml to list your programs");
    println!("  2. Run: courseweave validate --data data");
    println!("  3. Run: courseweave run --data data --format all");

    Ok(())
}

fn write_if_missing(path: &Path, content: &str) -> Result<()> {
    if path.exists() {
        println!("{} already exists, skipping.", path.display());
    } else {
        std::fs::write(path, content)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Created {}", path.display());
    }
    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# courseweave configuration
output_dir = "./courseweave-reports"
parallel = true

[policy]
program_codes = ["MS_DAE", "MS_DS", "MS_CS", "MS_DA", "MS_IS"]
course_types = ["Core", "Elective"]
expected_credits = 4

[policy.fairness]
low_coverage_pct = 10.0
credit_imbalance = 1.0
"#;

const SAMPLE_COURSES: &str = r#"[
  {"course_code": "IE6400", "course_name": "Foundations of Data Analytics Engineering", "credits": 4, "program_code": "MS_DAE", "course_type": "Core"},
  {"course_code": "IE7275", "course_name": "Data Mining in Engineering", "credits": 4, "program_code": "MS_DAE", "course_type": "Elective"},
  {"course_code": "DS5110", "course_name": "Introduction to Data Management and Processing", "credits": 4, "program_code": "MS_DS", "course_type": "Core"},
  {"course_code": "DS5220", "course_name": "Supervised Machine Learning", "credits": 4, "program_code": "MS_DS", "course_type": "Core"},
  {"course_code": "CS5800", "course_name": "Algorithms", "credits": 4, "program_code": "MS_CS", "course_type": "Core"},
  {"course_code": "CS6200", "course_name": "Information Retrieval", "credits": 4, "program_code": "MS_CS", "course_type": "Elective"},
  {"course_code": "ALY6000", "course_name": "Introduction to Analytics", "credits": 4, "program_code": "MS_DA", "course_type": "Core"},
  {"course_code": "ALY6010", "course_name": "Probability Theory and Introductory Statistics", "credits": 4, "program_code": "MS_DA", "course_type": "Core"},
  {"course_code": "INFO6105", "course_name": "Data Science Engineering Methods", "credits": 4, "program_code": "MS_IS", "course_type": "Core"},
  {"course_code": "INFO6205", "course_name": "Program Structures and Algorithms", "credits": 4, "program_code": "MS_IS", "course_type": "Core"}
]
"#;

const SAMPLE_PREREQUISITES: &str = r#"[
  {"course_code": "IE7275", "required_course_code": "IE6400"},
  {"course_code": "DS5220", "required_course_code": "DS5110"},
  {"course_code": "CS6200", "required_course_code": "CS5800"},
  {"course_code": "ALY6010", "required_course_code": "ALY6000"},
  {"course_code": "INFO6205", "required_course_code": "INFO6105"}
]
"#;

const SAMPLE_COMPLETIONS: &str = r#"[
  {"student_id": "S001", "course_code": "IE6400"},
  {"student_id": "S001", "course_code": "IE7275"},
  {"student_id": "S002", "course_code": "CS5800"},
  {"student_id": "S002", "course_code": "CS6200"},
  {"student_id": "S003", "course_code": "DS5110"}
]
"#;
