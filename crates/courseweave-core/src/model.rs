//! Core data model types for courseweave.
//!
//! Raw records mirror what arrives from ingestion: every field is optional and
//! untrimmed. Canonical records are what the normalizer emits and everything
//! downstream consumes.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

/// Columns every course record set must carry.
pub const COURSE_COLUMNS: [&str; 5] = [
    "course_code",
    "course_name",
    "credits",
    "program_code",
    "course_type",
];

/// Columns every prerequisite record set must carry.
pub const PREREQUISITE_COLUMNS: [&str; 2] = ["course_code", "required_course_code"];

/// Kind of a course within its program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CourseType {
    Core,
    Elective,
}

impl CourseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CourseType::Core => "Core",
            CourseType::Elective => "Elective",
        }
    }
}

impl fmt::Display for CourseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CourseType {
    type Err = String;

    /// Exact match only; callers title-case first.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Core" => Ok(CourseType::Core),
            "Elective" => Ok(CourseType::Elective),
            other => Err(format!("unknown course type: {other}")),
        }
    }
}

/// A course row as ingested.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCourse {
    #[serde(default)]
    pub course_code: Option<String>,
    #[serde(default)]
    pub course_name: Option<String>,
    /// Integers, integral floats and numeric strings are accepted; anything
    /// else is read as missing.
    #[serde(default, deserialize_with = "lenient_credits")]
    pub credits: Option<i64>,
    #[serde(default)]
    pub program_code: Option<String>,
    #[serde(default)]
    pub course_type: Option<String>,
}

/// A prerequisite row as ingested.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPrerequisite {
    #[serde(default)]
    pub course_code: Option<String>,
    #[serde(default)]
    pub required_course_code: Option<String>,
}

/// A canonical course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub course_code: String,
    pub course_name: String,
    pub credits: i64,
    pub program_code: String,
    pub course_type: CourseType,
}

impl Course {
    pub fn new(
        course_code: impl Into<String>,
        course_name: impl Into<String>,
        credits: i64,
        program_code: impl Into<String>,
        course_type: CourseType,
    ) -> Self {
        Self {
            course_code: course_code.into(),
            course_name: course_name.into(),
            credits,
            program_code: program_code.into(),
            course_type,
        }
    }
}

impl From<&Course> for RawCourse {
    fn from(course: &Course) -> Self {
        Self {
            course_code: Some(course.course_code.clone()),
            course_name: Some(course.course_name.clone()),
            credits: Some(course.credits),
            program_code: Some(course.program_code.clone()),
            course_type: Some(course.course_type.to_string()),
        }
    }
}

/// A canonical "`course_code` requires `required_course_code`" edge.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PrerequisiteEdge {
    pub course_code: String,
    pub required_course_code: String,
}

impl PrerequisiteEdge {
    pub fn new(course_code: impl Into<String>, required_course_code: impl Into<String>) -> Self {
        Self {
            course_code: course_code.into(),
            required_course_code: required_course_code.into(),
        }
    }

    pub fn is_self_reference(&self) -> bool {
        self.course_code == self.required_course_code
    }
}

impl fmt::Display for PrerequisiteEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.course_code, self.required_course_code)
    }
}

impl From<&PrerequisiteEdge> for RawPrerequisite {
    fn from(edge: &PrerequisiteEdge) -> Self {
        Self {
            course_code: Some(edge.course_code.clone()),
            required_course_code: Some(edge.required_course_code.clone()),
        }
    }
}

/// A student's completed course, sourced from outside the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub student_id: String,
    pub course_code: String,
}

impl CompletionRecord {
    pub fn new(student_id: impl Into<String>, course_code: impl Into<String>) -> Self {
        Self {
            student_id: student_id.into(),
            course_code: course_code.into(),
        }
    }
}

/// Rows of one table together with the columns the source actually carried.
///
/// A column missing from the source is distinct from a column whose values
/// are all null; the validator reports the former as `required_columns`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordSet<R> {
    pub columns: BTreeSet<String>,
    pub rows: Vec<R>,
}

impl<R> RecordSet<R> {
    pub fn new<I, S>(columns: I, rows: Vec<R>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows,
        }
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains(column)
    }

    /// Required columns absent from this set, in declaration order.
    pub fn missing_columns<'a>(&self, required: &[&'a str]) -> Vec<&'a str> {
        required
            .iter()
            .copied()
            .filter(|c| !self.has_column(c))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl RecordSet<RawCourse> {
    /// A course set carrying every required column.
    pub fn courses(rows: Vec<RawCourse>) -> Self {
        Self::new(COURSE_COLUMNS, rows)
    }
}

impl RecordSet<RawPrerequisite> {
    /// A prerequisite set carrying every required column.
    pub fn prerequisites(rows: Vec<RawPrerequisite>) -> Self {
        Self::new(PREREQUISITE_COLUMNS, rows)
    }
}

/// The two raw tables that enter the pipeline together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDataset {
    pub courses: RecordSet<RawCourse>,
    pub prerequisites: RecordSet<RawPrerequisite>,
}

impl RawDataset {
    pub fn new(courses: Vec<RawCourse>, prerequisites: Vec<RawPrerequisite>) -> Self {
        Self {
            courses: RecordSet::courses(courses),
            prerequisites: RecordSet::prerequisites(prerequisites),
        }
    }
}

/// `None` or whitespace-only.
pub(crate) fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

/// Trimmed, upper-cased identifier form used for course and program codes.
pub fn canonical_code(value: &str) -> String {
    value.trim().to_uppercase()
}

/// Upper-case the first letter of every word, lower-case the rest.
pub fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut at_word_start = true;
    for ch in value.chars() {
        if ch.is_alphabetic() {
            if at_word_start {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(ch);
            at_word_start = true;
        }
    }
    out
}

// `i64::MAX as f64` rounds up to 2^63, so the upper bound is exclusive.
const I64_FLOOR: f64 = i64::MIN as f64;
const I64_CEIL: f64 = i64::MAX as f64;

fn lenient_credits<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        serde_json::Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && (I64_FLOOR..I64_CEIL).contains(f))
                .map(|f| f as i64)
        }),
        serde_json::Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn course_type_display_and_parse() {
        assert_eq!(CourseType::Core.to_string(), "Core");
        assert_eq!("Elective".parse::<CourseType>().unwrap(), CourseType::Elective);
        assert!("core".parse::<CourseType>().is_err());
        assert!("Seminar".parse::<CourseType>().is_err());
    }

    #[test]
    fn title_case_words() {
        assert_eq!(title_case("core"), "Core");
        assert_eq!(title_case("ELECTIVE"), "Elective");
        assert_eq!(title_case("open elective"), "Open Elective");
    }

    #[test]
    fn canonical_code_trims_and_uppercases() {
        assert_eq!(canonical_code("  ie6400 "), "IE6400");
    }

    #[test]
    fn raw_course_accepts_loose_credits() {
        let rows: Vec<RawCourse> = serde_json::from_str(
            r#"[
                {"course_code": "A", "credits": 4},
                {"course_code": "B", "credits": 4.0},
                {"course_code": "C", "credits": " 3 "},
                {"course_code": "D", "credits": "four"},
                {"course_code": "E"}
            ]"#,
        )
        .unwrap();
        let credits: Vec<_> = rows.iter().map(|r| r.credits).collect();
        assert_eq!(credits, vec![Some(4), Some(4), Some(3), None, None]);
    }

    #[test]
    fn out_of_range_float_credits_are_missing() {
        let rows: Vec<RawCourse> = serde_json::from_str(
            r#"[
                {"course_code": "A", "credits": 1e30},
                {"course_code": "B", "credits": -1e30},
                {"course_code": "C", "credits": 9223372036854775808.0},
                {"course_code": "D", "credits": 1e15}
            ]"#,
        )
        .unwrap();
        let credits: Vec<_> = rows.iter().map(|r| r.credits).collect();
        assert_eq!(credits, vec![None, None, None, Some(1_000_000_000_000_000)]);
    }

    #[test]
    fn record_set_reports_missing_columns() {
        let set: RecordSet<RawCourse> = RecordSet::new(["course_code", "credits"], vec![]);
        assert_eq!(
            set.missing_columns(&COURSE_COLUMNS),
            vec!["course_name", "program_code", "course_type"]
        );
    }

    #[test]
    fn canonical_course_converts_back_to_raw() {
        let course = Course::new("IE6400", "Foundations", 4, "MS_DAE", CourseType::Core);
        let raw = RawCourse::from(&course);
        assert_eq!(raw.course_type.as_deref(), Some("Core"));
        assert_eq!(raw.credits, Some(4));
    }
}
