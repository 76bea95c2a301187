//! Schema and referential validation.
//!
//! Every check runs and reports independently so one call surfaces all
//! violations at once. The only short-circuit: a prerequisite set missing its
//! required columns skips the remaining prerequisite checks.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::Policy;
use crate::error::EngineError;
use crate::model::{
    is_blank, Course, CourseType, PrerequisiteEdge, RawCourse, RawPrerequisite, RecordSet,
    COURSE_COLUMNS, PREREQUISITE_COLUMNS,
};

/// Which table a violation was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Courses,
    Prerequisites,
}

/// Named schema check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Check {
    RequiredColumns,
    NoNulls,
    UniqueCourseCode,
    ValidProgramCode,
    ValidCourseType,
    PositiveCredits,
    UniquePrereqPairs,
    NoSelfReference,
    ValidFkReferences,
}

impl Check {
    pub fn as_str(&self) -> &'static str {
        match self {
            Check::RequiredColumns => "required_columns",
            Check::NoNulls => "no_nulls",
            Check::UniqueCourseCode => "unique_course_code",
            Check::ValidProgramCode => "valid_program_code",
            Check::ValidCourseType => "valid_course_type",
            Check::PositiveCredits => "positive_credits",
            Check::UniquePrereqPairs => "unique_prereq_pairs",
            Check::NoSelfReference => "no_self_reference",
            Check::ValidFkReferences => "valid_fk_references",
        }
    }
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One broken invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub table: Table,
    pub check: Check,
    pub detail: String,
}

impl Violation {
    fn courses(check: Check, detail: impl Into<String>) -> Self {
        Self {
            table: Table::Courses,
            check,
            detail: detail.into(),
        }
    }

    fn prerequisites(check: Check, detail: impl Into<String>) -> Self {
        Self {
            table: Table::Prerequisites,
            check,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = match self.table {
            Table::Courses => "courses",
            Table::Prerequisites => "prerequisites",
        };
        write!(f, "[{table}] {}: {}", self.check, self.detail)
    }
}

/// Result of a validation pass: `success` is true exactly when no violations
/// were found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub success: bool,
    pub violations: Vec<Violation>,
}

impl ValidationOutcome {
    pub fn from_violations(violations: Vec<Violation>) -> Self {
        Self {
            success: violations.is_empty(),
            violations,
        }
    }

    /// Turn a failed outcome into the aggregate error callers abort with.
    pub fn into_result(self) -> Result<(), EngineError> {
        if self.success {
            Ok(())
        } else {
            Err(EngineError::Validation {
                count: self.violations.len(),
                violations: self.violations,
            })
        }
    }
}

/// Validate canonical records.
pub fn validate(
    courses: &[Course],
    prereqs: &[PrerequisiteEdge],
    policy: &Policy,
) -> ValidationOutcome {
    let courses = RecordSet::courses(courses.iter().map(RawCourse::from).collect());
    let prereqs = RecordSet::prerequisites(prereqs.iter().map(RawPrerequisite::from).collect());
    validate_records(&courses, &prereqs, policy)
}

/// Validate record sets, including column presence.
pub fn validate_records(
    courses: &RecordSet<RawCourse>,
    prereqs: &RecordSet<RawPrerequisite>,
    policy: &Policy,
) -> ValidationOutcome {
    let valid_codes: HashSet<&str> = courses
        .rows
        .iter()
        .filter_map(|c| c.course_code.as_deref())
        .collect();

    let mut violations = validate_courses(courses, policy);
    violations.extend(validate_prerequisites(prereqs, &valid_codes));

    if violations.is_empty() {
        tracing::info!("all validation checks passed");
    } else {
        for v in &violations {
            tracing::error!("validation violation: {v}");
        }
    }

    ValidationOutcome::from_violations(violations)
}

/// Run the course checks.
pub fn validate_courses(courses: &RecordSet<RawCourse>, policy: &Policy) -> Vec<Violation> {
    let mut violations = Vec::new();
    let rows = &courses.rows;

    let missing = courses.missing_columns(&COURSE_COLUMNS);
    if !missing.is_empty() {
        violations.push(Violation::courses(
            Check::RequiredColumns,
            format!("missing: {}", missing.join(", ")),
        ));
    }

    let null_counts = [
        ("course_code", rows.iter().filter(|c| is_blank(c.course_code.as_deref())).count()),
        ("course_name", rows.iter().filter(|c| is_blank(c.course_name.as_deref())).count()),
        ("credits", rows.iter().filter(|c| c.credits.is_none()).count()),
        ("program_code", rows.iter().filter(|c| is_blank(c.program_code.as_deref())).count()),
        ("course_type", rows.iter().filter(|c| is_blank(c.course_type.as_deref())).count()),
    ];
    for (column, count) in null_counts {
        if count > 0 && courses.has_column(column) {
            violations.push(Violation::courses(
                Check::NoNulls,
                format!("column {column} has {count} null value(s)"),
            ));
        }
    }

    let mut seen = HashSet::new();
    let mut duplicates = BTreeSet::new();
    for code in rows.iter().filter_map(|c| c.course_code.as_deref()) {
        if !seen.insert(code) {
            duplicates.insert(code);
        }
    }
    if !duplicates.is_empty() {
        violations.push(Violation::courses(
            Check::UniqueCourseCode,
            format!("duplicate course_code value(s): {duplicates:?}"),
        ));
    }

    let invalid_programs: BTreeSet<&str> = rows
        .iter()
        .filter_map(|c| c.program_code.as_deref())
        .filter(|p| !policy.is_valid_program(p))
        .collect();
    if !invalid_programs.is_empty() {
        violations.push(Violation::courses(
            Check::ValidProgramCode,
            format!("invalid values: {invalid_programs:?}"),
        ));
    }

    let invalid_types: BTreeSet<&str> = rows
        .iter()
        .filter_map(|c| c.course_type.as_deref())
        .filter(|t| {
            !t.parse::<CourseType>()
                .is_ok_and(|kind| policy.is_valid_type(kind))
        })
        .collect();
    if !invalid_types.is_empty() {
        violations.push(Violation::courses(
            Check::ValidCourseType,
            format!("invalid values: {invalid_types:?}"),
        ));
    }

    let non_positive: Vec<String> = rows
        .iter()
        .filter(|c| c.credits.is_some_and(|credits| credits <= 0))
        .map(|c| c.course_code.clone().unwrap_or_else(|| "<null>".into()))
        .collect();
    if !non_positive.is_empty() {
        violations.push(Violation::courses(
            Check::PositiveCredits,
            format!("credits <= 0 found for: {}", non_positive.join(", ")),
        ));
    }

    violations
}

/// Run the prerequisite checks against the given course codes.
pub fn validate_prerequisites(
    prereqs: &RecordSet<RawPrerequisite>,
    valid_codes: &HashSet<&str>,
) -> Vec<Violation> {
    let missing = prereqs.missing_columns(&PREREQUISITE_COLUMNS);
    if !missing.is_empty() {
        return vec![Violation::prerequisites(
            Check::RequiredColumns,
            format!("missing: {}", missing.join(", ")),
        )];
    }

    let mut violations = Vec::new();
    let rows = &prereqs.rows;

    let null_counts = [
        ("course_code", rows.iter().filter(|p| is_blank(p.course_code.as_deref())).count()),
        (
            "required_course_code",
            rows.iter()
                .filter(|p| is_blank(p.required_course_code.as_deref()))
                .count(),
        ),
    ];
    for (column, count) in null_counts {
        if count > 0 {
            violations.push(Violation::prerequisites(
                Check::NoNulls,
                format!("column {column} has {count} null value(s)"),
            ));
        }
    }

    let pairs: Vec<(&str, &str)> = rows
        .iter()
        .filter_map(|p| Some((p.course_code.as_deref()?, p.required_course_code.as_deref()?)))
        .collect();

    let mut seen = HashSet::new();
    let duplicate_count = pairs.iter().filter(|pair| !seen.insert(**pair)).count();
    if duplicate_count > 0 {
        violations.push(Violation::prerequisites(
            Check::UniquePrereqPairs,
            format!("{duplicate_count} duplicate prerequisite pair(s)"),
        ));
    }

    let self_refs: BTreeSet<&str> = pairs
        .iter()
        .filter(|(course, required)| course == required)
        .map(|(course, _)| *course)
        .collect();
    if !self_refs.is_empty() {
        violations.push(Violation::prerequisites(
            Check::NoSelfReference,
            format!("self-referencing course(s): {self_refs:?}"),
        ));
    }

    let orphans: Vec<String> = pairs
        .iter()
        .filter(|(course, required)| {
            !valid_codes.contains(course) || !valid_codes.contains(required)
        })
        .map(|(course, required)| format!("{course} -> {required}"))
        .collect();
    if !orphans.is_empty() {
        violations.push(Violation::prerequisites(
            Check::ValidFkReferences,
            format!("prerequisite references non-existent course_code: {orphans:?}"),
        ));
    }

    violations
}
