//! Normalization of raw course and prerequisite rows into canonical records.
//!
//! Course rows pass through these steps in order:
//!
//! 1. rows with a missing or blank required field are dropped, before any
//!    string is touched;
//! 2. strings are trimmed, codes upper-cased, course types title-cased;
//! 3. duplicate `course_code`s are removed, the first row in input order wins;
//! 4. rows with an unknown program code are dropped;
//! 5. rows with an unknown course type are dropped;
//! 6. rows whose credits differ from the policy are kept and logged.
//!
//! Prerequisite rows lose null endpoints, are upper-cased, de-duplicated
//! (first wins) and finally stripped of orphans: edges that reference a code
//! absent from the normalized course set.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::config::Policy;
use crate::model::{
    canonical_code, is_blank, title_case, Course, CourseType, PrerequisiteEdge, RawCourse,
    RawPrerequisite,
};

/// Counts of everything the normalizer dropped or flagged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizationReport {
    pub courses_in: usize,
    pub courses_out: usize,
    /// Course rows missing a required field.
    pub null_fields: usize,
    /// Course rows dropped as later duplicates of a `course_code`.
    pub duplicate_codes: usize,
    pub unknown_programs: usize,
    pub unknown_types: usize,
    /// Kept rows whose credits differ from the expected value.
    pub credit_deviations: usize,
    pub rejected_programs: BTreeSet<String>,
    pub rejected_types: BTreeSet<String>,

    pub prerequisites_in: usize,
    pub prerequisites_out: usize,
    pub null_endpoints: usize,
    pub duplicate_pairs: usize,
    pub orphan_edges: usize,
}

impl NormalizationReport {
    pub fn courses_dropped(&self) -> usize {
        self.courses_in - self.courses_out
    }

    pub fn prerequisites_dropped(&self) -> usize {
        self.prerequisites_in - self.prerequisites_out
    }
}

/// Canonical output of a normalization pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Normalized {
    pub courses: Vec<Course>,
    pub prerequisites: Vec<PrerequisiteEdge>,
    pub report: NormalizationReport,
}

impl Normalized {
    /// Course codes of the canonical set.
    pub fn course_codes(&self) -> BTreeSet<&str> {
        self.courses.iter().map(|c| c.course_code.as_str()).collect()
    }
}

/// Normalize both tables. Prerequisites are filtered against the courses that
/// survive, so referential integrity holds by construction.
pub fn normalize(
    raw_courses: &[RawCourse],
    raw_prereqs: &[RawPrerequisite],
    policy: &Policy,
) -> Normalized {
    let mut report = NormalizationReport::default();
    let courses = normalize_courses(raw_courses, policy, &mut report);
    let valid_codes: HashSet<&str> = courses.iter().map(|c| c.course_code.as_str()).collect();
    let prerequisites = normalize_prerequisites(raw_prereqs, &valid_codes, &mut report);

    Normalized {
        courses,
        prerequisites,
        report,
    }
}

/// A course row after trimming, before program/type filtering.
struct TrimmedCourse {
    course_code: String,
    course_name: String,
    credits: i64,
    program_code: String,
    course_type: String,
}

impl TrimmedCourse {
    /// `None` when any required field is missing. Looks, never transforms.
    fn from_raw(raw: &RawCourse) -> Option<Self> {
        if is_blank(raw.course_code.as_deref())
            || is_blank(raw.course_name.as_deref())
            || is_blank(raw.program_code.as_deref())
            || is_blank(raw.course_type.as_deref())
        {
            return None;
        }
        let (Some(code), Some(name), Some(credits), Some(program), Some(kind)) = (
            raw.course_code.as_deref(),
            raw.course_name.as_deref(),
            raw.credits,
            raw.program_code.as_deref(),
            raw.course_type.as_deref(),
        ) else {
            return None;
        };
        Some(Self {
            course_code: code.to_string(),
            course_name: name.to_string(),
            credits,
            program_code: program.to_string(),
            course_type: kind.to_string(),
        })
    }

    fn normalized(self) -> Self {
        Self {
            course_code: canonical_code(&self.course_code),
            course_name: self.course_name.trim().to_string(),
            credits: self.credits,
            program_code: canonical_code(&self.program_code),
            course_type: title_case(self.course_type.trim()),
        }
    }
}

/// Clean course rows. See the module docs for the step order.
pub fn normalize_courses(
    raw: &[RawCourse],
    policy: &Policy,
    report: &mut NormalizationReport,
) -> Vec<Course> {
    tracing::info!("normalizing courses: {} input rows", raw.len());
    report.courses_in = raw.len();

    let present: Vec<TrimmedCourse> = raw.iter().filter_map(TrimmedCourse::from_raw).collect();
    report.null_fields = raw.len() - present.len();
    if report.null_fields > 0 {
        tracing::warn!(
            "dropped {} course row(s) with null required fields",
            report.null_fields
        );
    }

    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(present.len());
    for row in present.into_iter().map(TrimmedCourse::normalized) {
        if seen.insert(row.course_code.clone()) {
            unique.push(row);
        } else {
            report.duplicate_codes += 1;
        }
    }
    if report.duplicate_codes > 0 {
        tracing::warn!(
            "dropped {} duplicate course_code row(s), keeping first occurrence",
            report.duplicate_codes
        );
    }

    let mut known_programs = Vec::with_capacity(unique.len());
    for row in unique {
        if policy.is_valid_program(&row.program_code) {
            known_programs.push(row);
        } else {
            report.unknown_programs += 1;
            report.rejected_programs.insert(row.program_code);
        }
    }
    if report.unknown_programs > 0 {
        tracing::warn!(
            "dropped {} row(s) with unknown program_code: {:?}",
            report.unknown_programs,
            report.rejected_programs
        );
    }

    let mut courses = Vec::with_capacity(known_programs.len());
    for row in known_programs {
        match row.course_type.parse::<CourseType>() {
            Ok(kind) if policy.is_valid_type(kind) => courses.push(Course {
                course_code: row.course_code,
                course_name: row.course_name,
                credits: row.credits,
                program_code: row.program_code,
                course_type: kind,
            }),
            _ => {
                report.unknown_types += 1;
                report.rejected_types.insert(row.course_type);
            }
        }
    }
    if report.unknown_types > 0 {
        tracing::warn!(
            "dropped {} row(s) with unknown course_type: {:?}",
            report.unknown_types,
            report.rejected_types
        );
    }

    let deviations: Vec<(&str, i64)> = courses
        .iter()
        .filter(|c| c.credits != policy.expected_credits)
        .map(|c| (c.course_code.as_str(), c.credits))
        .collect();
    report.credit_deviations = deviations.len();
    if !deviations.is_empty() {
        tracing::warn!(
            "unexpected credit values (expected {}): {:?}",
            policy.expected_credits,
            deviations
        );
    }

    report.courses_out = courses.len();
    tracing::info!(
        "course normalization complete: {} rows kept, {} removed",
        report.courses_out,
        report.courses_dropped()
    );
    courses
}

/// Clean prerequisite rows against the set of canonical course codes.
pub fn normalize_prerequisites(
    raw: &[RawPrerequisite],
    valid_codes: &HashSet<&str>,
    report: &mut NormalizationReport,
) -> Vec<PrerequisiteEdge> {
    tracing::info!("normalizing prerequisites: {} input rows", raw.len());
    report.prerequisites_in = raw.len();

    let mut seen = HashSet::new();
    let mut edges = Vec::new();
    let mut orphans = Vec::new();

    for row in raw {
        let (Some(course), Some(required)) = (
            row.course_code.as_deref().filter(|v| !v.trim().is_empty()),
            row.required_course_code
                .as_deref()
                .filter(|v| !v.trim().is_empty()),
        ) else {
            report.null_endpoints += 1;
            continue;
        };

        let edge = PrerequisiteEdge::new(canonical_code(course), canonical_code(required));
        if !seen.insert(edge.clone()) {
            report.duplicate_pairs += 1;
            continue;
        }

        if valid_codes.contains(edge.course_code.as_str())
            && valid_codes.contains(edge.required_course_code.as_str())
        {
            edges.push(edge);
        } else {
            orphans.push(edge.to_string());
        }
    }

    report.orphan_edges = orphans.len();
    if report.null_endpoints > 0 {
        tracing::warn!(
            "dropped {} prerequisite row(s) with a null endpoint",
            report.null_endpoints
        );
    }
    if report.duplicate_pairs > 0 {
        tracing::warn!(
            "dropped {} duplicate prerequisite pair(s)",
            report.duplicate_pairs
        );
    }
    if !orphans.is_empty() {
        tracing::warn!(
            "removing prerequisites with unknown course codes: {:?}",
            orphans
        );
    }

    report.prerequisites_out = edges.len();
    tracing::info!(
        "prerequisite normalization complete: {} edges kept, {} removed",
        report.prerequisites_out,
        report.prerequisites_dropped()
    );
    edges
}
