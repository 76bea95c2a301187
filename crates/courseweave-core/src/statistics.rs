//! Descriptive statistics over a validated snapshot.
//!
//! Purely observational. Produced on every run that passes validation.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Course, PrerequisiteEdge};

/// Statistics for one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsReport {
    pub generated_at: DateTime<Utc>,
    pub courses: CourseStatistics,
    pub prerequisites: PrerequisiteStatistics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseStatistics {
    pub total_courses: usize,
    pub by_program: BTreeMap<String, usize>,
    pub by_type: BTreeMap<String, usize>,
    /// Mean credits over all courses; 0.0 when there are none.
    pub avg_credits: f64,
    pub unique_programs: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrerequisiteStatistics {
    pub total_prereq_pairs: usize,
    /// Distinct courses that require at least one other course.
    pub courses_with_prereqs: usize,
    /// The course required by the most edges. Ties go to the one seen first.
    pub most_required_course: Option<String>,
}

pub fn generate_statistics(courses: &[Course], prereqs: &[PrerequisiteEdge]) -> StatisticsReport {
    let mut by_program: BTreeMap<String, usize> = BTreeMap::new();
    let mut by_type: BTreeMap<String, usize> = BTreeMap::new();
    for course in courses {
        *by_program.entry(course.program_code.clone()).or_default() += 1;
        *by_type.entry(course.course_type.to_string()).or_default() += 1;
    }

    let avg_credits = if courses.is_empty() {
        0.0
    } else {
        courses.iter().map(|c| i128::from(c.credits)).sum::<i128>() as f64 / courses.len() as f64
    };

    let stats = StatisticsReport {
        generated_at: Utc::now(),
        courses: CourseStatistics {
            total_courses: courses.len(),
            unique_programs: by_program.len(),
            by_program,
            by_type,
            avg_credits,
        },
        prerequisites: PrerequisiteStatistics {
            total_prereq_pairs: prereqs.len(),
            courses_with_prereqs: prereqs
                .iter()
                .map(|e| e.course_code.as_str())
                .collect::<BTreeSet<_>>()
                .len(),
            most_required_course: most_required(prereqs),
        },
    };

    tracing::info!(
        "statistics: {} courses, {} prerequisite pairs",
        stats.courses.total_courses,
        stats.prerequisites.total_prereq_pairs
    );
    stats
}

fn most_required(prereqs: &[PrerequisiteEdge]) -> Option<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut order = Vec::new();
    for edge in prereqs {
        let code = edge.required_course_code.as_str();
        let count = counts.entry(code).or_insert_with(|| {
            order.push(code);
            0
        });
        *count += 1;
    }

    let mut best: Option<(&str, usize)> = None;
    for code in order {
        let count = counts[code];
        if best.map_or(true, |(_, top)| count > top) {
            best = Some((code, count));
        }
    }
    best.map(|(code, _)| code.to_string())
}
