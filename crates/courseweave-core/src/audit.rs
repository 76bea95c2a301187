//! Completion audit and the combined anomaly result.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::model::{canonical_code, CompletionRecord, PrerequisiteEdge};

/// A student who completed a course without completing one of its
/// prerequisites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingPrerequisite {
    pub student_id: String,
    pub enrolled_course: String,
    pub missing_prereq: String,
}

/// Hard anomalies found after validation. Both lists are always present,
/// empty when clean.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnomalyResult {
    pub missing_prerequisites: Vec<MissingPrerequisite>,
    pub circular_prerequisites: Vec<PrerequisiteEdge>,
}

impl AnomalyResult {
    pub fn hard_anomaly_count(&self) -> usize {
        self.missing_prerequisites.len() + self.circular_prerequisites.len()
    }

    pub fn is_clean(&self) -> bool {
        self.hard_anomaly_count() == 0
    }
}

/// Find every (student, course, prerequisite) where the student completed the
/// course but not the prerequisite.
///
/// Completion course codes are compared in canonical form. Repeated
/// completions of the same course count once. Output follows completion
/// order, then edge order.
pub fn find_missing_prerequisites(
    completions: &[CompletionRecord],
    prereqs: &[PrerequisiteEdge],
) -> Vec<MissingPrerequisite> {
    let mut requires: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in prereqs {
        requires
            .entry(edge.course_code.as_str())
            .or_default()
            .push(edge.required_course_code.as_str());
    }

    let keyed: Vec<(&str, String)> = completions
        .iter()
        .map(|c| (c.student_id.as_str(), canonical_code(&c.course_code)))
        .collect();
    let completed: HashSet<(&str, &str)> = keyed
        .iter()
        .map(|(student, course)| (*student, course.as_str()))
        .collect();

    let mut visited = HashSet::new();
    let mut missing = Vec::new();
    for (student, course) in &keyed {
        if !visited.insert((*student, course.as_str())) {
            continue;
        }
        let Some(required) = requires.get(course.as_str()) else {
            continue;
        };
        for &prereq in required {
            if !completed.contains(&(*student, prereq)) {
                missing.push(MissingPrerequisite {
                    student_id: student.to_string(),
                    enrolled_course: course.clone(),
                    missing_prereq: prereq.to_string(),
                });
            }
        }
    }

    if missing.is_empty() {
        tracing::info!(
            "no missing prerequisite anomalies across {} completions",
            completions.len()
        );
    } else {
        tracing::error!(
            "{} completion(s) without a satisfied prerequisite",
            missing.len()
        );
    }
    missing
}

#[cfg(test)]
mod tests {
    use super::*;

    fn done(student: &str, course: &str) -> CompletionRecord {
        CompletionRecord::new(student, course)
    }

    #[test]
    fn satisfied_prerequisites_produce_nothing() {
        let prereqs = vec![PrerequisiteEdge::new("IE7275", "IE6400")];
        let completions = vec![done("s1", "IE6400"), done("s1", "IE7275")];
        assert!(find_missing_prerequisites(&completions, &prereqs).is_empty());
    }

    #[test]
    fn missing_prerequisite_is_reported_per_edge() {
        let prereqs = vec![
            PrerequisiteEdge::new("IE7275", "IE6400"),
            PrerequisiteEdge::new("IE7275", "IE6700"),
        ];
        let completions = vec![
            done("s1", "IE7275"),
            done("s1", "IE6700"),
            done("s2", "IE7275"),
        ];
        let missing = find_missing_prerequisites(&completions, &prereqs);
        assert_eq!(
            missing,
            vec![
                MissingPrerequisite {
                    student_id: "s1".into(),
                    enrolled_course: "IE7275".into(),
                    missing_prereq: "IE6400".into(),
                },
                MissingPrerequisite {
                    student_id: "s2".into(),
                    enrolled_course: "IE7275".into(),
                    missing_prereq: "IE6400".into(),
                },
                MissingPrerequisite {
                    student_id: "s2".into(),
                    enrolled_course: "IE7275".into(),
                    missing_prereq: "IE6700".into(),
                },
            ]
        );
    }

    #[test]
    fn completions_are_scoped_per_student() {
        let prereqs = vec![PrerequisiteEdge::new("B", "A")];
        let completions = vec![done("s1", "A"), done("s2", "B")];
        let missing = find_missing_prerequisites(&completions, &prereqs);
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].student_id, "s2");
    }

    #[test]
    fn repeated_completions_count_once_and_codes_are_canonical() {
        let prereqs = vec![PrerequisiteEdge::new("B", "A")];
        let completions = vec![done("s1", " b"), done("s1", "B"), done("s2", "a"), done("s2", "b")];
        let missing = find_missing_prerequisites(&completions, &prereqs);
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].student_id, "s1");
    }

    #[test]
    fn anomaly_counts() {
        let mut result = AnomalyResult::default();
        assert!(result.is_clean());
        result
            .circular_prerequisites
            .push(PrerequisiteEdge::new("A", "B"));
        assert_eq!(result.hard_anomaly_count(), 1);
        assert!(!result.is_clean());
    }
}
