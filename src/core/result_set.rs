use serde::{Deserialize, Serialize};

use crate::core::{Finding, Observation, Severity};

/// The three-bucket collection of findings produced by one scan pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSet {
    pub issues: Vec<Finding>,
    pub warnings: Vec<Finding>,
    pub passed: Vec<Finding>,
    pub timestamp: String,
}

impl ResultSet {
    /// Empty result set stamped with the current time.
    pub fn new() -> Self {
        Self::at(crate::core::timestamp_now())
    }

    pub fn at(timestamp: impl Into<String>) -> Self {
        Self {
            issues: Vec::new(),
            warnings: Vec::new(),
            passed: Vec::new(),
            timestamp: timestamp.into(),
        }
    }

    pub fn add_issue(&mut self, obs: Observation) {
        self.issues
            .push(obs.into_finding(Some(Severity::Error), crate::core::timestamp_now()));
    }

    pub fn add_warning(&mut self, obs: Observation) {
        self.warnings
            .push(obs.into_finding(Some(Severity::Warning), crate::core::timestamp_now()));
    }

    pub fn add_passed(&mut self, obs: Observation) {
        self.passed
            .push(obs.into_finding(None, crate::core::timestamp_now()));
    }

    pub fn total(&self) -> usize {
        self.issues.len() + self.warnings.len() + self.passed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn score(&self) -> u32 {
        score(self.issues.len(), self.warnings.len(), self.passed.len())
    }

    /// Issues followed by warnings, the order highlights and lists use.
    pub fn problems(&self) -> impl Iterator<Item = &Finding> {
        self.issues.iter().chain(self.warnings.iter())
    }
}

/// `round(100 * passed / total)`; an empty result set scores 0.
pub fn score(issues: usize, warnings: usize, passed: usize) -> u32 {
    let total = issues + warnings + passed;
    if total == 0 {
        return 0;
    }
    ((passed as f64 / total as f64) * 100.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_handles_empty_and_partial_sets() {
        assert_eq!(score(0, 0, 0), 0);
        assert_eq!(score(0, 0, 10), 100);
        assert_eq!(score(1, 1, 8), 80);
        assert_eq!(score(2, 0, 1), 33);
        assert_eq!(score(1, 0, 1), 50);
    }

    #[test]
    fn accumulator_buckets_by_classification() {
        let mut results = ResultSet::at("2026-01-01T00:00:00Z");
        results.add_issue(Observation::new("Missing Alt Text", "d", "img"));
        results.add_warning(Observation::new("Empty Alt Text", "d", "img"));
        results.add_warning(Observation::new("Empty Alt Text", "d", "img"));
        results.add_passed(Observation::new("Alt Text Present", "d", "img"));

        assert_eq!(results.issues.len(), 1);
        assert_eq!(results.warnings.len(), 2);
        assert_eq!(results.passed.len(), 1);
        assert_eq!(results.issues[0].severity, Some(Severity::Error));
        assert_eq!(results.warnings[1].severity, Some(Severity::Warning));
        assert_eq!(results.passed[0].severity, None);
        assert_eq!(results.warnings[0].title, results.warnings[1].title);
        assert_eq!(results.score(), 25);
        assert_eq!(results.problems().count(), 3);
    }
}
