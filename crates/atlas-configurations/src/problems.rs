//! Problem reporting sink.

use parking_lot::Mutex;
use std::fmt;

/// Category every configuration usage problem is filed under.
pub const CONFIGURATION_USAGE: &str = "configuration usage";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => f.write_str("warning"),
            Severity::Error => f.write_str("error"),
        }
    }
}

/// A user-facing problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Problem {
    pub category: String,
    pub label: String,
    pub details: Option<String>,
    pub severity: Severity,
    pub cause: Option<String>,
}

impl Problem {
    pub fn new(label: impl Into<String>, severity: Severity) -> Self {
        Self {
            category: CONFIGURATION_USAGE.to_string(),
            label: label.into(),
            details: None,
            severity,
            cause: None,
        }
    }

    pub fn warning(label: impl Into<String>) -> Self {
        Self::new(label, Severity::Warning)
    }

    pub fn error(label: impl Into<String>) -> Self {
        Self::new(label, Severity::Error)
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_cause(mut self, cause: &dyn std::error::Error) -> Self {
        self.cause = Some(cause.to_string());
        self
    }
}

/// Receives problems.
pub trait ProblemReporter: Send + Sync {
    fn report(&self, problem: Problem);
}

/// Keeps every reported problem in memory.
#[derive(Debug, Default)]
pub struct CollectingProblemReporter {
    problems: Mutex<Vec<Problem>>,
}

impl CollectingProblemReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn problems(&self) -> Vec<Problem> {
        self.problems.lock().clone()
    }

    pub fn warnings(&self) -> Vec<Problem> {
        self.with_severity(Severity::Warning)
    }

    pub fn errors(&self) -> Vec<Problem> {
        self.with_severity(Severity::Error)
    }

    fn with_severity(&self, severity: Severity) -> Vec<Problem> {
        self.problems
            .lock()
            .iter()
            .filter(|problem| problem.severity == severity)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.problems.lock().clear();
    }
}

impl ProblemReporter for CollectingProblemReporter {
    fn report(&self, problem: Problem) {
        match problem.severity {
            Severity::Warning => tracing::warn!(category = %problem.category, "{}", problem.label),
            Severity::Error => tracing::error!(category = %problem.category, "{}", problem.label),
        }
        self.problems.lock().push(problem);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigurationError;

    #[test]
    fn test_collects_in_order() {
        let reporter = CollectingProblemReporter::new();
        reporter.report(Problem::warning("first"));
        reporter.report(Problem::error("second").with_details("more"));

        let problems = reporter.problems();
        assert_eq!(problems.len(), 2);
        assert_eq!(problems[0].label, "first");
        assert_eq!(problems[1].details.as_deref(), Some("more"));
        assert_eq!(reporter.warnings().len(), 1);
        assert_eq!(reporter.errors().len(), 1);
    }

    #[test]
    fn test_cause_is_rendered() {
        let error = ConfigurationError::UnknownConfiguration("api".to_string());
        let problem = Problem::error("lookup failed").with_cause(&error);
        assert_eq!(problem.category, CONFIGURATION_USAGE);
        assert_eq!(
            problem.cause.as_deref(),
            Some("Configuration with name 'api' not found.")
        );
    }

    #[test]
    fn test_clear() {
        let reporter = CollectingProblemReporter::new();
        reporter.report(Problem::warning("gone"));
        reporter.clear();
        assert!(reporter.problems().is_empty());
    }
}
