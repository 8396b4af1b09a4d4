//! Validation result types
//!
//! All of these are produced fresh for each validation run and discarded
//! afterwards. The `passed` flags are derived, never stored.

use std::time::Duration;

use serde::{Deserialize, Serialize, Serializer};

/// Outcome of a single check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Passed,
    Failed,
    Skipped,
}

impl std::fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CheckStatus::Passed => "passed",
            CheckStatus::Failed => "failed",
            CheckStatus::Skipped => "skipped",
        };
        write!(f, "{}", s)
    }
}

/// Result of running one check against one file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    /// Canonical check type name (`contains`, `function_exists`, ...)
    pub check_type: String,
    pub pattern: String,
    pub description: String,
    pub status: CheckStatus,
    #[serde(default)]
    pub detail: String,
}

impl CheckResult {
    pub fn passed(&self) -> bool {
        self.status == CheckStatus::Passed
    }
}

/// Aggregated result for one file requirement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileValidationResult {
    pub path: String,
    pub purpose: String,
    pub required: bool,
    pub exists: bool,
    pub checks: Vec<CheckResult>,
}

impl FileValidationResult {
    pub fn passed(&self) -> bool {
        (!self.required || self.exists) && self.checks.iter().all(CheckResult::passed)
    }
}

/// An existing function that might fulfill a missing requirement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlternativeMatch {
    pub file: String,
    pub function_name: String,
    pub signature: String,
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: String,
}

/// Result of validating one function requirement
///
/// A found function passes even when its signature differs from the expected
/// one; the mismatch is only reported in `detail`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionValidationResult {
    pub file: String,
    pub name: String,
    pub required: bool,
    pub expected_signature: String,
    pub found: bool,
    pub signature_match: bool,
    #[serde(default)]
    pub detail: String,
    #[serde(default)]
    pub alternatives: Vec<AlternativeMatch>,
}

impl FunctionValidationResult {
    pub fn passed(&self) -> bool {
        !self.required || self.found
    }
}

fn serialize_elapsed_ms<S: Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(elapsed.as_secs_f64() * 1000.0)
}

/// Aggregated result for a complete loop specification
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoopValidationResult {
    pub loop_id: String,
    pub loop_name: String,
    pub source_identifier: String,
    pub file_results: Vec<FileValidationResult>,
    pub function_results: Vec<FunctionValidationResult>,
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_elapsed_ms")]
    pub elapsed: Duration,
}

impl LoopValidationResult {
    pub fn all_passed(&self) -> bool {
        self.file_results.iter().all(FileValidationResult::passed)
            && self.function_results.iter().all(FunctionValidationResult::passed)
    }

    /// Each requirement counts as one unit regardless of its sub-checks
    pub fn total_checks(&self) -> usize {
        self.file_results.len() + self.function_results.len()
    }

    pub fn passed_checks(&self) -> usize {
        self.file_results.iter().filter(|r| r.passed()).count()
            + self.function_results.iter().filter(|r| r.passed()).count()
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(status: CheckStatus) -> CheckResult {
        CheckResult {
            check_type: "contains".to_string(),
            pattern: "x".to_string(),
            description: String::new(),
            status,
            detail: String::new(),
        }
    }

    fn function(required: bool, found: bool, signature_match: bool) -> FunctionValidationResult {
        FunctionValidationResult {
            file: "src/auth.py".to_string(),
            name: "login".to_string(),
            required,
            expected_signature: String::new(),
            found,
            signature_match,
            detail: String::new(),
            alternatives: vec![],
        }
    }

    #[test]
    fn test_file_result_passed() {
        let mut result = FileValidationResult {
            path: "a.py".to_string(),
            purpose: String::new(),
            required: true,
            exists: true,
            checks: vec![check(CheckStatus::Passed)],
        };
        assert!(result.passed());

        result.checks.push(check(CheckStatus::Skipped));
        assert!(!result.passed());

        result.checks.clear();
        result.exists = false;
        assert!(!result.passed());

        result.required = false;
        assert!(result.passed());
    }

    #[test]
    fn test_function_result_passed() {
        assert!(function(true, true, true).passed());
        assert!(function(true, true, false).passed());
        assert!(!function(true, false, false).passed());
        assert!(function(false, false, false).passed());
    }

    #[test]
    fn test_empty_loop_passes() {
        let result = LoopValidationResult {
            loop_id: "empty".to_string(),
            loop_name: "Empty".to_string(),
            source_identifier: String::new(),
            file_results: vec![],
            function_results: vec![],
            elapsed: Duration::ZERO,
        };
        assert!(result.all_passed());
        assert_eq!(result.total_checks(), 0);
        assert_eq!(result.passed_checks(), 0);
    }

    #[test]
    fn test_loop_counts() {
        let result = LoopValidationResult {
            loop_id: "l".to_string(),
            loop_name: "L".to_string(),
            source_identifier: String::new(),
            file_results: vec![],
            function_results: vec![function(true, true, false), function(true, false, false)],
            elapsed: Duration::from_millis(12),
        };
        assert!(!result.all_passed());
        assert_eq!(result.total_checks(), 2);
        assert_eq!(result.passed_checks(), 1);

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["elapsed_ms"], 12.0);
        assert_eq!(json["function_results"][0]["signature_match"], false);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(serde_json::to_value(CheckStatus::Skipped).unwrap(), "skipped");
        assert_eq!(CheckStatus::Failed.to_string(), "failed");
    }
}
