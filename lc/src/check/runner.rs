//! Check runner - dispatches a normalized check against one source file

use regex::Regex;
use tracing::debug;

use super::{CheckKind, CheckType, NormalizedCheck};
use crate::domain::{CheckResult, CheckStatus};
use crate::source::{ParsedSource, SourceFile};

pub const DETAIL_PATTERN_NOT_FOUND: &str = "Pattern not found in file";
pub const DETAIL_NOT_PARSED: &str = "could not parse file";
pub const DETAIL_FILE_MISSING: &str = "file does not exist";

fn result(check: &NormalizedCheck, status: CheckStatus, detail: impl Into<String>) -> CheckResult {
    CheckResult {
        check_type: check.kind.name().to_string(),
        pattern: check.pattern.clone(),
        description: check.description.clone(),
        status,
        detail: detail.into(),
    }
}

/// Failed result for a check whose file could not be resolved
pub fn failed_missing_file(check: &NormalizedCheck) -> CheckResult {
    failed_with_detail(check, DETAIL_FILE_MISSING)
}

/// Failed result carrying an explanation, for checks that never ran
pub fn failed_with_detail(check: &NormalizedCheck, detail: impl Into<String>) -> CheckResult {
    result(check, CheckStatus::Failed, detail)
}

/// Run one check against a file
///
/// `Contains` works on the raw text; every other kind needs the syntax tree
/// and fails with "could not parse file" when there is none.
pub fn run_check(check: &NormalizedCheck, file: &SourceFile) -> CheckResult {
    debug!(check_type = check.kind.name(), pattern = %check.pattern, path = ?file.path(), "run_check: called");
    let check_type = match &check.kind {
        CheckKind::Known(t) => *t,
        CheckKind::Unrecognized(name) => {
            debug!(%name, "run_check: unrecognized check type, skipping");
            return result(check, CheckStatus::Skipped, format!("Unknown check type: {}", name));
        }
    };

    let (label, lookup): (&str, fn(&ParsedSource, &str) -> bool) = match check_type {
        CheckType::Contains => {
            return if contains(&file.text(), &check.pattern) {
                result(check, CheckStatus::Passed, "")
            } else {
                result(check, CheckStatus::Failed, DETAIL_PATTERN_NOT_FOUND)
            };
        }
        CheckType::FunctionExists => ("Function", has_function),
        CheckType::ClassExists => ("Class", has_class),
        CheckType::ImportExists => ("Import", has_import),
    };

    let Some(parsed) = file.parsed() else {
        debug!(path = ?file.path(), "run_check: no syntax tree available");
        return result(check, CheckStatus::Failed, DETAIL_NOT_PARSED);
    };

    let found = lookup(parsed, &check.pattern);
    if found {
        result(check, CheckStatus::Passed, "")
    } else {
        result(
            check,
            CheckStatus::Failed,
            format!("{} '{}' not found", label, check.pattern),
        )
    }
}

/// Literal substring first, then a regex search
fn contains(text: &str, pattern: &str) -> bool {
    if text.contains(pattern) {
        return true;
    }
    match Regex::new(pattern) {
        Ok(re) => re.is_match(text),
        Err(e) => {
            debug!(%pattern, error = %e, "contains: pattern is not a valid regex");
            false
        }
    }
}

fn has_function(parsed: &ParsedSource, pattern: &str) -> bool {
    parsed.function_names().iter().any(|n| n == pattern)
}

fn has_class(parsed: &ParsedSource, pattern: &str) -> bool {
    parsed.class_names().iter().any(|n| n == pattern)
}

/// Substring match over imported names; suffix matches are a subset of this
fn has_import(parsed: &ParsedSource, pattern: &str) -> bool {
    parsed.imported_names().iter().any(|name| name.contains(pattern))
}
