//! Check normalization
//!
//! Checks arrive either as structured objects or as legacy `kind('pattern')`
//! strings. Both are converted into one [`NormalizedCheck`] before running.
//! Malformed entries never abort a run: they degrade to a text search.

mod legacy;
mod runner;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{RawCheck, StructuredCheck};

pub use legacy::{LegacyCheck, LegacyKind, parse_legacy};
pub use runner::{
    DETAIL_FILE_MISSING, DETAIL_NOT_PARSED, DETAIL_PATTERN_NOT_FOUND, failed_missing_file, failed_with_detail, run_check,
};

/// The closed set of check kinds the runner understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckType {
    Contains,
    FunctionExists,
    ClassExists,
    ImportExists,
}

impl CheckType {
    /// Canonical name used in reports and the structured form
    pub fn name(&self) -> &'static str {
        match self {
            CheckType::Contains => "contains",
            CheckType::FunctionExists => "function_exists",
            CheckType::ClassExists => "class_exists",
            CheckType::ImportExists => "import_exists",
        }
    }

    /// Resolve a structured `type` value, accepting the legacy aliases too
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            "contains" => Some(CheckType::Contains),
            "function_exists" => Some(CheckType::FunctionExists),
            "class_exists" => Some(CheckType::ClassExists),
            "import_exists" => Some(CheckType::ImportExists),
            other => LegacyKind::from_name(other).map(|k| k.check_type()),
        }
    }
}

impl std::fmt::Display for CheckType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Check kind after normalization
///
/// Structured checks may name a type this engine does not know; those are kept
/// so the runner can report them as skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckKind {
    Known(CheckType),
    Unrecognized(String),
}

impl CheckKind {
    pub fn name(&self) -> &str {
        match self {
            CheckKind::Known(t) => t.name(),
            CheckKind::Unrecognized(name) => name,
        }
    }
}

/// A check in canonical form, produced once per raw entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedCheck {
    pub kind: CheckKind,
    pub pattern: String,
    pub description: String,
}

impl NormalizedCheck {
    pub fn new(check_type: CheckType, pattern: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: CheckKind::Known(check_type),
            pattern: pattern.into(),
            description: description.into(),
        }
    }

    /// Literal text search for the whole input
    fn contains_fallback(text: &str) -> Self {
        Self::new(CheckType::Contains, text, format!("contains: {}", text))
    }

    /// Convert back into the structured raw form
    pub fn to_raw(&self) -> RawCheck {
        RawCheck::Structured(StructuredCheck {
            check_type: self.kind.name().to_string(),
            pattern: self.pattern.clone(),
            description: self.description.clone(),
        })
    }
}

/// Normalize a raw check entry of either generation
pub fn normalize(raw: &RawCheck) -> NormalizedCheck {
    match raw {
        RawCheck::Structured(s) => {
            let kind = match CheckType::from_name(&s.check_type) {
                Some(t) => CheckKind::Known(t),
                None => {
                    debug!(check_type = %s.check_type, "normalize: unrecognized structured type");
                    CheckKind::Unrecognized(s.check_type.clone())
                }
            };
            NormalizedCheck {
                kind,
                pattern: s.pattern.clone(),
                description: s.description.clone(),
            }
        }
        RawCheck::Legacy(text) => match parse_legacy(text) {
            Some(LegacyCheck { kind, pattern }) => {
                let check_type = kind.check_type();
                NormalizedCheck::new(check_type, pattern, format!("{}: {}", check_type, pattern))
            }
            None => {
                debug!(%text, "normalize: not a legacy call, treating as literal pattern");
                NormalizedCheck::contains_fallback(text.trim())
            }
        },
        RawCheck::Other(value) => {
            debug!(%value, "normalize: non-object check, treating as literal pattern");
            NormalizedCheck::contains_fallback(&value.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_structured_known_type() {
        let check = normalize(&RawCheck::Structured(StructuredCheck {
            check_type: "import_exists".to_string(),
            pattern: "stripe".to_string(),
            description: "Stripe SDK".to_string(),
        }));
        assert_eq!(check.kind, CheckKind::Known(CheckType::ImportExists));
        assert_eq!(check.pattern, "stripe");
        assert_eq!(check.description, "Stripe SDK");
    }

    #[test]
    fn test_structured_alias_type() {
        let check = normalize(&RawCheck::structured("defines_class", "Invoice"));
        assert_eq!(check.kind, CheckKind::Known(CheckType::ClassExists));
    }

    #[test]
    fn test_structured_unknown_type_is_kept() {
        let check = normalize(&RawCheck::structured("regex_match", "a+b"));
        assert_eq!(check.kind, CheckKind::Unrecognized("regex_match".to_string()));
        assert_eq!(check.kind.name(), "regex_match");
    }

    #[test]
    fn test_legacy_function_exists() {
        let check = normalize(&RawCheck::legacy("function_exists('scan_for_leaks')"));
        assert_eq!(check.kind, CheckKind::Known(CheckType::FunctionExists));
        assert_eq!(check.pattern, "scan_for_leaks");
        assert_eq!(check.description, "function_exists: scan_for_leaks");
    }

    #[test]
    fn test_legacy_aliases_map() {
        assert_eq!(
            normalize(&RawCheck::legacy("contains_logic('retry')")).kind,
            CheckKind::Known(CheckType::Contains)
        );
        assert_eq!(
            normalize(&RawCheck::legacy("defines_class('Ledger')")).kind,
            CheckKind::Known(CheckType::ClassExists)
        );
    }

    #[test]
    fn test_malformed_string_falls_back_to_contains() {
        let check = normalize(&RawCheck::legacy("  stripe.Charge.create "));
        assert_eq!(check.kind, CheckKind::Known(CheckType::Contains));
        assert_eq!(check.pattern, "stripe.Charge.create");
        assert_eq!(check.description, "contains: stripe.Charge.create");
    }

    #[test]
    fn test_other_json_falls_back_to_contains() {
        let check = normalize(&RawCheck::Other(json!(["a", "b"])));
        assert_eq!(check.kind, CheckKind::Known(CheckType::Contains));
        assert_eq!(check.pattern, r#"["a","b"]"#);
    }

    fn raw_check_strategy() -> impl Strategy<Value = RawCheck> {
        let type_name = prop_oneof![
            Just("contains".to_string()),
            Just("function_exists".to_string()),
            Just("class_exists".to_string()),
            Just("import_exists".to_string()),
            Just("contains_pattern".to_string()),
            Just("defines_class".to_string()),
            "[a-z_]{1,12}",
        ];
        let kind = prop_oneof![
            Just("contains_pattern"),
            Just("contains_logic"),
            Just("function_exists"),
            Just("defines_class"),
            Just("class_exists"),
            Just("import_exists"),
            Just("bogus"),
        ];
        prop_oneof![
            (type_name, ".{0,20}", ".{0,20}").prop_map(|(t, p, d)| RawCheck::Structured(StructuredCheck {
                check_type: t,
                pattern: p,
                description: d,
            })),
            (kind, "[^'\"]{0,16}").prop_map(|(k, p)| RawCheck::Legacy(format!("{}('{}')", k, p))),
            ".{0,30}".prop_map(RawCheck::Legacy),
            any::<i64>().prop_map(|n| RawCheck::Other(json!(n))),
        ]
    }

    proptest! {
        #[test]
        fn prop_normalize_is_idempotent(raw in raw_check_strategy()) {
            let once = normalize(&raw);
            let twice = normalize(&once.to_raw());
            prop_assert_eq!(once, twice);
        }
    }
}
