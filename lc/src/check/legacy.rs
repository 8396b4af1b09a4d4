//! Parser for the legacy call-like check syntax
//!
//! Grammar (after trimming surrounding whitespace):
//!
//! ```text
//! check   := kind "(" quote pattern quote ")"
//! kind    := contains_pattern | contains_logic | function_exists
//!          | defines_class | class_exists | import_exists
//! quote   := "'" | "\""          (both quotes must match)
//! pattern := one or more characters other than the quote
//! ```

use tracing::debug;

use super::CheckType;

/// The six call forms of the legacy syntax
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyKind {
    ContainsPattern,
    ContainsLogic,
    FunctionExists,
    DefinesClass,
    ClassExists,
    ImportExists,
}

impl LegacyKind {
    pub const ALL: [LegacyKind; 6] = [
        LegacyKind::ContainsPattern,
        LegacyKind::ContainsLogic,
        LegacyKind::FunctionExists,
        LegacyKind::DefinesClass,
        LegacyKind::ClassExists,
        LegacyKind::ImportExists,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    pub fn name(&self) -> &'static str {
        match self {
            LegacyKind::ContainsPattern => "contains_pattern",
            LegacyKind::ContainsLogic => "contains_logic",
            LegacyKind::FunctionExists => "function_exists",
            LegacyKind::DefinesClass => "defines_class",
            LegacyKind::ClassExists => "class_exists",
            LegacyKind::ImportExists => "import_exists",
        }
    }

    pub fn check_type(&self) -> CheckType {
        match self {
            LegacyKind::ContainsPattern | LegacyKind::ContainsLogic => CheckType::Contains,
            LegacyKind::FunctionExists => CheckType::FunctionExists,
            LegacyKind::DefinesClass | LegacyKind::ClassExists => CheckType::ClassExists,
            LegacyKind::ImportExists => CheckType::ImportExists,
        }
    }
}

/// A successfully parsed legacy check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegacyCheck<'a> {
    pub kind: LegacyKind,
    pub pattern: &'a str,
}

/// Parse `kind('pattern')`, returning `None` when the input does not follow the grammar
pub fn parse_legacy(input: &str) -> Option<LegacyCheck<'_>> {
    let input = input.trim();
    let open = input.find('(')?;
    let kind = LegacyKind::from_name(&input[..open])?;

    let args = input[open + 1..].strip_suffix(')')?;
    let quote = args.chars().next().filter(|c| *c == '\'' || *c == '"')?;
    let pattern = args[1..].strip_suffix(quote)?;

    if pattern.is_empty() || pattern.contains(quote) {
        debug!(%input, "parse_legacy: empty or unbalanced pattern");
        return None;
    }

    Some(LegacyCheck { kind, pattern })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_six_forms() {
        let cases = [
            ("contains_pattern('stripe.Charge')", CheckType::Contains),
            ("contains_logic('if user.is_paid')", CheckType::Contains),
            ("function_exists('scan_for_leaks')", CheckType::FunctionExists),
            ("defines_class('Invoice')", CheckType::ClassExists),
            ("class_exists('Invoice')", CheckType::ClassExists),
            ("import_exists('stripe')", CheckType::ImportExists),
        ];

        for (input, expected) in cases {
            let parsed = parse_legacy(input).unwrap_or_else(|| panic!("failed to parse {}", input));
            assert_eq!(parsed.kind.check_type(), expected, "{}", input);
        }
    }

    #[test]
    fn test_pattern_extracted() {
        let parsed = parse_legacy("function_exists('scan_for_leaks')").unwrap();
        assert_eq!(parsed.kind, LegacyKind::FunctionExists);
        assert_eq!(parsed.pattern, "scan_for_leaks");
    }

    #[test]
    fn test_surrounding_whitespace_ignored() {
        let parsed = parse_legacy("  import_exists('pkg.mod')\n").unwrap();
        assert_eq!(parsed.pattern, "pkg.mod");
    }

    #[test]
    fn test_double_quotes() {
        let parsed = parse_legacy("contains_pattern(\"it's here\")").unwrap();
        assert_eq!(parsed.kind, LegacyKind::ContainsPattern);
        assert_eq!(parsed.pattern, "it's here");
    }

    #[test]
    fn test_pattern_may_contain_parens() {
        let parsed = parse_legacy("contains_pattern('track(event)')").unwrap();
        assert_eq!(parsed.pattern, "track(event)");
    }

    #[test]
    fn test_rejects_malformed() {
        let inputs = [
            "",
            "stripe.Charge.create",
            "unknown_kind('x')",
            "function_exists()",
            "function_exists('')",
            "function_exists('x'",
            "function_exists(x)",
            "function_exists('x\")",
            "function_exists('a'b')",
            "function_exists ('x')",
            "function_exists('x') trailing",
            "(')",
        ];
        for input in inputs {
            assert!(parse_legacy(input).is_none(), "should reject {:?}", input);
        }
    }

    #[test]
    fn test_kind_names_roundtrip() {
        for kind in LegacyKind::ALL {
            assert_eq!(LegacyKind::from_name(kind.name()), Some(kind));
        }
    }
}
