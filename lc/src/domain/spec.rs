//! Loop specification types
//!
//! A loop specification is produced by an external collaborator (a JSON file in
//! the loops directory) and handed to the engine as an immutable value. Only the
//! `requirements.files` and `requirements.functions` sections are interpreted;
//! every other key is carried through untouched.

use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

fn default_loop_id() -> String {
    "unknown".to_string()
}

fn default_loop_name() -> String {
    "Unnamed Loop".to_string()
}

fn default_required() -> bool {
    true
}

fn default_check_type() -> String {
    "contains".to_string()
}

/// Treat an explicit `null` like an absent key
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_required<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or_else(default_required))
}

fn null_as_loop_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(default_loop_id))
}

fn null_as_loop_name<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(default_loop_name))
}

/// One growth loop specification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopSpec {
    #[serde(default = "default_loop_id", deserialize_with = "null_as_loop_id")]
    pub loop_id: String,

    #[serde(default = "default_loop_name", deserialize_with = "null_as_loop_name")]
    pub name: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub requirements: Requirements,

    /// Keys this engine does not interpret (dependencies, metrics, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,

    /// Where the spec was loaded from, if it came from a file
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl LoopSpec {
    /// Create an empty spec with the given id and name
    pub fn new(loop_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            loop_id: loop_id.into(),
            name: name.into(),
            requirements: Requirements::default(),
            extra: Map::new(),
            source: None,
        }
    }

    /// Parse a spec from JSON text
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Identifier of the spec's origin, empty when constructed in memory
    pub fn source_identifier(&self) -> String {
        self.source
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default()
    }
}

/// The `requirements` block of a loop specification
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Requirements {
    #[serde(default, deserialize_with = "null_as_default")]
    pub files: Vec<FileRequirement>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub functions: Vec<FunctionRequirement>,

    /// integrations, telemetry and anything else, passed through unused
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A file that must exist, optionally with checks against its content
///
/// Absent or `null` fields fall back to empty values, so a sloppy entry still
/// validates (and fails) instead of rejecting the whole loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRequirement {
    /// Path relative to the codebase root
    #[serde(default, deserialize_with = "null_as_default")]
    pub path: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub purpose: String,

    #[serde(default = "default_required", deserialize_with = "null_as_required")]
    pub required: bool,

    #[serde(default, deserialize_with = "null_as_default")]
    pub checks: Vec<RawCheck>,
}

impl FileRequirement {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            purpose: String::new(),
            required: true,
            checks: Vec::new(),
        }
    }

    pub fn with_check(mut self, check: RawCheck) -> Self {
        self.checks.push(check);
        self
    }
}

/// A function that must be defined in a given file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionRequirement {
    /// File path relative to the codebase root
    #[serde(default, deserialize_with = "null_as_default")]
    pub file: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,

    #[serde(default = "default_required", deserialize_with = "null_as_required")]
    pub required: bool,

    #[serde(
        default,
        rename = "signature",
        alias = "expected_signature",
        deserialize_with = "null_as_default"
    )]
    pub expected_signature: String,

    /// Free-text description of the required behavior
    #[serde(default, deserialize_with = "null_as_default")]
    pub logic: String,
}

impl FunctionRequirement {
    pub fn new(file: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            name: name.into(),
            required: true,
            expected_signature: String::new(),
            logic: String::new(),
        }
    }

    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.expected_signature = signature.into();
        self
    }

    pub fn with_logic(mut self, logic: impl Into<String>) -> Self {
        self.logic = logic.into();
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

/// A check entry exactly as authored
///
/// Two generations of syntax exist: the structured object form and the older
/// call-like string form `kind('pattern')`. Anything else is kept as raw JSON
/// so it can still degrade to a text search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawCheck {
    Structured(StructuredCheck),
    Legacy(String),
    Other(Value),
}

/// Structured check form: `{"type": ..., "pattern": ..., "description": ...}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredCheck {
    #[serde(rename = "type", default = "default_check_type")]
    pub check_type: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub pattern: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
}

impl RawCheck {
    pub fn structured(check_type: impl Into<String>, pattern: impl Into<String>) -> Self {
        RawCheck::Structured(StructuredCheck {
            check_type: check_type.into(),
            pattern: pattern.into(),
            description: String::new(),
        })
    }

    pub fn legacy(text: impl Into<String>) -> Self {
        RawCheck::Legacy(text.into())
    }
}
