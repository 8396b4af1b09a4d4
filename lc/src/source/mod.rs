//! Source inspection for Python files
//!
//! A [`SourceFile`] owns the bytes of one file and parses them with
//! tree-sitter on first structural query. The structural facts are extracted
//! once and cached on the value; dropping the value drops the cache, so nothing
//! leaks between files or between runs.
//!
//! Parse failure (invalid UTF-8, syntax errors, non-Python file) yields no
//! [`ParsedSource`]; callers treat that as "not found" instead of an error.

mod signature;

use std::borrow::Cow;
use std::cell::OnceCell;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use tracing::debug;
use tree_sitter::{Language, Node, Parser};

/// A function or method definition found in a parsed file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDef {
    pub name: String,
    pub signature: String,
    pub docstring: String,
    /// 1-based line of the `def`
    pub line_number: usize,
}

/// Structural facts of one successfully parsed Python file
#[derive(Debug, Clone)]
pub struct ParsedSource {
    source: String,
    functions: Vec<FunctionDef>,
    function_names: Vec<String>,
    class_names: Vec<String>,
    imports: Vec<String>,
}

impl ParsedSource {
    /// Parse Python source, returning `None` on any decode or syntax failure
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        let text = match std::str::from_utf8(bytes) {
            Ok(t) => t,
            Err(e) => {
                debug!(error = %e, "parse: source is not valid UTF-8");
                return None;
            }
        };
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);

        let mut parser = Parser::new();
        let language: Language = tree_sitter_python::LANGUAGE.into();
        if let Err(e) = parser.set_language(&language) {
            debug!(error = %e, "parse: failed to load Python grammar");
            return None;
        }
        let tree = parser.parse(text, None)?;
        let root = tree.root_node();
        if root.has_error() {
            debug!("parse: syntax tree contains errors");
            return None;
        }

        let mut parsed = Self {
            source: text.to_string(),
            functions: Vec::new(),
            function_names: Vec::new(),
            class_names: Vec::new(),
            imports: Vec::new(),
        };
        parsed.collect(root);
        Some(parsed)
    }

    /// Breadth-first walk recording definitions and imports
    fn collect(&mut self, root: Node<'_>) {
        let owned = self.source.clone();
        let src = owned.as_bytes();
        let mut queue = VecDeque::from([root]);
        let mut cursor = root.walk();

        while let Some(node) = queue.pop_front() {
            match node.kind() {
                "function_definition" => {
                    if let Some(name) = field_text(node, "name", src) {
                        self.function_names.push(name.to_string());
                        self.functions.push(FunctionDef {
                            name: name.to_string(),
                            signature: signature::format_signature(node, src),
                            docstring: signature::docstring(node, src),
                            line_number: node.start_position().row + 1,
                        });
                    }
                }
                "class_definition" => {
                    if let Some(name) = field_text(node, "name", src) {
                        self.class_names.push(name.to_string());
                    }
                }
                "import_statement" => {
                    for name in node.children_by_field_name("name", &mut cursor) {
                        if let Some(module) = imported_module(name, src) {
                            self.imports.push(module);
                        }
                    }
                }
                "import_from_statement" => self.collect_from_import(node, src),
                "future_import_statement" => {
                    self.imports.push("__future__".to_string());
                    for name in node.children_by_field_name("name", &mut cursor) {
                        if let Some(feature) = imported_module(name, src) {
                            self.imports.push(format!("__future__.{}", feature));
                        }
                    }
                }
                _ => {}
            }
            queue.extend(node.named_children(&mut cursor));
        }
    }

    fn collect_from_import(&mut self, node: Node<'_>, src: &[u8]) {
        let module = node
            .child_by_field_name("module_name")
            .map(|m| match m.kind() {
                "relative_import" => {
                    let mut cursor = m.walk();
                    m.named_children(&mut cursor)
                        .find(|c| c.kind() == "dotted_name")
                        .map(|c| node_text(c, src).to_string())
                        .unwrap_or_default()
                }
                _ => node_text(m, src).to_string(),
            })
            .unwrap_or_default();

        if !module.is_empty() {
            self.imports.push(module.clone());
        }

        let qualify = |name: &str| {
            if module.is_empty() {
                name.to_string()
            } else {
                format!("{}.{}", module, name)
            }
        };

        let mut cursor = node.walk();
        let names: Vec<String> = node
            .children_by_field_name("name", &mut cursor)
            .filter_map(|n| imported_module(n, src))
            .collect();
        for name in names {
            self.imports.push(qualify(&name));
        }

        let mut cursor = node.walk();
        if node.named_children(&mut cursor).any(|c| c.kind() == "wildcard_import") {
            self.imports.push(qualify("*"));
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Names of every function and method, in breadth-first order
    pub fn function_names(&self) -> &[String] {
        &self.function_names
    }

    pub fn class_names(&self) -> &[String] {
        &self.class_names
    }

    /// Imported module paths and `module.symbol` names
    pub fn imported_names(&self) -> &[String] {
        &self.imports
    }

    /// Formatted signature of the first function with this name
    pub fn function_signature(&self, name: &str) -> Option<&str> {
        self.functions
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.signature.as_str())
    }

    pub fn functions(&self) -> &[FunctionDef] {
        &self.functions
    }

    /// The first `lines` source lines starting at the definition
    pub fn preview(&self, def: &FunctionDef, lines: usize) -> String {
        self.source
            .lines()
            .skip(def.line_number.saturating_sub(1))
            .take(lines)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn node_text<'a>(node: Node<'_>, src: &'a [u8]) -> &'a str {
    node.utf8_text(src).unwrap_or("")
}

fn field_text<'a>(node: Node<'_>, field: &str, src: &'a [u8]) -> Option<&'a str> {
    node.child_by_field_name(field)
        .map(|n| node_text(n, src))
        .filter(|s| !s.is_empty())
}

/// `a.b` for a `dotted_name`, or the original name of an `aliased_import`
fn imported_module(node: Node<'_>, src: &[u8]) -> Option<String> {
    let target = match node.kind() {
        "aliased_import" => node.child_by_field_name("name")?,
        _ => node,
    };
    let text = node_text(target, src);
    (!text.is_empty()).then(|| text.to_string())
}

/// One file on disk (or in memory) awaiting inspection
#[derive(Debug)]
pub struct SourceFile {
    path: PathBuf,
    bytes: Vec<u8>,
    parsed: OnceCell<Option<ParsedSource>>,
}

impl SourceFile {
    /// Read a file from disk
    pub fn open(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        let bytes = std::fs::read(&path)?;
        Ok(Self::from_bytes(path, bytes))
    }

    pub fn from_bytes(path: impl Into<PathBuf>, bytes: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            bytes,
            parsed: OnceCell::new(),
        }
    }

    pub fn from_text(path: impl Into<PathBuf>, text: &str) -> Self {
        Self::from_bytes(path, text.as_bytes().to_vec())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File content with invalid UTF-8 replaced
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }

    pub fn is_python(&self) -> bool {
        matches!(
            self.path.extension().and_then(|e| e.to_str()),
            Some("py") | Some("pyi")
        )
    }

    /// Parsed structure, computed on first call
    pub fn parsed(&self) -> Option<&ParsedSource> {
        self.parsed
            .get_or_init(|| {
                if !self.is_python() {
                    debug!(path = ?self.path, "parsed: not a Python file");
                    return None;
                }
                let parsed = ParsedSource::parse(&self.bytes);
                if parsed.is_none() {
                    debug!(path = ?self.path, "parsed: could not parse file");
                }
                parsed
            })
            .as_ref()
    }
}
