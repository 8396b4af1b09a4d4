//! Function inventory - every function definition in a codebase
//!
//! Built once per batch and shared read-only as candidate material for the
//! semantic alternative search.

use std::path::Path;

use serde::Serialize;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::InventoryConfig;
use crate::source::SourceFile;

/// One function or method found while walking the codebase
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionInfo {
    /// Path relative to the codebase root, `/`-separated
    pub file: String,
    pub name: String,
    pub signature: String,
    pub docstring: String,
    pub line_number: usize,
    pub source_preview: String,
}

/// Walk `root` and collect every function definition in its Python files
///
/// Excluded directory names are pruned wherever they appear. Files larger than
/// `max-file-bytes` and files that fail to parse are skipped silently.
pub fn build_inventory(root: &Path, config: &InventoryConfig) -> Vec<FunctionInfo> {
    debug!(?root, "build_inventory: called");
    let mut functions = Vec::new();
    let mut files_seen = 0usize;

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            if e.depth() == 0 || !e.file_type().is_dir() {
                return true;
            }
            let name = e.file_name().to_string_lossy();
            !config.exclude_dirs.iter().any(|x| *x == name)
        });

    for entry in walker.filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() || entry.path().extension().and_then(|e| e.to_str()) != Some("py") {
            continue;
        }

        match entry.metadata() {
            Ok(meta) if meta.len() > config.max_file_bytes => {
                debug!(path = ?entry.path(), size = meta.len(), "build_inventory: skipping large file");
                continue;
            }
            Ok(_) => {}
            Err(e) => {
                debug!(path = ?entry.path(), error = %e, "build_inventory: metadata unavailable");
                continue;
            }
        }

        let file = match SourceFile::open(entry.path()) {
            Ok(f) => f,
            Err(e) => {
                debug!(path = ?entry.path(), error = %e, "build_inventory: unreadable file");
                continue;
            }
        };
        let Some(parsed) = file.parsed() else {
            continue;
        };
        files_seen += 1;

        let rel = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        for def in parsed.functions() {
            functions.push(FunctionInfo {
                file: rel.clone(),
                name: def.name.clone(),
                signature: def.signature.clone(),
                docstring: def.docstring.clone(),
                line_number: def.line_number,
                source_preview: parsed.preview(def, config.preview_lines),
            });
        }
    }

    info!(files = files_seen, functions = functions.len(), "Function inventory built");
    functions
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_collects_functions_with_relative_paths() {
        let dir = tempdir().unwrap();
        write(
            dir.path(),
            "src/auth.py",
            "def login(user, password):\n    \"\"\"Log a user in.\"\"\"\n    return True\n",
        );
        write(dir.path(), "src/billing/charge.py", "class C:\n    def run(self, amount: int):\n        pass\n");

        let inventory = build_inventory(dir.path(), &InventoryConfig::default());
        assert_eq!(inventory.len(), 2);

        let login = inventory.iter().find(|f| f.name == "login").unwrap();
        assert_eq!(login.file, "src/auth.py");
        assert_eq!(login.signature, "login(user, password)");
        assert_eq!(login.docstring, "Log a user in.");
        assert_eq!(login.line_number, 1);
        assert!(login.source_preview.starts_with("def login"));

        let run = inventory.iter().find(|f| f.name == "run").unwrap();
        assert_eq!(run.file, "src/billing/charge.py");
        assert_eq!(run.signature, "run(amount: int)");
    }

    #[test]
    fn test_excluded_dirs_pruned() {
        let dir = tempdir().unwrap();
        write(dir.path(), "app.py", "def keep():\n    pass\n");
        write(dir.path(), "venv/lib/site.py", "def vendored():\n    pass\n");
        write(dir.path(), "pkg/__pycache__/x.py", "def cached():\n    pass\n");
        write(dir.path(), "tests/test_app.py", "def test_keep():\n    pass\n");

        let names: Vec<_> = build_inventory(dir.path(), &InventoryConfig::default())
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec!["keep"]);
    }

    #[test]
    fn test_large_and_broken_files_skipped() {
        let dir = tempdir().unwrap();
        write(dir.path(), "big.py", &format!("def big():\n    x = '{}'\n", "a".repeat(200)));
        write(dir.path(), "broken.py", "def broken(:\n");
        write(dir.path(), "ok.py", "def ok():\n    pass\n");

        let config = InventoryConfig {
            max_file_bytes: 100,
            ..InventoryConfig::default()
        };
        let names: Vec<_> = build_inventory(dir.path(), &config).into_iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["ok"]);
    }

    #[test]
    fn test_preview_bounded() {
        let dir = tempdir().unwrap();
        let body: String = (0..50).map(|i| format!("    x{} = {}\n", i, i)).collect();
        write(dir.path(), "long.py", &format!("def long():\n{}", body));

        let config = InventoryConfig {
            preview_lines: 5,
            ..InventoryConfig::default()
        };
        let inventory = build_inventory(dir.path(), &config);
        assert_eq!(inventory[0].source_preview.lines().count(), 5);
    }

    #[test]
    fn test_missing_root_is_empty() {
        let dir = tempdir().unwrap();
        assert!(build_inventory(&dir.path().join("nope"), &InventoryConfig::default()).is_empty());
    }
}
