//! Requirement path resolution, confined to the codebase root

use std::path::{Component, Path, PathBuf};

use tracing::debug;

/// Resolve `relative` against an already canonical `root`
///
/// A leading `/` means root-relative. `..` may not climb above the root, and
/// the final path (after following symlinks) must still be inside it. Returns
/// `None` when the path does not exist or escapes.
pub(crate) fn resolve_in_root(root: &Path, relative: &str) -> Option<PathBuf> {
    let trimmed = relative.trim().trim_start_matches(['/', '\\']);
    if trimmed.is_empty() {
        return None;
    }

    let mut normalized = PathBuf::new();
    for component in Path::new(trimmed).components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    debug!(%relative, "resolve_in_root: path climbs above root");
                    return None;
                }
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    let resolved = root.join(&normalized).canonicalize().ok()?;
    if resolved.starts_with(root) {
        Some(resolved)
    } else {
        debug!(%relative, ?resolved, "resolve_in_root: path escapes root");
        None
    }
}
