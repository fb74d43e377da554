//! Jailed path resolution.
//!
//! Client paths are resolved lexically against the session's current directory (or the
//! jail root for absolute input), normalized, and accepted only when the result stays
//! at or below the jail root. The prefix test is component-wise, so `/srv/ftpx` is never
//! taken to be inside `/srv/ftp`.

use std::path::{Component, Path, PathBuf};

/// Resolves `raw` to an absolute path inside `jail_root`.
///
/// Returns `None` when the path escapes the jail or cannot be normalized. Callers must
/// reply with an error in that case and never fall back to the unresolved input.
pub fn resolve(raw: Option<&str>, current_dir: &Path, jail_root: &Path) -> Option<PathBuf> {
    let raw = raw.unwrap_or_default();

    if raw.contains('\0') {
        return None;
    }

    if raw.is_empty() {
        return confine(normalize(current_dir)?, jail_root);
    }

    let raw = raw.replace('\\', "/");

    if raw == "/" {
        return confine(normalize(jail_root)?, jail_root);
    }

    let joined = match raw.strip_prefix('/') {
        Some(rel) => jail_root.join(rel.trim_start_matches('/')),
        None => current_dir.join(&raw),
    };

    confine(normalize(&joined)?, jail_root)
}

/// Renders `path` as the client sees it: rooted at `/` relative to the jail.
pub fn virtual_path(path: &Path, jail_root: &Path) -> String {
    let Ok(rel) = path.strip_prefix(jail_root) else {
        return "/".to_string();
    };

    let parts = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>();

    format!("/{}", parts.join("/"))
}

/// Lexically resolves `.` and `..`; fails if `..` would climb above the filesystem root
/// or the path is relative.
fn normalize(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    let mut depth = 0usize;

    for component in path.components() {
        match component {
            Component::Prefix(p) => out.push(p.as_os_str()),
            Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if depth == 0 {
                    return None;
                }
                out.pop();
                depth -= 1;
            }
            Component::Normal(name) => {
                out.push(name);
                depth += 1;
            }
        }
    }

    out.is_absolute().then_some(out)
}

fn confine(path: PathBuf, jail_root: &Path) -> Option<PathBuf> {
    if path.starts_with(jail_root) {
        Some(path)
    } else {
        tracing::warn!(path = %path.display(), jail = %jail_root.display(), "path escapes jail");
        None
    }
}
