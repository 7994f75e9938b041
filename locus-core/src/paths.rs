//! Path Algebra - URL-Compatible Path Arithmetic
//!
//! Trailing slashes are significant: `a` is a file-like reference and `a/`
//! a directory-like one. Every operation keeps that distinction on output.

use std::borrow::Cow;

/// Determine whether the supplied path is rooted.
pub fn is_absolute_path(path: &str) -> bool {
    to_slashes(path).starts_with('/')
}

/// Determine if a path refers to a directory, using rules compatible with URLs.
///
/// Directory paths: `a/`, `a/..`, `a/.`, `.`, `..`
///
/// Non-directory paths: `a`, `a/b`, `../a`, `a/../b`
pub fn is_dir_path(path: &str) -> bool {
    path.ends_with('/') || is_dot_terminated(path)
}

/// Normalize a path using forward slashes regardless of platform.
///
/// Redundant trailing slashes after a final `.` or `..` atom are dropped.
pub fn normalize_path(path: &str) -> String {
    let path = to_slashes(path);

    if path.is_empty() {
        return ".".to_string();
    }

    let absolute = path.starts_with('/');
    let trailing = path.ends_with('/');
    let mut atoms: Vec<&str> = Vec::new();

    for atom in path.split('/') {
        match atom {
            "" | "." => {}
            ".." => {
                if atoms.last().is_some_and(|last| *last != "..") {
                    atoms.pop();
                } else if !absolute {
                    atoms.push("..");
                }
            }
            _ => atoms.push(atom),
        }
    }

    let mut normalized = atoms.join("/");

    if normalized.is_empty() && !absolute {
        normalized.push('.');
    }
    if trailing && !normalized.is_empty() {
        normalized.push('/');
    }
    if absolute {
        normalized.insert(0, '/');
    }

    if normalized.len() > 1 && normalized.ends_with('/') && is_dot_terminated(&normalized) {
        normalized.pop();
    }

    normalized
}

/// Resolve a path against a base path, using rules compatible with URLs.
pub fn resolve_path(base_path: &str, path: &str) -> String {
    let base_path = normalize_path(base_path);

    if path.is_empty() {
        return base_path;
    }

    let path = normalize_path(path);

    if is_absolute_path(&path) {
        return path;
    }

    let joined = normalize_path(&format!("{}/{}", dir_of(&base_path), path));

    if is_dir_path(&path) && !is_dir_path(&joined) {
        format!("{joined}/")
    } else {
        joined
    }
}

/// Get a relative path from one path to another, using rules compatible
/// with URLs.
///
/// Paths of differing absoluteness cannot be related, so `to_path` is
/// returned (normalized) as-is.
pub fn relative_path(from_path: &str, to_path: &str) -> String {
    let to_path = normalize_path(to_path);

    if is_absolute_path(from_path) != is_absolute_path(&to_path) {
        return to_path;
    }

    let from_path = normalize_path(from_path);
    let Some(traversal) = traverse(dir_of(&from_path), &to_path) else {
        return to_path;
    };
    let relatived = normalize_path(&traversal);

    if is_dir_path(&to_path) && !is_dir_path(&relatived) {
        format!("{relatived}/")
    } else {
        relatived
    }
}

/// Append a trailing slash if the supplied path is not already a directory
/// path.
pub fn to_dir_path(path: &str) -> String {
    if is_dir_path(path) {
        path.to_string()
    } else {
        format!("{path}/")
    }
}

fn to_slashes(path: &str) -> Cow<'_, str> {
    if std::path::MAIN_SEPARATOR == '/' {
        Cow::Borrowed(path)
    } else {
        Cow::Owned(path.replace(std::path::MAIN_SEPARATOR, "/"))
    }
}

/// Assumes the supplied path is already normalized.
fn is_dot_terminated(path: &str) -> bool {
    let path = path.strip_suffix('/').unwrap_or(path);
    let last_atom = path.rsplit('/').next().unwrap_or(path);

    last_atom == "." || last_atom == ".."
}

/// The directory a normalized path is relative to: itself when it is a
/// directory path, otherwise its parent.
fn dir_of(path: &str) -> &str {
    if is_dir_path(path) {
        return path;
    }

    match path.rfind('/') {
        None => ".",
        Some(0) => "/",
        Some(index) => &path[..index],
    }
}

/// `..`-climbing traversal between two normalized paths of equal absoluteness.
///
/// Returns `None` when `from_dir` climbs above its root further than
/// `to_path` does, since the names of those parents are unknowable.
fn traverse(from_dir: &str, to_path: &str) -> Option<String> {
    let from_atoms = atoms(from_dir);
    let to_atoms = atoms(to_path);
    let common = from_atoms
        .iter()
        .zip(&to_atoms)
        .take_while(|(from, to)| from == to)
        .count();

    if from_atoms[common..].contains(&"..") {
        return None;
    }

    let mut steps = vec![".."; from_atoms.len() - common];
    steps.extend_from_slice(&to_atoms[common..]);

    Some(steps.join("/"))
}

fn atoms(path: &str) -> Vec<&str> {
    path.split('/')
        .filter(|atom| !atom.is_empty() && *atom != ".")
        .collect()
}
