//! Path arithmetic for base-path agnostic pages.
//!
//! Pages never know where they are mounted. Everything they link to is
//! expressed relative to their own depth, so the gateway works behind any
//! reverse-proxy prefix.

use std::path::{Component, Path, PathBuf};

/// Collapse runs of `/` and drop trailing slashes.
///
/// With `keep_trailing`, a trailing run collapses to a single `/` instead.
pub fn normalize(url: &str, keep_trailing: bool) -> String {
    let mut out = String::with_capacity(url.len());
    for ch in url.chars() {
        if ch == '/' && out.ends_with('/') {
            continue;
        }
        out.push(ch);
    }
    if out.ends_with('/') {
        out.pop();
        if keep_trailing {
            out.push('/');
        }
    }
    out
}

/// Relative path from the page at `url` back to the root.
///
/// Each `/` outside the query string is one level of nesting:
///
/// ```text
/// /          => .
/// /foo       => .
/// /foo/      => ./..
/// /foo/bar   => ./..
/// /foo/bar/  => ./../..
/// ```
pub fn relative_root(url: &str) -> String {
    let path = url.split('?').next().unwrap_or_default();
    let depth = path.matches('/').count();
    let ups = if depth > 1 { "../".repeat(depth - 1) } else { String::new() };
    normalize(&format!("./{ups}"), false)
}

/// Lexically resolve `.` and `..` without touching the filesystem.
///
/// `..` never climbs above the root of an absolute path.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
