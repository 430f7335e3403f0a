//! Path helpers for the flat entry store.
//!
//! # Path Convention
//!
//! - Root folder: empty string `""`
//! - Top-level entry: `"/docs"`
//! - Nested entry: `"/docs/report.pdf"`
//! - No trailing slashes; `path == parent + "/" + name` for every entry

/// Get the parent directory of a path.
///
/// Returns the root (empty string) for root or top-level paths.
pub fn parent_path(path: &str) -> &str {
    match path.rsplit_once('/') {
        Some((parent, _)) => parent,
        None => "",
    }
}

/// Get the last segment of a path.
pub fn leaf_name(path: &str) -> &str {
    match path.rsplit_once('/') {
        Some((_, name)) => name,
        None => path,
    }
}

/// Join a parent path and a child name.
///
/// `join_path("", "docs")` is `"/docs"`.
pub fn join_path(parent: &str, name: &str) -> String {
    format!("{}/{}", parent.trim_end_matches('/'), name)
}

/// Iterate the non-empty segments of a path.
///
/// Both `""` and `"/"` yield no segments.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Normalize a path by resolving `.` and `..` components.
///
/// Returns the store convention: `""` for root, otherwise a leading slash
/// and no trailing slash.
pub fn normalize_path(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in segments(path) {
        match part {
            ".." => {
                parts.pop();
            }
            "." => {}
            _ => parts.push(part),
        }
    }

    if parts.is_empty() {
        String::new()
    } else {
        format!("/{}", parts.join("/"))
    }
}

/// Check whether `path` equals `ancestor` or lies beneath it.
///
/// Every path is within the root.
pub fn is_within(path: &str, ancestor: &str) -> bool {
    if ancestor.is_empty() || ancestor == "/" {
        return true;
    }
    path == ancestor
        || path
            .strip_prefix(ancestor)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Rebase `path` from under `from` to under `to`.
///
/// Returns `None` if `path` is not within `from`.
pub fn rebase(path: &str, from: &str, to: &str) -> Option<String> {
    if !is_within(path, from) {
        return None;
    }
    let rest = match from {
        "" | "/" => path.trim_start_matches('/'),
        _ => path[from.len()..].trim_start_matches('/'),
    };
    if rest.is_empty() {
        return Some(to.to_string());
    }
    Some(format!("{}/{}", to.trim_end_matches('/'), rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parent_path() {
        assert_eq!(parent_path("/docs/report.pdf"), "/docs");
        assert_eq!(parent_path("/docs"), "");
        assert_eq!(parent_path(""), "");
    }

    #[test]
    fn test_leaf_name() {
        assert_eq!(leaf_name("/docs/report.pdf"), "report.pdf");
        assert_eq!(leaf_name("/docs"), "docs");
        assert_eq!(leaf_name(""), "");
    }

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("", "docs"), "/docs");
        assert_eq!(join_path("/docs", "a.txt"), "/docs/a.txt");
        assert_eq!(join_path("/", "docs"), "/docs");
    }

    #[test]
    fn test_segments() {
        assert_eq!(segments("/a/b").collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(segments("/").count(), 0);
        assert_eq!(segments("").count(), 0);
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("docs/./private"), "/docs/private");
        assert_eq!(normalize_path("/docs/private/../public/"), "/docs/public");
        assert_eq!(normalize_path("/../.."), "");
        assert_eq!(normalize_path(""), "");
    }

    #[test]
    fn test_is_within() {
        assert!(is_within("/docs/a.txt", "/docs"));
        assert!(is_within("/docs", "/docs"));
        assert!(!is_within("/docsx", "/docs"));
        assert!(!is_within("/doc", "/docs"));
        assert!(is_within("/anything", ""));
    }

    #[test]
    fn test_rebase() {
        assert_eq!(
            rebase("/a/b/c.txt", "/a/b", "/x/y").as_deref(),
            Some("/x/y/c.txt")
        );
        assert_eq!(rebase("/a/b", "/a/b", "/z").as_deref(), Some("/z"));
        assert_eq!(rebase("/q", "/a", "/z"), None);
    }

    #[test]
    fn test_rebase_from_root() {
        assert_eq!(rebase("/a/b", "/", "/x").as_deref(), Some("/x/a/b"));
        assert_eq!(rebase("/a", "", "/x").as_deref(), Some("/x/a"));
        assert_eq!(rebase("/", "/", "/x").as_deref(), Some("/x"));
        assert_eq!(rebase("", "", "/x").as_deref(), Some("/x"));
        assert_eq!(rebase("/a/b", "/a", "/").as_deref(), Some("/b"));
    }
}
