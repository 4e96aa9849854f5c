//! Shared path manipulation utilities.

use std::env;
use std::path::{Component, Path, PathBuf};

/// Resolve a path to an absolute, normalized path.
///
/// If `fs::canonicalize` succeeds (path exists), it is used to resolve symlinks
/// and normalize components.
///
/// If it fails (e.g. path does not exist), the path is made absolute relative
/// to CWD and `..`/`.` components are resolved syntactically.
pub fn resolve_absolute_path(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
    };

    if let Ok(canonical) = std::fs::canonicalize(&absolute) {
        return canonical;
    }

    normalize_syntactic(&absolute)
}

/// Check whether `path` equals `root` or lies anywhere below it.
///
/// Purely syntactic: both sides are compared component-wise without touching
/// the filesystem, so the check also works for paths that no longer exist.
/// Comparison is case-insensitive to match rule pattern semantics.
pub fn is_under(path: &Path, root: &Path) -> bool {
    let path_components: Vec<String> = fold_components(path);
    let root_components: Vec<String> = fold_components(root);
    if root_components.is_empty() || path_components.len() < root_components.len() {
        return false;
    }
    path_components
        .iter()
        .zip(&root_components)
        .all(|(a, b)| a == b)
}

fn fold_components(path: &Path) -> Vec<String> {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().to_lowercase()),
            Component::Prefix(prefix) => Some(prefix.as_os_str().to_string_lossy().to_lowercase()),
            _ => None,
        })
        .collect()
}

fn normalize_syntactic(path: &Path) -> PathBuf {
    let mut components = Vec::new();
    for component in path.components() {
        match component {
            Component::Prefix(..) | Component::RootDir | Component::Normal(_) => {
                components.push(component);
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if let Some(Component::Normal(_)) = components.last() {
                    components.pop();
                }
            }
        }
    }
    components.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_existing_path_canonically() {
        let cwd = env::current_dir().unwrap();
        let resolved = resolve_absolute_path(Path::new("."));
        assert_eq!(resolved, std::fs::canonicalize(&cwd).unwrap());
    }

    #[test]
    fn normalizes_nonexistent_path_syntactically() {
        #[cfg(unix)]
        let root = Path::new("/");
        #[cfg(windows)]
        let root = Path::new("C:");

        let input = root.join("nonexistent").join("foo").join("..").join("bar");
        let expected = root.join("nonexistent").join("bar");

        assert!(std::fs::canonicalize(&input).is_err());

        let resolved = resolve_absolute_path(&input);
        assert_eq!(resolved, expected);
    }

    #[test]
    fn is_under_matches_subtree() {
        assert!(is_under(Path::new("/var/log/app.log"), Path::new("/var/log")));
        assert!(is_under(Path::new("/var/log"), Path::new("/var/log")));
        assert!(!is_under(Path::new("/var/logs/app.log"), Path::new("/var/log")));
        assert!(!is_under(Path::new("/var"), Path::new("/var/log")));
    }

    #[test]
    fn is_under_is_case_insensitive() {
        assert!(is_under(
            Path::new("/Users/Alice/Downloads/a.tmp"),
            Path::new("/users/alice/downloads")
        ));
    }

    #[test]
    fn is_under_empty_root_never_matches() {
        assert!(!is_under(Path::new("/anything"), Path::new("/")));
    }

    #[test]
    fn handles_parent_at_root() {
        #[cfg(unix)]
        {
            let input = Path::new("/../foo");
            let resolved = normalize_syntactic(input);
            assert_eq!(resolved, Path::new("/foo"));
        }
    }
}
