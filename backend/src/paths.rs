//! Confinement of client-supplied paths to the shared directory.

use std::path::{Component, Path, PathBuf};

use tokio::fs;

use crate::error::AppError;

/// Joins `requested` onto `root` and normalizes it lexically.
///
/// `..` segments are folded without touching the filesystem. Root and prefix
/// components inside `requested` are dropped, so an absolute path is rebased
/// under `root` instead of replacing it. The result must stay under `root`
/// component-wise.
pub fn resolve(root: &Path, requested: &str) -> Result<PathBuf, AppError> {
    let mut resolved = root.to_path_buf();
    for component in Path::new(requested).components() {
        match component {
            Component::Normal(segment) => resolved.push(segment),
            Component::ParentDir => {
                resolved.pop();
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }

    if resolved.starts_with(root) {
        Ok(resolved)
    } else {
        Err(AppError::AccessDenied)
    }
}

/// Rejects `candidate` if following symlinks would lead outside `root`.
///
/// The deepest existing ancestor of `candidate` is canonicalized and checked
/// against `root`, which must itself be canonical.
pub async fn confine(root: &Path, candidate: PathBuf) -> Result<PathBuf, AppError> {
    let mut ancestor = candidate.clone();
    loop {
        match fs::canonicalize(&ancestor).await {
            Ok(real) if real.starts_with(root) => return Ok(candidate),
            Ok(_) => return Err(AppError::AccessDenied),
            Err(_) => {
                if ancestor == root || !ancestor.pop() {
                    return Err(AppError::AccessDenied);
                }
            }
        }
    }
}

/// Joins a listing's request path and a child name the way clients send paths.
pub fn join_relative(base: &str, name: &str) -> String {
    let base = base.trim_end_matches('/');
    if base.is_empty() || base == "." {
        name.to_string()
    } else {
        format!("{base}/{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dot_resolves_to_root() {
        let root = Path::new("/srv/share");
        assert_eq!(resolve(root, ".").unwrap(), root);
        assert_eq!(resolve(root, "").unwrap(), root);
    }

    #[test]
    fn nested_paths_stay_inside() {
        let root = Path::new("/srv/share");
        assert_eq!(
            resolve(root, "photos/2024/a.png").unwrap(),
            Path::new("/srv/share/photos/2024/a.png")
        );
        assert_eq!(
            resolve(root, "photos/../docs/./b.txt").unwrap(),
            Path::new("/srv/share/docs/b.txt")
        );
    }

    #[test]
    fn parent_traversal_is_denied() {
        let root = Path::new("/srv/share");
        for requested in ["..", "../etc/passwd", "a/../../x", "../../../../"] {
            assert!(
                matches!(resolve(root, requested), Err(AppError::AccessDenied)),
                "{requested} escaped"
            );
        }
    }

    #[test]
    fn sibling_with_shared_prefix_is_denied() {
        let root = Path::new("/srv/share");
        assert!(matches!(
            resolve(root, "../share-extra/secret.txt"),
            Err(AppError::AccessDenied)
        ));
    }

    #[test]
    fn reentering_root_by_name_is_allowed() {
        let root = Path::new("/srv/share");
        assert_eq!(
            resolve(root, "../share/a.txt").unwrap(),
            Path::new("/srv/share/a.txt")
        );
    }

    #[test]
    fn absolute_paths_are_rebased() {
        let root = Path::new("/srv/share");
        assert_eq!(
            resolve(root, "/etc/passwd").unwrap(),
            Path::new("/srv/share/etc/passwd")
        );
    }

    #[test]
    fn join_relative_uses_slashes() {
        assert_eq!(join_relative(".", "a.txt"), "a.txt");
        assert_eq!(join_relative("", "a.txt"), "a.txt");
        assert_eq!(join_relative("sub", "a.txt"), "sub/a.txt");
        assert_eq!(join_relative("sub/", "a.txt"), "sub/a.txt");
    }

    #[tokio::test]
    async fn confine_accepts_paths_that_do_not_exist_yet() {
        let dir = tempfile::tempdir().unwrap();
        let root = std::fs::canonicalize(dir.path()).unwrap();
        let target = root.join("new/dir/file.txt");
        assert_eq!(confine(&root, target.clone()).await.unwrap(), target);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn confine_rejects_symlink_escape() {
        let outside = tempfile::tempdir().unwrap();
        std::fs::write(outside.path().join("secret.txt"), b"secret").unwrap();
        let dir = tempfile::tempdir().unwrap();
        let root = std::fs::canonicalize(dir.path()).unwrap();
        std::os::unix::fs::symlink(outside.path(), root.join("link")).unwrap();

        let lexical = resolve(&root, "link/secret.txt").unwrap();
        assert!(matches!(
            confine(&root, lexical).await,
            Err(AppError::AccessDenied)
        ));

        let lexical = resolve(&root, "link/not-yet.txt").unwrap();
        assert!(matches!(
            confine(&root, lexical).await,
            Err(AppError::AccessDenied)
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn confine_allows_symlinks_within_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = std::fs::canonicalize(dir.path()).unwrap();
        std::fs::create_dir(root.join("real")).unwrap();
        std::os::unix::fs::symlink(root.join("real"), root.join("alias")).unwrap();
        let lexical = resolve(&root, "alias").unwrap();
        assert!(confine(&root, lexical).await.is_ok());
    }
}
