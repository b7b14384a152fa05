//! Filesystem walk and copy helpers shared by step runners.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Collect every regular file under `dir`, recursively, in a stable order.
///
/// A stable order keeps build output deterministic for identical inputs.
/// A missing directory yields an empty set (matches glob semantics: no
/// sources, nothing to do).
pub fn walk_files(dir: &Path) -> Vec<PathBuf> {
    if !dir.is_dir() {
        return Vec::new();
    }

    // Serial walk: the default rayon-pool parallelism silently yields zero
    // entries when the walk runs inside an already-busy rayon worker, as it
    // does under `Node::Parallel`.
    jwalk::WalkDir::new(dir)
        .parallelism(jwalk::Parallelism::Serial)
        .sort(true)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path())
        .collect()
}

/// Collect files under `dir` whose extension matches `ext` (case-insensitive).
pub fn walk_files_with_ext(dir: &Path, ext: &str) -> Vec<PathBuf> {
    walk_files(dir)
        .into_iter()
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(ext))
        })
        .collect()
}

/// Copy `src` to `dest`, creating parent directories as needed.
pub fn copy_file(src: &Path, dest: &Path) -> io::Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(src, dest)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_walk_files_missing_dir() {
        let temp = TempDir::new().unwrap();
        assert!(walk_files(&temp.path().join("nope")).is_empty());
    }

    #[test]
    fn test_walk_files_recursive_and_sorted() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("b")).unwrap();
        fs::write(temp.path().join("b/two.txt"), "2").unwrap();
        fs::write(temp.path().join("a.txt"), "1").unwrap();

        let files = walk_files(temp.path());
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("a.txt"));
        assert!(files[1].ends_with("b/two.txt"));
    }

    #[test]
    fn test_walk_files_with_ext() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("page.html"), "").unwrap();
        fs::write(temp.path().join("notes.txt"), "").unwrap();

        let files = walk_files_with_ext(temp.path(), "html");
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("page.html"));
    }

    #[test]
    fn test_copy_file_creates_parents() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src.txt");
        let dest = temp.path().join("out/deep/dest.txt");
        fs::write(&src, "payload").unwrap();

        copy_file(&src, &dest).unwrap();
        assert_eq!(fs::read_to_string(dest).unwrap(), "payload");
    }
}
