//! Filesystem helpers shared by staging and deployment

use camino::{Utf8Path, Utf8PathBuf};
use walkdir::WalkDir;

use crate::{Error, Result};

/// List every file below `root` as (absolute path, path relative to `root`),
/// sorted by path
pub fn list_files(root: &Utf8Path) -> Result<Vec<(Utf8PathBuf, Utf8PathBuf)>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            Error::stage(
                format!("Failed to read directory entry: {}", e),
                "Check directory permissions",
            )
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        let path = Utf8Path::from_path(entry.path()).ok_or_else(|| {
            Error::stage(
                format!("Path is not valid UTF-8: {:?}", entry.path()),
                "Ensure all file paths contain only valid UTF-8 characters",
            )
        })?;

        let relative = path.strip_prefix(root).map_err(|_| {
            Error::stage(
                format!("Failed to strip prefix {} from {}", root, path),
                "This is an unexpected internal error",
            )
        })?;

        files.push((path.to_path_buf(), relative.to_path_buf()));
    }

    Ok(files)
}

/// Recursively copy a directory
pub fn copy_dir_recursive(src: &Utf8Path, dst: &Utf8Path) -> Result<()> {
    create_dir_all(dst)?;

    for entry in WalkDir::new(src).follow_links(true) {
        let entry = entry.map_err(|e| {
            Error::deploy(
                format!("Failed to read directory entry: {}", e),
                "Check directory permissions",
            )
        })?;

        let src_path = Utf8Path::from_path(entry.path()).ok_or_else(|| {
            Error::deploy(
                format!("Path is not valid UTF-8: {:?}", entry.path()),
                "Ensure all file paths contain only valid UTF-8 characters",
            )
        })?;

        let rel_path = src_path.strip_prefix(src).map_err(|_| {
            Error::deploy(
                format!("Failed to strip source prefix from {}", src_path),
                "This is an unexpected internal error",
            )
        })?;

        let dst_path = dst.join(rel_path);

        if entry.file_type().is_dir() {
            create_dir_all(&dst_path)?;
        } else {
            if let Some(parent) = dst_path.parent() {
                create_dir_all(parent)?;
            }
            copy_file(src_path, &dst_path)?;
        }
    }

    Ok(())
}

/// Create a directory and its parents
pub fn create_dir_all(dir: &Utf8Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| Error::fs("create directory", dir, e))
}

/// Copy one file; errors name the source and the destination
pub fn copy_file(src: &Utf8Path, dst: &Utf8Path) -> Result<()> {
    std::fs::copy(src, dst)
        .map(|_| ())
        .map_err(|e| Error::fs("copy", src, format!("to {}: {}", dst, e)))
}

/// Remove a directory tree if it exists
pub fn remove_dir_if_exists(dir: &Utf8Path) -> Result<bool> {
    if dir.exists() {
        std::fs::remove_dir_all(dir).map_err(|e| Error::fs("remove directory", dir, e))?;
        Ok(true)
    } else {
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_copy_dir_recursive() {
        let temp_dir = TempDir::new().unwrap();
        let root = Utf8Path::from_path(temp_dir.path()).unwrap();
        let src = root.join("src");
        let dst = root.join("dst");

        fs::create_dir_all(src.join("subdir/empty")).unwrap();
        fs::write(src.join("file1.txt"), "content1").unwrap();
        fs::write(src.join("subdir/file2.txt"), "content2").unwrap();

        copy_dir_recursive(&src, &dst).unwrap();

        assert_eq!(fs::read_to_string(dst.join("file1.txt")).unwrap(), "content1");
        assert_eq!(
            fs::read_to_string(dst.join("subdir/file2.txt")).unwrap(),
            "content2"
        );
        assert!(dst.join("subdir/empty").is_dir());
    }

    #[test]
    fn test_list_files_is_sorted_and_relative() {
        let temp_dir = TempDir::new().unwrap();
        let root = Utf8Path::from_path(temp_dir.path()).unwrap();

        fs::create_dir_all(root.join("b")).unwrap();
        fs::write(root.join("b/2.txt"), "").unwrap();
        fs::write(root.join("a.txt"), "").unwrap();

        let relative: Vec<_> = list_files(root)
            .unwrap()
            .into_iter()
            .map(|(_, rel)| rel)
            .collect();

        assert_eq!(
            relative,
            vec![Utf8PathBuf::from("a.txt"), Utf8PathBuf::from("b/2.txt")]
        );
    }

    #[test]
    fn test_remove_dir_if_exists() {
        let temp_dir = TempDir::new().unwrap();
        let root = Utf8Path::from_path(temp_dir.path()).unwrap();
        let dir = root.join("stage");
        fs::create_dir_all(dir.join("nested")).unwrap();

        assert!(remove_dir_if_exists(&dir).unwrap());
        assert!(!dir.exists());
        assert!(!remove_dir_if_exists(&dir).unwrap());
    }

    #[test]
    fn test_copy_errors_name_both_paths() {
        let temp_dir = TempDir::new().unwrap();
        let root = Utf8Path::from_path(temp_dir.path()).unwrap();
        let missing = root.join("Plugins/Foo/Gone.uasset");
        let dst = root.join("stage/Gone.uasset");

        let err = copy_file(&missing, &dst).unwrap_err();
        let msg = err.to_string();

        assert!(matches!(err, Error::Filesystem { .. }));
        assert!(msg.contains("Plugins/Foo/Gone.uasset"), "{msg}");
        assert!(msg.contains("stage/Gone.uasset"), "{msg}");
    }

    #[test]
    fn test_create_dir_error_names_path() {
        let temp_dir = TempDir::new().unwrap();
        let root = Utf8Path::from_path(temp_dir.path()).unwrap();
        let blocker = root.join("blocker");
        fs::write(&blocker, "file, not a directory").unwrap();

        let msg = create_dir_all(&blocker.join("nested")).unwrap_err().to_string();
        assert!(msg.contains("blocker/nested"), "{msg}");
    }
}
