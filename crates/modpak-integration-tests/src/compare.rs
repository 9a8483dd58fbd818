//! Reading archives and directory trees for comparison

use camino::Utf8Path;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use walkdir::WalkDir;

/// Result type for comparison operations
pub type Result<T> = std::result::Result<T, ComparisonError>;

/// Error type for comparison operations
#[derive(Debug, thiserror::Error)]
pub enum ComparisonError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Walkdir error: {0}")]
    Walkdir(#[from] walkdir::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Path is not valid UTF-8: {0}")]
    NonUtf8(String),
}

/// File entries of a zip archive, keyed by entry name
pub fn zip_contents(path: &Utf8Path) -> Result<BTreeMap<String, Vec<u8>>> {
    let mut archive = zip::ZipArchive::new(File::open(path)?)?;
    let mut contents = BTreeMap::new();

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        if entry.is_dir() {
            continue;
        }
        let mut data = Vec::new();
        entry.read_to_end(&mut data)?;
        contents.insert(entry.name().to_string(), data);
    }

    Ok(contents)
}

/// Files below a directory, keyed by `/`-separated relative path
pub fn dir_contents(root: &Utf8Path) -> Result<BTreeMap<String, Vec<u8>>> {
    let mut contents = BTreeMap::new();

    for entry in WalkDir::new(root).min_depth(1) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| ComparisonError::NonUtf8(e.to_string()))?;
        let relative = Utf8Path::from_path(relative)
            .ok_or_else(|| ComparisonError::NonUtf8(relative.display().to_string()))?;
        let name = relative
            .components()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join("/");
        contents.insert(name, std::fs::read(entry.path())?);
    }

    Ok(contents)
}

/// `BuildId` of every `.modules` entry in an archive
pub fn archived_build_ids(path: &Utf8Path) -> Result<BTreeMap<String, String>> {
    let mut ids = BTreeMap::new();

    for (name, data) in zip_contents(path)? {
        if !name.ends_with(".modules") {
            continue;
        }
        let value: serde_json::Value = serde_json::from_slice(&data)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        let id = value
            .get("BuildId")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        ids.insert(name, id);
    }

    Ok(ids)
}
