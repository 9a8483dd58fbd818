//! `.modules` build identifier synchronization
//!
//! The build tool writes a `.modules` file next to every set of compiled
//! binaries. The game only loads binaries whose `.modules` file carries its
//! own build identifier, so every file in the staged tree is rewritten to
//! carry the identifier chosen for this run.
//!
//! File format:
//!
//! ```json
//! {
//!     "BuildId": "SZML",
//!     "Modules": {
//!         "Foo": "UE-Foo-Win64-Shipping.dll"
//!     }
//! }
//! ```

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use walkdir::WalkDir;

use crate::{Error, Result};

/// Build identifier used when none is configured
pub const DEFAULT_BUILD_ID: &str = "SZML";

/// File extension of module manifests
pub const MODULES_EXTENSION: &str = "modules";

/// Build identifier shared by every `.modules` file of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildId(String);

impl BuildId {
    /// Create a build identifier; empty identifiers are rejected
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(Error::config(
                "Build identifier must not be empty",
                "Set package.build_id in modpak.toml or pass --build-id",
            ));
        }
        Ok(Self(id))
    }

    /// The identifier as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for BuildId {
    fn default() -> Self {
        Self(DEFAULT_BUILD_ID.to_string())
    }
}

impl fmt::Display for BuildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Contents of a `.modules` file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModulesFile {
    /// Build identifier the binaries were built for
    #[serde(rename = "BuildId", default)]
    pub build_id: String,

    /// Module name to binary file name
    #[serde(rename = "Modules")]
    pub modules: BTreeMap<String, String>,
}

impl ModulesFile {
    /// Read and parse a `.modules` file
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::manifest(path, e))?;
        serde_json::from_str(&content).map_err(|e| Error::manifest(path, e))
    }

    /// Write the file using tab indentation
    pub fn save(&self, path: &Utf8Path) -> Result<()> {
        let mut buffer = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        self.serialize(&mut serializer)
            .map_err(|e| Error::manifest(path, e))?;

        std::fs::write(path, buffer).map_err(|e| Error::manifest(path, e))
    }
}

/// Rewrite one `.modules` file with a new build identifier.
///
/// Module entries are carried over unchanged; any other top-level field is
/// dropped.
pub fn sync_modules_file(path: &Utf8Path, build_id: &BuildId) -> Result<()> {
    let current = ModulesFile::load(path)?;

    let updated = ModulesFile {
        build_id: build_id.as_str().to_string(),
        modules: current.modules,
    };
    updated.save(path)?;

    tracing::debug!(path = %path, previous = %current.build_id, "Updated modules file");
    Ok(())
}

/// Find every `.modules` file below a directory, in a stable order
pub fn find_modules_files(root: &Utf8Path) -> Result<Vec<Utf8PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
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
                "Ensure all paths are valid UTF-8",
            )
        })?;

        if path.extension() == Some(MODULES_EXTENSION) {
            files.push(path.to_path_buf());
        }
    }

    Ok(files)
}

/// Synchronize every `.modules` file under a stage directory.
///
/// The first file that fails aborts the whole operation. Returns the number
/// of files rewritten.
pub fn sync_build_id(stage_root: &Utf8Path, build_id: &BuildId) -> Result<usize> {
    let files = find_modules_files(stage_root)?;

    for file in &files {
        sync_modules_file(file, build_id)?;
    }

    tracing::info!(
        stage = %stage_root,
        build_id = %build_id,
        count = files.len(),
        "Synchronized modules build id"
    );
    Ok(files.len())
}
