//! Project descriptor handling
//!
//! A project is identified by its `.uproject` file. Only a couple of fields
//! are read from the descriptor; the rest of the JSON document is ignored.

use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;

use crate::{Error, Result};

/// Fields of interest from a `.uproject` file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawProject {
    #[serde(default)]
    engine_association: Option<String>,
}

/// A game project that plugins are packaged against
#[derive(Debug, Clone)]
pub struct ProjectDescriptor {
    /// Project name (descriptor file name without any extensions)
    pub name: String,

    /// Absolute path to the `.uproject` file
    pub file: Utf8PathBuf,

    /// Directory containing the `.uproject` file
    pub directory: Utf8PathBuf,

    /// Engine association declared by the descriptor
    pub engine_association: Option<String>,
}

impl ProjectDescriptor {
    /// Load a project descriptor from a `.uproject` path
    pub fn from_path(path: &Utf8Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::config(
                format!("Project file not found: {}", path),
                "Pass the path of the .uproject file with --project",
            ));
        }

        let file = path.canonicalize_utf8().map_err(|e| {
            Error::config(
                format!("Failed to resolve project path {}: {}", path, e),
                "Ensure the path exists and is accessible",
            )
        })?;

        let name = file_name_without_any_extensions(&file).ok_or_else(|| {
            Error::config(
                format!("Cannot derive a project name from {}", file),
                "The project file must be named <ProjectName>.uproject",
            )
        })?;

        let directory = file
            .parent()
            .map(Utf8Path::to_path_buf)
            .ok_or_else(|| {
                Error::config(
                    format!("Project file has no parent directory: {}", file),
                    "Pass the path of the .uproject file with --project",
                )
            })?;

        let content =
            std::fs::read_to_string(&file).map_err(|e| Error::fs("read", &file, e))?;
        let raw: RawProject = serde_json::from_str(&content).map_err(|e| {
            Error::config(
                format!("Failed to parse project file {}: {}", file, e),
                "The .uproject file must be a valid JSON document",
            )
        })?;

        tracing::debug!(
            project = %name,
            engine = raw.engine_association.as_deref().unwrap_or("<none>"),
            "Loaded project descriptor"
        );

        Ok(Self {
            name,
            file,
            directory,
            engine_association: raw.engine_association,
        })
    }

    /// Directory holding the project's plugins
    pub fn plugins_dir(&self) -> Utf8PathBuf {
        self.directory.join("Plugins")
    }

    /// Resolve a project-relative path
    pub fn join(&self, relative: &Utf8Path) -> Utf8PathBuf {
        if relative.is_absolute() {
            relative.to_path_buf()
        } else {
            self.directory.join(relative)
        }
    }
}

/// File name up to the first `.`, so `Foo.uplugin` and `Foo.tar.gz` both give `Foo`
pub fn file_name_without_any_extensions(path: &Utf8Path) -> Option<String> {
    let file_name = path.file_name()?;
    let stem = file_name.split('.').next().unwrap_or(file_name);
    if stem.is_empty() {
        None
    } else {
        Some(stem.to_string())
    }
}
