//! Plugin descriptor resolution
//!
//! A plugin is identified by its `<Name>.uplugin` file. Plugins live either
//! inside the engine tree (`Engine/Plugins/...`) or inside the project tree
//! (`<Project>/Plugins/...`); the origin decides how cooked content has to be
//! remapped during staging.

use camino::{Utf8Path, Utf8PathBuf};
use walkdir::WalkDir;

use crate::project::ProjectDescriptor;
use crate::{Error, Result};

/// Directories never searched for plugin descriptors
const EXCLUDED_DIRS: &[&str] = &[
    "Binaries",
    "Content",
    "Intermediate",
    "Saved",
    "Source",
    ".git",
];

/// Tree a plugin was found in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginOrigin {
    /// The plugin lives under the engine root
    Engine,
    /// The plugin lives under the project directory
    Project,
}

/// The plugin being packaged
#[derive(Debug, Clone)]
pub struct PluginDescriptor {
    /// Plugin name (descriptor file name without extension)
    pub name: String,

    /// Absolute path to the `.uplugin` file
    pub file: Utf8PathBuf,

    /// Tree the plugin was found in
    pub origin: PluginOrigin,

    /// Plugin directory relative to the project's `Plugins` directory
    /// (only meaningful for project plugins)
    project_relative: Option<Utf8PathBuf>,
}

impl PluginDescriptor {
    /// Build a descriptor from an already located `.uplugin` file.
    ///
    /// `engine_dir` is the engine's `Engine` directory. Engine membership is
    /// checked first; a file under neither tree is a configuration error.
    pub fn new(
        name: &str,
        file: &Utf8Path,
        project_dir: &Utf8Path,
        engine_dir: Option<&Utf8Path>,
    ) -> Result<Self> {
        if name.is_empty() {
            return Err(no_plugin_name());
        }

        let origin = if engine_dir.is_some_and(|engine| file.starts_with(engine)) {
            PluginOrigin::Engine
        } else if file.starts_with(project_dir) {
            PluginOrigin::Project
        } else {
            return Err(Error::config(
                format!(
                    "Unknown remap for plugin {}: {} is outside the engine and project trees",
                    name, file
                ),
                "Move the plugin under <Project>/Plugins or the engine's Plugins directory",
            ));
        };

        let project_relative = file
            .parent()
            .and_then(|dir| dir.strip_prefix(project_dir.join("Plugins")).ok())
            .map(Utf8Path::to_path_buf);

        Ok(Self {
            name: name.to_string(),
            file: file.to_path_buf(),
            origin,
            project_relative,
        })
    }

    /// Locate `<name>.uplugin` in the project, then the engine, and build a descriptor
    pub fn resolve(
        name: &str,
        project: &ProjectDescriptor,
        engine_dir: Option<&Utf8Path>,
    ) -> Result<Self> {
        if name.is_empty() {
            return Err(no_plugin_name());
        }

        let file_name = format!("{}.uplugin", name);
        let mut search_roots = vec![project.plugins_dir()];
        if let Some(engine) = engine_dir {
            search_roots.push(engine.join("Plugins"));
        }

        for root in &search_roots {
            if let Some(found) = find_descriptor(root, &file_name)? {
                tracing::info!(plugin = name, path = %found, "Found plugin descriptor");
                return Self::new(name, &found, &project.directory, engine_dir);
            }
        }

        Err(Error::config(
            format!("Plugin '{}' not found", name),
            format!(
                "Expected {} under {}",
                file_name,
                search_roots
                    .iter()
                    .map(|p| p.as_str())
                    .collect::<Vec<_>>()
                    .join(" or ")
            ),
        ))
    }

    /// Directory containing the `.uplugin` file
    pub fn directory(&self) -> &Utf8Path {
        self.file.parent().unwrap_or(&self.file)
    }

    /// Path of the plugin below a game's `Mods` directory
    pub fn install_relative_path(&self) -> Utf8PathBuf {
        match (&self.origin, &self.project_relative) {
            (PluginOrigin::Project, Some(relative)) => relative.clone(),
            _ => Utf8PathBuf::from(&self.name),
        }
    }
}

fn no_plugin_name() -> Error {
    Error::config(
        "No plugin name supplied",
        "Pass the plugin to package with --plugin",
    )
}

/// Search a directory tree for a plugin descriptor with the given file name
fn find_descriptor(root: &Utf8Path, file_name: &str) -> Result<Option<Utf8PathBuf>> {
    if !root.is_dir() {
        return Ok(None);
    }

    let walker = WalkDir::new(root).follow_links(true).sort_by_file_name();

    for entry in walker.into_iter().filter_entry(|e| {
        !(e.file_type().is_dir()
            && e.file_name()
                .to_str()
                .is_some_and(|name| EXCLUDED_DIRS.contains(&name)))
    }) {
        let entry = entry.map_err(|e| {
            Error::config(
                format!("Failed to read directory entry: {}", e),
                "Check directory permissions",
            )
        })?;

        if entry.file_type().is_file() && entry.file_name().to_str() == Some(file_name) {
            let path = Utf8Path::from_path(entry.path()).ok_or_else(|| {
                Error::config(
                    format!("Path is not valid UTF-8: {:?}", entry.path()),
                    "Ensure all paths are valid UTF-8",
                )
            })?;
            let path = path
                .canonicalize_utf8()
                .map_err(|e| Error::fs("resolve", path, e))?;
            return Ok(Some(path));
        }
    }

    Ok(None)
}
