//! Plugin archiving
//!
//! Each context's remapped plugin subtree (`<stage>/<Project>/Mods/<Plugin>`)
//! is zipped into `<project>/Saved/ArchivedPlugins/<Platform>/<Plugin>.zip`.
//! The archive root is the plugin directory itself, so extracting it into a
//! game's `Mods/<Plugin>` folder reproduces the staged layout.

use camino::{Utf8Path, Utf8PathBuf};
use std::fs::File;
use std::io::{BufWriter, Write};
use walkdir::WalkDir;
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

use crate::config::PackageConfig;
use crate::context::DeploymentContext;
use crate::plugin::PluginDescriptor;
use crate::project::ProjectDescriptor;
use crate::remap::plugin_stage_path;
use crate::{Error, Result};

/// Where archives are written
#[derive(Debug, Clone)]
pub struct ArchiveSettings {
    /// Archive directory relative to the project directory
    pub archive_dir: Utf8PathBuf,
    /// Archive file extension
    pub extension: String,
}

impl From<&PackageConfig> for ArchiveSettings {
    fn from(config: &PackageConfig) -> Self {
        Self {
            archive_dir: config.archive_dir.clone(),
            extension: config.archive_extension.clone(),
        }
    }
}

impl Default for ArchiveSettings {
    fn default() -> Self {
        Self::from(&PackageConfig::default())
    }
}

/// A written archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveArtifact {
    /// Platform label the archive was built for
    pub platform_label: String,
    /// Archive path
    pub path: Utf8PathBuf,
    /// Number of files stored
    pub files: usize,
}

/// Path of the archive for one platform
pub fn archive_path(
    project: &ProjectDescriptor,
    settings: &ArchiveSettings,
    platform_label: &str,
    plugin_name: &str,
) -> Utf8PathBuf {
    project
        .join(&settings.archive_dir)
        .join(platform_label)
        .join(format!("{}.{}", plugin_name, settings.extension))
}

/// Archive the staged plugin of one context, replacing any previous archive
pub fn archive_plugin(
    context: &DeploymentContext,
    project: &ProjectDescriptor,
    plugin: &PluginDescriptor,
    settings: &ArchiveSettings,
) -> Result<ArchiveArtifact> {
    let plugin_dir = context
        .stage_root
        .join(plugin_stage_path(&project.name, &plugin.name));

    if !plugin_dir.is_dir() {
        return Err(Error::archive(
            &plugin_dir,
            "staged plugin directory not found; staging did not produce the remapped plugin",
        ));
    }

    let zip_path = archive_path(project, settings, &context.platform_label, &plugin.name);
    if let Some(parent) = zip_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| Error::archive(&zip_path, e))?;
    }

    if zip_path.exists() {
        tracing::debug!(path = %zip_path, "Removing previous archive");
        std::fs::remove_file(&zip_path).map_err(|e| Error::archive(&zip_path, e))?;
    }

    let files = write_zip(&plugin_dir, &zip_path)?;

    tracing::info!(
        platform = %context.platform_label,
        path = %zip_path,
        files,
        "Archived plugin"
    );

    Ok(ArchiveArtifact {
        platform_label: context.platform_label.clone(),
        path: zip_path,
        files,
    })
}

/// Archive the plugin for every context
pub fn archive_all(
    contexts: &[DeploymentContext],
    project: &ProjectDescriptor,
    plugin: &PluginDescriptor,
    settings: &ArchiveSettings,
) -> Result<Vec<ArchiveArtifact>> {
    contexts
        .iter()
        .map(|context| archive_plugin(context, project, plugin, settings))
        .collect()
}

/// Zip the contents of `source_dir` (without the directory itself)
fn write_zip(source_dir: &Utf8Path, zip_path: &Utf8Path) -> Result<usize> {
    let file = File::create(zip_path).map_err(|e| Error::archive(zip_path, e))?;
    let mut writer = zip::ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut count = 0;

    for entry in WalkDir::new(source_dir)
        .follow_links(true)
        .sort_by_file_name()
        .min_depth(1)
    {
        let entry = entry.map_err(|e| Error::archive(zip_path, e))?;
        let relative = entry
            .path()
            .strip_prefix(source_dir)
            .map_err(|e| Error::archive(zip_path, e))?;
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if entry.file_type().is_dir() {
            writer
                .add_directory(format!("{}/", name), options)
                .map_err(|e| Error::archive(zip_path, e))?;
        } else {
            writer
                .start_file(name, options)
                .map_err(|e| Error::archive(zip_path, e))?;
            let content = std::fs::read(entry.path()).map_err(|e| {
                Error::archive(zip_path, format!("{}: {}", entry.path().display(), e))
            })?;
            writer
                .write_all(&content)
                .map_err(|e| Error::archive(zip_path, e))?;
            count += 1;
        }
    }

    let mut inner = writer.finish().map_err(|e| Error::archive(zip_path, e))?;
    inner.flush().map_err(|e| Error::archive(zip_path, e))?;

    Ok(count)
}
