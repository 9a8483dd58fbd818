//! Cooked content path remapping
//!
//! Cooked plugin content is laid out as if the plugin lived directly under
//! the engine's or the project's plugin directory. At runtime the mount point
//! of a mod resolves to `<Project>/Mods/<Plugin>`, so staging has to move the
//! cooked files there. Cooked assets only reference each other through mount
//! point relative paths, so renaming the directories is enough.
//!
//! Everything here is path arithmetic; nothing touches the filesystem.

use camino::{Utf8Path, Utf8PathBuf};

use crate::context::DeploymentContext;
use crate::plugin::PluginDescriptor;
use crate::{Error, Result};

/// Root tag used for content cooked from the engine tree
pub const ENGINE_ROOT_TAG: &str = "Engine";

/// Directory (below the project name) mods are mounted from
pub const MODS_DIR: &str = "Mods";

/// A stage-relative directory relocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemapEntry {
    /// Stage-relative source directory
    pub source: Utf8PathBuf,
    /// Stage-relative destination directory
    pub destination: Utf8PathBuf,
}

impl RemapEntry {
    /// Create a remap entry
    pub fn new(source: impl Into<Utf8PathBuf>, destination: impl Into<Utf8PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
        }
    }

    /// Rewrite a stage-relative path if it lies under this entry's source
    pub fn apply(&self, path: &Utf8Path) -> Option<Utf8PathBuf> {
        path.strip_prefix(&self.source)
            .ok()
            .map(|rest| self.destination.join(rest))
    }
}

/// Compute the remap for one context.
///
/// The source is the plugin's parent directory relative to whichever root
/// contains it, prefixed with `Engine` or the project name. The destination
/// is always `<Project>/Mods`.
pub fn remap_for(
    plugin: &PluginDescriptor,
    project_name: &str,
    context: &DeploymentContext,
) -> Result<RemapEntry> {
    if plugin.name.is_empty() || plugin.file.file_name().is_none_or(str::is_empty) {
        return Err(Error::config(
            "Expected a plugin descriptor, got none",
            "Pass the plugin to package with --plugin",
        ));
    }

    let parent = plugin
        .directory()
        .parent()
        .ok_or_else(|| unknown_remap(plugin))?;

    let source = match &context.engine_root {
        Some(engine_root) if plugin.file.starts_with(engine_root) => {
            relative_origin(ENGINE_ROOT_TAG, parent, engine_root)
        }
        _ if plugin.file.starts_with(&context.project_root) => {
            relative_origin(project_name, parent, &context.project_root)
        }
        _ => None,
    }
    .ok_or_else(|| unknown_remap(plugin))?;

    Ok(RemapEntry::new(source, mods_dir(project_name)))
}

/// Append the plugin remap to every context
pub fn apply_remaps(
    plugin: &PluginDescriptor,
    project_name: &str,
    contexts: &mut [DeploymentContext],
) -> Result<()> {
    for context in contexts.iter_mut() {
        let entry = remap_for(plugin, project_name, context)?;
        tracing::debug!(
            platform = %context.platform_label,
            source = %entry.source,
            destination = %entry.destination,
            "Registered content remap"
        );
        context.remaps.push(entry);
    }
    Ok(())
}

/// `<Project>/Mods`
pub fn mods_dir(project_name: &str) -> Utf8PathBuf {
    Utf8PathBuf::from(project_name).join(MODS_DIR)
}

/// Stage-relative path of the remapped plugin: `<Project>/Mods/<Plugin>`
pub fn plugin_stage_path(project_name: &str, plugin_name: &str) -> Utf8PathBuf {
    mods_dir(project_name).join(plugin_name)
}

fn relative_origin(tag: &str, parent: &Utf8Path, root: &Utf8Path) -> Option<Utf8PathBuf> {
    parent
        .strip_prefix(root)
        .ok()
        .map(|relative| Utf8PathBuf::from(tag).join(relative))
}

fn unknown_remap(plugin: &PluginDescriptor) -> Error {
    Error::config(
        format!("Unknown remap for plugin {}", plugin.name),
        format!(
            "{} must be under the engine or the project directory",
            plugin.file
        ),
    )
}
