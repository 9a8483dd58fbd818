//! Copying packaged plugins into a game installation

use camino::{Utf8Path, Utf8PathBuf};

use crate::config::DeployConfig;
use crate::context::DeploymentContext;
use crate::plugin::PluginDescriptor;
use crate::project::ProjectDescriptor;
use crate::remap::{MODS_DIR, plugin_stage_path};
use crate::{Error, Result};

use super::launch::{Launcher, find_executable};
use super::utils::{copy_dir_recursive, create_dir_all, remove_dir_if_exists};

/// Deployment options, validated before the pipeline starts
#[derive(Debug, Clone)]
pub struct DeployOptions {
    /// Game installation directory
    pub install_dir: Option<Utf8PathBuf>,
    /// Copy the plugin into the installation
    pub copy_to_install: bool,
    /// Launch the game afterwards
    pub launch: bool,
    /// Platform label eligible for installation
    pub platform: String,
    /// Extension of the game executable
    pub executable_extension: String,
}

impl From<&DeployConfig> for DeployOptions {
    fn from(config: &DeployConfig) -> Self {
        Self {
            install_dir: config.install_dir.clone(),
            copy_to_install: config.copy_to_install,
            launch: config.launch,
            platform: config.platform.clone(),
            executable_extension: config.executable_extension.clone(),
        }
    }
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self::from(&DeployConfig::default())
    }
}

impl DeployOptions {
    /// Check the options against the project.
    ///
    /// Copying or launching requires an install directory, and that directory
    /// must contain the project's content root (`<Game>/<Project>`).
    pub fn validate(&self, project: &ProjectDescriptor) -> Result<()> {
        let Some(ref install_dir) = self.install_dir else {
            if self.copy_to_install {
                return Err(Error::config(
                    "Copy to game directory was requested, but no game directory was given",
                    "Pass --game-dir or set deploy.install_dir in modpak.toml",
                ));
            }
            if self.launch {
                return Err(Error::config(
                    "Launching the game was requested, but no game directory was given",
                    "Pass --game-dir or set deploy.install_dir in modpak.toml",
                ));
            }
            return Ok(());
        };

        let content_root = install_dir.join(&project.name);
        if !content_root.is_dir() {
            return Err(Error::config(
                format!(
                    "Provided game directory is invalid, expected to find {}",
                    content_root
                ),
                "The game directory must be the installation root containing the project folder",
            ));
        }

        Ok(())
    }

    /// Whether anything has to happen after archiving
    pub fn is_enabled(&self) -> bool {
        self.install_dir.is_some() && (self.copy_to_install || self.launch)
    }
}

/// Result of a deployment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeployReport {
    /// Plugin directories written into the installation
    pub installed: Vec<Utf8PathBuf>,
    /// Executable that was launched
    pub launched: Option<Utf8PathBuf>,
}

/// Copy a staged plugin directory into `<install>/<Project>/Mods/<relative>`.
///
/// An existing destination is removed first so no stale files survive.
pub fn install_plugin(
    stage_plugin_dir: &Utf8Path,
    install_dir: &Utf8Path,
    project: &ProjectDescriptor,
    plugin: &PluginDescriptor,
) -> Result<Utf8PathBuf> {
    let destination = install_dir
        .join(&project.name)
        .join(MODS_DIR)
        .join(plugin.install_relative_path());

    if remove_dir_if_exists(&destination)? {
        tracing::debug!(path = %destination, "Removed previously installed plugin");
    }

    create_dir_all(&destination)?;
    copy_dir_recursive(stage_plugin_dir, &destination)?;

    tracing::info!(plugin = %plugin.name, path = %destination, "Installed plugin");
    Ok(destination)
}

/// Copies packaged plugins into the game and optionally launches it
pub struct Deployer<'a> {
    options: &'a DeployOptions,
    launcher: &'a dyn Launcher,
}

impl<'a> Deployer<'a> {
    /// Create a deployer
    pub fn new(options: &'a DeployOptions, launcher: &'a dyn Launcher) -> Self {
        Self { options, launcher }
    }

    /// Deploy every eligible context, then launch the game if requested
    pub fn deploy(
        &self,
        contexts: &[DeploymentContext],
        project: &ProjectDescriptor,
        plugin: &PluginDescriptor,
    ) -> Result<DeployReport> {
        let mut report = DeployReport::default();

        let Some(ref install_dir) = self.options.install_dir else {
            return Ok(report);
        };

        if self.options.copy_to_install {
            for context in contexts {
                if context.platform_label != self.options.platform {
                    tracing::debug!(
                        platform = %context.platform_label,
                        "Platform is not deployable, skipping installation"
                    );
                    continue;
                }

                let stage_plugin_dir = context
                    .stage_root
                    .join(plugin_stage_path(&project.name, &plugin.name));
                if !stage_plugin_dir.is_dir() {
                    return Err(Error::deploy(
                        format!("Staged plugin not found at {}", stage_plugin_dir),
                        "Staging must produce the plugin before it can be installed",
                    ));
                }

                report.installed.push(install_plugin(
                    &stage_plugin_dir,
                    install_dir,
                    project,
                    plugin,
                )?);
            }
        }

        if self.options.launch {
            let executable = find_executable(
                install_dir,
                &project.name,
                &self.options.executable_extension,
            )?;
            self.launcher.launch(&executable, install_dir)?;
            report.launched = Some(executable);
        }

        Ok(report)
    }
}
