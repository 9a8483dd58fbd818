//! Configuration file parsing and merging
//!
//! This module handles parsing of `modpak.toml` and `modpak.local.toml` files
//! found next to the `.uproject` file. The local file is meant for per-machine
//! settings (engine location, game install directory) and overrides the base.

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{Error, Result};
use crate::modules::DEFAULT_BUILD_ID;
use crate::platform::{PackagingPolicy, TargetPlatform};

/// Base configuration file name
pub const CONFIG_FILE: &str = "modpak.toml";

/// Per-machine override file name
pub const LOCAL_CONFIG_FILE: &str = "modpak.local.toml";

/// Main configuration structure for modpak
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Host engine settings
    pub engine: EngineConfig,

    /// Packaging settings
    pub package: PackageConfig,

    /// Cook settings
    pub cook: CookConfig,

    /// Deployment settings
    pub deploy: DeployConfig,

    /// Per-platform overrides indexed by platform label (e.g. "Windows")
    pub platforms: BTreeMap<String, PlatformConfig>,
}

/// Host engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Engine root directory (the directory containing `Engine/`)
    pub root: Option<Utf8PathBuf>,
}

/// Packaging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageConfig {
    /// Build identifier written into every `.modules` file
    pub build_id: String,

    /// Target platforms to package for
    pub platforms: Vec<TargetPlatform>,

    /// Build configuration passed to the cooker (default: "Shipping")
    pub configuration: String,

    /// Also package for the dedicated server
    pub dedicated_server: bool,

    /// Skip the client deployment contexts
    pub no_client: bool,

    /// Request pak output from the cook. Cooked files are still staged
    /// loose; the flag also selects contexts for staging.
    pub pak: bool,

    /// Request staging
    pub stage: bool,

    /// Skip staging even when requested
    pub skip_stage: bool,

    /// Cook output directory, relative to the project directory
    pub cooked_dir: Utf8PathBuf,

    /// Staging directory, relative to the project directory
    pub stage_dir: Utf8PathBuf,

    /// Archive output directory, relative to the project directory
    pub archive_dir: Utf8PathBuf,

    /// Archive file extension (default: "zip")
    pub archive_extension: String,
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            build_id: DEFAULT_BUILD_ID.to_string(),
            platforms: vec![TargetPlatform::Win64],
            configuration: "Shipping".to_string(),
            dedicated_server: false,
            no_client: false,
            pak: true,
            stage: true,
            skip_stage: false,
            cooked_dir: Utf8PathBuf::from("Saved/Cooked"),
            stage_dir: Utf8PathBuf::from("Saved/StagedBuilds"),
            archive_dir: Utf8PathBuf::from("Saved/ArchivedPlugins"),
            archive_extension: "zip".to_string(),
        }
    }
}

impl PackageConfig {
    /// Requested platforms in order, each listed once
    pub fn target_platforms(&self) -> Vec<TargetPlatform> {
        let mut platforms = Vec::with_capacity(self.platforms.len());
        for &platform in &self.platforms {
            if !platforms.contains(&platform) {
                platforms.push(platform);
            }
        }
        platforms
    }
}

/// Cook configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CookConfig {
    /// Run the cooker before staging (disable when content is already cooked)
    pub enabled: bool,

    /// Path to the automation runner (default: RunUAT under the engine root)
    pub runner: Option<Utf8PathBuf>,

    /// Options forwarded to the cook commandlet
    pub additional_cooker_options: String,

    /// Release version the plugin content is cooked against
    pub based_on_release_version: String,

    /// Compress cooked packages
    pub compressed: bool,

    /// Leave editor-only content out of the cook
    pub skip_editor_content: bool,

    /// Cook engine content referenced by the plugin into the DLC
    pub dlc_include_engine_content: bool,

    /// Extra arguments appended to the cook command line
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl Default for CookConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            runner: None,
            additional_cooker_options: "-AllowUncookedAssetReferences -versioncookedcontent"
                .to_string(),
            based_on_release_version: "NonExistentBasedOnReleaseVersion".to_string(),
            compressed: false,
            skip_editor_content: true,
            dlc_include_engine_content: false,
            extra_args: Vec::new(),
        }
    }
}

/// Deployment configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    /// Platform label eligible for copying into the game install
    pub platform: String,

    /// Game installation directory
    pub install_dir: Option<Utf8PathBuf>,

    /// Copy the packaged plugin into the game installation
    pub copy_to_install: bool,

    /// Launch the game after deployment
    pub launch: bool,

    /// Extension of the game executable searched in the install directory
    pub executable_extension: String,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            platform: "Windows".to_string(),
            install_dir: None,
            copy_to_install: false,
            launch: false,
            executable_extension: "exe".to_string(),
        }
    }
}

/// Per-platform configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// Overrides the platform's default packaging policy
    pub packaging: Option<PackagingPolicy>,
}

impl Config {
    /// Load configuration from a project directory.
    ///
    /// `modpak.local.toml` is layered over `modpak.toml`; either may be
    /// missing. Relative `engine.root` and `deploy.install_dir` values are
    /// taken relative to the project directory, not the working directory.
    pub fn load(project_dir: &Utf8Path) -> Result<Self> {
        let mut merged = toml::Value::Table(toml::map::Map::new());
        let mut layers = Vec::new();

        for name in [CONFIG_FILE, LOCAL_CONFIG_FILE] {
            let path = project_dir.join(name);
            if let Some(layer) = read_layer(&path)? {
                merged = merge_toml_values(merged, layer);
                layers.push(path);
            }
        }

        if layers.is_empty() {
            tracing::debug!(
                project = %project_dir,
                "No modpak configuration found, using defaults"
            );
        }

        let mut config: Config = merged.try_into()?;
        config.resolve_paths(project_dir);

        tracing::debug!(
            layers = ?layers,
            build_id = %config.package.build_id,
            "Loaded modpak configuration"
        );
        Ok(config)
    }

    fn resolve_paths(&mut self, project_dir: &Utf8Path) {
        for path in [&mut self.engine.root, &mut self.deploy.install_dir]
            .into_iter()
            .flatten()
        {
            if path.is_relative() {
                *path = project_dir.join(&*path);
            }
        }
    }

    /// Load configuration from a string (for testing)
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Packaging policy for a platform label, falling back to the platform default
    pub fn packaging_policy(&self, platform: TargetPlatform, label: &str) -> PackagingPolicy {
        self.platforms
            .get(label)
            .and_then(|p| p.packaging)
            .unwrap_or_else(|| platform.default_packaging())
    }
}

/// Parse one configuration layer, `None` when the file does not exist
fn read_layer(path: &Utf8Path) -> Result<Option<toml::Value>> {
    if !path.is_file() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path).map_err(|e| Error::fs("read", path, e))?;
    let value = toml::from_str::<toml::Value>(&content).map_err(|e| {
        Error::config(
            format!("Invalid configuration in {}: {}", path, e.message()),
            "Fix the TOML syntax or remove the file",
        )
    })?;
    tracing::trace!(path = %path, "Read configuration layer");
    Ok(Some(value))
}

/// Merge a configuration layer over the layers below it:
/// - Tables: recursively merged
/// - Arrays: local replaces base (not merged)
/// - Primitives: local overrides base
fn merge_toml_values(base: toml::Value, local: toml::Value) -> toml::Value {
    match (base, local) {
        (toml::Value::Table(mut base_table), toml::Value::Table(local_table)) => {
            for (key, local_value) in local_table {
                if let Some(base_value) = base_table.remove(&key) {
                    base_table.insert(key, merge_toml_values(base_value, local_value));
                } else {
                    base_table.insert(key, local_value);
                }
            }
            toml::Value::Table(base_table)
        }
        (_, local) => local,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert!(config.engine.root.is_none());
        assert_eq!(config.package.build_id, "SZML");
        assert_eq!(config.package.platforms, vec![TargetPlatform::Win64]);
        assert_eq!(config.package.configuration, "Shipping");
        assert!(config.package.pak);
        assert!(config.package.stage);
        assert!(!config.package.skip_stage);
        assert_eq!(
            config.package.archive_dir,
            Utf8PathBuf::from("Saved/ArchivedPlugins")
        );
        assert_eq!(config.deploy.platform, "Windows");
        assert!(!config.deploy.copy_to_install);
        assert!(config.cook.enabled);
    }

    #[test]
    fn test_parse_minimal_config() {
        let config = Config::parse("").unwrap();

        assert_eq!(config.package.archive_extension, "zip");
        assert!(config.platforms.is_empty());
    }

    #[test]
    fn test_parse_full_config() {
        let content = r#"
[engine]
root = "/opt/UnrealEngine"

[package]
build_id = "CL-1234"
platforms = ["Win64", "Linux"]
dedicated_server = true

[cook]
enabled = false
extra_args = ["-iterate"]

[deploy]
install_dir = "/games/FactoryGame"
copy_to_install = true
launch = true

[platforms.Linux]
packaging = "never"
"#;

        let config = Config::parse(content).unwrap();

        assert_eq!(
            config.engine.root,
            Some(Utf8PathBuf::from("/opt/UnrealEngine"))
        );
        assert_eq!(config.package.build_id, "CL-1234");
        assert_eq!(
            config.package.platforms,
            vec![TargetPlatform::Win64, TargetPlatform::Linux]
        );
        assert!(config.package.dedicated_server);
        assert!(!config.cook.enabled);
        assert_eq!(config.cook.extra_args, vec!["-iterate"]);
        assert!(config.deploy.copy_to_install);
        assert!(config.deploy.launch);
        assert_eq!(
            config.packaging_policy(TargetPlatform::Linux, "Linux"),
            PackagingPolicy::Never
        );
        assert_eq!(
            config.packaging_policy(TargetPlatform::Win64, "Windows"),
            PackagingPolicy::Optional
        );
    }

    #[test]
    fn test_merge_configs_via_toml_value() {
        let base = r#"
[package]
build_id = "BASE"
platforms = ["Win64", "Linux"]

[deploy]
platform = "Windows"
"#;

        let local = r#"
[package]
platforms = ["Linux"]

[deploy]
install_dir = "/games/Foo"
"#;

        let base_value: toml::Value = toml::from_str(base).unwrap();
        let local_value: toml::Value = toml::from_str(local).unwrap();
        let merged: Config = merge_toml_values(base_value, local_value)
            .try_into()
            .unwrap();

        assert_eq!(merged.package.build_id, "BASE");
        // Arrays are replaced, not merged
        assert_eq!(merged.package.platforms, vec![TargetPlatform::Linux]);
        assert_eq!(merged.deploy.platform, "Windows");
        assert_eq!(
            merged.deploy.install_dir,
            Some(Utf8PathBuf::from("/games/Foo"))
        );
    }

    #[test]
    fn test_load_from_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        let project_dir = Utf8Path::from_path(temp_dir.path()).unwrap();

        std::fs::write(
            project_dir.join(CONFIG_FILE),
            "[package]\nbuild_id = \"A\"\ndedicated_server = true\n",
        )
        .unwrap();
        std::fs::write(
            project_dir.join(LOCAL_CONFIG_FILE),
            "[package]\nbuild_id = \"B\"\n",
        )
        .unwrap();

        let config = Config::load(project_dir).unwrap();

        assert_eq!(config.package.build_id, "B");
        assert!(config.package.dedicated_server);
    }

    #[test]
    fn test_load_missing_config_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let project_dir = Utf8Path::from_path(temp_dir.path()).unwrap();

        let config = Config::load(project_dir).unwrap();

        assert_eq!(config.package.build_id, "SZML");
    }

    #[test]
    fn test_load_resolves_paths_against_project() {
        let temp_dir = tempfile::tempdir().unwrap();
        let project_dir = Utf8Path::from_path(temp_dir.path()).unwrap();

        std::fs::write(
            project_dir.join(LOCAL_CONFIG_FILE),
            "[engine]\nroot = \"../UE\"\n\n[deploy]\ninstall_dir = \"/games/FactoryGame\"\n",
        )
        .unwrap();

        let config = Config::load(project_dir).unwrap();

        assert_eq!(config.engine.root, Some(project_dir.join("../UE")));
        assert_eq!(
            config.deploy.install_dir,
            Some(Utf8PathBuf::from("/games/FactoryGame"))
        );
    }

    #[test]
    fn test_load_error_names_broken_layer() {
        let temp_dir = tempfile::tempdir().unwrap();
        let project_dir = Utf8Path::from_path(temp_dir.path()).unwrap();

        std::fs::write(project_dir.join(CONFIG_FILE), "[package]\n").unwrap();
        std::fs::write(project_dir.join(LOCAL_CONFIG_FILE), "[deploy\n").unwrap();

        let err = Config::load(project_dir).unwrap_err();

        assert!(err.is_config());
        assert!(err.to_string().contains(LOCAL_CONFIG_FILE), "{}", err);
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        let result = Config::parse("[package\nbuild_id = 1");
        assert!(matches!(result, Err(crate::Error::TomlParse(_))));
    }
}
