//! On-disk project fixtures
//!
//! A fixture lays out a minimal project with one plugin, plus an empty game
//! installation next to it:
//!
//! ```text
//! <tmp>/FactoryGame/FactoryGame.uproject
//! <tmp>/FactoryGame/Plugins/Foo/Foo.uplugin
//! <tmp>/Game/FactoryGame/
//! ```

use camino::{Utf8Path, Utf8PathBuf};
use modpak::config::Config;
use modpak::context::DeploymentContext;
use modpak::cook::{BuildParams, Cooker};
use modpak::deploy::Launcher;
use modpak::pipeline::{PackageRequest, Pipeline};
use modpak::project::ProjectDescriptor;
use std::cell::RefCell;
use std::rc::Rc;
use tempfile::TempDir;

/// Modules file as the cooker writes it, with the engine's build id
pub const COOKED_MODULES: &str = concat!(
    "{\n",
    "\t\"BuildId\": \"0d1e3b2c-engine\",\n",
    "\t\"Modules\": {\n",
    "\t\t\"Foo\": \"UnrealGame-Foo-Win64-Shipping.dll\",\n",
    "\t\t\"FooEditor\": \"UnrealGame-FooEditor-Win64-Shipping.dll\"\n",
    "\t}\n",
    "}\n",
);

/// A project with a single plugin in a temporary directory
pub struct ModProject {
    _temp: TempDir,
    /// Temporary root
    pub root: Utf8PathBuf,
    /// Project descriptor
    pub project: ProjectDescriptor,
    /// Plugin name
    pub plugin: String,
}

impl ModProject {
    /// Create `FactoryGame` with plugin `Foo`
    pub fn new() -> Self {
        Self::with_names("FactoryGame", "Foo")
    }

    /// Create a project and plugin with the given names
    pub fn with_names(project_name: &str, plugin_name: &str) -> Self {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let root = Utf8Path::from_path(temp.path())
            .expect("Temp dir is not UTF-8")
            .canonicalize_utf8()
            .expect("Failed to canonicalize temp dir");

        let project_dir = root.join(project_name);
        let plugin_dir = project_dir.join("Plugins").join(plugin_name);
        std::fs::create_dir_all(&plugin_dir).expect("Failed to create plugin dir");
        std::fs::write(
            project_dir.join(format!("{}.uproject", project_name)),
            r#"{ "FileVersion": 3, "EngineAssociation": "5.3" }"#,
        )
        .expect("Failed to write project file");
        std::fs::write(
            plugin_dir.join(format!("{}.uplugin", plugin_name)),
            r#"{ "FileVersion": 3, "VersionName": "1.0.0" }"#,
        )
        .expect("Failed to write plugin file");
        std::fs::create_dir_all(root.join("Game").join(project_name))
            .expect("Failed to create game dir");

        let project =
            ProjectDescriptor::from_path(&project_dir.join(format!("{}.uproject", project_name)))
                .expect("Failed to load project");

        Self {
            _temp: temp,
            root,
            project,
            plugin: plugin_name.to_string(),
        }
    }

    /// Game installation directory
    pub fn game_dir(&self) -> Utf8PathBuf {
        self.root.join("Game")
    }

    /// Stage root of a platform label
    pub fn stage_root(&self, label: &str) -> Utf8PathBuf {
        self.project.directory.join("Saved/StagedBuilds").join(label)
    }

    /// Expected archive path of a platform label
    pub fn archive(&self, label: &str) -> Utf8PathBuf {
        self.project
            .directory
            .join("Saved/ArchivedPlugins")
            .join(label)
            .join(format!("{}.zip", self.plugin))
    }

    /// Plugin directory inside the game installation
    pub fn installed_plugin(&self) -> Utf8PathBuf {
        self.game_dir()
            .join(&self.project.name)
            .join("Mods")
            .join(&self.plugin)
    }

    /// Resolve a packaging request
    pub fn request(&self, config: Config) -> PackageRequest {
        PackageRequest::new(self.project.clone(), &self.plugin, config)
            .expect("Failed to build package request")
    }

    /// Pipeline using [`FixtureCooker`] and a [`RecordingLauncher`]
    pub fn pipeline(&self, config: Config, launcher: &RecordingLauncher) -> Pipeline {
        Pipeline::new(self.request(config))
            .with_cooker(FixtureCooker::new(&self.project.name, &self.plugin))
            .with_launcher(launcher.clone())
    }
}

impl Default for ModProject {
    fn default() -> Self {
        Self::new()
    }
}

/// Writes the cooked tree the engine would produce for a DLC plugin cook
#[derive(Debug, Clone)]
pub struct FixtureCooker {
    project_name: String,
    plugin_name: String,
    /// Content written into the plugin's asset
    pub asset: String,
}

impl FixtureCooker {
    /// Create a cooker for a project and plugin
    pub fn new(project_name: &str, plugin_name: &str) -> Self {
        Self {
            project_name: project_name.to_string(),
            plugin_name: plugin_name.to_string(),
            asset: "cooked asset".to_string(),
        }
    }
}

impl Cooker for FixtureCooker {
    fn cook(&self, _params: &BuildParams, contexts: &[DeploymentContext]) -> modpak::Result<()> {
        for context in contexts {
            let project = context.cook_root.join(&self.project_name);
            let plugin = project.join("Plugins").join(&self.plugin_name);

            std::fs::create_dir_all(plugin.join("Content/Maps"))?;
            std::fs::create_dir_all(plugin.join("Binaries/Win64"))?;
            std::fs::create_dir_all(project.join("Content"))?;

            std::fs::write(
                plugin.join(format!("{}.uplugin", self.plugin_name)),
                r#"{ "FileVersion": 3 }"#,
            )?;
            std::fs::write(plugin.join("Content/Maps/Level.umap"), &self.asset)?;
            std::fs::write(
                plugin.join("Binaries/Win64/UnrealGame.modules"),
                COOKED_MODULES,
            )?;
            std::fs::write(plugin.join("Binaries/Win64/UnrealServer.modules"), COOKED_MODULES)?;
            // Base game content that belongs to no plugin
            std::fs::write(project.join("Content/Base.uasset"), "base")?;
        }
        Ok(())
    }
}

/// Launcher recording launches instead of spawning processes
#[derive(Debug, Clone, Default)]
pub struct RecordingLauncher {
    launched: Rc<RefCell<Vec<Utf8PathBuf>>>,
}

impl RecordingLauncher {
    /// Executables launched so far
    pub fn launched(&self) -> Vec<Utf8PathBuf> {
        self.launched.borrow().clone()
    }
}

impl Launcher for RecordingLauncher {
    fn launch(&self, executable: &Utf8Path, _working_dir: &Utf8Path) -> modpak::Result<()> {
        self.launched.borrow_mut().push(executable.to_path_buf());
        Ok(())
    }
}
