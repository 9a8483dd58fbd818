//! Package command implementation

use camino::Utf8PathBuf;
use clap::Args;
use miette::Result;

use crate::config::Config;
use crate::pipeline::{PackageRequest, Pipeline};
use crate::platform::TargetPlatform;
use crate::project::ProjectDescriptor;

/// Arguments for the package command
#[derive(Debug, Args)]
pub struct PackageArgs {
    /// Path of the project's .uproject file
    #[arg(long)]
    pub project: Utf8PathBuf,

    /// Name of the plugin to package
    #[arg(long)]
    pub plugin: String,

    /// Engine root directory (the directory containing Engine/)
    #[arg(long)]
    pub engine_dir: Option<Utf8PathBuf>,

    /// Game installation directory
    #[arg(long)]
    pub game_dir: Option<Utf8PathBuf>,

    /// Copy the packaged plugin into the game's Mods directory
    #[arg(long)]
    pub copy_to_game_dir: bool,

    /// Launch the game after packaging
    #[arg(long)]
    pub launch_game: bool,

    /// Build id written into every .modules file
    #[arg(long)]
    pub build_id: Option<String>,

    /// Target platforms (repeatable, default from modpak.toml)
    #[arg(long = "platform")]
    pub platforms: Vec<TargetPlatform>,

    /// Also package for the dedicated server
    #[arg(long)]
    pub server: bool,

    /// Do not package the client
    #[arg(long)]
    pub no_client: bool,

    /// Use existing cooked content instead of running the cooker
    #[arg(long)]
    pub skip_cook: bool,

    /// Dry run - show what would be packaged
    #[arg(long)]
    pub dry_run: bool,
}

impl PackageArgs {
    /// Apply command line overrides on top of the loaded configuration
    fn apply(&self, config: &mut Config) {
        if let Some(ref engine_dir) = self.engine_dir {
            config.engine.root = Some(engine_dir.clone());
        }
        if let Some(ref game_dir) = self.game_dir {
            config.deploy.install_dir = Some(game_dir.clone());
        }
        if let Some(ref build_id) = self.build_id {
            config.package.build_id = build_id.clone();
        }
        if !self.platforms.is_empty() {
            config.package.platforms = self.platforms.clone();
        }
        config.deploy.copy_to_install |= self.copy_to_game_dir;
        config.deploy.launch |= self.launch_game;
        config.package.dedicated_server |= self.server;
        config.package.no_client |= self.no_client;
        if self.skip_cook {
            config.cook.enabled = false;
        }
    }
}

/// Run the package command
pub fn run(args: PackageArgs) -> Result<()> {
    let project = ProjectDescriptor::from_path(&args.project)?;
    tracing::info!("Packaging {} for project {}", args.plugin, project.name);

    let mut config = Config::load(&project.directory)?;
    args.apply(&mut config);

    let request = PackageRequest::new(project, &args.plugin, config)?;
    let pipeline = Pipeline::new(request);

    if args.dry_run {
        let plan = pipeline.plan()?;
        let request = pipeline.request();

        println!(
            "Would package {} ({}) with build id {}:",
            request.plugin.name, request.plugin.file, request.build_id
        );
        for planned in &plan {
            let ctx = &planned.context;
            println!("  - {}", ctx.platform_label);
            println!("      cooked: {}", ctx.cook_root);
            println!("      staged: {}", ctx.stage_root);
            for remap in &ctx.remaps {
                println!("      remap:  {} -> {}", remap.source, remap.destination);
            }
            match planned.archive {
                Some(ref archive) => println!("      archive: {}", archive),
                None => println!("      archive: (staging not required)"),
            }
        }
        if let Some(ref install_dir) = request.deploy.install_dir {
            if request.deploy.copy_to_install {
                println!(
                    "Would install into {}",
                    install_dir
                        .join(&request.project.name)
                        .join("Mods")
                        .join(request.plugin.install_relative_path())
                );
            }
            if request.deploy.launch {
                println!("Would launch the game from {}", install_dir);
            }
        }
        return Ok(());
    }

    let report = pipeline.run()?;

    for archive in &report.archives {
        println!("{}: {} ({} files)", archive.platform_label, archive.path, archive.files);
    }
    for installed in &report.deploy.installed {
        println!("Installed: {}", installed);
    }
    if let Some(ref launched) = report.deploy.launched {
        println!("Launched: {}", launched);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Debug, Parser)]
    struct TestCli {
        #[command(flatten)]
        args: PackageArgs,
    }

    #[test]
    fn test_overrides_apply_to_config() {
        let cli = TestCli::parse_from([
            "modpak",
            "--project",
            "FactoryGame.uproject",
            "--plugin",
            "Foo",
            "--game-dir",
            "/games/Satisfactory",
            "--copy-to-game-dir",
            "--build-id",
            "ABCD",
            "--platform",
            "linux",
            "--platform",
            "Win64",
            "--server",
            "--skip-cook",
        ]);

        let mut config = Config::default();
        cli.args.apply(&mut config);

        assert_eq!(
            config.deploy.install_dir,
            Some(Utf8PathBuf::from("/games/Satisfactory"))
        );
        assert!(config.deploy.copy_to_install);
        assert!(!config.deploy.launch);
        assert_eq!(config.package.build_id, "ABCD");
        assert_eq!(
            config.package.platforms,
            vec![TargetPlatform::Linux, TargetPlatform::Win64]
        );
        assert!(config.package.dedicated_server);
        assert!(!config.cook.enabled);
    }

    #[test]
    fn test_config_kept_without_overrides() {
        let cli = TestCli::parse_from(["modpak", "--project", "P.uproject", "--plugin", "Foo"]);

        let mut config = Config::parse("[package]\nbuild_id = \"FROMFILE\"\n").unwrap();
        cli.args.apply(&mut config);

        assert_eq!(config.package.build_id, "FROMFILE");
        assert_eq!(config.package.platforms, vec![TargetPlatform::Win64]);
        assert!(config.cook.enabled);
    }
}
