//! Content cooking
//!
//! Cooking is delegated to the engine's automation tool. The pipeline only
//! needs the cooked output to exist below each context's cook root once
//! [`Cooker::cook`] returns, so the cooker is a trait and tests substitute
//! their own implementation.

use camino::{Utf8Path, Utf8PathBuf};
use std::io::{BufRead, BufReader};
use std::process::{Command, Stdio};

use crate::config::CookConfig;
use crate::context::DeploymentContext;
use crate::platform::TargetPlatform;
use crate::plugin::PluginDescriptor;
use crate::project::ProjectDescriptor;
use crate::{Error, Result};

/// Everything the cooker needs to know about the requested build
#[derive(Debug, Clone)]
pub struct BuildParams {
    /// Project the plugin is cooked against
    pub project: ProjectDescriptor,
    /// Plugin being packaged (cooked as DLC)
    pub plugin: PluginDescriptor,
    /// Engine directory (`<root>/Engine`)
    pub engine_dir: Option<Utf8PathBuf>,
    /// Target platforms
    pub platforms: Vec<TargetPlatform>,
    /// Build configuration (e.g. "Shipping")
    pub configuration: String,
    /// Cook for the dedicated server as well
    pub dedicated_server: bool,
    /// Skip the client cook
    pub no_client: bool,
    /// Ask the automation tool for pak output
    pub pak: bool,
    /// Cook options
    pub cook: CookConfig,
}

/// Produces cooked content for a set of deployment contexts
pub trait Cooker {
    /// Cook once for all contexts combined
    fn cook(&self, params: &BuildParams, contexts: &[DeploymentContext]) -> Result<()>;
}

/// Cooker used when content has already been cooked
#[derive(Debug, Default)]
pub struct NoopCooker;

impl Cooker for NoopCooker {
    fn cook(&self, _params: &BuildParams, contexts: &[DeploymentContext]) -> Result<()> {
        for context in contexts {
            if !has_cooked_output(&context.cook_root) {
                tracing::warn!(
                    platform = %context.platform_label,
                    path = %context.cook_root,
                    "Cooking skipped but no cooked output found"
                );
            }
        }
        Ok(())
    }
}

/// Cooker running `RunUAT BuildCookRun`
#[derive(Debug, Default)]
pub struct UatCooker;

impl UatCooker {
    /// Path of the automation runner
    pub fn runner(params: &BuildParams) -> Result<Utf8PathBuf> {
        if let Some(ref runner) = params.cook.runner {
            return Ok(runner.clone());
        }

        let engine_dir = params.engine_dir.as_ref().ok_or_else(|| {
            Error::config(
                "Cannot locate RunUAT: no engine directory configured",
                "Pass --engine-dir, or set engine.root or cook.runner in modpak.toml",
            )
        })?;

        let script = if cfg!(windows) {
            "RunUAT.bat"
        } else {
            "RunUAT.sh"
        };
        Ok(engine_dir.join("Build").join("BatchFiles").join(script))
    }

    /// Arguments passed to the runner
    pub fn arguments(params: &BuildParams) -> Vec<String> {
        let platforms = params
            .platforms
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("+");

        let mut args = vec![
            "BuildCookRun".to_string(),
            format!("-project={}", params.project.file),
            "-noP4".to_string(),
            "-utf8output".to_string(),
            "-cook".to_string(),
            "-skipstage".to_string(),
            format!("-dlcname={}", params.plugin.name),
            format!(
                "-basedonreleaseversion={}",
                params.cook.based_on_release_version
            ),
        ];

        let cook = &params.cook;
        for (enabled, flag) in [
            (params.pak, "-pak"),
            (cook.compressed, "-compressed"),
            (cook.skip_editor_content, "-SkipCookingEditorContent"),
            (cook.dlc_include_engine_content, "-DLCIncludeEngineContent"),
        ] {
            if enabled {
                args.push(flag.to_string());
            }
        }

        if params.no_client {
            args.push("-noclient".to_string());
        } else {
            args.push(format!("-platform={}", platforms));
            args.push(format!("-clientconfig={}", params.configuration));
        }

        if params.dedicated_server {
            args.push("-server".to_string());
            args.push(format!("-serverplatform={}", platforms));
            args.push(format!("-serverconfig={}", params.configuration));
        }

        if !params.cook.additional_cooker_options.is_empty() {
            args.push(format!(
                "-additionalcookeroptions={}",
                params.cook.additional_cooker_options
            ));
        }

        args.extend(params.cook.extra_args.iter().cloned());
        args
    }
}

impl Cooker for UatCooker {
    fn cook(&self, params: &BuildParams, _contexts: &[DeploymentContext]) -> Result<()> {
        let runner = Self::runner(params)?;
        if !runner.exists() {
            return Err(Error::config(
                format!("Automation runner not found: {}", runner),
                "Check the engine directory or cook.runner in modpak.toml",
            ));
        }

        tracing::info!("********** COOK COMMAND STARTED **********");

        let mut command = Command::new(runner.as_std_path());
        command
            .args(Self::arguments(params))
            .current_dir(&params.project.directory);

        run_command_with_logging(&mut command, &params.plugin.name, "Cook")?;

        tracing::info!("********** COOK COMMAND COMPLETED **********");
        Ok(())
    }
}

/// Run a command, forwarding each output line to tracing
///
/// Stdout lines are logged at debug level and stderr lines at warn level,
/// both under the `cook_output` target.
pub fn run_command_with_logging(
    command: &mut Command,
    plugin_name: &str,
    operation: &str,
) -> Result<()> {
    command.stdout(Stdio::piped()).stderr(Stdio::piped());

    tracing::debug!("Running command: {:?}", command);

    let mut child = command.spawn().map_err(|e| {
        Error::cook(
            format!("{} failed to start for {}", operation, plugin_name),
            e.to_string(),
        )
    })?;

    let stderr = child.stderr.take();
    let stderr_plugin = plugin_name.to_string();
    let stderr_handle = std::thread::spawn(move || {
        if let Some(stderr) = stderr {
            for line in BufReader::new(stderr).lines().map_while(std::result::Result::ok) {
                tracing::warn!(target: "cook_output", plugin = %stderr_plugin, "{}", line);
            }
        }
    });

    if let Some(stdout) = child.stdout.take() {
        for line in BufReader::new(stdout).lines().map_while(std::result::Result::ok) {
            tracing::debug!(target: "cook_output", plugin = %plugin_name, "{}", line);
        }
    }

    let status = child.wait().map_err(|e| {
        Error::cook(
            format!("{} failed for {}", operation, plugin_name),
            e.to_string(),
        )
    })?;

    let _ = stderr_handle.join();

    if !status.success() {
        return Err(Error::cook(
            format!(
                "{} failed for {} with exit code: {:?}",
                operation,
                plugin_name,
                status.code()
            ),
            "Check the cook output for errors (run with -v for the full log)",
        ));
    }

    Ok(())
}

/// Whether a directory holds any cooked output
pub fn has_cooked_output(cook_root: &Utf8Path) -> bool {
    std::fs::read_dir(cook_root)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::PluginOrigin;

    fn params() -> BuildParams {
        let project = ProjectDescriptor {
            name: "FactoryGame".to_string(),
            file: Utf8PathBuf::from("/work/FactoryGame/FactoryGame.uproject"),
            directory: Utf8PathBuf::from("/work/FactoryGame"),
            engine_association: None,
        };
        let plugin = PluginDescriptor::new(
            "Foo",
            Utf8Path::new("/work/FactoryGame/Plugins/Foo/Foo.uplugin"),
            &project.directory,
            None,
        )
        .unwrap();
        assert_eq!(plugin.origin, PluginOrigin::Project);

        BuildParams {
            project,
            plugin,
            engine_dir: Some(Utf8PathBuf::from("/ue/Engine")),
            platforms: vec![TargetPlatform::Win64],
            configuration: "Shipping".to_string(),
            dedicated_server: false,
            no_client: false,
            pak: true,
            cook: CookConfig::default(),
        }
    }

    #[test]
    fn test_client_arguments() {
        let args = UatCooker::arguments(&params());

        assert_eq!(args[0], "BuildCookRun");
        assert!(args.contains(&"-project=/work/FactoryGame/FactoryGame.uproject".to_string()));
        assert!(args.contains(&"-dlcname=Foo".to_string()));
        assert!(args.contains(&"-platform=Win64".to_string()));
        assert!(args.contains(&"-clientconfig=Shipping".to_string()));
        assert!(
            args.contains(&"-basedonreleaseversion=NonExistentBasedOnReleaseVersion".to_string())
        );
        assert!(!args.iter().any(|a| a == "-server"));
    }

    #[test]
    fn test_packaging_flags() {
        let args = UatCooker::arguments(&params());

        assert!(args.contains(&"-pak".to_string()));
        assert!(args.contains(&"-SkipCookingEditorContent".to_string()));
        assert!(!args.contains(&"-compressed".to_string()));
        assert!(!args.contains(&"-DLCIncludeEngineContent".to_string()));

        let mut params = params();
        params.pak = false;
        params.cook.compressed = true;
        params.cook.skip_editor_content = false;
        params.cook.dlc_include_engine_content = true;

        let args = UatCooker::arguments(&params);

        assert!(!args.contains(&"-pak".to_string()));
        assert!(args.contains(&"-compressed".to_string()));
        assert!(!args.contains(&"-SkipCookingEditorContent".to_string()));
        assert!(args.contains(&"-DLCIncludeEngineContent".to_string()));
    }

    #[test]
    fn test_server_arguments() {
        let mut params = params();
        params.platforms.push(TargetPlatform::Linux);
        params.dedicated_server = true;
        params.no_client = true;
        params.cook.extra_args = vec!["-iterate".to_string()];

        let args = UatCooker::arguments(&params);

        assert!(args.contains(&"-noclient".to_string()));
        assert!(args.contains(&"-serverplatform=Win64+Linux".to_string()));
        assert!(!args.iter().any(|a| a.starts_with("-platform=")));
        assert_eq!(args.last().map(String::as_str), Some("-iterate"));
    }

    #[test]
    fn test_runner_path() {
        let runner = UatCooker::runner(&params()).unwrap();
        assert!(runner.starts_with("/ue/Engine/Build/BatchFiles"));

        let mut params = params();
        params.engine_dir = None;
        assert!(UatCooker::runner(&params).unwrap_err().is_config());

        params.cook.runner = Some(Utf8PathBuf::from("/custom/uat.sh"));
        assert_eq!(
            UatCooker::runner(&params).unwrap(),
            Utf8PathBuf::from("/custom/uat.sh")
        );
    }

    #[test]
    fn test_has_cooked_output() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let root = Utf8Path::from_path(temp_dir.path()).unwrap();

        assert!(!has_cooked_output(&root.join("missing")));
        assert!(!has_cooked_output(root));
        std::fs::write(root.join("file"), "x").unwrap();
        assert!(has_cooked_output(root));
    }
}
