//! Packaging orchestration
//!
//! A run moves through [`PipelineState`] in order:
//!
//! ```text
//! Init -> Cooked -> Staged -> Remapped -> Packaged -> Archived -> Deployed -> Cleaned
//! ```
//!
//! Cooking happens once for all deployment contexts; every later step walks
//! the full context list. The stage directories are owned by a
//! [`StagingGuard`] from the moment staging starts, so they are deleted on
//! every exit path and the error that stopped the run is the one returned.

mod guard;
mod progress;

pub use guard::{StagingGuard, remove_stage_dirs};
pub use progress::PipelineProgress;

use camino::{Utf8Path, Utf8PathBuf};
use std::fmt;

use crate::archive::{ArchiveArtifact, ArchiveSettings, archive_all, archive_path};
use crate::config::Config;
use crate::context::{DeploymentContext, create_contexts};
use crate::cook::{BuildParams, Cooker, NoopCooker, UatCooker};
use crate::deploy::{DeployOptions, DeployReport, Deployer, Launcher, ProcessLauncher};
use crate::modules::{BuildId, sync_build_id};
use crate::platform::{StageFlags, requires_staging};
use crate::plugin::PluginDescriptor;
use crate::project::ProjectDescriptor;
use crate::remap::apply_remaps;
use crate::stage::{FsStager, Stager, StagingPipeline};
use crate::{Error, Result};

/// Progress of a packaging run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PipelineState {
    /// Nothing done yet
    Init,
    /// The cooker finished for all contexts
    Cooked,
    /// Stage directories cleaned and staging manifests built
    Staged,
    /// Remapped stage trees materialized
    Remapped,
    /// `.modules` build ids synchronized
    Packaged,
    /// One archive written per staged context
    Archived,
    /// Copied into the game installation and launched, as requested
    Deployed,
    /// Stage directories removed
    Cleaned,
}

impl PipelineState {
    /// Short human readable description
    pub fn description(self) -> &'static str {
        match self {
            PipelineState::Init => "initializing",
            PipelineState::Cooked => "cooked",
            PipelineState::Staged => "staging planned",
            PipelineState::Remapped => "staged and remapped",
            PipelineState::Packaged => "modules synchronized",
            PipelineState::Archived => "archived",
            PipelineState::Deployed => "deployed",
            PipelineState::Cleaned => "cleaned up",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Init => "Init",
            PipelineState::Cooked => "Cooked",
            PipelineState::Staged => "Staged",
            PipelineState::Remapped => "Remapped",
            PipelineState::Packaged => "Packaged",
            PipelineState::Archived => "Archived",
            PipelineState::Deployed => "Deployed",
            PipelineState::Cleaned => "Cleaned",
        };
        f.write_str(name)
    }
}

/// Fully resolved input of a packaging run
#[derive(Debug, Clone)]
pub struct PackageRequest {
    /// Project the plugin belongs to
    pub project: ProjectDescriptor,
    /// Plugin being packaged
    pub plugin: PluginDescriptor,
    /// Engine directory (`<root>/Engine`), if an engine root is configured
    pub engine_dir: Option<Utf8PathBuf>,
    /// Effective configuration
    pub config: Config,
    /// Build id written into every `.modules` file
    pub build_id: BuildId,
    /// Deployment options
    pub deploy: DeployOptions,
}

impl PackageRequest {
    /// Resolve the plugin and derived settings from a loaded configuration
    pub fn new(project: ProjectDescriptor, plugin_name: &str, config: Config) -> Result<Self> {
        let engine_dir = config
            .engine
            .root
            .as_deref()
            .map(|root| engine_dir(&project.join(root)))
            .transpose()?;

        let plugin = PluginDescriptor::resolve(plugin_name, &project, engine_dir.as_deref())?;
        let build_id = BuildId::new(config.package.build_id.clone())?;
        let deploy = DeployOptions::from(&config.deploy);

        Ok(Self {
            project,
            plugin,
            engine_dir,
            config,
            build_id,
            deploy,
        })
    }

    /// Staging flags requested by the configuration
    pub fn stage_flags(&self) -> StageFlags {
        StageFlags {
            pak: self.config.package.pak,
            stage: self.config.package.stage,
            skip_stage: self.config.package.skip_stage,
        }
    }

    /// Parameters handed to the cooker
    pub fn build_params(&self) -> BuildParams {
        let package = &self.config.package;
        BuildParams {
            project: self.project.clone(),
            plugin: self.plugin.clone(),
            engine_dir: self.engine_dir.clone(),
            platforms: package.target_platforms(),
            configuration: package.configuration.clone(),
            dedicated_server: package.dedicated_server,
            no_client: package.no_client,
            pak: package.pak,
            cook: self.config.cook.clone(),
        }
    }

    /// Archive destination settings
    pub fn archive_settings(&self) -> ArchiveSettings {
        ArchiveSettings::from(&self.config.package)
    }
}

/// The `Engine` directory below an engine root.
///
/// A root that already is the `Engine` directory is accepted as well.
fn engine_dir(root: &Utf8Path) -> Result<Utf8PathBuf> {
    let candidate = if root.file_name() == Some("Engine") {
        root.to_path_buf()
    } else {
        root.join("Engine")
    };

    if !candidate.is_dir() {
        return Err(Error::config(
            format!("Engine directory not found: {}", candidate),
            "Set engine.root (or --engine-dir) to the directory containing Engine/",
        ));
    }

    candidate
        .canonicalize_utf8()
        .map_err(|e| Error::fs("resolve", &candidate, e))
}

/// One deployment context as the run would handle it
#[derive(Debug, Clone)]
pub struct PlannedContext {
    /// The context, with remaps applied
    pub context: DeploymentContext,
    /// Whether staging (and therefore archiving) happens for it
    pub staged: bool,
    /// Archive that would be written
    pub archive: Option<Utf8PathBuf>,
}

/// Outcome of a successful run
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// Platform labels of all deployment contexts
    pub contexts: Vec<String>,
    /// Number of contexts staged
    pub staged: usize,
    /// Number of `.modules` files synchronized
    pub modules_synced: usize,
    /// Archives written
    pub archives: Vec<ArchiveArtifact>,
    /// Installation result
    pub deploy: DeployReport,
    /// Last state reached
    pub final_state: PipelineState,
}

/// Packaging pipeline with replaceable collaborators
pub struct Pipeline {
    request: PackageRequest,
    cooker: Box<dyn Cooker>,
    stager: Box<dyn Stager>,
    launcher: Box<dyn Launcher>,
}

impl Pipeline {
    /// Create a pipeline using the engine cooker (unless disabled), the
    /// filesystem stager and the process launcher
    pub fn new(request: PackageRequest) -> Self {
        let cooker: Box<dyn Cooker> = if request.config.cook.enabled {
            Box::new(UatCooker)
        } else {
            Box::new(NoopCooker)
        };

        Self {
            request,
            cooker,
            stager: Box::new(FsStager),
            launcher: Box::new(ProcessLauncher),
        }
    }

    /// Replace the cooker
    pub fn with_cooker(mut self, cooker: impl Cooker + 'static) -> Self {
        self.cooker = Box::new(cooker);
        self
    }

    /// Replace the stager
    pub fn with_stager(mut self, stager: impl Stager + 'static) -> Self {
        self.stager = Box::new(stager);
        self
    }

    /// Replace the launcher
    pub fn with_launcher(mut self, launcher: impl Launcher + 'static) -> Self {
        self.launcher = Box::new(launcher);
        self
    }

    /// The request this pipeline runs
    pub fn request(&self) -> &PackageRequest {
        &self.request
    }

    /// Deployment contexts with the plugin remap registered
    pub fn contexts(&self) -> Result<Vec<DeploymentContext>> {
        let request = &self.request;
        let mut contexts = create_contexts(
            &request.project,
            request.engine_dir.as_deref(),
            &request.config,
        );

        if contexts.is_empty() {
            return Err(Error::config(
                "No deployment contexts: client disabled and no dedicated server requested",
                "Drop --no-client or add --server",
            ));
        }

        apply_remaps(&request.plugin, &request.project.name, &mut contexts)?;
        Ok(contexts)
    }

    /// Describe what a run would do without touching the filesystem
    pub fn plan(&self) -> Result<Vec<PlannedContext>> {
        let request = &self.request;
        request.deploy.validate(&request.project)?;

        let flags = request.stage_flags();
        let settings = request.archive_settings();

        Ok(self
            .contexts()?
            .into_iter()
            .map(|context| {
                let staged = requires_staging(context.packaging, flags);
                let archive = staged.then(|| {
                    archive_path(
                        &request.project,
                        &settings,
                        &context.platform_label,
                        &request.plugin.name,
                    )
                });
                PlannedContext {
                    context,
                    staged,
                    archive,
                }
            })
            .collect())
    }

    /// Run the pipeline to completion.
    ///
    /// Stage directories are removed whatever the outcome.
    pub fn run(&self) -> Result<PipelineReport> {
        let progress = PipelineProgress::new(&self.request.plugin.name);
        let _span = progress.span().enter();
        let mut state = PipelineState::Init;

        tracing::info!(
            project = %self.request.project.name,
            plugin = %self.request.plugin.name,
            build_id = %self.request.build_id,
            "Packaging plugin"
        );

        match self.execute(&mut state, &progress) {
            Ok(report) => {
                tracing::info!(
                    plugin = %self.request.plugin.name,
                    archives = report.archives.len(),
                    "Packaging complete"
                );
                Ok(report)
            }
            Err(e) => {
                tracing::error!(
                    plugin = %self.request.plugin.name,
                    last_state = %state,
                    "Packaging failed: {}",
                    e
                );
                Err(e)
            }
        }
    }

    fn execute(
        &self,
        state: &mut PipelineState,
        progress: &PipelineProgress,
    ) -> Result<PipelineReport> {
        let request = &self.request;
        let mut advance = |next: PipelineState| {
            *state = next;
            progress.advance(next);
        };

        request.deploy.validate(&request.project)?;
        let contexts = self.contexts()?;

        self.cooker.cook(&request.build_params(), &contexts)?;
        advance(PipelineState::Cooked);

        let guard = StagingGuard::acquire(&contexts);
        let staging = StagingPipeline::new(self.stager.as_ref(), request.stage_flags());

        let manifests = staging.prepare(&contexts)?;
        advance(PipelineState::Staged);

        let staged = staging.apply(&contexts, &manifests)?;
        advance(PipelineState::Remapped);

        let staged_contexts: Vec<DeploymentContext> = contexts
            .iter()
            .zip(&manifests)
            .filter(|(_, manifest)| manifest.is_some())
            .map(|(context, _)| context.clone())
            .collect();

        let mut modules_synced = 0;
        for context in &staged_contexts {
            modules_synced += sync_build_id(&context.stage_root, &request.build_id)?;
        }
        advance(PipelineState::Packaged);

        let archives = archive_all(
            &staged_contexts,
            &request.project,
            &request.plugin,
            &request.archive_settings(),
        )?;
        advance(PipelineState::Archived);

        let deploy = Deployer::new(&request.deploy, self.launcher.as_ref()).deploy(
            &staged_contexts,
            &request.project,
            &request.plugin,
        )?;
        advance(PipelineState::Deployed);

        let failed = guard.release();
        if !failed.is_empty() {
            tracing::warn!(
                count = failed.len(),
                "Some stage directories could not be removed; run `modpak clean` to retry"
            );
        }
        advance(PipelineState::Cleaned);

        Ok(PipelineReport {
            contexts: contexts.iter().map(|c| c.platform_label.clone()).collect(),
            staged,
            modules_synced,
            archives,
            deploy,
            final_state: *state,
        })
    }
}
