//! Staging
//!
//! Staging turns each context's cooked output into its stage directory,
//! applying the registered directory remaps on the way. The work is split in
//! three steps behind the [`Stager`] trait (clean, build manifest, apply) and
//! driven by [`StagingPipeline`] in two passes: every context is cleaned and
//! planned before any context is applied.

use camino::{Utf8Path, Utf8PathBuf};

use crate::context::DeploymentContext;
use crate::deploy::{copy_file, create_dir_all, list_files, remove_dir_if_exists};
use crate::platform::{StageFlags, requires_staging};
use crate::{Error, Result};

/// A single file to materialize in the stage directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    /// Absolute source path
    pub source: Utf8PathBuf,
    /// Destination path relative to the stage root
    pub destination: Utf8PathBuf,
}

/// What goes where for one context
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StagingManifest {
    /// Files in staging order
    pub files: Vec<StagedFile>,
}

impl StagingManifest {
    /// Add a file, applying the first matching remap to its destination
    pub fn add(&mut self, source: Utf8PathBuf, relative: &Utf8Path, context: &DeploymentContext) {
        let destination = context
            .remaps
            .iter()
            .find_map(|remap| remap.apply(relative))
            .unwrap_or_else(|| relative.to_path_buf());
        self.files.push(StagedFile {
            source,
            destination,
        });
    }

    /// Number of files
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the manifest is empty
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Materializes cooked output into stage directories
pub trait Stager {
    /// Remove any previous stage directory of the context
    fn clean(&self, context: &DeploymentContext) -> Result<()>;

    /// Decide which files go where, including remaps
    fn create_manifest(&self, context: &DeploymentContext) -> Result<StagingManifest>;

    /// Copy the planned files into the stage directory
    fn apply(&self, context: &DeploymentContext, manifest: &StagingManifest) -> Result<()>;
}

/// Stager copying files from the cook root into the stage root
#[derive(Debug, Default)]
pub struct FsStager;

impl Stager for FsStager {
    fn clean(&self, context: &DeploymentContext) -> Result<()> {
        if remove_dir_if_exists(&context.stage_root)? {
            tracing::debug!(path = %context.stage_root, "Removed previous stage directory");
        }
        Ok(())
    }

    fn create_manifest(&self, context: &DeploymentContext) -> Result<StagingManifest> {
        if !context.cook_root.is_dir() {
            return Err(Error::stage(
                format!(
                    "No cooked output for {} at {}",
                    context.platform_label, context.cook_root
                ),
                "Cook the plugin first or check package.cooked_dir",
            ));
        }

        let mut manifest = StagingManifest::default();
        for (source, relative) in list_files(&context.cook_root)? {
            manifest.add(source, &relative, context);
        }

        tracing::debug!(
            platform = %context.platform_label,
            files = manifest.len(),
            "Created staging manifest"
        );
        Ok(manifest)
    }

    fn apply(&self, context: &DeploymentContext, manifest: &StagingManifest) -> Result<()> {
        create_dir_all(&context.stage_root)?;

        for file in &manifest.files {
            let destination = context.stage_root.join(&file.destination);
            if let Some(parent) = destination.parent() {
                create_dir_all(parent)?;
            }
            copy_file(&file.source, &destination)?;
        }

        Ok(())
    }
}

/// Drives the stage lifecycle over all contexts
pub struct StagingPipeline<'a> {
    stager: &'a dyn Stager,
    flags: StageFlags,
}

impl<'a> StagingPipeline<'a> {
    /// Create a staging pipeline
    pub fn new(stager: &'a dyn Stager, flags: StageFlags) -> Self {
        Self { stager, flags }
    }

    /// Whether a context needs staging output
    pub fn is_required(&self, context: &DeploymentContext) -> bool {
        requires_staging(context.packaging, self.flags)
    }

    /// Clean and plan every context that needs staging.
    ///
    /// Returns the manifests indexed like `contexts`; contexts that do not
    /// need staging get `None`.
    pub fn prepare(&self, contexts: &[DeploymentContext]) -> Result<Vec<Option<StagingManifest>>> {
        tracing::info!("********** STAGE COMMAND STARTED **********");
        let mut manifests = Vec::with_capacity(contexts.len());

        for context in contexts {
            if !self.is_required(context) {
                tracing::info!(
                    platform = %context.platform_label,
                    "Staging not required, skipping"
                );
                manifests.push(None);
                continue;
            }

            self.stager.clean(context)?;
            manifests.push(Some(self.stager.create_manifest(context)?));
        }

        Ok(manifests)
    }

    /// Apply the manifests produced by [`StagingPipeline::prepare`]
    pub fn apply(
        &self,
        contexts: &[DeploymentContext],
        manifests: &[Option<StagingManifest>],
    ) -> Result<usize> {
        let mut staged = 0;

        for (context, manifest) in contexts.iter().zip(manifests) {
            if let Some(manifest) = manifest {
                self.stager.apply(context, manifest)?;
                tracing::info!(
                    platform = %context.platform_label,
                    files = manifest.len(),
                    path = %context.stage_root,
                    "Staged"
                );
                staged += 1;
            }
        }

        tracing::info!("********** STAGE COMMAND COMPLETED **********");
        Ok(staged)
    }

    /// Run both passes; returns the number of contexts staged
    pub fn run(&self, contexts: &[DeploymentContext]) -> Result<usize> {
        let manifests = self.prepare(contexts)?;
        self.apply(contexts, &manifests)
    }
}
