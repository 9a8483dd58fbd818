//! Clean command implementation

use camino::Utf8PathBuf;
use clap::Args;
use miette::Result;

use crate::config::Config;
use crate::context::create_contexts;
use crate::pipeline::remove_stage_dirs;
use crate::project::ProjectDescriptor;

/// Arguments for the clean command
#[derive(Debug, Args)]
pub struct CleanArgs {
    /// Path of the project's .uproject file
    #[arg(long)]
    pub project: Utf8PathBuf,
}

/// Remove stage directories left behind by an interrupted run
pub fn run(args: CleanArgs) -> Result<()> {
    let project = ProjectDescriptor::from_path(&args.project)?;
    let mut config = Config::load(&project.directory)?;
    // Server and client stage directories are both candidates
    config.package.dedicated_server = true;
    config.package.no_client = false;

    let contexts = create_contexts(&project, None, &config);
    let failed = remove_stage_dirs(contexts.iter().map(|c| c.stage_root.as_path()));

    if !failed.is_empty() {
        return Err(miette::miette!(
            "Failed to remove {} stage director{}: {}",
            failed.len(),
            if failed.len() == 1 { "y" } else { "ies" },
            failed
                .iter()
                .map(|p| p.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ));
    }

    tracing::info!("Stage directories of {} removed", project.name);
    Ok(())
}
