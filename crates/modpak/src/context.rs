//! Deployment contexts
//!
//! A deployment context describes one staged build for one target platform:
//! where its cooked output lives, where it is staged, and which directory
//! remaps staging has to apply.

use camino::{Utf8Path, Utf8PathBuf};

use crate::config::Config;
use crate::platform::{PackagingPolicy, TargetPlatform};
use crate::project::ProjectDescriptor;
use crate::remap::RemapEntry;

/// Per-platform staging and packaging state
#[derive(Debug, Clone)]
pub struct DeploymentContext {
    /// Target platform
    pub platform: TargetPlatform,

    /// Whether this context is the dedicated server build
    pub dedicated_server: bool,

    /// Platform label used for cook/stage/archive folder names (e.g. "Windows")
    pub platform_label: String,

    /// Packaging policy of the platform
    pub packaging: PackagingPolicy,

    /// Engine directory (`<root>/Engine`), if known
    pub engine_root: Option<Utf8PathBuf>,

    /// Project directory
    pub project_root: Utf8PathBuf,

    /// Directory the cooker writes this platform's output to
    pub cook_root: Utf8PathBuf,

    /// Directory the staged tree is materialized in
    pub stage_root: Utf8PathBuf,

    /// Directory remaps applied while staging, in registration order
    pub remaps: Vec<RemapEntry>,
}

impl DeploymentContext {
    /// Create a context for one platform
    pub fn new(
        platform: TargetPlatform,
        dedicated_server: bool,
        packaging: PackagingPolicy,
        engine_root: Option<&Utf8Path>,
        project_root: &Utf8Path,
        cooked_dir: &Utf8Path,
        stage_dir: &Utf8Path,
    ) -> Self {
        let platform_label = platform.cook_platform(dedicated_server);
        Self {
            platform,
            dedicated_server,
            cook_root: project_root.join(cooked_dir).join(&platform_label),
            stage_root: project_root.join(stage_dir).join(&platform_label),
            platform_label,
            packaging,
            engine_root: engine_root.map(Utf8Path::to_path_buf),
            project_root: project_root.to_path_buf(),
            remaps: Vec::new(),
        }
    }
}

/// Create the deployment contexts requested by the configuration.
///
/// Client contexts come first (unless `no_client` is set), followed by the
/// dedicated server contexts when requested. A platform listed twice yields
/// one context per variant.
pub fn create_contexts(
    project: &ProjectDescriptor,
    engine_root: Option<&Utf8Path>,
    config: &Config,
) -> Vec<DeploymentContext> {
    let package = &config.package;
    let mut contexts = Vec::new();

    let platforms = package.target_platforms();

    let mut variants = Vec::new();
    if !package.no_client {
        variants.push(false);
    }
    if package.dedicated_server {
        variants.push(true);
    }

    for dedicated_server in variants {
        for &platform in &platforms {
            let label = platform.cook_platform(dedicated_server);
            let policy = config.packaging_policy(platform, &label);
            contexts.push(DeploymentContext::new(
                platform,
                dedicated_server,
                policy,
                engine_root,
                &project.directory,
                &package.cooked_dir,
                &package.stage_dir,
            ));
        }
    }

    tracing::debug!(
        contexts = ?contexts.iter().map(|c| c.platform_label.as_str()).collect::<Vec<_>>(),
        "Created deployment contexts"
    );

    contexts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> ProjectDescriptor {
        ProjectDescriptor {
            name: "FactoryGame".to_string(),
            file: Utf8PathBuf::from("/work/FactoryGame/FactoryGame.uproject"),
            directory: Utf8PathBuf::from("/work/FactoryGame"),
            engine_association: None,
        }
    }

    #[test]
    fn test_default_contexts() {
        let contexts = create_contexts(&project(), None, &Config::default());

        assert_eq!(contexts.len(), 1);
        let ctx = &contexts[0];
        assert_eq!(ctx.platform_label, "Windows");
        assert_eq!(
            ctx.stage_root,
            Utf8PathBuf::from("/work/FactoryGame/Saved/StagedBuilds/Windows")
        );
        assert_eq!(
            ctx.cook_root,
            Utf8PathBuf::from("/work/FactoryGame/Saved/Cooked/Windows")
        );
        assert!(ctx.remaps.is_empty());
    }

    #[test]
    fn test_server_and_client_contexts() {
        let mut config = Config::default();
        config.package.platforms = vec![TargetPlatform::Win64, TargetPlatform::Linux];
        config.package.dedicated_server = true;

        let labels: Vec<_> = create_contexts(&project(), None, &config)
            .into_iter()
            .map(|c| c.platform_label)
            .collect();

        assert_eq!(
            labels,
            vec!["Windows", "Linux", "WindowsServer", "LinuxServer"]
        );
    }

    #[test]
    fn test_no_client() {
        let mut config = Config::default();
        config.package.no_client = true;

        assert!(create_contexts(&project(), None, &config).is_empty());

        config.package.dedicated_server = true;
        let contexts = create_contexts(&project(), None, &config);
        assert_eq!(contexts.len(), 1);
        assert!(contexts[0].dedicated_server);
    }

    #[test]
    fn test_duplicate_platforms_yield_one_context() {
        let mut config = Config::default();
        config.package.platforms = vec![
            TargetPlatform::Win64,
            TargetPlatform::Linux,
            TargetPlatform::Win64,
        ];
        config.package.dedicated_server = true;

        let contexts = create_contexts(&project(), None, &config);

        let labels: Vec<_> = contexts.iter().map(|c| c.platform_label.as_str()).collect();
        assert_eq!(labels, vec!["Windows", "Linux", "WindowsServer", "LinuxServer"]);
    }
}
