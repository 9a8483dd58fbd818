//! Scoped ownership of stage directories
//!
//! Stage directories confuse the cooker and the build tool on the next run,
//! so they never outlive a pipeline invocation. [`StagingGuard`] owns them
//! from the moment staging may create them; releasing or dropping the guard
//! deletes them. Failures while deleting are logged and never replace the
//! error that ended the run.

use camino::{Utf8Path, Utf8PathBuf};

use crate::context::DeploymentContext;
use crate::deploy::remove_dir_if_exists;

/// Remove the stage directory of every context.
///
/// Returns the directories that could not be removed.
pub fn remove_stage_dirs<'a>(dirs: impl IntoIterator<Item = &'a Utf8Path>) -> Vec<Utf8PathBuf> {
    let mut failed = Vec::new();

    for dir in dirs {
        match remove_dir_if_exists(dir) {
            Ok(true) => tracing::debug!(path = %dir, "Removed stage directory"),
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(path = %dir, "Failed to remove stage directory: {}", e);
                failed.push(dir.to_path_buf());
            }
        }
    }

    failed
}

/// Deletes the stage directories it owns when released or dropped
#[derive(Debug)]
pub struct StagingGuard {
    dirs: Vec<Utf8PathBuf>,
    released: bool,
}

impl StagingGuard {
    /// Take ownership of the stage directories of `contexts`
    pub fn acquire(contexts: &[DeploymentContext]) -> Self {
        let mut dirs: Vec<Utf8PathBuf> = Vec::with_capacity(contexts.len());
        for context in contexts {
            if !dirs.contains(&context.stage_root) {
                dirs.push(context.stage_root.clone());
            }
        }
        Self {
            dirs,
            released: false,
        }
    }

    /// Directories owned by this guard
    pub fn dirs(&self) -> &[Utf8PathBuf] {
        &self.dirs
    }

    /// Delete the owned directories now.
    ///
    /// Returns the directories that could not be removed.
    pub fn release(mut self) -> Vec<Utf8PathBuf> {
        self.released = true;
        self.cleanup()
    }

    fn cleanup(&self) -> Vec<Utf8PathBuf> {
        tracing::debug!(count = self.dirs.len(), "Cleaning stage directories");
        remove_stage_dirs(self.dirs.iter().map(Utf8PathBuf::as_path))
    }
}

impl Drop for StagingGuard {
    fn drop(&mut self) {
        if !self.released {
            self.cleanup();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{PackagingPolicy, TargetPlatform};
    use tempfile::TempDir;

    fn contexts(root: &Utf8Path) -> Vec<DeploymentContext> {
        [TargetPlatform::Win64, TargetPlatform::Linux]
            .into_iter()
            .map(|platform| {
                DeploymentContext::new(
                    platform,
                    false,
                    PackagingPolicy::Optional,
                    None,
                    root,
                    Utf8Path::new("Saved/Cooked"),
                    Utf8Path::new("Saved/StagedBuilds"),
                )
            })
            .collect()
    }

    #[test]
    fn test_release_removes_stage_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let root = Utf8Path::from_path(temp_dir.path()).unwrap();
        let contexts = contexts(root);
        for ctx in &contexts {
            std::fs::create_dir_all(ctx.stage_root.join("Game/Mods")).unwrap();
        }

        let guard = StagingGuard::acquire(&contexts);
        assert_eq!(guard.dirs().len(), 2);
        assert!(guard.release().is_empty());

        for ctx in &contexts {
            assert!(!ctx.stage_root.exists());
        }
    }

    #[test]
    fn test_drop_removes_stage_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let root = Utf8Path::from_path(temp_dir.path()).unwrap();
        let contexts = contexts(root);

        {
            let _guard = StagingGuard::acquire(&contexts);
            for ctx in &contexts {
                std::fs::create_dir_all(ctx.stage_root.join("FactoryGame/Mods")).unwrap();
            }
        }

        for ctx in &contexts {
            assert!(!ctx.stage_root.exists());
        }
    }

    #[test]
    fn test_unremovable_dirs_are_reported() {
        let temp_dir = TempDir::new().unwrap();
        let root = Utf8Path::from_path(temp_dir.path()).unwrap();
        let contexts = contexts(root);
        std::fs::create_dir_all(contexts[0].stage_root.parent().unwrap()).unwrap();
        std::fs::write(&contexts[0].stage_root, "not a directory").unwrap();
        std::fs::create_dir_all(&contexts[1].stage_root).unwrap();

        let failed = StagingGuard::acquire(&contexts).release();

        assert_eq!(failed, vec![contexts[0].stage_root.clone()]);
        assert!(!contexts[1].stage_root.exists());
    }

    #[test]
    fn test_missing_dirs_are_not_failures() {
        let temp_dir = TempDir::new().unwrap();
        let root = Utf8Path::from_path(temp_dir.path()).unwrap();

        let failed = StagingGuard::acquire(&contexts(root)).release();
        assert!(failed.is_empty());
    }
}
