//! Game executable discovery and launching

use camino::{Utf8Path, Utf8PathBuf};
use std::process::Command;

use crate::{Error, Result};

/// Starts the game once deployment finished
pub trait Launcher {
    /// Launch `executable` with `working_dir` as its working directory
    fn launch(&self, executable: &Utf8Path, working_dir: &Utf8Path) -> Result<()>;
}

/// Launcher spawning the executable as a detached process
#[derive(Debug, Default)]
pub struct ProcessLauncher;

impl Launcher for ProcessLauncher {
    fn launch(&self, executable: &Utf8Path, working_dir: &Utf8Path) -> Result<()> {
        tracing::info!(executable = %executable, "Launching game");

        Command::new(executable.as_std_path())
            .current_dir(working_dir)
            .spawn()
            .map_err(|e| {
                Error::deploy(
                    format!("Failed to launch {}: {}", executable, e),
                    "Check that the game executable can be started from this machine",
                )
            })?;

        Ok(())
    }
}

/// Find the game executable directly inside the install directory.
///
/// Only the top level is searched. When several executables exist, the one
/// named after the project wins, otherwise the first in name order is used.
/// A name that differs from the project name is reported as a warning.
pub fn find_executable(
    install_dir: &Utf8Path,
    project_name: &str,
    extension: &str,
) -> Result<Utf8PathBuf> {
    let mut candidates = Vec::new();

    let read_error = |e: std::io::Error| Error::fs("read directory", install_dir, e);
    for entry in install_dir.read_dir_utf8().map_err(read_error)? {
        let entry = entry.map_err(read_error)?;
        let path = entry.path();
        let matches_extension = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension));
        if matches_extension && entry.file_type().map_err(read_error)?.is_file() {
            candidates.push(path.to_path_buf());
        }
    }
    candidates.sort();

    let executable = candidates
        .iter()
        .find(|path| path.file_stem() == Some(project_name))
        .or_else(|| candidates.first())
        .cloned()
        .ok_or_else(|| {
            Error::config(
                format!("No .{} executable found in {}", extension, install_dir),
                "Pass the game's installation directory with --game-dir",
            )
        })?;

    let stem = executable.file_stem().unwrap_or_default();
    if stem != project_name {
        tracing::warn!(
            "Mismatch between executable name and project name: '{}' != '{}'",
            stem,
            project_name
        );
    }

    Ok(executable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn install_dir(files: &[&str]) -> (TempDir, Utf8PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let root = Utf8Path::from_path(temp_dir.path()).unwrap().to_path_buf();
        for file in files {
            std::fs::write(root.join(file), "").unwrap();
        }
        std::fs::create_dir_all(root.join("FactoryGame/Binaries")).unwrap();
        std::fs::write(root.join("FactoryGame/Binaries/Nested.exe"), "").unwrap();
        (temp_dir, root)
    }

    #[test]
    fn test_prefers_project_named_executable() {
        let (_temp, root) = install_dir(&["CrashReporter.exe", "FactoryGame.exe", "readme.txt"]);

        let exe = find_executable(&root, "FactoryGame", "exe").unwrap();
        assert_eq!(exe.file_name(), Some("FactoryGame.exe"));
    }

    #[test]
    fn test_mismatched_name_is_not_an_error() {
        let (_temp, root) = install_dir(&["FactoryGameSteam.EXE"]);

        let exe = find_executable(&root, "FactoryGame", "exe").unwrap();
        assert_eq!(exe.file_name(), Some("FactoryGameSteam.EXE"));
    }

    #[test]
    fn test_search_is_not_recursive() {
        let (_temp, root) = install_dir(&[]);

        let err = find_executable(&root, "FactoryGame", "exe").unwrap_err();
        assert!(err.is_config());
    }
}
