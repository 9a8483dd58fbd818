//! Deployment into a local game installation
//!
//! This module provides:
//! - Installation: copying the packaged plugin into `<Game>/<Project>/Mods`
//! - Launching: starting the game executable found in the install directory
//! - Filesystem helpers shared with staging

mod installer;
mod launch;
mod utils;

pub use installer::{DeployOptions, DeployReport, Deployer, install_plugin};
pub use launch::{Launcher, ProcessLauncher, find_executable};
pub use utils::{copy_dir_recursive, copy_file, create_dir_all, list_files, remove_dir_if_exists};
