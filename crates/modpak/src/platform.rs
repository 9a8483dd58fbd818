//! Target platforms and packaging policy
//!
//! Each target platform decides whether it requires, allows or forbids
//! archive packaging. [`requires_staging`] turns that policy plus the
//! requested flags into the single staging decision used by the pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Platform a plugin can be packaged for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetPlatform {
    /// 64-bit Windows
    Win64,
    /// x86_64 Linux
    Linux,
    /// AArch64 Linux
    LinuxArm64,
    /// macOS
    Mac,
}

impl TargetPlatform {
    /// Label of the cooked/staged output for this platform.
    ///
    /// This is the folder name used below the cook, stage and archive
    /// directories, e.g. `Windows` or `WindowsServer`.
    pub fn cook_platform(self, dedicated_server: bool) -> String {
        let base = match self {
            TargetPlatform::Win64 => "Windows",
            TargetPlatform::Linux => "Linux",
            TargetPlatform::LinuxArm64 => "LinuxArm64",
            TargetPlatform::Mac => "Mac",
        };
        if dedicated_server {
            format!("{}Server", base)
        } else {
            base.to_string()
        }
    }

    /// Packaging policy used when the configuration does not override it
    pub fn default_packaging(self) -> PackagingPolicy {
        // Desktop platforms leave the choice to the caller
        PackagingPolicy::Optional
    }
}

impl fmt::Display for TargetPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetPlatform::Win64 => write!(f, "Win64"),
            TargetPlatform::Linux => write!(f, "Linux"),
            TargetPlatform::LinuxArm64 => write!(f, "LinuxArm64"),
            TargetPlatform::Mac => write!(f, "Mac"),
        }
    }
}

impl FromStr for TargetPlatform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "win64" | "windows" => Ok(TargetPlatform::Win64),
            "linux" => Ok(TargetPlatform::Linux),
            "linuxarm64" | "linuxaarch64" => Ok(TargetPlatform::LinuxArm64),
            "mac" | "macos" => Ok(TargetPlatform::Mac),
            other => Err(Error::config(
                format!("Unknown target platform '{}'", other),
                "Supported platforms: Win64, Linux, LinuxArm64, Mac",
            )),
        }
    }
}

/// Whether a platform requires, allows or forbids archive packaging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackagingPolicy {
    /// Packaging is mandatory
    Always,
    /// Packaging happens only when requested
    Optional,
    /// Packaging is never performed
    Never,
}

/// Staging related flags requested by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageFlags {
    /// Archive packaging was requested
    pub pak: bool,
    /// Staging was requested
    pub stage: bool,
    /// Staging was explicitly skipped
    pub skip_stage: bool,
}

impl Default for StageFlags {
    fn default() -> Self {
        Self {
            pak: true,
            stage: true,
            skip_stage: false,
        }
    }
}

/// Decide whether staging output is required for a platform
pub fn requires_staging(policy: PackagingPolicy, flags: StageFlags) -> bool {
    let requires_pak = policy == PackagingPolicy::Always
        || (flags.pak && policy != PackagingPolicy::Never);
    requires_pak || (flags.stage && !flags.skip_stage)
}
