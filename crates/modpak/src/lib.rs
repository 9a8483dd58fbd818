//! modpak - package game plugins as relocatable mods
//!
//! This crate provides both a library and CLI for modpak, including:
//! - Configuration file parsing and merging
//! - Project and plugin descriptor discovery
//! - Deployment contexts and content path remapping
//! - Cooking through the engine's automation tool
//! - Staging, `.modules` build id synchronization and zip archiving
//! - Installation into a game directory and launching the game
//! - The packaging pipeline tying the steps together

pub mod archive;
pub mod commands;
pub mod config;
pub mod context;
pub mod cook;
pub mod deploy;
pub mod error;
pub mod modules;
pub mod pipeline;
pub mod platform;
pub mod plugin;
pub mod project;
pub mod remap;
pub mod stage;

pub use error::{Error, Result};
