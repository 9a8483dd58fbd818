//! Test support for modpak end-to-end scenarios

pub mod compare;
pub mod fixture;
