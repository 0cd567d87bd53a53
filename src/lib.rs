pub const APP_NAME: &str = "launchpad";

pub mod apps;
pub mod bundle;
pub mod config;
pub mod dragdrop;
pub mod error;
pub mod gesture;
pub mod icons;
pub mod import;
pub mod logs;
pub mod persistence;
pub mod registry;
pub mod resolver;
pub mod transfer;
pub mod walk;

#[cfg(test)]
mod testutil;

pub use error::{LaunchpadError, Result};
