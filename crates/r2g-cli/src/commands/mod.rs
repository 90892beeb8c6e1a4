pub mod check_config;
pub mod init;
pub mod replay;

use std::path::Path;

use anyhow::Context;
use r2g_core::config::MigratorConfig;

/// Load the configuration file, or the built-in defaults when none is given.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<MigratorConfig> {
    match path {
        Some(path) => MigratorConfig::load_from(path)
            .with_context(|| format!("invalid configuration {}", path.display())),
        None => Ok(MigratorConfig::default()),
    }
}
