use std::path::Path;

use anyhow::Context;
use r2g_core::git2_backend::Git2Backend;
use r2g_core::{CycleOutcome, Migrator};

use super::load_config;

pub fn run(repo: &Path, config: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(config)?;
    let mut migrator = Migrator::new(Git2Backend::new(), config);
    let outcome = migrator
        .init(repo)
        .with_context(|| format!("failed to initialize sandbox {}", repo.display()))?;

    match outcome {
        CycleOutcome::Clean => println!("{}: already initialized", repo.display()),
        _ => println!("{}: initial commit created", repo.display()),
    }
    Ok(())
}
