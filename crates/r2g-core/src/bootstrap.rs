use std::path::Path;

use crate::backend::{RepoOption, VcsRepository};
use crate::config::MigratorConfig;
use crate::driver::{CommitDriver, CycleOutcome};
use crate::error::{MigrateError, Result};
use crate::ignore_file::{self, GITATTRIBUTES, GITIGNORE, ROOT_IGNORED_ENTRIES};

pub const INITIAL_COMMIT_MESSAGE: &str = "Initial commit";

/// One-time preparation of a freshly opened sandbox.
pub struct RepositoryBootstrapper<'a> {
    root: &'a Path,
    config: &'a MigratorConfig,
}

impl<'a> RepositoryBootstrapper<'a> {
    pub fn new(root: &'a Path, config: &'a MigratorConfig) -> Self {
        Self { root, config }
    }

    /// Merge the baseline and configured entries into the root
    /// `.gitignore` and the configured lines into `.gitattributes`.
    pub fn prepare_root_files(&self) -> Result<()> {
        let mut ignore_entries: Vec<String> =
            ROOT_IGNORED_ENTRIES.iter().map(|e| e.to_string()).collect();
        ignore_file::add_missing(&mut ignore_entries, &self.config.global_gitignore_entries);

        ignore_file::merge_root_file(self.root, GITIGNORE, &ignore_entries)
            .map_err(|e| MigrateError::io("unable to write root .gitignore", e))?;
        ignore_file::merge_root_file(self.root, GITATTRIBUTES, &self.config.gitattributes)
            .map_err(|e| MigrateError::io("unable to write root .gitattributes", e))?;
        Ok(())
    }

    /// Prepare root files, pin repository settings and capture the result in
    /// an initial commit authored by the default identity at `now_millis`.
    pub fn run<R: VcsRepository>(&self, repo: &mut R, now_millis: i64) -> Result<CycleOutcome> {
        self.prepare_root_files()?;
        repo.set_option("core.ignoreCase", RepoOption::Bool(false))?;

        let ident = self.config.default_identity(now_millis);
        CommitDriver::new(self.root, self.config).run_cycle(repo, &ident, INITIAL_COMMIT_MESSAGE)
    }
}
