//! Capability interface to the version-control backend.
//!
//! The engine never talks to a git library directly. Everything it needs is
//! expressed here as plain calls taking explicit path sets, so the libgit2
//! implementation in [`crate::git2_backend`] and the scripted fakes used in
//! tests are interchangeable.

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use crate::cache_size::CacheSizeConfig;
use crate::types::{Identity, StatusSnapshot};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors reported by a backend implementation.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The backend rejected an operation.
    #[error("git operation failed: {0}")]
    Git(String),

    /// The path is neither a repository nor a directory a repository can be
    /// created in.
    #[error("path not found: {0}")]
    PathNotFound(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BackendError>;

// ---------------------------------------------------------------------------
// Repository options
// ---------------------------------------------------------------------------

/// Value for a repository configuration entry such as `core.ignoreCase`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoOption {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl fmt::Display for RepoOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepoOption::Bool(b) => write!(f, "{b}"),
            RepoOption::Int(n) => write!(f, "{n}"),
            RepoOption::Text(s) => f.write_str(s),
        }
    }
}

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// Entry point of a backend: process-wide tuning and repository access.
pub trait VcsBackend {
    type Repo: VcsRepository;

    /// Install cache limits. Called once, before any repository is opened.
    fn configure_cache(&mut self, cache: &CacheSizeConfig) -> Result<()>;

    /// Open the repository at `root`, or create one when `root` is an
    /// existing directory without one.
    fn open_or_init(&self, root: &Path) -> Result<Self::Repo>;
}

/// Operations on one open repository. Paths are repository-relative and
/// `/`-separated.
pub trait VcsRepository {
    fn status(&self) -> Result<StatusSnapshot>;

    /// Stage the working-tree content of `paths`.
    ///
    /// Paths that no longer exist are staged as removals. Untracked paths
    /// matched by the ignore files currently on disk are skipped, since the
    /// status may predate `.gitignore` files written during the same cycle.
    fn stage_add(&mut self, paths: &BTreeSet<String>) -> Result<()>;

    /// Stage the removal of `paths`.
    fn stage_remove(&mut self, paths: &BTreeSet<String>) -> Result<()>;

    /// Overwrite the working-tree copies of `paths` from the index.
    fn restore(&mut self, paths: &BTreeSet<String>) -> Result<()>;

    /// Commit the index with `author` as author and committer.
    fn commit(&mut self, author: &Identity, message: &str) -> Result<()>;

    fn set_option(&mut self, key: &str, value: RepoOption) -> Result<()>;

    /// Tag the current head.
    fn tag(&mut self, name: &str, tagger: &Identity) -> Result<()>;

    /// Housekeeping (garbage collection, packing) before release.
    fn close(self) -> Result<()>
    where
        Self: Sized;
}
