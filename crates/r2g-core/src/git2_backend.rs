//! Backend implementation on top of libgit2 (git2 crate).
//!
//! Status, staging, commits and tags run in-process. Garbage collection on
//! close shells out to `git gc`, since libgit2 has no equivalent.
//!
//! # Feature gated
//!
//! This module is only available with the `libgit2` feature flag (enabled
//! by default).

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::backend::{BackendError, RepoOption, Result, VcsBackend, VcsRepository};
use crate::cache_size::CacheSizeConfig;
use crate::types::{Identity, StatusSnapshot};

// ---------------------------------------------------------------------------
// Error bridging
// ---------------------------------------------------------------------------

impl From<git2::Error> for BackendError {
    fn from(e: git2::Error) -> Self {
        BackendError::Git(e.message().to_string())
    }
}

fn signature(ident: &Identity) -> Result<git2::Signature<'static>> {
    let time = git2::Time::new(ident.when_seconds(), ident.utc_offset_minutes);
    Ok(git2::Signature::new(&ident.name, &ident.email, &time)?)
}

// ---------------------------------------------------------------------------
// Backend
// ---------------------------------------------------------------------------

/// libgit2 backend. Cache limits are process-wide in libgit2, so they are
/// installed once through [`VcsBackend::configure_cache`].
#[derive(Debug, Default)]
pub struct Git2Backend {
    cache: CacheSizeConfig,
}

impl Git2Backend {
    pub fn new() -> Self {
        Self::default()
    }
}

fn to_size(value: i64) -> usize {
    usize::try_from(value).unwrap_or(0)
}

impl VcsBackend for Git2Backend {
    type Repo = Git2Repository;

    fn configure_cache(&mut self, cache: &CacheSizeConfig) -> Result<()> {
        // SAFETY: these modify libgit2 globals without synchronization. The
        // engine calls this once, before any repository is opened and before
        // any other thread could be using libgit2.
        unsafe {
            git2::opts::set_mwindow_file_limit(to_size(i64::from(cache.packed_git_open_files)))?;
            git2::opts::set_mwindow_mapped_limit(to_size(cache.packed_git_limit))?;
            git2::opts::set_mwindow_size(to_size(i64::from(cache.packed_git_window_size)))?;
        }
        self.cache = *cache;
        tracing::debug!(
            open_files = cache.packed_git_open_files,
            mapped_limit = cache.packed_git_limit,
            window_size = cache.packed_git_window_size,
            "configured object cache"
        );
        Ok(())
    }

    fn open_or_init(&self, root: &Path) -> Result<Git2Repository> {
        let repo = if root.join(".git").exists() {
            git2::Repository::open(root)?
        } else if root.is_dir() {
            tracing::info!(root = %root.display(), "initializing new repository");
            git2::Repository::init(root)?
        } else {
            return Err(BackendError::PathNotFound(root.display().to_string()));
        };

        let workdir = repo
            .workdir()
            .map(Path::to_path_buf)
            .ok_or_else(|| BackendError::Git("repository has no working directory".into()))?;

        Ok(Git2Repository {
            repo,
            workdir,
            cache: self.cache,
        })
    }
}

// ---------------------------------------------------------------------------
// Repository
// ---------------------------------------------------------------------------

/// An open non-bare repository.
pub struct Git2Repository {
    repo: git2::Repository,
    workdir: PathBuf,
    cache: CacheSizeConfig,
}

impl Git2Repository {
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Access to the underlying libgit2 handle.
    pub fn raw(&self) -> &git2::Repository {
        &self.repo
    }

    fn head_commit(&self) -> Result<Option<git2::Commit<'_>>> {
        match self.repo.head() {
            Ok(head) => Ok(Some(head.peel_to_commit()?)),
            Err(e)
                if e.code() == git2::ErrorCode::UnbornBranch
                    || e.code() == git2::ErrorCode::NotFound =>
            {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl VcsRepository for Git2Repository {
    fn status(&self) -> Result<StatusSnapshot> {
        let mut opts = git2::StatusOptions::new();
        opts.include_untracked(true)
            .recurse_untracked_dirs(true)
            .include_ignored(false)
            .exclude_submodules(true);

        let statuses = self.repo.statuses(Some(&mut opts))?;
        let mut snapshot = StatusSnapshot::default();

        for entry in statuses.iter() {
            let Some(path) = entry.path() else {
                tracing::warn!("skipping status entry with non-UTF-8 path");
                continue;
            };
            let st = entry.status();

            if st.contains(git2::Status::CONFLICTED) {
                snapshot.conflicting.insert(path.to_string());
                continue;
            }
            if st.contains(git2::Status::WT_NEW) {
                snapshot.untracked.insert(path.to_string());
            }
            if st.intersects(
                git2::Status::WT_MODIFIED | git2::Status::WT_TYPECHANGE | git2::Status::WT_RENAMED,
            ) {
                snapshot.modified.insert(path.to_string());
            }
            if st.contains(git2::Status::WT_DELETED) {
                snapshot.missing.insert(path.to_string());
            }
            if st.intersects(
                git2::Status::INDEX_NEW
                    | git2::Status::INDEX_MODIFIED
                    | git2::Status::INDEX_DELETED
                    | git2::Status::INDEX_RENAMED
                    | git2::Status::INDEX_TYPECHANGE,
            ) {
                snapshot.staged.insert(path.to_string());
            }
        }

        Ok(snapshot)
    }

    fn stage_add(&mut self, paths: &BTreeSet<String>) -> Result<()> {
        let mut index = self.repo.index()?;
        for path in paths {
            let rel = Path::new(path);
            // a path regenerated away (empty .gitignore) is staged as removal
            if self.workdir.join(rel).symlink_metadata().is_err() {
                index.remove_path(rel)?;
                continue;
            }
            // status was taken before this cycle's ignore files were written
            if index.get_path(rel, 0).is_none() && self.repo.status_should_ignore(rel)? {
                tracing::debug!(path = %path, "skipping ignored untracked path");
                continue;
            }
            index.add_path(rel)?;
        }
        index.write()?;
        Ok(())
    }

    fn stage_remove(&mut self, paths: &BTreeSet<String>) -> Result<()> {
        let mut index = self.repo.index()?;
        for path in paths {
            index.remove_path(Path::new(path))?;
        }
        index.write()?;
        Ok(())
    }

    fn restore(&mut self, paths: &BTreeSet<String>) -> Result<()> {
        let mut checkout = git2::build::CheckoutBuilder::new();
        checkout
            .force()
            .recreate_missing(true)
            .disable_pathspec_match(true);
        for path in paths {
            checkout.path(path.as_str());
        }
        self.repo.checkout_index(None, Some(&mut checkout))?;
        Ok(())
    }

    fn commit(&mut self, author: &Identity, message: &str) -> Result<()> {
        let mut index = self.repo.index()?;
        let tree_id = index.write_tree()?;
        let tree = self.repo.find_tree(tree_id)?;
        let sig = signature(author)?;

        let parent = self.head_commit()?;
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();
        let oid = self
            .repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)?;
        tracing::debug!(commit = %oid, "wrote commit");
        Ok(())
    }

    fn set_option(&mut self, key: &str, value: RepoOption) -> Result<()> {
        let mut config = self.repo.config()?.open_level(git2::ConfigLevel::Local)?;
        match &value {
            RepoOption::Bool(b) => config.set_bool(key, *b)?,
            RepoOption::Int(n) => config.set_i64(key, *n)?,
            RepoOption::Text(s) => config.set_str(key, s)?,
        }
        tracing::debug!(key, value = %value, "set repository option");
        Ok(())
    }

    fn tag(&mut self, name: &str, tagger: &Identity) -> Result<()> {
        let head = self
            .head_commit()?
            .ok_or_else(|| BackendError::Git("cannot tag an empty repository".into()))?;
        let sig = signature(tagger)?;
        self.repo.tag(name, head.as_object(), &sig, "", false)?;
        Ok(())
    }

    fn close(self) -> Result<()> {
        let delta_base = format!("core.deltaBaseCacheLimit={}", self.cache.delta_base_cache_limit);
        let big_file = format!("core.bigFileThreshold={}", self.cache.stream_file_threshold);
        let output = Command::new("git")
            .args(["-c", &delta_base, "-c", &big_file, "gc", "--quiet"])
            .current_dir(&self.workdir)
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BackendError::Git(stderr.trim().to_string()));
        }
        Ok(())
    }
}
