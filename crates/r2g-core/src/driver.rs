use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::backend::{VcsBackend, VcsRepository};
use crate::bootstrap::RepositoryBootstrapper;
use crate::config::MigratorConfig;
use crate::error::{MigrateError, Result};
use crate::ignore_file::{self, GITIGNORE};
use crate::message::CommitComposer;
use crate::partition::StatusPartitioner;
use crate::types::{ChangeEvent, Identity, PartitionResult, TagEvent};

// ---------------------------------------------------------------------------
// CommitDriver
// ---------------------------------------------------------------------------

/// What one commit cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The tree was already clean; nothing was touched.
    Clean,
    /// Index actions were applied and a commit was created.
    Committed(PartitionResult),
    /// Only restores were needed, so no commit was created.
    Restored(PartitionResult),
}

/// Runs one status -> partition -> index -> commit -> verify cycle.
pub struct CommitDriver<'a> {
    root: &'a Path,
    config: &'a MigratorConfig,
}

impl<'a> CommitDriver<'a> {
    pub fn new(root: &'a Path, config: &'a MigratorConfig) -> Self {
        Self { root, config }
    }

    pub fn run_cycle<R: VcsRepository>(
        &self,
        repo: &mut R,
        author: &Identity,
        message: &str,
    ) -> Result<CycleOutcome> {
        let status = repo.status()?;
        if status.is_clean() {
            tracing::debug!("working tree clean, nothing to commit");
            return Ok(CycleOutcome::Clean);
        }

        let partition = StatusPartitioner::new(self.root, self.config).partition(&status)?;

        if !partition.to_add.is_empty() {
            repo.stage_add(&partition.to_add)?;
        }
        if !partition.to_remove.is_empty() {
            repo.stage_remove(&partition.to_remove)?;
        }
        if !partition.to_restore.is_empty() {
            repo.restore(&partition.to_restore)?;
        }

        let commit = partition.needs_commit() || !status.staged.is_empty();
        if commit {
            repo.commit(author, message)?;
            tracing::info!(
                author = %author.name,
                added = partition.to_add.len(),
                removed = partition.to_remove.len(),
                restored = partition.to_restore.len(),
                summary = message.lines().next().unwrap_or(""),
                "committed change"
            );
        }

        let after = repo.status()?;
        if !after.is_clean() {
            let dirty = after.dirty_paths();
            tracing::error!(paths = ?dirty, "status is not clean after commit");
            return Err(MigrateError::DirtyAfterCommit(dirty));
        }

        if commit {
            Ok(CycleOutcome::Committed(partition))
        } else {
            Ok(CycleOutcome::Restored(partition))
        }
    }

    /// Replay one change event as a commit.
    pub fn commit_event<R: VcsRepository>(
        &self,
        repo: &mut R,
        event: &ChangeEvent,
    ) -> Result<CycleOutcome> {
        let (author, message) = CommitComposer::new(self.config).compose(event);
        self.run_cycle(repo, &author, &message)
    }
}

// ---------------------------------------------------------------------------
// Tags
// ---------------------------------------------------------------------------

/// Git-friendly tag name: spaces become underscores.
pub fn tag_name(name: &str) -> String {
    name.replace(' ', "_")
}

// ---------------------------------------------------------------------------
// Migrator
// ---------------------------------------------------------------------------

/// Replays change events into a sandbox owned exclusively by this value.
///
/// Lifecycle: [`Migrator::init`] once, then any number of
/// [`Migrator::commit_changes`] / [`Migrator::create_tag`], then
/// [`Migrator::close`].
pub struct Migrator<B: VcsBackend> {
    backend: B,
    config: MigratorConfig,
    root: Option<PathBuf>,
    repo: Option<B::Repo>,
}

impl<B: VcsBackend> Migrator<B> {
    pub fn new(backend: B, config: MigratorConfig) -> Self {
        Self {
            backend,
            config,
            root: None,
            repo: None,
        }
    }

    pub fn config(&self) -> &MigratorConfig {
        &self.config
    }

    /// Tune the backend, open or create the repository at `root` and run the
    /// bootstrap commit.
    pub fn init(&mut self, root: &Path) -> Result<CycleOutcome> {
        self.backend.configure_cache(&self.config.cache)?;

        let mut repo = self
            .backend
            .open_or_init(root)
            .map_err(|source| MigrateError::Bootstrap {
                path: root.display().to_string(),
                source,
            })?;
        tracing::info!(root = %root.display(), "opened repository");

        let outcome = RepositoryBootstrapper::new(root, &self.config)
            .run(&mut repo, chrono::Utc::now().timestamp_millis())?;

        self.root = Some(root.to_path_buf());
        self.repo = Some(repo);
        Ok(outcome)
    }

    pub fn commit_changes(&mut self, event: &ChangeEvent) -> Result<CycleOutcome> {
        let (Some(root), Some(repo)) = (self.root.as_deref(), self.repo.as_mut()) else {
            return Err(MigrateError::NotInitialized);
        };
        CommitDriver::new(root, &self.config).commit_event(repo, event)
    }

    /// Tag the current head. Returns the tag name used, or `None` when the
    /// event carries no name.
    pub fn create_tag(&mut self, tag: &TagEvent) -> Result<Option<String>> {
        let Some(raw) = tag.name.as_deref().filter(|n| !n.is_empty()) else {
            return Ok(None);
        };
        let Some(repo) = self.repo.as_mut() else {
            return Err(MigrateError::NotInitialized);
        };

        let name = tag_name(raw);
        let tagger = self
            .config
            .default_identity(chrono::Utc::now().timestamp_millis());
        repo.tag(&name, &tagger).map_err(|source| MigrateError::Tag {
            name: name.clone(),
            source,
        })?;
        tracing::info!(tag = %name, "created tag");
        Ok(Some(name))
    }

    /// Root-anchored `.gitignore` entries that still exist as files in the
    /// sandbox.
    pub fn existing_ignored_files(&self) -> Result<BTreeSet<String>> {
        let Some(root) = self.root.as_deref() else {
            return Ok(BTreeSet::new());
        };
        let lines = ignore_file::read_lines(&root.join(GITIGNORE))
            .map_err(|e| MigrateError::io("unable to process .gitignore", e))?;
        Ok(lines
            .into_iter()
            .filter(|line| {
                line.strip_prefix('/')
                    .is_some_and(|rel| !rel.is_empty() && root.join(rel).is_file())
            })
            .collect())
    }

    /// Run backend housekeeping and report ignored files left in the
    /// sandbox. A housekeeping failure is logged, not returned.
    pub fn close(mut self) -> Result<BTreeSet<String>> {
        if let Some(repo) = self.repo.take() {
            if let Err(e) = repo.close() {
                tracing::warn!(error = %e, "repository housekeeping failed");
            }
        }

        let leftovers = self.existing_ignored_files()?;
        if !leftovers.is_empty() {
            tracing::warn!(count = leftovers.len(), "some ignored files still exist in the sandbox");
            for entry in &leftovers {
                tracing::warn!(path = %entry, "ignored file still present");
            }
        }
        Ok(leftovers)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendError, RepoOption};
    use crate::cache_size::CacheSizeConfig;
    use crate::types::{StatusSnapshot, WorkItem};
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Add(BTreeSet<String>),
        Remove(BTreeSet<String>),
        Restore(BTreeSet<String>),
        Commit(String, String),
        Option(String, RepoOption),
        Tag(String),
        Close,
    }

    /// Replays queued status snapshots and records every mutation.
    #[derive(Default)]
    struct ScriptedRepo {
        statuses: RefCell<VecDeque<StatusSnapshot>>,
        calls: Rc<RefCell<Vec<Call>>>,
        fail_tag: bool,
    }

    impl ScriptedRepo {
        fn with_statuses(statuses: Vec<StatusSnapshot>) -> Self {
            Self {
                statuses: RefCell::new(statuses.into()),
                ..Default::default()
            }
        }
    }

    impl VcsRepository for ScriptedRepo {
        fn status(&self) -> crate::backend::Result<StatusSnapshot> {
            Ok(self.statuses.borrow_mut().pop_front().unwrap_or_default())
        }
        fn stage_add(&mut self, paths: &BTreeSet<String>) -> crate::backend::Result<()> {
            self.calls.borrow_mut().push(Call::Add(paths.clone()));
            Ok(())
        }
        fn stage_remove(&mut self, paths: &BTreeSet<String>) -> crate::backend::Result<()> {
            self.calls.borrow_mut().push(Call::Remove(paths.clone()));
            Ok(())
        }
        fn restore(&mut self, paths: &BTreeSet<String>) -> crate::backend::Result<()> {
            self.calls.borrow_mut().push(Call::Restore(paths.clone()));
            Ok(())
        }
        fn commit(&mut self, author: &Identity, message: &str) -> crate::backend::Result<()> {
            self.calls
                .borrow_mut()
                .push(Call::Commit(author.name.clone(), message.to_string()));
            Ok(())
        }
        fn set_option(&mut self, key: &str, value: RepoOption) -> crate::backend::Result<()> {
            self.calls.borrow_mut().push(Call::Option(key.to_string(), value));
            Ok(())
        }
        fn tag(&mut self, name: &str, _tagger: &Identity) -> crate::backend::Result<()> {
            if self.fail_tag {
                return Err(BackendError::Git("tag exists".into()));
            }
            self.calls.borrow_mut().push(Call::Tag(name.to_string()));
            Ok(())
        }
        fn close(self) -> crate::backend::Result<()> {
            self.calls.borrow_mut().push(Call::Close);
            Err(BackendError::Git("gc unavailable".into()))
        }
    }

    struct ScriptedBackend {
        statuses: Vec<StatusSnapshot>,
        calls: Rc<RefCell<Vec<Call>>>,
        cache: Rc<RefCell<Option<CacheSizeConfig>>>,
        fail_open: bool,
    }

    impl VcsBackend for ScriptedBackend {
        type Repo = ScriptedRepo;

        fn configure_cache(&mut self, cache: &CacheSizeConfig) -> crate::backend::Result<()> {
            *self.cache.borrow_mut() = Some(*cache);
            Ok(())
        }

        fn open_or_init(&self, root: &Path) -> crate::backend::Result<ScriptedRepo> {
            if self.fail_open {
                return Err(BackendError::PathNotFound(root.display().to_string()));
            }
            let mut repo = ScriptedRepo::with_statuses(self.statuses.clone());
            repo.calls = Rc::clone(&self.calls);
            Ok(repo)
        }
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn untracked(items: &[&str]) -> StatusSnapshot {
        StatusSnapshot {
            untracked: set(items),
            ..Default::default()
        }
    }

    fn event(comment: &str, numbers: &[u64]) -> ChangeEvent {
        ChangeEvent {
            comment: comment.into(),
            creator_name: "Jane Doe".into(),
            email_address: "jane@example.com".into(),
            creation_time_millis: 1_000_000,
            work_items: numbers.iter().map(|&number| WorkItem { number }).collect(),
        }
    }

    #[test]
    fn clean_tree_does_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = MigratorConfig::default();
        let mut repo = ScriptedRepo::default();
        let outcome = CommitDriver::new(dir.path(), &cfg)
            .commit_event(&mut repo, &event("noop", &[]))
            .unwrap();
        assert_eq!(outcome, CycleOutcome::Clean);
        assert!(repo.calls.borrow().is_empty());
    }

    #[test]
    fn cycle_stages_and_commits_with_composed_message() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.rs"), "fn main() {}").unwrap();
        let cfg = MigratorConfig::default();
        let mut repo = ScriptedRepo::with_statuses(vec![
            StatusSnapshot {
                untracked: set(&["a.rs"]),
                missing: set(&["old.rs"]),
                ..Default::default()
            },
            StatusSnapshot::default(),
        ]);

        let outcome = CommitDriver::new(dir.path(), &cfg)
            .commit_event(&mut repo, &event("add main", &[12, 13]))
            .unwrap();
        assert!(matches!(outcome, CycleOutcome::Committed(_)));
        assert_eq!(
            *repo.calls.borrow(),
            vec![
                Call::Add(set(&["a.rs"])),
                Call::Remove(set(&["old.rs"])),
                Call::Commit("Jane Doe".into(), "12 13 add main".into()),
            ]
        );
    }

    #[test]
    fn restore_only_cycle_does_not_commit() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".jazzignore"), "core.ignore={bin}\n").unwrap();
        let cfg = MigratorConfig::default();
        let mut repo = ScriptedRepo::with_statuses(vec![StatusSnapshot {
            missing: set(&[".gitignore"]),
            ..Default::default()
        }]);

        let outcome = CommitDriver::new(dir.path(), &cfg)
            .commit_event(&mut repo, &event("x", &[]))
            .unwrap();
        assert!(matches!(outcome, CycleOutcome::Restored(_)));
        assert_eq!(*repo.calls.borrow(), vec![Call::Restore(set(&[".gitignore"]))]);
    }

    #[test]
    fn dirty_tree_after_commit_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = MigratorConfig::default();
        let mut repo = ScriptedRepo::with_statuses(vec![untracked(&["a"]), untracked(&["b"])]);

        let err = CommitDriver::new(dir.path(), &cfg)
            .commit_event(&mut repo, &event("x", &[]))
            .unwrap_err();
        assert!(matches!(err, MigrateError::DirtyAfterCommit(ref paths) if paths == &["b".to_string()]));
    }

    #[test]
    fn staged_only_changes_are_committed() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = MigratorConfig::default();
        let mut repo = ScriptedRepo::with_statuses(vec![StatusSnapshot {
            staged: set(&["pre-staged.txt"]),
            ..Default::default()
        }]);

        let outcome = CommitDriver::new(dir.path(), &cfg)
            .commit_event(&mut repo, &event("msg", &[]))
            .unwrap();
        assert!(matches!(outcome, CycleOutcome::Committed(_)));
        assert_eq!(
            *repo.calls.borrow(),
            vec![Call::Commit("Jane Doe".into(), "msg".into())]
        );
    }

    #[test]
    fn tag_names_replace_spaces() {
        assert_eq!(tag_name("release 1 0"), "release_1_0");
        assert_eq!(tag_name("v1"), "v1");
    }

    fn backend(statuses: Vec<StatusSnapshot>) -> ScriptedBackend {
        ScriptedBackend {
            statuses,
            calls: Rc::default(),
            cache: Rc::default(),
            fail_open: false,
        }
    }

    #[test]
    fn init_configures_cache_and_bootstraps() {
        let dir = tempfile::tempdir().unwrap();
        let be = backend(vec![untracked(&[".gitignore"]), StatusSnapshot::default()]);
        let calls = Rc::clone(&be.calls);
        let cache = Rc::clone(&be.cache);
        let cfg = MigratorConfig::default();
        let expected = cfg.cache;
        let mut migrator = Migrator::new(be, cfg);

        migrator.init(dir.path()).unwrap();
        assert_eq!(*cache.borrow(), Some(expected));
        let calls = calls.borrow();
        assert_eq!(
            calls[0],
            Call::Option("core.ignoreCase".into(), RepoOption::Bool(false))
        );
        assert_eq!(calls[1], Call::Add(set(&[".gitignore"])));
        assert_eq!(calls[2], Call::Commit("RTC 2 git".into(), "Initial commit".into()));
        assert!(dir.path().join(".gitignore").exists());
    }

    #[test]
    fn init_failure_is_a_bootstrap_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut be = backend(vec![]);
        be.fail_open = true;
        let mut migrator = Migrator::new(be, MigratorConfig::default());
        let err = migrator.init(&dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, MigrateError::Bootstrap { .. }));
    }

    #[test]
    fn commit_before_init_is_rejected() {
        let mut migrator = Migrator::new(backend(vec![]), MigratorConfig::default());
        let err = migrator.commit_changes(&event("x", &[])).unwrap_err();
        assert!(matches!(err, MigrateError::NotInitialized));
    }

    #[test]
    fn empty_or_absent_tag_name_skips_tagging() {
        let dir = tempfile::tempdir().unwrap();
        let be = backend(vec![]);
        let calls = Rc::clone(&be.calls);
        let mut migrator = Migrator::new(be, MigratorConfig::default());
        migrator.init(dir.path()).unwrap();

        assert_eq!(migrator.create_tag(&TagEvent { name: None }).unwrap(), None);
        assert_eq!(
            migrator.create_tag(&TagEvent { name: Some(String::new()) }).unwrap(),
            None
        );
        assert!(!calls.borrow().iter().any(|c| matches!(c, Call::Tag(_))));

        let name = migrator
            .create_tag(&TagEvent { name: Some("release 1 0".into()) })
            .unwrap();
        assert_eq!(name.as_deref(), Some("release_1_0"));
        assert!(calls.borrow().contains(&Call::Tag("release_1_0".into())));
    }

    #[test]
    fn tag_failure_is_wrapped() {
        let dir = tempfile::tempdir().unwrap();
        let mut migrator = Migrator::new(backend(vec![]), MigratorConfig::default());
        migrator.init(dir.path()).unwrap();
        if let Some(repo) = migrator.repo.as_mut() {
            repo.fail_tag = true;
        }
        let err = migrator
            .create_tag(&TagEvent { name: Some("v 1".into()) })
            .unwrap_err();
        assert!(matches!(err, MigrateError::Tag { ref name, .. } if name == "v_1"));
    }

    #[test]
    fn close_reports_leftover_ignored_files_and_swallows_gc_errors() {
        let dir = tempfile::tempdir().unwrap();
        let be = backend(vec![]);
        let calls = Rc::clone(&be.calls);
        let cfg = MigratorConfig::from_toml_str("global.gitignore.entries = \"/gone.zip\"").unwrap();
        let mut migrator = Migrator::new(be, cfg);
        migrator.init(dir.path()).unwrap();

        std::fs::write(dir.path().join("big.zip"), "zip").unwrap();
        std::fs::create_dir(dir.path().join("dir.zip")).unwrap();
        ignore_file::write_lines(
            &dir.path().join(GITIGNORE),
            &["/.jazz5", "/big.zip", "/dir.zip", "/gone.zip", "*.tmp"],
        )
        .unwrap();

        let leftovers = migrator.close().unwrap();
        assert_eq!(leftovers, set(&["/big.zip"]));
        assert_eq!(calls.borrow().last(), Some(&Call::Close));
    }
}
