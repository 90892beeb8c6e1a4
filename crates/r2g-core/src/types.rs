use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Change events
// ---------------------------------------------------------------------------

/// A work item referenced by a change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub number: u64,
}

/// One unit of history replay, turned into exactly one commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    #[serde(default)]
    pub comment: String,
    pub creator_name: String,
    pub email_address: String,
    /// Milliseconds since the Unix epoch, UTC.
    pub creation_time_millis: i64,
    #[serde(default)]
    pub work_items: Vec<WorkItem>,
}

/// A request to tag the current head between change events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagEvent {
    #[serde(default)]
    pub name: Option<String>,
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Author, committer or tagger identity handed to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub email: String,
    pub when_millis: i64,
    pub utc_offset_minutes: i32,
}

impl Identity {
    /// Identity at the given instant with a zero UTC offset.
    pub fn new(name: impl Into<String>, email: impl Into<String>, when_millis: i64) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            when_millis,
            utc_offset_minutes: 0,
        }
    }

    /// Seconds since the epoch, as git stores them.
    pub fn when_seconds(&self) -> i64 {
        self.when_millis.div_euclid(1000)
    }
}

// ---------------------------------------------------------------------------
// Status and partition
// ---------------------------------------------------------------------------

/// Working-tree status as reported by the backend.
///
/// Paths are repository-relative and `/`-separated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub untracked: BTreeSet<String>,
    pub modified: BTreeSet<String>,
    pub missing: BTreeSet<String>,
    /// Index entries differing from HEAD.
    pub staged: BTreeSet<String>,
    pub conflicting: BTreeSet<String>,
}

impl StatusSnapshot {
    pub fn is_clean(&self) -> bool {
        self.untracked.is_empty()
            && self.modified.is_empty()
            && self.missing.is_empty()
            && self.staged.is_empty()
            && self.conflicting.is_empty()
    }

    /// Every path that keeps the snapshot from being clean.
    pub fn dirty_paths(&self) -> Vec<String> {
        let all: BTreeSet<&String> = self
            .untracked
            .iter()
            .chain(&self.modified)
            .chain(&self.missing)
            .chain(&self.staged)
            .chain(&self.conflicting)
            .collect();
        all.into_iter().cloned().collect()
    }
}

/// Index actions for one commit cycle. The three sets are pairwise disjoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionResult {
    pub to_add: BTreeSet<String>,
    pub to_remove: BTreeSet<String>,
    pub to_restore: BTreeSet<String>,
}

impl PartitionResult {
    /// Whether the cycle stages anything and therefore needs a commit.
    pub fn needs_commit(&self) -> bool {
        !self.to_add.is_empty() || !self.to_remove.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_event_deserializes_with_defaults() {
        let json = r#"{"creator_name":"Jane","email_address":"jane@example.com","creation_time_millis":1000}"#;
        let event: ChangeEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.creator_name, "Jane");
        assert!(event.comment.is_empty());
        assert!(event.work_items.is_empty());
    }

    #[test]
    fn identity_seconds_round_down() {
        let ident = Identity::new("a", "a@b", 1_449_321_955_999);
        assert_eq!(ident.when_seconds(), 1_449_321_955);
        assert_eq!(ident.utc_offset_minutes, 0);
    }

    #[test]
    fn snapshot_clean_and_dirty_paths() {
        let mut snap = StatusSnapshot::default();
        assert!(snap.is_clean());
        snap.missing.insert("b.txt".into());
        snap.untracked.insert("a.txt".into());
        snap.staged.insert("a.txt".into());
        assert!(!snap.is_clean());
        assert_eq!(snap.dirty_paths(), vec!["a.txt".to_string(), "b.txt".to_string()]);
    }

    #[test]
    fn restore_only_partition_needs_no_commit() {
        let mut part = PartitionResult::default();
        part.to_restore.insert("x/.gitignore".into());
        assert!(!part.needs_commit());
        part.to_remove.insert("y".into());
        assert!(part.needs_commit());
    }
}
