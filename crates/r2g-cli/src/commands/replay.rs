use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::Context;
use r2g_core::git2_backend::Git2Backend;
use r2g_core::{CycleOutcome, Migrator};

use super::load_config;
use crate::events::{EventRecord, read_events};

/// Counters printed after a replay.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub commits: usize,
    pub unchanged: usize,
    pub tags: usize,
    pub leftovers: Vec<String>,
}

pub fn run(repo: &Path, config: Option<&Path>, events: &Path, close: bool) -> anyhow::Result<()> {
    let config = load_config(config)?;
    let file = File::open(events)
        .with_context(|| format!("failed to open events file {}", events.display()))?;
    let records = read_events(BufReader::new(file))?;

    let mut migrator = Migrator::new(Git2Backend::new(), config);
    migrator
        .init(repo)
        .with_context(|| format!("failed to initialize sandbox {}", repo.display()))?;

    let summary = replay(migrator, &records, close)?;
    println!(
        "replayed {} events: {} commits, {} unchanged, {} tags",
        records.len(),
        summary.commits,
        summary.unchanged,
        summary.tags
    );
    for path in &summary.leftovers {
        println!("ignored file still present: {path}");
    }
    Ok(())
}

/// Apply `records` in order. The first failing event aborts the run.
pub fn replay(
    mut migrator: Migrator<Git2Backend>,
    records: &[(usize, EventRecord)],
    close: bool,
) -> anyhow::Result<ReplaySummary> {
    let mut summary = ReplaySummary::default();

    for (line, record) in records {
        match record {
            EventRecord::Change(change) => {
                let outcome = migrator
                    .commit_changes(change)
                    .with_context(|| format!("change on line {line} failed"))?;
                match outcome {
                    CycleOutcome::Committed(_) => summary.commits += 1,
                    CycleOutcome::Clean | CycleOutcome::Restored(_) => summary.unchanged += 1,
                }
            }
            EventRecord::Tag(tag) => {
                let created = migrator
                    .create_tag(tag)
                    .with_context(|| format!("tag on line {line} failed"))?;
                if created.is_some() {
                    summary.tags += 1;
                }
            }
        }
    }

    tracing::info!(
        commits = summary.commits,
        unchanged = summary.unchanged,
        tags = summary.tags,
        "replay finished"
    );
    if close {
        summary.leftovers = migrator.close()?.into_iter().collect();
    }
    Ok(summary)
}
