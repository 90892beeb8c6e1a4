use std::collections::BTreeSet;
use std::path::Path;

use crate::config::MigratorConfig;
use crate::error::{MigrateError, Result};
use crate::extension_policy::ExtensionIgnorePolicy;
use crate::ignore_file::{self, JAZZIGNORE};
use crate::jazzignore;
use crate::types::{PartitionResult, StatusSnapshot};

/// Turns a working-tree status into add/remove/restore actions.
///
/// Partitioning has side effects on the sandbox: `.gitignore` files are
/// regenerated from their `.jazzignore` siblings and the root `.gitignore`
/// collects extension-ignored paths.
pub struct StatusPartitioner<'a> {
    root: &'a Path,
    policy: ExtensionIgnorePolicy<'a>,
}

impl<'a> StatusPartitioner<'a> {
    pub fn new(root: &'a Path, config: &'a MigratorConfig) -> Self {
        Self {
            root,
            policy: ExtensionIgnorePolicy::new(&config.ignored_file_extensions),
        }
    }

    pub fn partition(&self, status: &StatusSnapshot) -> Result<PartitionResult> {
        let mut result = PartitionResult {
            to_add: self.handle_added(status)?,
            ..PartitionResult::default()
        };
        result.to_remove = self.handle_removed(status, &mut result.to_restore);
        self.translate_jazzignores(&mut result)?;
        self.enforce_disjoint(&mut result);

        tracing::debug!(
            add = result.to_add.len(),
            remove = result.to_remove.len(),
            restore = result.to_restore.len(),
            "partitioned status"
        );
        Ok(result)
    }

    fn handle_added(&self, status: &StatusSnapshot) -> Result<BTreeSet<String>> {
        let mut to_add: BTreeSet<String> = status
            .untracked
            .iter()
            .chain(&status.modified)
            .cloned()
            .collect();

        self.policy
            .apply(self.root, &mut to_add)
            .map_err(|e| MigrateError::io("unable to handle .gitignore", e))?;
        Ok(to_add)
    }

    fn handle_removed(
        &self,
        status: &StatusSnapshot,
        to_restore: &mut BTreeSet<String>,
    ) -> BTreeSet<String> {
        let mut to_remove = BTreeSet::new();
        for removed in &status.missing {
            // a .gitignore deleted behind our back while its .jazzignore is
            // still there comes back from the index
            if let Some(jazzignore) = ignore_file::jazzignore_for(removed) {
                if self.root.join(&jazzignore).exists() {
                    to_restore.insert(removed.clone());
                    continue;
                }
            }
            to_remove.insert(removed.clone());
        }
        to_remove
    }

    /// Regenerate the `.gitignore` next to every added or removed
    /// `.jazzignore`. A `.gitignore` still on disk afterwards is added, one
    /// that was deleted is removed.
    fn translate_jazzignores(&self, result: &mut PartitionResult) -> Result<()> {
        let sources: Vec<String> = result
            .to_add
            .iter()
            .chain(&result.to_remove)
            .filter(|p| p.ends_with(JAZZIGNORE))
            .cloned()
            .collect();

        for source in sources {
            let derived = jazzignore::sync_gitignore(self.root, &source)
                .map_err(|e| MigrateError::io("unable to handle .jazzignore", e))?;
            let Some(gitignore) = derived else { continue };
            if self.root.join(&gitignore).exists() {
                result.to_add.insert(gitignore);
            } else {
                result.to_remove.insert(gitignore);
            }
        }
        Ok(())
    }

    fn enforce_disjoint(&self, result: &mut PartitionResult) {
        let overlap: Vec<String> = result
            .to_add
            .intersection(&result.to_remove)
            .cloned()
            .collect();
        for path in overlap {
            if self.root.join(&path).exists() {
                result.to_remove.remove(&path);
            } else {
                result.to_add.remove(&path);
            }
        }

        let PartitionResult {
            to_add,
            to_remove,
            to_restore,
        } = result;
        to_restore.retain(|p| !to_add.contains(p) && !to_remove.contains(p));
    }
}
