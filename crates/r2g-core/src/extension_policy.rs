use std::collections::BTreeSet;
use std::io;
use std::path::Path;

use crate::ignore_file::{self, GITIGNORE};

/// Routes files with configured suffixes into the root `.gitignore` instead
/// of the index.
#[derive(Debug, Clone, Copy)]
pub struct ExtensionIgnorePolicy<'a> {
    extensions: &'a [String],
}

impl<'a> ExtensionIgnorePolicy<'a> {
    pub fn new(extensions: &'a [String]) -> Self {
        Self { extensions }
    }

    pub fn matches(&self, path: &str) -> bool {
        self.extensions.iter().any(|ext| path.ends_with(ext.as_str()))
    }

    /// Remove every matching path from `candidates` and return the
    /// root-anchored ignore lines for them, one per path.
    pub fn strip(&self, candidates: &mut BTreeSet<String>) -> Vec<String> {
        if self.extensions.is_empty() {
            return Vec::new();
        }
        let ignored: Vec<String> = candidates
            .iter()
            .filter(|p| self.matches(p))
            .cloned()
            .collect();
        for path in &ignored {
            candidates.remove(path);
        }
        ignored.into_iter().map(|p| format!("/{p}")).collect()
    }

    /// Strip matching paths and merge their lines into `<root>/.gitignore`.
    ///
    /// When a line was newly added the root `.gitignore` is rewritten and put
    /// into `candidates` so it is staged with the rest. Returns whether that
    /// happened.
    pub fn apply(&self, root: &Path, candidates: &mut BTreeSet<String>) -> io::Result<bool> {
        let lines = self.strip(candidates);
        if lines.is_empty() {
            return Ok(false);
        }

        let path = root.join(GITIGNORE);
        let mut existing = ignore_file::read_lines(&path)?;
        if !ignore_file::add_missing(&mut existing, &lines) {
            return Ok(false);
        }
        ignore_file::write_lines(&path, &existing)?;
        candidates.insert(GITIGNORE.to_string());
        tracing::debug!(count = lines.len(), "ignored files by extension");
        Ok(true)
    }
}
