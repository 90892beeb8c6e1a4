//! Line-oriented helpers for `.gitignore` / `.gitattributes` files and the
//! textual mapping between legacy and target ignore files.

use std::io;
use std::path::Path;

pub const GITIGNORE: &str = ".gitignore";
pub const GITATTRIBUTES: &str = ".gitattributes";
pub const JAZZIGNORE: &str = ".jazzignore";

/// Entries always ignored at the repository root: legacy client metadata.
pub const ROOT_IGNORED_ENTRIES: [&str; 3] = ["/.jazz5", "/.jazzShed", "/.metadata"];

/// Append every line of `adding` that is not yet in `existing`, keeping the
/// order of first occurrence. Returns whether anything was appended.
pub fn add_missing<I, S>(existing: &mut Vec<String>, adding: I) -> bool
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut changed = false;
    for entry in adding {
        let entry = entry.as_ref();
        if !existing.iter().any(|e| e == entry) {
            existing.push(entry.to_string());
            changed = true;
        }
    }
    changed
}

/// Read all lines of a UTF-8 file. A missing file reads as empty.
pub fn read_lines(path: &Path) -> io::Result<Vec<String>> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(text.lines().map(ToOwned::to_owned).collect()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e),
    }
}

/// Overwrite `path` with one `\n`-terminated line per entry.
pub fn write_lines<S: AsRef<str>>(path: &Path, lines: &[S]) -> io::Result<()> {
    let mut text = String::new();
    for line in lines {
        text.push_str(line.as_ref());
        text.push('\n');
    }
    std::fs::write(path, text)
}

/// Delete a file, treating "already gone" as success.
pub fn remove_if_exists(path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// `dir/.jazzignore` -> `dir/.gitignore`, or `None` for any other path.
pub fn gitignore_for(jazzignore_path: &str) -> Option<String> {
    sibling(jazzignore_path, JAZZIGNORE, GITIGNORE)
}

/// `dir/.gitignore` -> `dir/.jazzignore`, or `None` for any other path.
pub fn jazzignore_for(gitignore_path: &str) -> Option<String> {
    sibling(gitignore_path, GITIGNORE, JAZZIGNORE)
}

// Only an exact file name matches: `x/foo.gitignore` is not an ignore file.
fn sibling(path: &str, from: &str, to: &str) -> Option<String> {
    let dir = path.strip_suffix(from)?;
    (dir.is_empty() || dir.ends_with('/')).then(|| format!("{dir}{to}"))
}

/// Merge `lines` into the root file `name` under `root`. The file is only
/// written when the merged content is non-empty and differs from what was
/// there. Returns the merged lines.
pub fn merge_root_file<S: AsRef<str>>(
    root: &Path,
    name: &str,
    lines: &[S],
) -> io::Result<Vec<String>> {
    let path = root.join(name);
    let mut existing = read_lines(&path)?;
    let changed = add_missing(&mut existing, lines);
    if changed && !existing.is_empty() {
        write_lines(&path, &existing)?;
    }
    Ok(existing)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn add_missing_appends_in_order_without_duplicates() {
        let mut existing = v(&["/a", "/b"]);
        assert!(add_missing(&mut existing, ["/c", "/a", "/d", "/c"]));
        assert_eq!(existing, v(&["/a", "/b", "/c", "/d"]));
    }

    #[test]
    fn add_missing_is_idempotent() {
        let adding = v(&["x", "y", "x", "z"]);
        let mut once = v(&["y", "w"]);
        add_missing(&mut once, &adding);
        let mut twice = once.clone();
        assert!(!add_missing(&mut twice, &adding));
        assert_eq!(once, twice);
        assert_eq!(once, v(&["y", "w", "x", "z"]));
    }

    #[test]
    fn add_missing_into_empty_keeps_first_occurrence() {
        let mut existing = Vec::new();
        add_missing(&mut existing, ["b", "a", "b"]);
        assert_eq!(existing, v(&["b", "a"]));
    }

    #[test]
    fn sibling_mapping_is_textual() {
        assert_eq!(gitignore_for(".jazzignore").as_deref(), Some(".gitignore"));
        assert_eq!(
            gitignore_for("a/b/.jazzignore").as_deref(),
            Some("a/b/.gitignore")
        );
        assert_eq!(jazzignore_for("a/.gitignore").as_deref(), Some("a/.jazzignore"));
        assert_eq!(gitignore_for("a/b.txt"), None);
        assert_eq!(jazzignore_for("a/.gitattributes"), None);
        assert_eq!(gitignore_for("a/foo.jazzignore"), None);
        assert_eq!(jazzignore_for("x.gitignore"), None);
    }

    #[test]
    fn read_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_lines(&dir.path().join("nope")).unwrap().is_empty());
    }

    #[test]
    fn write_then_read_lines_handles_crlf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(GITIGNORE);
        write_lines(&path, &["/a", "b"]).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "/a\nb\n");

        std::fs::write(&path, "x\r\ny\r\n").unwrap();
        assert_eq!(read_lines(&path).unwrap(), v(&["x", "y"]));
    }

    #[test]
    fn merge_root_file_preserves_existing_lines_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(GITIGNORE), "  spaced  \n/.metadata\n").unwrap();
        let merged = merge_root_file(dir.path(), GITIGNORE, &ROOT_IGNORED_ENTRIES).unwrap();
        assert_eq!(merged, v(&["  spaced  ", "/.metadata", "/.jazz5", "/.jazzShed"]));
        assert_eq!(
            std::fs::read_to_string(dir.path().join(GITIGNORE)).unwrap(),
            "  spaced  \n/.metadata\n/.jazz5\n/.jazzShed\n"
        );
    }

    #[test]
    fn merge_root_file_with_nothing_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let merged = merge_root_file::<&str>(dir.path(), GITATTRIBUTES, &[]).unwrap();
        assert!(merged.is_empty());
        assert!(!dir.path().join(GITATTRIBUTES).exists());
    }

    #[test]
    fn remove_if_exists_tolerates_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone");
        remove_if_exists(&path).unwrap();
        std::fs::write(&path, "x").unwrap();
        remove_if_exists(&path).unwrap();
        assert!(!path.exists());
    }
}
