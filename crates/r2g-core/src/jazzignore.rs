//! Translation of RTC `.jazzignore` files into `.gitignore` files.
//!
//! A `.jazzignore` is a Java properties file. Two keys matter:
//!
//! ```text
//! core.ignore.recursive = {*.class} \
//!     {\.*}
//! core.ignore = {bin} {target}
//! ```
//!
//! Patterns in `core.ignore.recursive` apply to the directory and all its
//! descendants and become unanchored gitignore lines. Patterns in
//! `core.ignore` apply to the directory only and become `/`-anchored lines.

use std::io;
use std::path::Path;

use crate::ignore_file::{self, add_missing, GITIGNORE};

const RECURSIVE_KEY: &str = "core.ignore.recursive";
const LOCAL_KEY: &str = "core.ignore";

/// Patterns read from one `.jazzignore` file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JazzIgnore {
    pub recursive: Vec<String>,
    pub local: Vec<String>,
}

/// What has to happen to the `.gitignore` next to a `.jazzignore`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Translation {
    /// Overwrite the target with these lines.
    Write(Vec<String>),
    /// The source is gone or has no patterns: delete the target.
    Delete,
}

impl JazzIgnore {
    pub fn parse(text: &str) -> Self {
        let mut out = Self::default();
        for (key, value) in properties(text) {
            match key.as_str() {
                RECURSIVE_KEY => out.recursive.extend(braced_patterns(&value)),
                LOCAL_KEY => out.local.extend(braced_patterns(&value)),
                _ => {}
            }
        }
        out
    }

    /// Recursive patterns first, then directory-local ones, duplicates
    /// dropped.
    pub fn to_gitignore_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        add_missing(&mut lines, self.recursive.iter().map(|p| escape(p)));
        add_missing(
            &mut lines,
            self.local.iter().map(|p| format!("/{}", p.trim_start_matches('/'))),
        );
        lines
    }
}

/// Translate the `.jazzignore` at `path`. A missing file or one without any
/// pattern yields [`Translation::Delete`].
pub fn translate_file(path: &Path) -> io::Result<Translation> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Translation::Delete),
        Err(e) => return Err(e),
    };
    let lines = JazzIgnore::parse(&text).to_gitignore_lines();
    if lines.is_empty() {
        Ok(Translation::Delete)
    } else {
        Ok(Translation::Write(lines))
    }
}

/// Bring `<dir>/.gitignore` in line with `<dir>/.jazzignore` under `root`.
///
/// Directory files are overwritten (or deleted) wholesale. The root
/// `.gitignore` also carries the baseline, configured and extension entries,
/// so translated lines are merged into it and it is never deleted.
///
/// Returns the repository-relative path of the `.gitignore`, or `None` when
/// `jazzignore_rel` is not a `.jazzignore` path.
pub fn sync_gitignore(root: &Path, jazzignore_rel: &str) -> io::Result<Option<String>> {
    let Some(gitignore_rel) = ignore_file::gitignore_for(jazzignore_rel) else {
        return Ok(None);
    };
    let at_root = gitignore_rel == GITIGNORE;
    let target = root.join(&gitignore_rel);
    match translate_file(&root.join(jazzignore_rel))? {
        Translation::Write(lines) if at_root => {
            ignore_file::merge_root_file(root, GITIGNORE, &lines)?;
        }
        Translation::Write(lines) => ignore_file::write_lines(&target, &lines)?,
        Translation::Delete if at_root => {}
        Translation::Delete => ignore_file::remove_if_exists(&target)?,
    }
    tracing::debug!(jazzignore = jazzignore_rel, gitignore = %gitignore_rel, "synced ignore file");
    Ok(Some(gitignore_rel))
}

// gitignore gives a leading `#` or `!` special meaning.
fn escape(pattern: &str) -> String {
    if pattern.starts_with('#') || pattern.starts_with('!') {
        format!("\\{pattern}")
    } else {
        pattern.to_string()
    }
}

fn braced_patterns(value: &str) -> Vec<String> {
    let mut patterns = Vec::new();
    let mut rest = value;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            break;
        };
        let pattern = after[..close].trim();
        if !pattern.is_empty() {
            patterns.push(pattern.to_string());
        }
        rest = &after[close + 1..];
    }
    patterns
}

// ---------------------------------------------------------------------------
// Java properties subset
// ---------------------------------------------------------------------------

fn properties(text: &str) -> Vec<(String, String)> {
    let mut entries = Vec::new();
    let mut lines = text.lines();

    while let Some(line) = lines.next() {
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
            continue;
        }

        let mut logical = trimmed.to_string();
        while ends_with_continuation(&logical) {
            logical.pop();
            match lines.next() {
                Some(next) => logical.push_str(next.trim_start()),
                None => break,
            }
        }

        let (key, value) = split_key_value(&logical);
        entries.push((unescape(key), unescape(value)));
    }
    entries
}

fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|&c| c == '\\').count() % 2 == 1
}

fn split_key_value(line: &str) -> (&str, &str) {
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' => return (&line[..i], line[i + 1..].trim_start()),
            c if c.is_whitespace() => {
                let value = line[i..].trim_start();
                let value = value
                    .strip_prefix(['=', ':'])
                    .map(str::trim_start)
                    .unwrap_or(value);
                return (&line[..i], value);
            }
            _ => {}
        }
    }
    (line, "")
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{c}'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => out.push_str(&hex),
                }
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}
