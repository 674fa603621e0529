//! Read-only checks over a finished invocation's working directory and log.
//!
//! Every check either passes or fails with a descriptive assertion error
//! naming the expected and actual condition. Nothing here mutates state, so
//! re-running checks against an unchanged tree yields the same verdict.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::properties;
use crate::repository::{ArtifactCoordinate, LocalRepository};

/// Log line markers treated as errors by [`Validator::verify_error_free_log`].
pub const ERROR_MARKERS: &[&str] = &["[ERROR]", "[FATAL]"];

/// Inspects a working directory and captured logs after execution.
#[derive(Debug, Clone)]
pub struct Validator {
    workdir: PathBuf,
}

impl Validator {
    /// Creates a validator over a working directory.
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    /// Returns the working directory under inspection.
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn resolve(&self, rel: &str) -> PathBuf {
        let path = Path::new(rel);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workdir.join(rel)
        }
    }

    /// Verifies that the given file exists. `*` wildcards are supported in
    /// the final path component.
    pub fn verify_file_present(&self, rel: &str) -> Result<()> {
        self.verify_file_presence(rel, true)
    }

    /// Verifies that the given file does not exist.
    pub fn verify_file_absent(&self, rel: &str) -> Result<()> {
        self.verify_file_presence(rel, false)
    }

    fn verify_file_presence(&self, rel: &str, wanted: bool) -> Result<()> {
        let path = self.resolve(rel);

        let found = if rel.contains('*') {
            self.wildcard_exists(&path)?
        } else {
            path.exists()
        };

        match (found, wanted) {
            (false, true) => Err(Error::Assertion(format!(
                "expected file was not found: {}",
                path.display()
            ))),
            (true, false) => Err(Error::Assertion(format!(
                "unwanted file was found: {}",
                path.display()
            ))),
            _ => Ok(()),
        }
    }

    /// Matches a `*` pattern in the final path component against the
    /// parent's directory listing.
    fn wildcard_exists(&self, path: &Path) -> Result<bool> {
        let parent = match path.parent() {
            Some(parent) => parent,
            None => return Ok(false),
        };
        let pattern = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name,
            None => return Ok(false),
        };

        if !parent.is_dir() {
            return Ok(false);
        }

        for entry in std::fs::read_dir(parent)? {
            let entry = entry?;
            if let Some(name) = entry.file_name().to_str() {
                if wildcard_match(name, pattern) {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// Verifies that a file exists and contains the given text.
    pub fn verify_file_contains(&self, rel: &str, needle: &str) -> Result<()> {
        self.verify_file_present(rel)?;
        let path = self.resolve(rel);
        let content = std::fs::read_to_string(&path)?;
        if content.contains(needle) {
            Ok(())
        } else {
            Err(Error::Assertion(format!(
                "content of {} does not contain '{}'",
                path.display(),
                needle
            )))
        }
    }

    /// Loads the non-empty lines of a text file, relative to the working
    /// directory.
    pub fn load_lines(&self, rel: &str) -> Result<Vec<String>> {
        let path = self.resolve(rel);
        let content = std::fs::read_to_string(&path)?;
        Ok(content
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect())
    }

    /// Verifies that the text appears somewhere in the log, ignoring ANSI
    /// escapes.
    pub fn verify_text_in_log(&self, log_file: &str, text: &str) -> Result<()> {
        let lines = self.load_lines(log_file)?;
        if lines.iter().any(|line| strip_ansi(line).contains(text)) {
            Ok(())
        } else {
            Err(Error::Assertion(format!(
                "text not found in log {}: '{}'",
                log_file, text
            )))
        }
    }

    /// Verifies that the text appears nowhere in the log.
    pub fn verify_text_not_in_log(&self, log_file: &str, text: &str) -> Result<()> {
        let lines = self.load_lines(log_file)?;
        match lines.iter().find(|line| strip_ansi(line).contains(text)) {
            Some(line) => Err(Error::Assertion(format!(
                "unwanted text found in log {}: '{}'",
                log_file, line
            ))),
            None => Ok(()),
        }
    }

    /// Verifies that no log line carries an error marker.
    pub fn verify_error_free_log(&self, log_file: &str) -> Result<()> {
        for line in self.load_lines(log_file)? {
            let plain = strip_ansi(&line);
            if ERROR_MARKERS.iter().any(|marker| plain.contains(marker)) {
                return Err(Error::Assertion(format!("error in execution: {}", line)));
            }
        }
        Ok(())
    }

    /// Loads a property file relative to the working directory.
    pub fn load_properties(&self, rel: &str) -> Result<HashMap<String, String>> {
        let path = self.resolve(rel);
        let content = std::fs::read_to_string(&path).map_err(|e| {
            Error::Assertion(format!(
                "could not read property file {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(properties::parse(&content))
    }

    /// Verifies that a property file defines `key` with exactly `expected`.
    pub fn verify_property(&self, rel: &str, key: &str, expected: &str) -> Result<()> {
        let props = self.load_properties(rel)?;
        match props.get(key) {
            Some(actual) if actual == expected => Ok(()),
            Some(actual) => Err(Error::Assertion(format!(
                "property {} in {} was '{}', expected '{}'",
                key, rel, actual, expected
            ))),
            None => Err(Error::Assertion(format!(
                "property {} not defined in {}",
                key, rel
            ))),
        }
    }

    /// Verifies that the artifact exists in the local repository.
    pub fn verify_artifact_present(
        &self,
        repo: &LocalRepository,
        coordinate: &ArtifactCoordinate,
    ) -> Result<()> {
        if repo.contains(coordinate) {
            Ok(())
        } else {
            Err(Error::Assertion(format!(
                "expected artifact {} was not found at {}",
                coordinate,
                repo.artifact_path(coordinate).display()
            )))
        }
    }

    /// Verifies that the artifact does not exist in the local repository.
    pub fn verify_artifact_absent(
        &self,
        repo: &LocalRepository,
        coordinate: &ArtifactCoordinate,
    ) -> Result<()> {
        if repo.contains(coordinate) {
            Err(Error::Assertion(format!(
                "unwanted artifact {} was found at {}",
                coordinate,
                repo.artifact_path(coordinate).display()
            )))
        } else {
            Ok(())
        }
    }
}

/// Strips ANSI escape sequences from a log line.
pub fn strip_ansi(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\u{1b}' {
            if chars.peek() == Some(&'[') {
                chars.next();
                for c in chars.by_ref() {
                    if ('@'..='~').contains(&c) {
                        break;
                    }
                }
            }
            continue;
        }
        out.push(ch);
    }
    out
}

/// Matches a file name against a pattern whose `*` segments match any run
/// of characters.
fn wildcard_match(name: &str, pattern: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return name == pattern;
    }

    let mut rest = name;

    if !rest.starts_with(parts[0]) {
        return false;
    }
    rest = &rest[parts[0].len()..];

    for part in &parts[1..parts.len() - 1] {
        if part.is_empty() {
            continue;
        }
        match rest.find(part) {
            Some(idx) => rest = &rest[idx + part.len()..],
            None => return false,
        }
    }

    rest.ends_with(parts[parts.len() - 1])
}
