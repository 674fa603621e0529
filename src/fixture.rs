//! Fixture extraction into private working copies.
//!
//! A fixture is an immutable sample project under the resource root. Each
//! extraction materializes an independent writable copy, so concurrently
//! running scenarios never share a working directory.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Copies named fixture trees out of a resource root.
#[derive(Debug, Clone)]
pub struct FixtureExtractor {
    /// Directory containing the fixture resources.
    resource_root: PathBuf,
    /// Directory receiving working copies.
    work_root: PathBuf,
}

impl FixtureExtractor {
    /// Creates an extractor reading from `resource_root`, writing working
    /// copies to a directory under the system temp dir.
    pub fn new(resource_root: impl Into<PathBuf>) -> Self {
        Self {
            resource_root: resource_root.into(),
            work_root: std::env::temp_dir().join("build-verifier-fixtures"),
        }
    }

    /// Overrides the directory working copies are created in.
    pub fn with_work_root(mut self, work_root: impl Into<PathBuf>) -> Self {
        self.work_root = work_root.into();
        self
    }

    /// Materializes a private, writable copy of the named fixture and
    /// returns its handle. Every call yields an independent directory.
    pub fn extract(&self, id: &str) -> Result<FixtureDir> {
        let source = self.resource_root.join(id);
        if !source.is_dir() {
            return Err(Error::ResourceNotFound {
                id: id.to_string(),
                root: self.resource_root.clone(),
            });
        }

        let short_uuid = &uuid::Uuid::new_v4().to_string()[..8];
        let dest = self
            .work_root
            .join(format!("{}-{}", sanitize(id), short_uuid));
        std::fs::create_dir_all(&dest)?;

        for entry in WalkDir::new(&source) {
            let entry = entry.map_err(std::io::Error::from)?;
            let rel = entry
                .path()
                .strip_prefix(&source)
                .map_err(|_| Error::Config(format!("walked outside fixture '{}'", id)))?;
            if rel.as_os_str().is_empty() {
                continue;
            }

            let target = dest.join(rel);
            if entry.file_type().is_dir() {
                std::fs::create_dir_all(&target)?;
            } else {
                if let Some(parent) = target.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::copy(entry.path(), &target)?;
            }
        }

        tracing::info!(fixture = %id, path = ?dest, "extracted fixture working copy");

        Ok(FixtureDir {
            path: dest,
            keep: false,
            removed: false,
        })
    }
}

/// Maps a fixture id to a directory-name-safe form.
fn sanitize(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .to_lowercase()
}

/// A private working copy of a fixture. Removed on drop unless kept.
#[derive(Debug)]
pub struct FixtureDir {
    path: PathBuf,
    keep: bool,
    removed: bool,
}

impl FixtureDir {
    /// Returns the root of the working copy.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Keeps the working copy on disk after drop (debugging support).
    pub fn keep(&mut self) {
        self.keep = true;
    }

    /// Removes the working copy now.
    pub fn discard(&mut self) -> Result<()> {
        if !self.removed {
            std::fs::remove_dir_all(&self.path)?;
            self.removed = true;
        }
        Ok(())
    }
}

impl Drop for FixtureDir {
    fn drop(&mut self) {
        if !self.keep && !self.removed {
            if let Err(e) = std::fs::remove_dir_all(&self.path) {
                tracing::warn!(error = %e, path = ?self.path, "failed to remove fixture working copy");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Helper to lay out a resource root with one fixture in it.
    fn create_resource_root() -> TempDir {
        let temp = TempDir::new().expect("failed to create temp dir");
        let fixture = temp.path().join("sample-project");
        std::fs::create_dir_all(fixture.join("src")).unwrap();
        std::fs::write(fixture.join("project.xml"), "<project/>").unwrap();
        std::fs::write(fixture.join("src/app.txt"), "app").unwrap();
        temp
    }

    #[test]
    fn extract_copies_the_full_tree() {
        let resources = create_resource_root();
        let work = TempDir::new().unwrap();
        let extractor =
            FixtureExtractor::new(resources.path()).with_work_root(work.path());

        let fixture = extractor.extract("sample-project").unwrap();

        assert!(fixture.path().join("project.xml").is_file());
        assert!(fixture.path().join("src/app.txt").is_file());
    }

    #[test]
    fn extract_unknown_fixture_fails() {
        let resources = create_resource_root();
        let extractor = FixtureExtractor::new(resources.path());

        let err = extractor.extract("no-such-fixture").unwrap_err();
        assert!(matches!(err, Error::ResourceNotFound { .. }));
    }

    #[test]
    fn extractions_are_independent() {
        let resources = create_resource_root();
        let work = TempDir::new().unwrap();
        let extractor =
            FixtureExtractor::new(resources.path()).with_work_root(work.path());

        let first = extractor.extract("sample-project").unwrap();
        let second = extractor.extract("sample-project").unwrap();

        assert_ne!(first.path(), second.path());

        // Mutating one copy must not leak into the other.
        std::fs::write(first.path().join("project.xml"), "<changed/>").unwrap();
        let untouched = std::fs::read_to_string(second.path().join("project.xml")).unwrap();
        assert_eq!(untouched, "<project/>");
    }

    #[test]
    fn working_copy_is_removed_on_drop() {
        let resources = create_resource_root();
        let work = TempDir::new().unwrap();
        let extractor =
            FixtureExtractor::new(resources.path()).with_work_root(work.path());

        let path = {
            let fixture = extractor.extract("sample-project").unwrap();
            fixture.path().to_path_buf()
        };

        assert!(!path.exists());
    }

    #[test]
    fn kept_working_copy_survives_drop() {
        let resources = create_resource_root();
        let work = TempDir::new().unwrap();
        let extractor =
            FixtureExtractor::new(resources.path()).with_work_root(work.path());

        let path = {
            let mut fixture = extractor.extract("sample-project").unwrap();
            fixture.keep();
            fixture.path().to_path_buf()
        };

        assert!(path.exists());
    }

    #[test]
    fn discard_is_idempotent() {
        let resources = create_resource_root();
        let work = TempDir::new().unwrap();
        let extractor =
            FixtureExtractor::new(resources.path()).with_work_root(work.path());

        let mut fixture = extractor.extract("sample-project").unwrap();
        fixture.discard().expect("first discard failed");
        fixture
            .discard()
            .expect("second discard should be idempotent");
    }
}
