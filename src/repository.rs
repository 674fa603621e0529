//! Local artifact repository handle.
//!
//! Scenarios both set up preconditions (purging stale artifacts) and verify
//! postconditions (an install step materialized an artifact) against a local
//! repository in the default directory layout. The repository is an explicit
//! handle passed where needed rather than process-wide state, so parallel
//! tests can namespace or serialize access themselves.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

fn default_kind() -> String {
    "jar".to_string()
}

/// Identifies a built artifact in repository coordinate space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactCoordinate {
    /// Group identifier, dot-separated.
    pub group_id: String,

    /// Artifact identifier.
    pub artifact_id: String,

    /// Version string.
    pub version: String,

    /// File extension of the artifact ("jar", "pom", ...).
    #[serde(default = "default_kind")]
    pub kind: String,

    /// Optional classifier appended to the file name.
    #[serde(default)]
    pub classifier: Option<String>,
}

impl ArtifactCoordinate {
    /// Creates a coordinate without a classifier.
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
            kind: kind.into(),
            classifier: None,
        }
    }

    /// Sets the classifier.
    pub fn with_classifier(mut self, classifier: impl Into<String>) -> Self {
        self.classifier = Some(classifier.into());
        self
    }

    /// Parses `group:artifact:version:kind` with an optional trailing
    /// `:classifier` segment.
    pub fn parse(text: &str) -> Result<Self> {
        let parts: Vec<&str> = text.split(':').collect();
        if parts.len() < 4 || parts.len() > 5 || parts.iter().any(|p| p.is_empty()) {
            return Err(Error::Config(format!(
                "artifact coordinate must be group:artifact:version:kind[:classifier]: '{}'",
                text
            )));
        }

        let mut coordinate = Self::new(parts[0], parts[1], parts[2], parts[3]);
        if let Some(classifier) = parts.get(4) {
            coordinate = coordinate.with_classifier(*classifier);
        }
        Ok(coordinate)
    }

    /// File name of the artifact in the default layout.
    pub fn file_name(&self) -> String {
        match &self.classifier {
            Some(classifier) => format!(
                "{}-{}-{}.{}",
                self.artifact_id, self.version, classifier, self.kind
            ),
            None => format!("{}-{}.{}", self.artifact_id, self.version, self.kind),
        }
    }
}

impl fmt::Display for ArtifactCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.group_id, self.artifact_id, self.version, self.kind
        )?;
        if let Some(classifier) = &self.classifier {
            write!(f, ":{}", classifier)?;
        }
        Ok(())
    }
}

/// Handle to a local repository laid out in the default directory scheme:
/// `group/…/artifact/version/artifact-version[-classifier].ext`.
#[derive(Debug, Clone)]
pub struct LocalRepository {
    root: PathBuf,
}

impl LocalRepository {
    /// Creates a handle rooted at the given directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the repository root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of the artifact file for a coordinate. The path is
    /// computed, not checked for existence.
    pub fn artifact_path(&self, coordinate: &ArtifactCoordinate) -> PathBuf {
        self.version_dir(
            &coordinate.group_id,
            &coordinate.artifact_id,
            &coordinate.version,
        )
        .join(coordinate.file_name())
    }

    /// Returns whether the artifact file exists.
    pub fn contains(&self, coordinate: &ArtifactCoordinate) -> bool {
        self.artifact_path(coordinate).is_file()
    }

    /// Deletes a single artifact file if present.
    pub fn delete_artifact(&self, coordinate: &ArtifactCoordinate) -> Result<()> {
        let path = self.artifact_path(coordinate);
        if path.exists() {
            std::fs::remove_file(&path)?;
            tracing::debug!(path = ?path, "deleted artifact");
        }
        Ok(())
    }

    /// Deletes every artifact under a group identifier.
    pub fn delete_artifacts(&self, group_id: &str) -> Result<()> {
        self.remove_tree(&self.group_dir(group_id))
    }

    /// Deletes every artifact of one group:artifact:version.
    pub fn delete_artifacts_version(
        &self,
        group_id: &str,
        artifact_id: &str,
        version: &str,
    ) -> Result<()> {
        self.remove_tree(&self.version_dir(group_id, artifact_id, version))
    }

    fn group_dir(&self, group_id: &str) -> PathBuf {
        self.root.join(group_id.replace('.', "/"))
    }

    fn version_dir(&self, group_id: &str, artifact_id: &str, version: &str) -> PathBuf {
        self.group_dir(group_id).join(artifact_id).join(version)
    }

    /// Removes a directory tree; missing trees are fine (deletion is a
    /// precondition step and must be idempotent).
    fn remove_tree(&self, dir: &Path) -> Result<()> {
        if dir.exists() {
            std::fs::remove_dir_all(dir)?;
            tracing::debug!(path = ?dir, "purged repository subtree");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn coordinate() -> ArtifactCoordinate {
        ArtifactCoordinate::new("org.example.sample", "sample", "1.0", "pom")
    }

    fn install(repo: &LocalRepository, coordinate: &ArtifactCoordinate) {
        let path = repo.artifact_path(coordinate);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "artifact body").unwrap();
    }

    #[test]
    fn coordinate_parses_four_segments() {
        let parsed = ArtifactCoordinate::parse("org.example.sample:sample:1.0:pom").unwrap();
        assert_eq!(parsed, coordinate());
    }

    #[test]
    fn coordinate_parses_classifier() {
        let parsed = ArtifactCoordinate::parse("g:a:1.0:jar:sources").unwrap();
        assert_eq!(parsed.classifier.as_deref(), Some("sources"));
        assert_eq!(parsed.file_name(), "a-1.0-sources.jar");
    }

    #[test]
    fn coordinate_rejects_wrong_arity() {
        assert!(ArtifactCoordinate::parse("g:a:1.0").is_err());
        assert!(ArtifactCoordinate::parse("g:a:1.0:jar:c:extra").is_err());
        assert!(ArtifactCoordinate::parse("g::1.0:jar").is_err());
    }

    #[test]
    fn artifact_path_uses_default_layout() {
        let repo = LocalRepository::new("/repo");
        let path = repo.artifact_path(&coordinate());
        assert_eq!(
            path,
            PathBuf::from("/repo/org/example/sample/sample/1.0/sample-1.0.pom")
        );
    }

    #[test]
    fn contains_reflects_filesystem() {
        let temp = TempDir::new().unwrap();
        let repo = LocalRepository::new(temp.path());

        assert!(!repo.contains(&coordinate()));
        install(&repo, &coordinate());
        assert!(repo.contains(&coordinate()));
    }

    #[test]
    fn delete_artifact_removes_file() {
        let temp = TempDir::new().unwrap();
        let repo = LocalRepository::new(temp.path());
        install(&repo, &coordinate());

        repo.delete_artifact(&coordinate()).unwrap();
        assert!(!repo.contains(&coordinate()));

        // Deleting again is a no-op.
        repo.delete_artifact(&coordinate()).unwrap();
    }

    #[test]
    fn delete_artifacts_version_purges_version_dir() {
        let temp = TempDir::new().unwrap();
        let repo = LocalRepository::new(temp.path());
        install(&repo, &coordinate());

        repo.delete_artifacts_version("org.example.sample", "sample", "1.0")
            .unwrap();
        assert!(!repo.contains(&coordinate()));

        repo.delete_artifacts_version("org.example.sample", "sample", "1.0")
            .unwrap();
    }

    #[test]
    fn delete_artifacts_purges_group() {
        let temp = TempDir::new().unwrap();
        let repo = LocalRepository::new(temp.path());
        install(&repo, &coordinate());

        repo.delete_artifacts("org.example.sample").unwrap();
        assert!(!temp.path().join("org/example/sample").exists());
    }
}
