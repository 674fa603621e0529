//! Harness configuration and validation.
//!
//! Validates configuration before running scenarios to catch errors early.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::invoke::{InvocationSpec, DEFAULT_CLI_ARGUMENTS};

fn default_cli_args() -> Vec<String> {
    DEFAULT_CLI_ARGUMENTS.iter().map(|s| s.to_string()).collect()
}

fn default_repo_property() -> String {
    "maven.repo.local".to_string()
}

fn default_clean_goal() -> String {
    "clean".to_string()
}

fn default_true() -> bool {
    true
}

/// Configuration for the scenario harness.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Path to the tool binary under test.
    pub tool_bin: String,

    /// Root directory containing fixture resources.
    pub fixture_root: PathBuf,

    /// Root of the local artifact repository.
    pub local_repo: PathBuf,

    /// Directory receiving private working copies. A system temp directory
    /// is used when unset.
    #[serde(default)]
    pub work_root: Option<PathBuf>,

    /// Arguments always passed to the tool.
    #[serde(default = "default_cli_args")]
    pub default_args: Vec<String>,

    /// System property used to point the tool at the local repository.
    #[serde(default = "default_repo_property")]
    pub repo_property: String,

    /// Goal prepended when a step has autoclean enabled.
    #[serde(default = "default_clean_goal")]
    pub clean_goal: String,

    /// Keep working copies of passing scenarios.
    #[serde(default)]
    pub keep_on_success: bool,

    /// Keep working copies of failing scenarios for debugging.
    #[serde(default = "default_true")]
    pub keep_on_failure: bool,
}

impl HarnessConfig {
    /// Creates a configuration with default toggles.
    pub fn new(
        tool_bin: impl Into<String>,
        fixture_root: impl Into<PathBuf>,
        local_repo: impl Into<PathBuf>,
    ) -> Self {
        Self {
            tool_bin: tool_bin.into(),
            fixture_root: fixture_root.into(),
            local_repo: local_repo.into(),
            work_root: None,
            default_args: default_cli_args(),
            repo_property: default_repo_property(),
            clean_goal: default_clean_goal(),
            keep_on_success: false,
            keep_on_failure: true,
        }
    }

    /// Overrides the working-copy root.
    pub fn with_work_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.work_root = Some(root.into());
        self
    }

    /// Overrides the always-passed arguments.
    pub fn with_default_args(mut self, args: Vec<String>) -> Self {
        self.default_args = args;
        self
    }

    /// Overrides the local-repository property key.
    pub fn with_repo_property(mut self, key: impl Into<String>) -> Self {
        self.repo_property = key.into();
        self
    }

    /// Sets whether passing scenarios keep their working copies.
    pub fn with_keep_on_success(mut self, keep: bool) -> Self {
        self.keep_on_success = keep;
        self
    }

    /// Sets whether failing scenarios keep their working copies.
    pub fn with_keep_on_failure(mut self, keep: bool) -> Self {
        self.keep_on_failure = keep;
        self
    }
}

/// Validation result containing all found issues.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    /// List of validation errors (fatal).
    pub errors: Vec<String>,
    /// List of validation warnings (non-fatal).
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Returns true if validation passed (no errors).
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Adds an error to the result.
    pub fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    /// Adds a warning to the result.
    pub fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    /// Merges another validation result into this one.
    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    /// Converts to a Result, failing if there are errors.
    pub fn into_result(self) -> Result<Vec<String>> {
        if self.is_valid() {
            Ok(self.warnings)
        } else {
            Err(Error::Config(self.errors.join("; ")))
        }
    }
}

/// Trait for validatable configuration types.
pub trait Validate {
    /// Validates the configuration and returns any issues found.
    fn validate(&self) -> ValidationResult;
}

impl Validate for HarnessConfig {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.tool_bin.trim().is_empty() {
            result.add_error("tool_bin cannot be empty");
        }

        if self.repo_property.trim().is_empty() {
            result.add_error("repo_property cannot be empty");
        }

        if !self.fixture_root.is_dir() {
            result.add_warning(format!(
                "fixture_root {} is not a directory",
                self.fixture_root.display()
            ));
        }

        if self.clean_goal.trim().is_empty() {
            result.add_warning("clean_goal is empty; autoclean steps will pass a blank argument");
        }

        result
    }
}

impl Validate for InvocationSpec {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.log_file.trim().is_empty() {
            result.add_error("log file name unspecified");
        }

        if self.timeout.is_zero() {
            result.add_error("timeout must be non-zero");
        }

        if self.timeout > Duration::from_secs(7200) {
            result.add_warning("timeout over 2 hours may indicate a misconfiguration");
        }

        result
    }
}
