//! Declarative scenario descriptors.
//!
//! A scenario names a fixture, an ordered list of tool invocations, and the
//! expectations to evaluate afterwards. Scenarios live in YAML files next to
//! the fixture resources they exercise.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::invoke::{InvocationSpec, DEFAULT_LOG_FILE};
use crate::repository::ArtifactCoordinate;

fn default_autoclean() -> bool {
    true
}

fn default_log_file() -> String {
    DEFAULT_LOG_FILE.to_string()
}

fn default_timeout_secs() -> u64 {
    300
}

/// A complete fixture-execute-verify scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,

    /// Description of what this scenario exercises.
    #[serde(default)]
    pub description: String,

    /// Fixture resource identifier to extract.
    pub fixture: String,

    /// Tool version range this scenario applies to, in interval syntax
    /// (`"[2.0,)"`). Absent means all versions.
    #[serde(default)]
    pub tool_versions: Option<String>,

    /// Artifacts purged from the local repository before the first
    /// invocation, as `group:artifact:version` triples.
    #[serde(default)]
    pub purge: Vec<String>,

    /// Ordered invocations against the extracted working copy.
    pub invocations: Vec<InvocationStep>,

    /// Checks evaluated after the last invocation completes.
    #[serde(default)]
    pub expectations: Vec<Expectation>,
}

impl Scenario {
    /// Loads a scenario from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(Error::Io)?;

        serde_yaml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse scenario: {}", e)))
    }

    /// Log file written by the last invocation; log expectations default to
    /// this file.
    pub fn last_log_file(&self) -> &str {
        self.invocations
            .last()
            .map(|step| step.log_file.as_str())
            .unwrap_or(DEFAULT_LOG_FILE)
    }
}

/// One invocation within a scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvocationStep {
    /// CLI arguments passed through verbatim.
    #[serde(default)]
    pub args: Vec<String>,

    /// System property definitions.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,

    /// Alternate settings file passed via `-s`.
    #[serde(default)]
    pub settings_file: Option<String>,

    /// Environment variables for the child process.
    #[serde(default)]
    pub environment: HashMap<String, String>,

    /// Whether to run the tool offline.
    #[serde(default)]
    pub offline: bool,

    /// Whether to purge prior output before running.
    #[serde(default = "default_autoclean")]
    pub autoclean: bool,

    /// Log file name for this step.
    #[serde(default = "default_log_file")]
    pub log_file: String,

    /// Wall-clock budget in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout: u64,

    /// Whether a non-zero exit is the expected outcome of this step.
    #[serde(default)]
    pub expect_failure: bool,
}

impl InvocationStep {
    /// Converts the step into an executable spec.
    pub fn to_spec(&self) -> InvocationSpec {
        let mut spec = InvocationSpec::new()
            .with_args(self.args.clone())
            .offline(self.offline)
            .autoclean(self.autoclean)
            .with_log_file(&self.log_file)
            .with_timeout(Duration::from_secs(self.timeout));

        for (key, value) in &self.properties {
            spec = spec.with_property(key, value);
        }
        for (key, value) in &self.environment {
            spec = spec.with_env(key, value);
        }
        if let Some(settings) = &self.settings_file {
            spec = spec.with_settings_file(settings);
        }

        spec
    }
}

/// A post-run expectation evaluated by the validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum Expectation {
    /// A file (relative to the working directory) must exist. `*` wildcards
    /// are allowed in the final path component.
    FilePresent { path: String },

    /// A file must not exist.
    FileAbsent { path: String },

    /// A file must exist and contain the text.
    FileContains { path: String, text: String },

    /// The log must contain the text. `log` overrides which log file is
    /// read; the last step's log is the default.
    LogContains {
        text: String,
        #[serde(default)]
        log: Option<String>,
    },

    /// The log must not contain the text.
    LogExcludes {
        text: String,
        #[serde(default)]
        log: Option<String>,
    },

    /// No log line may carry an error marker.
    ErrorFreeLog {
        #[serde(default)]
        log: Option<String>,
    },

    /// A property file must define the key with exactly the value.
    Property {
        file: String,
        key: String,
        value: String,
    },

    /// The artifact must exist in the local repository.
    ArtifactPresent {
        #[serde(flatten)]
        coordinate: ArtifactCoordinate,
    },

    /// The artifact must not exist in the local repository.
    ArtifactAbsent {
        #[serde(flatten)]
        coordinate: ArtifactCoordinate,
    },
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FilePresent { path } => write!(f, "file present: {}", path),
            Self::FileAbsent { path } => write!(f, "file absent: {}", path),
            Self::FileContains { path, text } => {
                write!(f, "file {} contains '{}'", path, text)
            }
            Self::LogContains { text, .. } => write!(f, "log contains '{}'", text),
            Self::LogExcludes { text, .. } => write!(f, "log excludes '{}'", text),
            Self::ErrorFreeLog { .. } => write!(f, "error-free log"),
            Self::Property { file, key, value } => {
                write!(f, "property {}#{} = '{}'", file, key, value)
            }
            Self::ArtifactPresent { coordinate } => {
                write!(f, "artifact present: {}", coordinate)
            }
            Self::ArtifactAbsent { coordinate } => {
                write!(f, "artifact absent: {}", coordinate)
            }
        }
    }
}
