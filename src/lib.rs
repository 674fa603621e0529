//! Build Verifier - fixture-execute-verify harness for build tool CLIs
//!
//! This library extracts sample projects into private working directories,
//! invokes an external build tool against them, and verifies the produced
//! logs, file trees, and repository artifacts.

pub mod config;
pub mod error;
pub mod fixture;
pub mod harness;
pub mod invoke;
pub mod launcher;
pub mod properties;
pub mod repository;
pub mod scenario;
pub mod validator;
pub mod version;

pub use config::{HarnessConfig, Validate, ValidationResult};
pub use error::Error;
pub use fixture::{FixtureDir, FixtureExtractor};
pub use harness::{Harness, InvocationSummary, ScenarioReport, ScenarioStatus};
pub use invoke::{
    InvocationResult, InvocationSpec, Invoker, DEFAULT_CLI_ARGUMENTS, DEFAULT_LOG_FILE,
};
pub use launcher::{ForkedLauncher, LaunchOutcome, LaunchRequest, ToolLauncher};
pub use repository::{ArtifactCoordinate, LocalRepository};
pub use scenario::{Expectation, InvocationStep, Scenario};
pub use validator::{strip_ansi, Validator, ERROR_MARKERS};
pub use version::{ToolVersion, VersionRange};
