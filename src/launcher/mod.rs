//! Launcher seam between the harness and the external build tool.
//!
//! Production code forks the tool binary; tests substitute stub launchers
//! that play the tool's role without a real process.

mod forked;

pub use forked::ForkedLauncher;

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

/// A request to run the tool once against a working directory.
#[derive(Debug, Clone)]
pub struct LaunchRequest {
    /// Arguments passed to the tool verbatim.
    pub args: Vec<String>,
    /// Directory the tool runs in.
    pub working_dir: PathBuf,
    /// Extra environment for the child process.
    pub environment: HashMap<String, String>,
    /// File receiving combined stdout/stderr, line by line in arrival order.
    pub log_path: PathBuf,
    /// Wall-clock budget for the run.
    pub timeout: Duration,
}

/// Outcome of a completed tool run.
#[derive(Debug, Clone)]
pub struct LaunchOutcome {
    /// Exit code, when the process exited normally.
    pub exit_code: Option<i32>,
    /// Number of log lines captured.
    pub lines_captured: usize,
    /// Wall-clock duration of the run.
    pub duration: Duration,
}

impl LaunchOutcome {
    /// Returns whether the tool exited with status zero.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Trait for tool launchers.
#[async_trait]
pub trait ToolLauncher: Send + Sync {
    /// Runs the tool to completion, recording output to the request's log
    /// file. Resolves only after the process has terminated.
    async fn launch(&self, request: LaunchRequest) -> Result<LaunchOutcome>;

    /// Reports the tool's version string (typically its `--version` output).
    async fn version(&self) -> Result<String>;

    /// Returns the name of this launcher.
    fn name(&self) -> &str;
}
