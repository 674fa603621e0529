//! Invocation specs and the execute path.
//!
//! An [`InvocationSpec`] accumulates everything one tool run needs; the
//! [`Invoker`] turns a spec into a child process via a [`ToolLauncher`] and
//! produces a write-once [`InvocationResult`] after the process terminates.
//! Multi-step builds are a sequence of specs executed against the same
//! working directory, each with its own result.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::launcher::{LaunchRequest, ToolLauncher};
use crate::repository::LocalRepository;

/// Default log file name, relative to the working directory.
pub const DEFAULT_LOG_FILE: &str = "log.txt";

/// Arguments always passed to the tool unless overridden.
pub const DEFAULT_CLI_ARGUMENTS: &[&str] = &["--errors", "--batch-mode"];

/// Token in spec arguments replaced with the working directory at execution.
const BASEDIR_TOKEN: &str = "${basedir}";

fn default_autoclean() -> bool {
    true
}

fn default_log_file() -> String {
    DEFAULT_LOG_FILE.to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(300)
}

/// One configured run of the tool against a working directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvocationSpec {
    /// CLI arguments (goals, flags) passed through verbatim. `${basedir}`
    /// tokens are substituted with the working directory.
    #[serde(default)]
    pub args: Vec<String>,

    /// System property definitions rendered as `-Dkey=value`.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,

    /// Alternate settings file passed via `-s`.
    #[serde(default)]
    pub settings_file: Option<PathBuf>,

    /// Environment variables for the child process.
    #[serde(default)]
    pub environment: HashMap<String, String>,

    /// Whether to run the tool offline (`--offline`).
    #[serde(default)]
    pub offline: bool,

    /// Whether to purge prior output by prepending the clean goal.
    #[serde(default = "default_autoclean")]
    pub autoclean: bool,

    /// Log file name, relative to the working directory.
    #[serde(default = "default_log_file")]
    pub log_file: String,

    /// Wall-clock budget for the run.
    #[serde(default = "default_timeout")]
    pub timeout: Duration,
}

impl Default for InvocationSpec {
    fn default() -> Self {
        Self {
            args: Vec::new(),
            properties: BTreeMap::new(),
            settings_file: None,
            environment: HashMap::new(),
            offline: false,
            autoclean: default_autoclean(),
            log_file: default_log_file(),
            timeout: default_timeout(),
        }
    }
}

impl InvocationSpec {
    /// Creates an empty spec with default toggles.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one CLI argument.
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several CLI arguments.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets a system property definition.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Sets the alternate settings file.
    pub fn with_settings_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings_file = Some(path.into());
        self
    }

    /// Sets an environment variable for the child process.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    /// Toggles offline mode.
    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    /// Toggles autoclean.
    pub fn autoclean(mut self, autoclean: bool) -> Self {
        self.autoclean = autoclean;
        self
    }

    /// Overrides the log file name.
    pub fn with_log_file(mut self, name: impl Into<String>) -> Self {
        self.log_file = name.into();
        self
    }

    /// Sets the wall-clock budget.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Write-once record of a completed invocation. Only produced after the
/// tool process has terminated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvocationResult {
    /// Exit code reported by the tool process.
    pub exit_code: i32,
    /// Path to the captured log.
    pub log_path: PathBuf,
    /// Number of log lines captured.
    pub lines_captured: usize,
    /// Duration of the run.
    pub duration: Duration,
}

/// Executes invocation specs against one working directory.
///
/// The invoker itself carries no per-run state: repeated `execute` calls
/// against the same working directory model multi-step builds.
pub struct Invoker<L: ToolLauncher> {
    launcher: L,
    workdir: PathBuf,
    local_repo: Option<LocalRepository>,
    repo_property: String,
    default_args: Vec<String>,
    clean_goal: String,
}

impl<L: ToolLauncher> Invoker<L> {
    /// Creates an invoker bound to a working directory.
    pub fn new(launcher: L, workdir: impl Into<PathBuf>) -> Self {
        Self {
            launcher,
            workdir: workdir.into(),
            local_repo: None,
            repo_property: "maven.repo.local".to_string(),
            default_args: DEFAULT_CLI_ARGUMENTS.iter().map(|s| s.to_string()).collect(),
            clean_goal: "clean".to_string(),
        }
    }

    /// Points every invocation at a local repository via a `-D` define, so
    /// forked builds stay inside the sandbox set up for the test.
    pub fn with_local_repo(mut self, repo: LocalRepository) -> Self {
        self.local_repo = Some(repo);
        self
    }

    /// Overrides the property key used for the local repository define.
    pub fn with_repo_property(mut self, key: impl Into<String>) -> Self {
        self.repo_property = key.into();
        self
    }

    /// Overrides the default CLI arguments.
    pub fn with_default_args(mut self, args: Vec<String>) -> Self {
        self.default_args = args;
        self
    }

    /// Overrides the goal prepended when autoclean is enabled.
    pub fn with_clean_goal(mut self, goal: impl Into<String>) -> Self {
        self.clean_goal = goal.into();
        self
    }

    /// Returns the working directory.
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Returns the local repository handle, when configured.
    pub fn local_repo(&self) -> Option<&LocalRepository> {
        self.local_repo.as_ref()
    }

    /// Assembles the full argument list for a spec.
    fn assemble_args(&self, spec: &InvocationSpec) -> Vec<String> {
        let basedir = self.workdir.display().to_string();
        let mut args = self.default_args.clone();

        if spec.offline {
            args.push("--offline".to_string());
        }

        if let Some(repo) = &self.local_repo {
            args.push(format!("-D{}={}", self.repo_property, repo.root().display()));
        }

        if let Some(settings) = &spec.settings_file {
            args.push("-s".to_string());
            args.push(settings.display().to_string().replace(BASEDIR_TOKEN, &basedir));
        }

        if spec.autoclean {
            args.push(self.clean_goal.clone());
        }

        for (key, value) in &spec.properties {
            args.push(format!("-D{}={}", key, value));
        }

        for arg in &spec.args {
            args.push(arg.replace(BASEDIR_TOKEN, &basedir));
        }

        args
    }

    /// Launches the tool, blocks until termination, and records combined
    /// output to the spec's log file.
    ///
    /// A non-zero exit becomes [`Error::Verification`] carrying the captured
    /// log; callers asserting an expected failure may catch it.
    pub async fn execute(&self, spec: &InvocationSpec) -> Result<InvocationResult> {
        let args = self.assemble_args(spec);
        let log_path = self.workdir.join(&spec.log_file);

        let request = LaunchRequest {
            args: args.clone(),
            working_dir: self.workdir.clone(),
            environment: spec.environment.clone(),
            log_path: log_path.clone(),
            timeout: spec.timeout,
        };

        tracing::info!(
            workdir = ?self.workdir,
            launcher = %self.launcher.name(),
            args = ?args,
            "executing tool"
        );

        let outcome = self.launcher.launch(request).await?;

        // A signal-terminated child carries no exit code; report it as -1.
        let exit_code = outcome.exit_code.unwrap_or(-1);
        if exit_code != 0 {
            let log = read_log(&log_path);
            return Err(Error::Verification {
                message: format!(
                    "exit code was non-zero: {}; command line: {}",
                    exit_code,
                    args.join(" ")
                ),
                log,
            });
        }

        Ok(InvocationResult {
            exit_code,
            log_path,
            lines_captured: outcome.lines_captured,
            duration: outcome.duration,
        })
    }
}

fn read_log(log_path: &Path) -> String {
    std::fs::read_to_string(log_path)
        .unwrap_or_else(|e| format!("(error reading log contents: {})", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Launcher stub that records the request and plays back a scripted
    /// exit code and log body.
    struct StubLauncher {
        exit_code: i32,
        log_body: &'static str,
        requests: Mutex<Vec<LaunchRequest>>,
    }

    impl StubLauncher {
        fn new(exit_code: i32, log_body: &'static str) -> Self {
            Self {
                exit_code,
                log_body,
                requests: Mutex::new(Vec::new()),
            }
        }

        fn last_args(&self) -> Vec<String> {
            self.requests.lock().unwrap().last().unwrap().args.clone()
        }
    }

    #[async_trait]
    impl ToolLauncher for StubLauncher {
        async fn launch(&self, request: LaunchRequest) -> Result<crate::launcher::LaunchOutcome> {
            std::fs::write(&request.log_path, self.log_body)?;
            self.requests.lock().unwrap().push(request);
            Ok(crate::launcher::LaunchOutcome {
                exit_code: Some(self.exit_code),
                lines_captured: self.log_body.lines().count(),
                duration: Duration::from_millis(1),
            })
        }

        async fn version(&self) -> Result<String> {
            Ok("Stub Tool 1.0".to_string())
        }

        fn name(&self) -> &str {
            "stub"
        }
    }

    #[test]
    fn spec_has_sensible_defaults() {
        let spec = InvocationSpec::new();

        assert!(spec.args.is_empty());
        assert!(spec.autoclean);
        assert!(!spec.offline);
        assert_eq!(spec.log_file, DEFAULT_LOG_FILE);
        assert_eq!(spec.timeout, Duration::from_secs(300));
    }

    #[test]
    fn spec_builder_accumulates() {
        let spec = InvocationSpec::new()
            .with_arg("install")
            .with_property("skip.checks", "true")
            .with_settings_file("settings.xml")
            .with_env("TOOL_OPTS", "-X")
            .offline(true)
            .autoclean(false)
            .with_log_file("install.log")
            .with_timeout(Duration::from_secs(60));

        assert_eq!(spec.args, vec!["install"]);
        assert_eq!(
            spec.properties.get("skip.checks").map(String::as_str),
            Some("true")
        );
        assert!(spec.offline);
        assert!(!spec.autoclean);
        assert_eq!(spec.log_file, "install.log");
        assert_eq!(spec.timeout, Duration::from_secs(60));
    }

    #[tokio::test]
    async fn execute_assembles_argument_order() {
        let workdir = TempDir::new().unwrap();
        let repo_dir = TempDir::new().unwrap();
        let launcher = StubLauncher::new(0, "[INFO] done\n");

        let invoker = Invoker::new(launcher, workdir.path())
            .with_local_repo(LocalRepository::new(repo_dir.path()))
            .with_repo_property("repo.local");

        let spec = InvocationSpec::new()
            .with_arg("install")
            .with_property("key", "value")
            .offline(true);

        invoker.execute(&spec).await.unwrap();

        let args = invoker.launcher.last_args();
        assert_eq!(args[0], "--errors");
        assert_eq!(args[1], "--batch-mode");
        assert_eq!(args[2], "--offline");
        assert!(args[3].starts_with("-Drepo.local="));
        assert_eq!(args[4], "clean");
        assert_eq!(args[5], "-Dkey=value");
        assert_eq!(args[6], "install");
    }

    #[tokio::test]
    async fn execute_substitutes_basedir_token() {
        let workdir = TempDir::new().unwrap();
        let launcher = StubLauncher::new(0, "");
        let invoker = Invoker::new(launcher, workdir.path());

        let spec = InvocationSpec::new()
            .autoclean(false)
            .with_arg("-f")
            .with_arg("${basedir}/alt/project.xml");

        invoker.execute(&spec).await.unwrap();

        let args = invoker.launcher.last_args();
        let expected = format!("{}/alt/project.xml", workdir.path().display());
        assert!(args.contains(&expected));
    }

    #[tokio::test]
    async fn execute_returns_result_on_success() {
        let workdir = TempDir::new().unwrap();
        let launcher = StubLauncher::new(0, "[INFO] ok\n");
        let invoker = Invoker::new(launcher, workdir.path());

        let result = invoker.execute(&InvocationSpec::new()).await.unwrap();

        assert_eq!(result.exit_code, 0);
        assert_eq!(result.lines_captured, 1);
        assert_eq!(result.log_path, workdir.path().join(DEFAULT_LOG_FILE));
        assert!(result.log_path.is_file());
    }

    #[tokio::test]
    async fn execute_nonzero_exit_carries_log() {
        let workdir = TempDir::new().unwrap();
        let launcher = StubLauncher::new(1, "[ERROR] dependency path is a directory\n");
        let invoker = Invoker::new(launcher, workdir.path());

        let err = invoker.execute(&InvocationSpec::new()).await.unwrap_err();

        match err {
            Error::Verification { message, log } => {
                assert!(message.contains("exit code was non-zero: 1"));
                assert!(log.contains("[ERROR] dependency path is a directory"));
            }
            other => panic!("expected Verification, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn execute_honors_log_file_override() {
        let workdir = TempDir::new().unwrap();
        let launcher = StubLauncher::new(0, "step output\n");
        let invoker = Invoker::new(launcher, workdir.path());

        let spec = InvocationSpec::new().with_log_file("second-build.log");
        let result = invoker.execute(&spec).await.unwrap();

        assert_eq!(result.log_path, workdir.path().join("second-build.log"));
        assert!(result.log_path.is_file());
    }
}
