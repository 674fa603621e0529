//! Scenario orchestration: extract, execute, verify.
//!
//! One pass per scenario: gate on the tool version, materialize a private
//! working copy of the fixture, run each invocation in order, then evaluate
//! the expectations. Invocation failures and assertion failures stay
//! distinct: an unexpected invocation failure ends the scenario before any
//! expectation runs, so a later check can never mask it.

use std::path::PathBuf;

use serde::Serialize;

use crate::config::{HarnessConfig, Validate};
use crate::error::{Error, Result};
use crate::fixture::{FixtureDir, FixtureExtractor};
use crate::invoke::Invoker;
use crate::launcher::{ForkedLauncher, ToolLauncher};
use crate::repository::LocalRepository;
use crate::scenario::{Expectation, Scenario};
use crate::validator::Validator;
use crate::version::{ToolVersion, VersionRange};

/// File name of the machine-readable report written into kept working copies.
const REPORT_FILE: &str = "verifier-report.json";

/// Terminal status of a scenario run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioStatus {
    /// Every invocation and expectation held.
    Passed,
    /// An invocation or expectation failed.
    Failed,
    /// The tool version fell outside the scenario's range.
    Skipped,
}

/// Summary of one invocation within a scenario run.
#[derive(Debug, Clone, Serialize)]
pub struct InvocationSummary {
    /// Position of the step within the scenario, 1-based.
    pub step: usize,
    /// Whether the step's outcome matched its expectation.
    pub ok: bool,
    /// Human-readable outcome.
    pub detail: String,
}

/// Result of running one scenario.
#[derive(Debug, Serialize)]
pub struct ScenarioReport {
    /// Name of the scenario that was run.
    pub scenario: String,
    /// Terminal status.
    pub status: ScenarioStatus,
    /// Per-check and per-failure messages, in evaluation order.
    pub messages: Vec<String>,
    /// Summaries of the executed invocations.
    pub invocations: Vec<InvocationSummary>,
    /// Working directory the scenario ran in, when one was extracted.
    pub workdir: Option<PathBuf>,
    /// Whether the working directory was kept on disk.
    pub workdir_kept: bool,
}

impl ScenarioReport {
    /// Returns whether the scenario passed.
    pub fn passed(&self) -> bool {
        self.status == ScenarioStatus::Passed
    }

    fn without_workdir(name: &str, status: ScenarioStatus, message: String) -> Self {
        Self {
            scenario: name.to_string(),
            status,
            messages: vec![message],
            invocations: Vec::new(),
            workdir: None,
            workdir_kept: false,
        }
    }
}

/// Fixture-execute-verify harness.
pub struct Harness<L: ToolLauncher> {
    launcher: L,
    config: HarnessConfig,
}

impl Harness<ForkedLauncher> {
    /// Creates a harness that forks the configured tool binary.
    pub fn new(config: HarnessConfig) -> Result<Self> {
        let warnings = config.validate().into_result()?;
        for warning in warnings {
            tracing::warn!("{}", warning);
        }

        let launcher = ForkedLauncher::new(config.tool_bin.clone());
        Ok(Self { launcher, config })
    }
}

impl<L: ToolLauncher + Clone> Harness<L> {
    /// Creates a harness with a custom launcher (stubs, embedded tools).
    pub fn with_launcher(config: HarnessConfig, launcher: L) -> Self {
        Self { launcher, config }
    }

    /// Returns the harness configuration.
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Runs a scenario and returns its report.
    pub async fn run_scenario(&self, scenario: &Scenario) -> ScenarioReport {
        tracing::info!(
            scenario = %scenario.name,
            fixture = %scenario.fixture,
            "running scenario"
        );

        // The version gate runs before anything touches the filesystem.
        if let Some(range_text) = &scenario.tool_versions {
            match self.excluded_version(range_text).await {
                Ok(None) => {}
                Ok(Some(version)) => {
                    tracing::info!(
                        scenario = %scenario.name,
                        version = %version,
                        range = %range_text,
                        "skipping scenario, tool version outside range"
                    );
                    return ScenarioReport::without_workdir(
                        &scenario.name,
                        ScenarioStatus::Skipped,
                        format!("tool version {} outside range {}", version, range_text),
                    );
                }
                Err(e) => {
                    return ScenarioReport::without_workdir(
                        &scenario.name,
                        ScenarioStatus::Failed,
                        format!("version gate failed: {}", e),
                    );
                }
            }
        }

        let mut extractor = FixtureExtractor::new(&self.config.fixture_root);
        if let Some(work_root) = &self.config.work_root {
            extractor = extractor.with_work_root(work_root);
        }

        let mut fixture = match extractor.extract(&scenario.fixture) {
            Ok(fixture) => fixture,
            Err(e) => {
                return ScenarioReport::without_workdir(
                    &scenario.name,
                    ScenarioStatus::Failed,
                    format!("fixture extraction failed: {}", e),
                );
            }
        };

        let (status, messages, invocations) = self.run_in_workdir(scenario, &fixture).await;

        let keep = match status {
            ScenarioStatus::Passed => self.config.keep_on_success,
            ScenarioStatus::Failed => self.config.keep_on_failure,
            ScenarioStatus::Skipped => false,
        };
        if keep {
            fixture.keep();
        }

        let report = ScenarioReport {
            scenario: scenario.name.clone(),
            status,
            messages,
            invocations,
            workdir: Some(fixture.path().to_path_buf()),
            workdir_kept: keep,
        };

        if keep {
            self.dump_report(&report, fixture.path().join(REPORT_FILE));
        }

        tracing::info!(scenario = %scenario.name, status = ?status, "scenario finished");
        report
    }

    /// Executes the invocations and expectations inside the working copy.
    async fn run_in_workdir(
        &self,
        scenario: &Scenario,
        fixture: &FixtureDir,
    ) -> (ScenarioStatus, Vec<String>, Vec<InvocationSummary>) {
        let mut messages = Vec::new();
        let mut summaries = Vec::new();

        let repo = LocalRepository::new(&self.config.local_repo);

        // Preconditions: purge stale artifacts before the first invocation.
        for entry in &scenario.purge {
            if let Err(e) = purge_entry(&repo, entry) {
                messages.push(format!("purge of '{}' failed: {}", entry, e));
                return (ScenarioStatus::Failed, messages, summaries);
            }
        }

        let invoker = Invoker::new(self.launcher.clone(), fixture.path())
            .with_local_repo(repo.clone())
            .with_repo_property(&self.config.repo_property)
            .with_default_args(self.config.default_args.clone())
            .with_clean_goal(&self.config.clean_goal);

        for (idx, step) in scenario.invocations.iter().enumerate() {
            let number = idx + 1;
            let spec = step.to_spec();

            match spec.validate().into_result() {
                Ok(warnings) => {
                    for warning in warnings {
                        tracing::warn!(step = number, "{}", warning);
                    }
                }
                Err(e) => {
                    messages.push(format!("step {} rejected: {}", number, e));
                    return (ScenarioStatus::Failed, messages, summaries);
                }
            }

            match invoker.execute(&spec).await {
                Ok(result) => {
                    if step.expect_failure {
                        messages.push(format!(
                            "step {} succeeded but was expected to fail",
                            number
                        ));
                        summaries.push(InvocationSummary {
                            step: number,
                            ok: false,
                            detail: format!("exit 0 in {:.1}s", result.duration.as_secs_f64()),
                        });
                        return (ScenarioStatus::Failed, messages, summaries);
                    }
                    summaries.push(InvocationSummary {
                        step: number,
                        ok: true,
                        detail: format!("exit 0 in {:.1}s", result.duration.as_secs_f64()),
                    });
                }
                // Only here may an invocation failure become a pass condition.
                Err(Error::Verification { message, .. }) if step.expect_failure => {
                    summaries.push(InvocationSummary {
                        step: number,
                        ok: true,
                        detail: format!("failed as expected: {}", message),
                    });
                }
                Err(e) => {
                    let detail = e.to_string();
                    messages.push(format!("step {} failed: {}", number, detail));
                    summaries.push(InvocationSummary {
                        step: number,
                        ok: false,
                        detail,
                    });
                    return (ScenarioStatus::Failed, messages, summaries);
                }
            }
        }

        let validator = Validator::new(fixture.path());
        let last_log = scenario.last_log_file();
        let mut failed = false;

        for expectation in &scenario.expectations {
            match check(&validator, &repo, last_log, expectation) {
                Ok(()) => messages.push(format!("ok: {}", expectation)),
                Err(e) => {
                    failed = true;
                    messages.push(format!("failed: {}: {}", expectation, e));
                }
            }
        }

        let status = if failed {
            ScenarioStatus::Failed
        } else {
            ScenarioStatus::Passed
        };
        (status, messages, summaries)
    }

    /// Returns the tool version when it falls outside the range.
    async fn excluded_version(&self, range_text: &str) -> Result<Option<ToolVersion>> {
        let range = VersionRange::parse(range_text)?;
        let raw = self.launcher.version().await?;
        let version = ToolVersion::find_in(&raw)
            .ok_or_else(|| Error::Config(format!("could not parse tool version from '{}'", raw)))?;

        if range.contains(&version) {
            Ok(None)
        } else {
            Ok(Some(version))
        }
    }

    fn dump_report(&self, report: &ScenarioReport, path: PathBuf) {
        match serde_json::to_string_pretty(report) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&path, json) {
                    tracing::warn!(error = %e, path = ?path, "failed to write scenario report");
                }
            }
            Err(e) => tracing::warn!(error = %e, "failed to serialize scenario report"),
        }
    }
}

/// Evaluates one expectation against the working copy and repository.
fn check(
    validator: &Validator,
    repo: &LocalRepository,
    last_log: &str,
    expectation: &Expectation,
) -> Result<()> {
    match expectation {
        Expectation::FilePresent { path } => validator.verify_file_present(path),
        Expectation::FileAbsent { path } => validator.verify_file_absent(path),
        Expectation::FileContains { path, text } => validator.verify_file_contains(path, text),
        Expectation::LogContains { text, log } => {
            validator.verify_text_in_log(log.as_deref().unwrap_or(last_log), text)
        }
        Expectation::LogExcludes { text, log } => {
            validator.verify_text_not_in_log(log.as_deref().unwrap_or(last_log), text)
        }
        Expectation::ErrorFreeLog { log } => {
            validator.verify_error_free_log(log.as_deref().unwrap_or(last_log))
        }
        Expectation::Property { file, key, value } => validator.verify_property(file, key, value),
        Expectation::ArtifactPresent { coordinate } => {
            validator.verify_artifact_present(repo, coordinate)
        }
        Expectation::ArtifactAbsent { coordinate } => {
            validator.verify_artifact_absent(repo, coordinate)
        }
    }
}

/// Purges one `group:artifact:version` triple from the repository.
fn purge_entry(repo: &LocalRepository, entry: &str) -> Result<()> {
    let parts: Vec<&str> = entry.split(':').collect();
    if parts.len() != 3 || parts.iter().any(|p| p.is_empty()) {
        return Err(Error::Config(format!(
            "purge entry must be group:artifact:version: '{}'",
            entry
        )));
    }
    repo.delete_artifacts_version(parts[0], parts[1], parts[2])
}
