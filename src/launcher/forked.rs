//! Forked-process launcher for the tool under test.

use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;

use crate::error::{Error, Result};

use super::{LaunchOutcome, LaunchRequest, ToolLauncher};

/// Launcher that forks the tool binary as a child process bound to the
/// working directory.
#[derive(Debug, Clone)]
pub struct ForkedLauncher {
    /// Path to the tool binary.
    bin_path: String,
}

impl ForkedLauncher {
    /// Creates a launcher for the given tool binary.
    pub fn new(bin_path: impl Into<String>) -> Self {
        Self {
            bin_path: bin_path.into(),
        }
    }

    /// Returns the configured binary path.
    pub fn bin_path(&self) -> &str {
        &self.bin_path
    }
}

#[async_trait]
impl ToolLauncher for ForkedLauncher {
    async fn launch(&self, request: LaunchRequest) -> Result<LaunchOutcome> {
        let start = Instant::now();

        tracing::info!(
            bin = %self.bin_path,
            working_dir = ?request.working_dir,
            log = ?request.log_path,
            "launching tool"
        );

        let mut log = tokio::fs::File::create(&request.log_path).await?;

        let mut child = Command::new(&self.bin_path)
            .args(&request.args)
            .current_dir(&request.working_dir)
            .envs(&request.environment)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(Stdio::null())
            .spawn()
            .map_err(|e| Error::Launch(format!("failed to spawn {}: {}", self.bin_path, e)))?;

        let stdout = child.stdout.take().expect("stdout was piped");
        let stderr = child.stderr.take().expect("stderr was piped");

        let mut stdout_reader = BufReader::new(stdout).lines();
        let mut stderr_reader = BufReader::new(stderr).lines();

        // Drain both streams into the log, then reap the child. The whole
        // sequence runs under the wall-clock budget.
        let run = async {
            let mut lines_captured = 0usize;
            let mut stdout_open = true;
            let mut stderr_open = true;

            while stdout_open || stderr_open {
                tokio::select! {
                    line = stdout_reader.next_line(), if stdout_open => match line {
                        Ok(Some(text)) => {
                            lines_captured += 1;
                            log.write_all(text.as_bytes()).await?;
                            log.write_all(b"\n").await?;
                        }
                        Ok(None) => stdout_open = false,
                        Err(e) => {
                            tracing::error!(error = %e, "error reading tool stdout");
                            stdout_open = false;
                        }
                    },
                    line = stderr_reader.next_line(), if stderr_open => match line {
                        Ok(Some(text)) => {
                            lines_captured += 1;
                            log.write_all(text.as_bytes()).await?;
                            log.write_all(b"\n").await?;
                        }
                        Ok(None) => stderr_open = false,
                        Err(e) => {
                            tracing::error!(error = %e, "error reading tool stderr");
                            stderr_open = false;
                        }
                    },
                }
            }

            log.flush().await?;

            let status = child.wait().await.map_err(|e| {
                Error::Launch(format!("failed to wait for {}: {}", self.bin_path, e))
            })?;

            Ok::<_, Error>((status, lines_captured))
        };

        // Bind before matching so the drained future releases its borrow of
        // the child and the timeout arm can kill it.
        let timed = tokio::time::timeout(request.timeout, run).await;

        match timed {
            Ok(outcome) => {
                let (status, lines_captured) = outcome?;
                tracing::info!(
                    exit = ?status.code(),
                    lines = lines_captured,
                    "tool terminated"
                );
                Ok(LaunchOutcome {
                    exit_code: status.code(),
                    lines_captured,
                    duration: start.elapsed(),
                })
            }
            Err(_) => {
                tracing::warn!(timeout = ?request.timeout, "tool timed out, killing child");
                if let Err(e) = child.kill().await {
                    tracing::error!(error = %e, "failed to kill timed-out tool");
                }
                let _ = child.wait().await;
                Err(Error::Timeout(request.timeout))
            }
        }
    }

    async fn version(&self) -> Result<String> {
        let output = Command::new(&self.bin_path)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                Error::Launch(format!("failed to run {} --version: {}", self.bin_path, e))
            })?;

        if !output.status.success() {
            return Err(Error::Launch(format!(
                "{} --version exited with {:?}",
                self.bin_path,
                output.status.code()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout);
        Ok(text.lines().next().unwrap_or("").trim().to_string())
    }

    fn name(&self) -> &str {
        "forked"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;
    use tempfile::TempDir;

    fn request(workdir: &TempDir, args: &[&str]) -> LaunchRequest {
        LaunchRequest {
            args: args.iter().map(|s| s.to_string()).collect(),
            working_dir: workdir.path().to_path_buf(),
            environment: HashMap::new(),
            log_path: workdir.path().join("log.txt"),
            timeout: Duration::from_secs(10),
        }
    }

    #[tokio::test]
    async fn launch_captures_output_lines() {
        let workdir = TempDir::new().unwrap();
        let launcher = ForkedLauncher::new("sh");

        let outcome = launcher
            .launch(request(&workdir, &["-c", "echo one; echo two >&2"]))
            .await
            .unwrap();

        assert!(outcome.success());
        assert_eq!(outcome.lines_captured, 2);

        let log = std::fs::read_to_string(workdir.path().join("log.txt")).unwrap();
        assert!(log.contains("one"));
        assert!(log.contains("two"));
    }

    #[tokio::test]
    async fn launch_reports_nonzero_exit() {
        let workdir = TempDir::new().unwrap();
        let launcher = ForkedLauncher::new("sh");

        let outcome = launcher
            .launch(request(&workdir, &["-c", "echo failing; exit 7"]))
            .await
            .unwrap();

        assert!(!outcome.success());
        assert_eq!(outcome.exit_code, Some(7));
    }

    #[tokio::test]
    async fn launch_runs_in_working_directory() {
        let workdir = TempDir::new().unwrap();
        let launcher = ForkedLauncher::new("sh");

        launcher
            .launch(request(&workdir, &["-c", "echo marker > produced.txt"]))
            .await
            .unwrap();

        assert!(workdir.path().join("produced.txt").is_file());
    }

    #[tokio::test]
    async fn launch_kills_on_timeout() {
        let workdir = TempDir::new().unwrap();
        let launcher = ForkedLauncher::new("sh");

        let mut req = request(&workdir, &["-c", "sleep 30"]);
        req.timeout = Duration::from_millis(200);

        let err = launcher.launch(req).await.unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
    }

    #[tokio::test]
    async fn launch_missing_binary_fails() {
        let workdir = TempDir::new().unwrap();
        let launcher = ForkedLauncher::new("definitely-not-a-real-binary");

        let err = launcher.launch(request(&workdir, &[])).await.unwrap_err();
        assert!(matches!(err, Error::Launch(_)));
    }

    #[tokio::test]
    async fn version_returns_first_line() {
        // `sh --version` is not portable; use a tiny script instead.
        let bin_dir = TempDir::new().unwrap();
        let bin = bin_dir.path().join("fake-tool");
        std::fs::write(&bin, "#!/bin/sh\necho \"Fake Tool 1.2.3\"\necho extra\n").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&bin, std::fs::Permissions::from_mode(0o755)).unwrap();
        }

        let launcher = ForkedLauncher::new(bin.to_string_lossy().to_string());
        let version = launcher.version().await.unwrap();
        assert_eq!(version, "Fake Tool 1.2.3");
    }
}
