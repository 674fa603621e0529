//! Build Verifier CLI
//!
//! Runs every scenario file under a directory against a configured tool
//! binary and reports the results.

use std::path::PathBuf;

use build_verifier::{Harness, HarnessConfig, Scenario, ScenarioStatus};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <scenarios-dir>", args[0]);
        eprintln!("\nRuns every *.yaml scenario under the directory.");
        eprintln!("\nEnvironment variables:");
        eprintln!("  VERIFIER_TOOL      Tool binary under test (default: mvn)");
        eprintln!("  VERIFIER_FIXTURES  Fixture resource root (default: <scenarios-dir>/fixtures)");
        eprintln!("  VERIFIER_REPO      Local repository root (default: $HOME/.m2/repository)");
        eprintln!("  VERIFIER_KEEP=1    Keep working copies of passing scenarios too");
        std::process::exit(1);
    }

    let scenarios_dir = PathBuf::from(&args[1]);

    let tool_bin = std::env::var("VERIFIER_TOOL").unwrap_or_else(|_| "mvn".to_string());
    let fixture_root = std::env::var("VERIFIER_FIXTURES")
        .map(PathBuf::from)
        .unwrap_or_else(|_| scenarios_dir.join("fixtures"));
    let local_repo = std::env::var("VERIFIER_REPO")
        .map(PathBuf::from)
        .unwrap_or_else(|_| default_local_repo());
    let keep_all = std::env::var("VERIFIER_KEEP")
        .map(|v| v == "1" || v.to_lowercase() == "true")
        .unwrap_or(false);

    let config = HarnessConfig::new(tool_bin, fixture_root, local_repo)
        .with_keep_on_success(keep_all);

    let harness = match Harness::new(config) {
        Ok(harness) => harness,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let scenario_files = match collect_scenarios(&scenarios_dir) {
        Ok(files) => files,
        Err(e) => {
            eprintln!("Failed to list scenarios in {}: {}", scenarios_dir.display(), e);
            std::process::exit(1);
        }
    };

    if scenario_files.is_empty() {
        eprintln!("No *.yaml scenarios found under {}", scenarios_dir.display());
        std::process::exit(1);
    }

    let mut passed = 0usize;
    let mut failed = 0usize;
    let mut skipped = 0usize;

    for path in &scenario_files {
        let scenario = match Scenario::load(path) {
            Ok(scenario) => scenario,
            Err(e) => {
                eprintln!("Failed to load {}: {}", path.display(), e);
                failed += 1;
                continue;
            }
        };

        let report = harness.run_scenario(&scenario).await;

        match report.status {
            ScenarioStatus::Passed => passed += 1,
            ScenarioStatus::Failed => failed += 1,
            ScenarioStatus::Skipped => skipped += 1,
        }

        println!("\n{}", "=".repeat(60));
        println!("Scenario: {} [{:?}]", report.scenario, report.status);
        println!("{}", "=".repeat(60));
        for summary in &report.invocations {
            let mark = if summary.ok { "ok" } else { "FAILED" };
            println!("  step {} {} - {}", summary.step, mark, summary.detail);
        }
        for message in &report.messages {
            println!("  {}", message);
        }
        if let Some(workdir) = &report.workdir {
            if report.workdir_kept {
                println!("  workdir kept at {}", workdir.display());
            }
        }
    }

    println!("\n{}", "=".repeat(60));
    println!(
        "Scenarios: {} passed, {} failed, {} skipped",
        passed, failed, skipped
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

fn default_local_repo() -> PathBuf {
    match std::env::var("HOME") {
        Ok(home) => PathBuf::from(home).join(".m2/repository"),
        Err(_) => std::env::temp_dir().join("build-verifier-repo"),
    }
}

fn collect_scenarios(dir: &PathBuf) -> std::io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .map(|ext| ext == "yaml" || ext == "yml")
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    Ok(files)
}
