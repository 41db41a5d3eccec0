use crate::config::manifest::Manifest;
use crate::config::types::HarnessConfig;
use crate::exec::executor::SandboxedExecutor;
use crate::judge::runner::{GroupSelection, Judge, RunContext, RunOptions};
use crate::observability::events;
use crate::safety::integrity;
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Exit code for failures before any test point runs
pub const EXIT_STARTUP_FAILURE: i32 = 2;

#[derive(Parser, Debug)]
#[command(name = "ojtest", author, version, about, long_about = None)]
pub struct Cli {
    /// Group to run; every group in manifest order when omitted
    pub group: Option<String>,
    /// Skip checksum verification of the test data
    #[arg(long)]
    pub skip_check: bool,
    /// Run the first test point of each invoked group even if its dependency is unmet
    #[arg(long)]
    pub ignore_first_dependency: bool,
    /// Pass `-l <ID>.log --level <level>` to the program under test
    #[arg(long)]
    pub enable_tested_program_logging: bool,
    /// JSON configuration file; command-line flags override it
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
    /// Directory holding <ID>.in and <ID>.out
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,
    /// Test manifest (default: <data-dir>/config.json)
    #[arg(long, value_name = "PATH")]
    pub manifest: Option<PathBuf>,
    /// Checksum listing (default: <data-dir>/checksum.sha256)
    #[arg(long, value_name = "PATH")]
    pub checksum_file: Option<PathBuf>,
    /// Scratch root for per-group playgrounds
    #[arg(long, value_name = "DIR")]
    pub playground_root: Option<PathBuf>,
    /// Program under test
    #[arg(long, value_name = "PATH")]
    pub program: Option<PathBuf>,
    /// Extra argument for the program under test (repeatable)
    #[arg(long = "program-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub program_args: Vec<String>,
    /// Level passed to the program when logging is enabled
    #[arg(long, value_name = "LEVEL")]
    pub program_log_level: Option<String>,
    /// Kill the program this many ms after its time limit (off by default)
    #[arg(long, value_name = "MS")]
    pub supervise_grace_ms: Option<u64>,
    /// Fail on unknown groups and dependencies instead of skipping them
    #[arg(long)]
    pub strict: bool,
    /// Write a JSON run report to this path
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,
    /// Harness log filter when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Cli {
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            ignore_first_dependency: self.ignore_first_dependency,
            enable_program_logging: self.enable_tested_program_logging,
        }
    }

    /// Defaults, then the `--config` file, then flags
    pub fn build_config(&self) -> Result<HarnessConfig> {
        let mut config = match &self.config {
            Some(path) => HarnessConfig::load_from_file(path)?,
            None => HarnessConfig::default(),
        };

        if let Some(dir) = &self.data_dir {
            config.data_root = dir.clone();
        }
        if let Some(path) = &self.manifest {
            config.manifest_path = Some(path.clone());
        }
        if let Some(path) = &self.checksum_file {
            config.checksum_path = Some(path.clone());
        }
        if let Some(dir) = &self.playground_root {
            config.playground_root = dir.clone();
        }
        if let Some(program) = &self.program {
            config.program = program.clone();
        }
        if !self.program_args.is_empty() {
            config.program_args = self.program_args.clone();
        }
        if let Some(level) = &self.program_log_level {
            config.program_log_level = level.clone();
        }
        if let Some(ms) = self.supervise_grace_ms {
            config.supervise_grace = Some(Duration::from_millis(ms));
        }
        if self.strict {
            config.strict = true;
        }

        Ok(config)
    }
}

fn init_logging(default_filter: &str) {
    // A second init (tests, embedding) is harmless.
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .try_init();
}

fn check_integrity(config: &HarnessConfig, run_id: &str) {
    let checksum_path = config.checksum_path();
    match integrity::verify_checksums(&checksum_path, &config.data_root) {
        Ok(report) => {
            if report.is_clean() {
                log::info!("integrity check passed ({} files)", report.verified);
            } else {
                log::error!(
                    "integrity check failed: {} mismatched, {} missing, {} malformed line(s); continuing",
                    report.mismatched.len(),
                    report.missing.len(),
                    report.malformed_lines.len()
                );
            }
            events::integrity_checked(run_id, &report);
        }
        Err(e) => log::error!("integrity check failed: {}; continuing", e),
    }
}

/// Parse the command line and run; returns the process exit code
pub fn run() -> Result<i32> {
    run_with(Cli::parse())
}

pub fn run_with(cli: Cli) -> Result<i32> {
    init_logging(&cli.log_level);

    let config = cli.build_config()?;
    let manifest_path = config.manifest_path();
    let manifest = Manifest::load_from_file(&manifest_path)
        .with_context(|| format!("loading manifest {}", manifest_path.display()))?;
    let executor = SandboxedExecutor::from_config(&config).context("resolving program under test")?;
    log::debug!("program under test: {}", executor.program().display());

    let mut ctx = RunContext::new();
    if cli.skip_check {
        log::info!("integrity check skipped");
    } else {
        check_integrity(&config, ctx.run_id());
    }

    let judge = Judge::new(&config, &manifest, executor);
    let selection = GroupSelection::from_arg(cli.group.clone());
    judge.run_in(&mut ctx, &selection, &cli.run_options())?;

    let report = ctx.into_report();
    for result in &report.results {
        println!("{:<4} {}/{}", result.status, result.group, result.id);
    }
    println!("{}", report.summary());
    if let Some(path) = &cli.report {
        if let Err(e) = report.write_json(path) {
            log::error!("{}", e);
        }
    }

    Ok(report.exit_code())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_are_order_independent() {
        let a = Cli::try_parse_from([
            "ojtest",
            "--skip-check",
            "g1",
            "--ignore-first-dependency",
            "--enable-tested-program-logging",
        ])
        .unwrap();
        let b = Cli::try_parse_from([
            "ojtest",
            "--enable-tested-program-logging",
            "--ignore-first-dependency",
            "g1",
            "--skip-check",
        ])
        .unwrap();

        for cli in [a, b] {
            assert_eq!(cli.group.as_deref(), Some("g1"));
            assert!(cli.skip_check);
            assert_eq!(
                cli.run_options(),
                RunOptions {
                    ignore_first_dependency: true,
                    enable_program_logging: true,
                }
            );
        }
    }

    #[test]
    fn test_no_positional_means_all_groups() {
        let cli = Cli::try_parse_from(["ojtest"]).unwrap();
        assert_eq!(GroupSelection::from_arg(cli.group), GroupSelection::All);
    }

    #[test]
    fn test_two_positionals_are_rejected() {
        assert!(Cli::try_parse_from(["ojtest", "g1", "g2"]).is_err());
    }

    #[test]
    fn test_flags_override_config_file() {
        let path = std::env::temp_dir().join(format!("ojtest-cli-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(
            &path,
            r#"{"data_root": "/from/file", "program": "/from/file/code", "supervise_grace": 100}"#,
        )
        .unwrap();

        let cli = Cli::try_parse_from([
            "ojtest",
            "--config",
            path.to_str().unwrap(),
            "--data-dir",
            "/from/flag",
            "--program-arg",
            "-O2",
            "--strict",
        ])
        .unwrap();
        let config = cli.build_config().unwrap();

        assert_eq!(config.data_root, PathBuf::from("/from/flag"));
        assert_eq!(config.program, PathBuf::from("/from/file/code"));
        assert_eq!(config.program_args, vec!["-O2".to_string()]);
        assert_eq!(config.supervise_grace, Some(Duration::from_millis(100)));
        assert!(config.strict);
        let _ = std::fs::remove_file(&path);
    }
}
