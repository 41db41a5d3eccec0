/// Process execution of the program under test with kernel-enforced limits
use crate::config::types::{HarnessConfig, HarnessError, Result};
use crate::exec::policy::SandboxPolicy;
use crate::exec::preexec;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs::File;
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// Everything the executor needs for one test point
#[derive(Clone, Debug)]
pub struct ExecutionRequest {
    pub policy: SandboxPolicy,
    /// Bound to the child's stdin
    pub stdin: PathBuf,
    /// Created (truncated) and bound to the child's stdout
    pub stdout: PathBuf,
    /// Created (truncated) and bound to the child's stderr
    pub stderr: PathBuf,
    /// Working directory of the child
    pub workdir: PathBuf,
    /// When set, `-l <path> --level <level>` is appended to the arguments
    pub log_file: Option<PathBuf>,
    /// Used only by the optional supervisor deadline
    pub time_limit: Duration,
}

/// How the child ended
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExitReport {
    pub exit_code: Option<i32>,
    /// Terminating signal, if the child did not exit normally
    pub signal: Option<i32>,
    pub wall_time_ms: u64,
    /// The supervisor deadline expired and the child was killed
    pub killed_by_supervisor: bool,
}

impl ExitReport {
    fn from_status(status: ExitStatus, killed_by_supervisor: bool, wall_time: Duration) -> Self {
        Self {
            exit_code: status.code(),
            signal: status.signal(),
            wall_time_ms: wall_time.as_millis() as u64,
            killed_by_supervisor,
        }
    }

    /// Zero exit status, not killed by the supervisor
    pub fn success(&self) -> bool {
        self.exit_code == Some(0) && !self.killed_by_supervisor
    }
}

/// Spawns the program under test, one test point at a time
#[derive(Clone, Debug)]
pub struct SandboxedExecutor {
    program: PathBuf,
    program_args: Vec<String>,
    log_level: String,
    supervise_grace: Option<Duration>,
}

impl SandboxedExecutor {
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            program_args: Vec::new(),
            log_level: crate::config::types::DEFAULT_PROGRAM_LOG_LEVEL.to_string(),
            supervise_grace: None,
        }
    }

    /// Build from configuration, resolving the program path.
    /// A missing program is a hard startup failure.
    pub fn from_config(config: &HarnessConfig) -> Result<Self> {
        Ok(Self::new(config.resolve_program()?)
            .with_args(config.program_args.clone())
            .with_log_level(config.program_log_level.clone())
            .with_supervisor(config.supervise_grace))
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.program_args = args;
        self
    }

    pub fn with_log_level(mut self, level: String) -> Self {
        self.log_level = level;
        self
    }

    /// Kill the child `grace` after its time limit. `None` disables the supervisor.
    pub fn with_supervisor(mut self, grace: Option<Duration>) -> Self {
        self.supervise_grace = grace;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Arguments passed after the program path
    pub fn arguments(&self, log_file: Option<&Path>) -> Vec<OsString> {
        let mut args: Vec<OsString> = self.program_args.iter().map(OsString::from).collect();
        if let Some(log_file) = log_file {
            args.push("-l".into());
            args.push(log_file.as_os_str().to_owned());
            args.push("--level".into());
            args.push(OsString::from(&self.log_level));
        }
        args
    }

    /// Run the program once and block until it exits
    pub fn execute(&self, request: &ExecutionRequest) -> Result<ExitReport> {
        let stdin = open_redirect(&request.stdin, "input", |p| File::open(p))?;
        let stdout = open_redirect(&request.stdout, "output", |p| File::create(p))?;
        let stderr = open_redirect(&request.stderr, "error", |p| File::create(p))?;

        let mut cmd = Command::new(&self.program);
        cmd.args(self.arguments(request.log_file.as_deref()))
            .current_dir(&request.workdir)
            .stdin(Stdio::from(stdin))
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr));

        let limits = request.policy.rlimits();
        for limit in &limits {
            log::debug!("{} soft={} hard={}", limit.name, limit.soft, limit.hard);
        }
        unsafe {
            cmd.pre_exec(move || preexec::apply_rlimits(&limits));
        }

        let start_time = Instant::now();
        let child = cmd.spawn().map_err(|e| {
            HarnessError::Process(format!(
                "Failed to start {}: {}",
                self.program.display(),
                e
            ))
        })?;
        log::debug!("spawned {} as pid {}", self.program.display(), child.id());

        let (status, killed) = match self.supervise_grace {
            None => (wait_blocking(child)?, false),
            Some(grace) => wait_with_deadline(child, request.time_limit + grace)?,
        };

        Ok(ExitReport::from_status(status, killed, start_time.elapsed()))
    }
}

fn open_redirect(
    path: &Path,
    role: &str,
    open: fn(&Path) -> std::io::Result<File>,
) -> Result<File> {
    open(path).map_err(|e| {
        HarnessError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to open {} file {}: {}", role, path.display(), e),
        ))
    })
}

fn wait_blocking(mut child: Child) -> Result<ExitStatus> {
    child
        .wait()
        .map_err(|e| HarnessError::Process(format!("Failed to wait for child: {}", e)))
}

fn wait_with_deadline(mut child: Child, deadline: Duration) -> Result<(ExitStatus, bool)> {
    let start = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok((status, false)),
            Ok(None) => {
                if start.elapsed() >= deadline {
                    log::warn!(
                        "pid {} exceeded supervisor deadline of {:?}, killing",
                        child.id(),
                        deadline
                    );
                    terminate_process(child.id());
                    return Ok((wait_blocking(child)?, true));
                }
                thread::sleep(Duration::from_millis(5));
            }
            Err(e) => {
                return Err(HarnessError::Process(format!(
                    "Process monitoring error: {}",
                    e
                )))
            }
        }
    }
}

fn terminate_process(pid: u32) {
    if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        // ESRCH: exited between try_wait and kill.
        log::debug!("kill({}) failed: {}", pid, e);
    }
}
