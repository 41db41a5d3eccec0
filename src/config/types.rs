/// Core types shared across the harness: configuration and error taxonomy
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Identifier of a single test point. `0` is reserved as the "no dependency" sentinel.
pub type TestPointId = u32;

/// Verbosity passed to the program under test when logging is enabled
pub const DEFAULT_PROGRAM_LOG_LEVEL: &str = "debug";

/// Harness configuration
///
/// Layered as defaults, then an optional JSON file, then command-line flags.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Directory holding `<ID>.in` / `<ID>.out` pairs
    pub data_root: PathBuf,
    /// Test manifest; `<data_root>/config.json` when unset
    pub manifest_path: Option<PathBuf>,
    /// sha256sum-format checksum listing; `<data_root>/checksum.sha256` when unset
    pub checksum_path: Option<PathBuf>,
    /// Scratch root under which one playground per group is created
    pub playground_root: PathBuf,
    /// Program under test
    pub program: PathBuf,
    /// Leading arguments passed before any logging arguments
    pub program_args: Vec<String>,
    /// Level passed as `--level` to the program when logging is enabled
    pub program_log_level: String,
    /// Grace added to a test point's time limit before the supervisor kills the child.
    /// `None` leaves enforcement to the kernel only.
    #[serde(with = "optional_millis")]
    pub supervise_grace: Option<Duration>,
    /// Surface unknown groups and dependencies as errors instead of skipping silently
    pub strict: bool,
}

impl HarnessConfig {
    /// Runtime root directory scoped by effective UID.
    /// Keeps concurrent harness runs of different users from sharing playgrounds.
    pub fn runtime_root_dir() -> PathBuf {
        let euid = unsafe { libc::geteuid() };
        std::env::temp_dir().join(format!("ojtest-uid-{}", euid))
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.manifest_path
            .clone()
            .unwrap_or_else(|| self.data_root.join("config.json"))
    }

    pub fn checksum_path(&self) -> PathBuf {
        self.checksum_path
            .clone()
            .unwrap_or_else(|| self.data_root.join("checksum.sha256"))
    }

    /// Input file for a test point
    pub fn input_path(&self, id: TestPointId) -> PathBuf {
        self.data_root.join(format!("{}.in", id))
    }

    /// Pre-recorded expected answer for a test point
    pub fn answer_path(&self, id: TestPointId) -> PathBuf {
        self.data_root.join(format!("{}.out", id))
    }

    /// Load a configuration file, filling missing fields with defaults
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            HarnessError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        serde_json::from_str(&content).map_err(|e| {
            HarnessError::Config(format!(
                "Failed to parse config file {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Resolve the program under test to an absolute path.
    /// The child runs inside the playground, so relative paths would otherwise break.
    pub fn resolve_program(&self) -> Result<PathBuf> {
        let resolved = self.program.canonicalize().map_err(|e| {
            HarnessError::Config(format!(
                "Program under test {} is not usable: {}",
                self.program.display(),
                e
            ))
        })?;

        if !resolved.is_file() {
            return Err(HarnessError::Config(format!(
                "Program under test {} is not a regular file",
                resolved.display()
            )));
        }

        Ok(resolved)
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("test/data"),
            manifest_path: None,
            checksum_path: None,
            playground_root: Self::runtime_root_dir().join("playground"),
            program: PathBuf::from("build/code"),
            program_args: Vec::new(),
            program_log_level: DEFAULT_PROGRAM_LOG_LEVEL.to_string(),
            supervise_grace: None,
            strict: false,
        }
    }
}

mod optional_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        value.map(|d| d.as_millis() as u64).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_millis))
    }
}

/// Error taxonomy for the harness
#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Manifest error: {0}")]
    Manifest(String),

    /// A group or dependency referenced by the manifest or invocation does not exist
    #[error("Configuration gap: {0}")]
    ConfigurationGap(String),

    #[error("Integrity error: {0}")]
    Integrity(String),

    #[error("Process error: {0}")]
    Process(String),

    #[error("Filesystem error: {0}")]
    Filesystem(String),
}

/// Result type for harness operations
pub type Result<T> = std::result::Result<T, HarnessError>;
