/// Per-group playground directories
///
/// One directory per group under a scratch root. Created fresh at group start
/// and wiped again before any test point whose disk limit is negative.
use crate::config::types::{HarnessError, Result, TestPointId};
use std::fs;
use std::path::{Path, PathBuf};

/// Artifacts the harness leaves in a playground for each test point
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Artifact {
    /// Standard output of the program under test
    Output,
    /// Standard error of the program under test
    Error,
    /// Discrepancies against the expected answer
    Diff,
    /// Program's own log when logging is enabled
    Log,
}

impl Artifact {
    pub fn extension(self) -> &'static str {
        match self {
            Artifact::Output => "out",
            Artifact::Error => "err",
            Artifact::Diff => "diff",
            Artifact::Log => "log",
        }
    }
}

/// Working directory owned by a single group's sequential execution
#[derive(Debug)]
pub struct Playground {
    group: String,
    dir: PathBuf,
}

impl Playground {
    /// Remove whatever is at `<root>/<group>` and create it empty.
    /// The root is made absolute so artifact paths stay valid from inside the playground.
    pub fn prepare(root: &Path, group: &str) -> Result<Self> {
        validate_group_name(group)?;
        let root = Self::ensure_root(root)?;
        let playground = Self {
            group: group.to_string(),
            dir: root.join(group),
        };
        playground.recreate()?;
        Ok(playground)
    }

    /// Create the scratch root if needed and return its absolute path
    pub fn ensure_root(root: &Path) -> Result<PathBuf> {
        fs::create_dir_all(root).map_err(|e| {
            HarnessError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to create playground root {}: {}", root.display(), e),
            ))
        })?;
        Ok(root.canonicalize()?)
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn artifact(&self, id: TestPointId, artifact: Artifact) -> PathBuf {
        self.dir.join(format!("{}.{}", id, artifact.extension()))
    }

    /// Negative `disk_limit_raw` wipes the playground now and yields the magnitude.
    /// Non-negative values pass through untouched.
    pub fn reset_if_requested(&self, disk_limit_raw: i64) -> Result<u64> {
        if disk_limit_raw < 0 {
            log::info!("resetting playground {}", self.dir.display());
            self.recreate()?;
        }
        Ok(disk_limit_raw.unsigned_abs())
    }

    fn recreate(&self) -> Result<()> {
        match fs::remove_dir_all(&self.dir) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(HarnessError::Filesystem(format!(
                    "Failed to remove playground {}: {}",
                    self.dir.display(),
                    e
                )))
            }
        }

        fs::create_dir_all(&self.dir).map_err(|e| {
            HarnessError::Io(std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to create playground directory {}: {}",
                    self.dir.display(),
                    e
                ),
            ))
        })
    }
}

/// Group names become a single path component under the scratch root
fn validate_group_name(group: &str) -> Result<()> {
    let bad = group.is_empty()
        || group == "."
        || group == ".."
        || group.contains('/')
        || group.contains('\0');
    if bad {
        return Err(HarnessError::Config(format!(
            "Group name {:?} cannot be used as a playground directory",
            group
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_root(tag: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("ojtest-playground-{}-{}", tag, uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_prepare_creates_group_directory() {
        let root = scratch_root("create");
        let playground = Playground::prepare(&root, "g1").unwrap();
        assert!(playground.dir().is_dir());
        assert!(playground.dir().is_absolute());
        assert_eq!(playground.dir(), root.canonicalize().unwrap().join("g1"));
        assert_eq!(playground.group(), "g1");
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn test_prepare_wipes_stale_contents() {
        let root = scratch_root("stale");
        fs::create_dir_all(root.join("g1/nested")).unwrap();
        fs::write(root.join("g1/nested/leftover"), b"x").unwrap();

        let playground = Playground::prepare(&root, "g1").unwrap();
        assert_eq!(fs::read_dir(playground.dir()).unwrap().count(), 0);
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn test_negative_disk_limit_resets_and_returns_magnitude() {
        let root = scratch_root("reset");
        let playground = Playground::prepare(&root, "g").unwrap();
        let artifact = playground.artifact(1, Artifact::Output);
        fs::write(&artifact, b"earlier").unwrap();

        assert_eq!(playground.reset_if_requested(-51_200).unwrap(), 51_200);
        assert!(!artifact.exists());
        assert!(playground.dir().is_dir());
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn test_non_negative_disk_limit_leaves_artifacts() {
        let root = scratch_root("keep");
        let playground = Playground::prepare(&root, "g").unwrap();
        let artifact = playground.artifact(1, Artifact::Error);
        fs::write(&artifact, b"kept").unwrap();

        assert_eq!(playground.reset_if_requested(4096).unwrap(), 4096);
        assert_eq!(playground.reset_if_requested(0).unwrap(), 0);
        assert!(artifact.exists());
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn test_artifacts_are_named_by_test_point() {
        let root = scratch_root("names");
        let playground = Playground::prepare(&root, "g").unwrap();
        let dir = playground.dir();
        assert_eq!(playground.artifact(7, Artifact::Output), dir.join("7.out"));
        assert_eq!(playground.artifact(7, Artifact::Error), dir.join("7.err"));
        assert_eq!(playground.artifact(7, Artifact::Diff), dir.join("7.diff"));
        assert_eq!(playground.artifact(7, Artifact::Log), dir.join("7.log"));
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn test_uncreatable_root_is_an_error() {
        let root = scratch_root("file-root");
        fs::create_dir_all(&root).unwrap();
        let blocker = root.join("not-a-dir");
        fs::write(&blocker, b"x").unwrap();
        assert!(Playground::ensure_root(&blocker.join("playground")).is_err());
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn test_path_like_group_names_are_rejected() {
        let root = scratch_root("names-bad");
        for name in ["", ".", "..", "a/b", "../escape"] {
            assert!(Playground::prepare(&root, name).is_err(), "{:?}", name);
        }
        let _ = fs::remove_dir_all(&root);
    }
}
