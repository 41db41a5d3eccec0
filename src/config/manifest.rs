/// Decoded test manifest: groups of test points and their per-point limits
use crate::config::types::{HarnessError, Result, TestPointId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Dependency sentinel meaning "no prerequisite"
pub const NO_DEPENDENCY: TestPointId = 0;

/// Limits and dependency of one test point
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct TestPointDescriptor {
    #[serde(rename = "ID")]
    pub id: TestPointId,
    /// CPU time in milliseconds
    pub time_limit: u64,
    /// Address space in bytes
    pub memory_limit: u64,
    /// Output file size in bytes. A negative value requests a playground reset
    /// before the point runs; the magnitude is the limit.
    pub disk_limit: i64,
    /// Open file descriptors
    pub file_number_limit: u64,
    #[serde(default)]
    pub dependency: TestPointId,
}

/// Named, ordered list of test points sharing one playground
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TestGroup {
    #[serde(rename = "GroupName", alias = "Name")]
    pub name: String,
    #[serde(rename = "TestPoints")]
    pub test_points: Vec<TestPointId>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Manifest {
    #[serde(default)]
    pub groups: Vec<TestGroup>,
    #[serde(default)]
    pub details: Vec<TestPointDescriptor>,
    #[serde(skip)]
    index: HashMap<TestPointId, usize>,
}

impl Manifest {
    pub fn new(groups: Vec<TestGroup>, details: Vec<TestPointDescriptor>) -> Self {
        let mut manifest = Self {
            groups,
            details,
            index: HashMap::new(),
        };
        manifest.rebuild_index();
        manifest
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            HarnessError::Manifest(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let mut manifest: Manifest = serde_json::from_str(&content).map_err(|e| {
            HarnessError::Manifest(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        manifest.rebuild_index();
        Ok(manifest)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let mut manifest: Manifest = serde_json::from_str(content)
            .map_err(|e| HarnessError::Manifest(format!("Failed to parse manifest: {}", e)))?;
        manifest.rebuild_index();
        Ok(manifest)
    }

    // First occurrence wins when an ID is listed twice.
    fn rebuild_index(&mut self) {
        self.index.clear();
        for (pos, detail) in self.details.iter().enumerate() {
            self.index.entry(detail.id).or_insert(pos);
        }
    }

    pub fn group(&self, name: &str) -> Option<&TestGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    pub fn descriptor(&self, id: TestPointId) -> Option<&TestPointDescriptor> {
        self.index.get(&id).map(|&pos| &self.details[pos])
    }

    /// Unresolved references reachable from the given groups: listed IDs
    /// without details and dependencies of listed IDs without details.
    pub fn configuration_gaps_for<'a, I>(&self, groups: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a TestGroup>,
    {
        let mut gaps = Vec::new();
        for group in groups {
            for &id in &group.test_points {
                match self.descriptor(id) {
                    None => gaps.push(format!(
                        "group '{}' lists test point {} which has no details entry",
                        group.name, id
                    )),
                    Some(detail)
                        if detail.dependency != NO_DEPENDENCY
                            && self.descriptor(detail.dependency).is_none() =>
                    {
                        gaps.push(format!(
                            "test point {} depends on unknown test point {}",
                            id, detail.dependency
                        ))
                    }
                    Some(_) => {}
                }
            }
        }
        gaps
    }
}
