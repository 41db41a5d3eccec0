/// Dependency ledger: last known pass/fail per test point
use crate::config::manifest::NO_DEPENDENCY;
use crate::config::types::TestPointId;
use std::collections::HashMap;

#[derive(Clone, Debug)]
pub struct DependencyLedger {
    outcomes: HashMap<TestPointId, bool>,
}

impl DependencyLedger {
    /// Seeded with the "no dependency" sentinel as passed
    pub fn new() -> Self {
        let mut outcomes = HashMap::new();
        outcomes.insert(NO_DEPENDENCY, true);
        Self { outcomes }
    }

    /// Never-recorded IDs count as unmet
    pub fn is_satisfied(&self, dependency: TestPointId) -> bool {
        self.outcomes.get(&dependency).copied().unwrap_or(false)
    }

    /// Overwrites any earlier outcome for `id`
    pub fn record(&mut self, id: TestPointId, passed: bool) {
        self.outcomes.insert(id, passed);
    }

    pub fn outcome(&self, id: TestPointId) -> Option<bool> {
        self.outcomes.get(&id).copied()
    }
}

impl Default for DependencyLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_is_always_satisfied() {
        let ledger = DependencyLedger::new();
        assert!(ledger.is_satisfied(NO_DEPENDENCY));
    }

    #[test]
    fn test_unknown_dependency_is_unmet() {
        let ledger = DependencyLedger::new();
        assert!(!ledger.is_satisfied(99));
        assert_eq!(ledger.outcome(99), None);
    }

    #[test]
    fn test_record_overwrites() {
        let mut ledger = DependencyLedger::new();
        ledger.record(1, true);
        assert!(ledger.is_satisfied(1));
        ledger.record(1, false);
        assert!(!ledger.is_satisfied(1));
        assert_eq!(ledger.outcome(1), Some(false));
    }
}
