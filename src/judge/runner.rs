/// Orchestration: groups in order, test points in declared order
///
/// Per test point: dependency gate, optional playground reset, sandboxed run,
/// then comparison when the run exited cleanly. Failures of one test point
/// or one group's playground never abort the run.
use crate::config::manifest::{Manifest, TestGroup, TestPointDescriptor};
use crate::config::types::{HarnessConfig, HarnessError, Result, TestPointId};
use crate::exec::executor::{ExecutionRequest, SandboxedExecutor};
use crate::exec::policy::SandboxPolicy;
use crate::judge::ledger::DependencyLedger;
use crate::judge::report::RunReport;
use crate::observability::events;
use crate::safety::playground::{Artifact, Playground};
use crate::verdict::outcome::TestPointResult;
use crate::verdict::verifier;
use std::collections::HashSet;
use std::time::Duration;
use uuid::Uuid;

/// Which groups to run
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GroupSelection {
    /// Every group, in manifest order
    All,
    /// One group by name
    Named(String),
}

impl GroupSelection {
    pub fn from_arg(group: Option<String>) -> Self {
        match group {
            Some(name) => GroupSelection::Named(name),
            None => GroupSelection::All,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// The first test point of each invoked group runs regardless of its dependency
    pub ignore_first_dependency: bool,
    /// Pass `-l <ID>.log --level <level>` to the program under test
    pub enable_program_logging: bool,
}

/// State threaded through one invocation: the ledger and the aggregated report.
/// The ledger persists across groups, so later groups may depend on earlier ones.
#[derive(Debug)]
pub struct RunContext {
    ledger: DependencyLedger,
    report: RunReport,
}

impl RunContext {
    pub fn new() -> Self {
        Self {
            ledger: DependencyLedger::new(),
            report: RunReport::new(Uuid::new_v4().to_string()),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.report.run_id
    }

    pub fn ledger(&self) -> &DependencyLedger {
        &self.ledger
    }

    pub fn report(&self) -> &RunReport {
        &self.report
    }

    pub fn into_report(self) -> RunReport {
        self.report
    }

    fn record(&mut self, result: TestPointResult) {
        self.ledger.record(result.id, result.passed());
        events::test_point_recorded(self.run_id(), &result);
        match &result.detail {
            Some(detail) => log::info!(
                "[{}] test point {}: {} ({})",
                result.group,
                result.id,
                result.status,
                detail
            ),
            None => log::info!("[{}] test point {}: {}", result.group, result.id, result.status),
        }
        self.report.record(result);
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Judge<'a> {
    config: &'a HarnessConfig,
    manifest: &'a Manifest,
    executor: SandboxedExecutor,
}

impl<'a> Judge<'a> {
    pub fn new(
        config: &'a HarnessConfig,
        manifest: &'a Manifest,
        executor: SandboxedExecutor,
    ) -> Self {
        Self {
            config,
            manifest,
            executor,
        }
    }

    /// Run the selected groups in a fresh context
    pub fn run(&self, selection: &GroupSelection, options: &RunOptions) -> Result<RunReport> {
        let mut ctx = RunContext::new();
        self.run_in(&mut ctx, selection, options)?;
        Ok(ctx.into_report())
    }

    /// Run the selected groups, accumulating into an existing context
    pub fn run_in(
        &self,
        ctx: &mut RunContext,
        selection: &GroupSelection,
        options: &RunOptions,
    ) -> Result<()> {
        let groups = self.selected_groups(ctx.run_id(), selection)?;
        if self.config.strict {
            self.check_configuration(&groups)?;
        }
        Playground::ensure_root(&self.config.playground_root)?;

        let names: Vec<String> = groups.iter().map(|g| g.name.clone()).collect();
        events::run_start(ctx.run_id(), &names);

        for group in groups {
            self.run_group(ctx, group, options);
        }

        events::run_end(ctx.run_id(), ctx.report.passed(), ctx.report.failed());
        Ok(())
    }

    /// Every unresolved reference reachable from `groups`, as one error
    pub fn check_configuration(&self, groups: &[&TestGroup]) -> Result<()> {
        let gaps = self.manifest.configuration_gaps_for(groups.iter().copied());
        if gaps.is_empty() {
            return Ok(());
        }
        Err(HarnessError::ConfigurationGap(gaps.join("; ")))
    }

    fn selected_groups(
        &self,
        run_id: &str,
        selection: &GroupSelection,
    ) -> Result<Vec<&'a TestGroup>> {
        match selection {
            GroupSelection::All => Ok(self.manifest.groups.iter().collect()),
            GroupSelection::Named(name) => match self.manifest.group(name) {
                Some(group) => Ok(vec![group]),
                None if self.config.strict => Err(HarnessError::ConfigurationGap(format!(
                    "group '{}' is not defined in the manifest",
                    name
                ))),
                None => {
                    events::group_missing(run_id, name);
                    Ok(Vec::new())
                }
            },
        }
    }

    /// Prepare the group's playground and judge its test points in order.
    /// A playground that cannot be prepared fails every point of the group.
    pub fn run_group(
        &self,
        ctx: &mut RunContext,
        group: &TestGroup,
        options: &RunOptions,
    ) {
        let playground = Playground::prepare(&self.config.playground_root, &group.name);
        events::group_start(ctx.run_id(), &group.name, group.test_points.len());
        if let Err(e) = &playground {
            log::error!("[{}] playground unavailable: {}", group.name, e);
        }

        let mut seen = HashSet::new();
        for (position, &id) in group.test_points.iter().enumerate() {
            if !seen.insert(id) {
                log::warn!(
                    "[{}] test point {} listed more than once, ignoring repeat",
                    group.name,
                    id
                );
                continue;
            }
            let result = match &playground {
                Ok(playground) => self.run_test_point(ctx, playground, position, id, options),
                Err(e) => TestPointResult::internal_error(
                    &group.name,
                    id,
                    format!("playground unavailable: {}", e),
                ),
            };
            ctx.record(result);
        }
    }

    fn run_test_point(
        &self,
        ctx: &RunContext,
        playground: &Playground,
        position: usize,
        id: TestPointId,
        options: &RunOptions,
    ) -> TestPointResult {
        let group = playground.group();
        let Some(descriptor) = self.manifest.descriptor(id) else {
            return TestPointResult::internal_error(
                group,
                id,
                format!("test point {} has no details entry", id),
            );
        };

        let first_point_override = options.ignore_first_dependency && position == 0;
        if !first_point_override && !ctx.ledger.is_satisfied(descriptor.dependency) {
            return TestPointResult::skipped(group, id, descriptor.dependency);
        }

        match self.execute_and_verify(ctx.run_id(), playground, descriptor, options) {
            Ok(result) => result,
            Err(e) => {
                log::error!("[{}] test point {}: {}", group, id, e);
                TestPointResult::internal_error(group, id, e.to_string())
            }
        }
    }

    fn execute_and_verify(
        &self,
        run_id: &str,
        playground: &Playground,
        descriptor: &TestPointDescriptor,
        options: &RunOptions,
    ) -> Result<TestPointResult> {
        let id = descriptor.id;
        let group = playground.group();

        let disk_limit = playground.reset_if_requested(descriptor.disk_limit)?;
        if descriptor.disk_limit < 0 {
            events::playground_reset(run_id, group, id);
        }

        let request = ExecutionRequest {
            policy: SandboxPolicy::for_test_point(descriptor, disk_limit),
            stdin: self.config.input_path(id),
            stdout: playground.artifact(id, Artifact::Output),
            stderr: playground.artifact(id, Artifact::Error),
            workdir: playground.dir().to_path_buf(),
            log_file: options
                .enable_program_logging
                .then(|| playground.artifact(id, Artifact::Log)),
            time_limit: Duration::from_millis(descriptor.time_limit),
        };

        let exit = self.executor.execute(&request)?;
        if !exit.success() {
            return Ok(TestPointResult::executed(group, id, exit, None));
        }

        let matched = verifier::verify(
            &request.stdout,
            &self.config.answer_path(id),
            &playground.artifact(id, Artifact::Diff),
        )?;
        Ok(TestPointResult::executed(group, id, exit, Some(matched)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::manifest::NO_DEPENDENCY;
    use crate::verdict::outcome::TestPointStatus;
    use std::path::PathBuf;

    fn descriptor(id: TestPointId, dependency: TestPointId) -> TestPointDescriptor {
        TestPointDescriptor {
            id,
            time_limit: 1000,
            memory_limit: 1 << 20,
            disk_limit: 1024,
            file_number_limit: 16,
            dependency,
        }
    }

    fn fixture(strict: bool) -> (HarnessConfig, Manifest) {
        let mut config = HarnessConfig::default();
        config.strict = strict;
        config.playground_root =
            std::env::temp_dir().join(format!("ojtest-runner-{}", Uuid::new_v4()));
        let manifest = Manifest::new(
            vec![TestGroup {
                name: "g".to_string(),
                test_points: vec![1, 2],
            }],
            vec![descriptor(1, 99), descriptor(2, NO_DEPENDENCY)],
        );
        (config, manifest)
    }

    // /bin/false never gets to run in these tests: every point is skipped, unknown or lacks input.
    fn executor() -> SandboxedExecutor {
        SandboxedExecutor::new(PathBuf::from("/bin/false"))
    }

    #[test]
    fn test_group_selection_from_argument() {
        assert_eq!(GroupSelection::from_arg(None), GroupSelection::All);
        assert_eq!(
            GroupSelection::from_arg(Some("g1".into())),
            GroupSelection::Named("g1".into())
        );
    }

    #[test]
    fn test_unknown_group_is_a_silent_no_op_when_lenient() {
        let (config, manifest) = fixture(false);
        let judge = Judge::new(&config, &manifest, executor());
        let report = judge
            .run(&GroupSelection::Named("missing".into()), &RunOptions::default())
            .unwrap();
        assert!(report.results.is_empty());
        assert_eq!(report.exit_code(), 0);
        let _ = std::fs::remove_dir_all(&config.playground_root);
    }

    #[test]
    fn test_unknown_group_is_a_configuration_gap_when_strict() {
        let (config, mut manifest) = fixture(true);
        manifest.details[0].dependency = NO_DEPENDENCY;
        let judge = Judge::new(&config, &manifest, executor());
        let err = judge
            .run(&GroupSelection::Named("missing".into()), &RunOptions::default())
            .unwrap_err();
        assert!(matches!(err, HarnessError::ConfigurationGap(_)));
    }

    #[test]
    fn test_strict_mode_rejects_unknown_dependency_before_running() {
        let (config, manifest) = fixture(true);
        let judge = Judge::new(&config, &manifest, executor());
        let err = judge.run(&GroupSelection::All, &RunOptions::default()).unwrap_err();
        assert!(matches!(err, HarnessError::ConfigurationGap(ref m) if m.contains("99")));
        assert!(!config.playground_root.join("g").exists());
    }

    #[test]
    fn test_strict_mode_checks_only_the_selected_group() {
        let (config, manifest) = fixture(true);
        let manifest = Manifest::new(
            vec![
                TestGroup {
                    name: "clean".to_string(),
                    test_points: vec![2],
                },
                manifest.groups[0].clone(),
            ],
            manifest.details.clone(),
        );
        let judge = Judge::new(&config, &manifest, executor());

        let err = judge.run(&GroupSelection::All, &RunOptions::default()).unwrap_err();
        assert!(matches!(err, HarnessError::ConfigurationGap(_)));

        // No input data exists for point 2, so it is judged without being run.
        let report = judge
            .run(&GroupSelection::Named("clean".into()), &RunOptions::default())
            .unwrap();
        assert_eq!(report.results.len(), 1);
        assert_eq!(report.results[0].status, TestPointStatus::InternalError);
        let _ = std::fs::remove_dir_all(&config.playground_root);
    }

    #[test]
    fn test_unusable_group_name_fails_its_points_and_the_run_continues() {
        let (config, manifest) = fixture(false);
        let manifest = Manifest::new(
            vec![
                TestGroup {
                    name: "../escape".to_string(),
                    test_points: vec![2],
                },
                TestGroup {
                    name: "g".to_string(),
                    test_points: vec![1],
                },
            ],
            manifest.details.clone(),
        );
        let judge = Judge::new(&config, &manifest, executor());
        let report = judge.run(&GroupSelection::All, &RunOptions::default()).unwrap();

        assert_eq!(report.results.len(), 2);
        assert_eq!(report.results[0].status, TestPointStatus::InternalError);
        assert!(report.results[0]
            .detail
            .as_deref()
            .is_some_and(|d| d.contains("playground unavailable")));
        assert_eq!(report.results[1].status, TestPointStatus::Skipped);
        let _ = std::fs::remove_dir_all(&config.playground_root);
    }

    #[test]
    fn test_unmet_dependency_skips_without_executing() {
        let (config, manifest) = fixture(false);
        let manifest = Manifest::new(
            vec![TestGroup {
                name: "g".to_string(),
                test_points: vec![1],
            }],
            manifest.details.clone(),
        );
        let judge = Judge::new(&config, &manifest, executor());
        let report = judge.run(&GroupSelection::All, &RunOptions::default()).unwrap();

        assert_eq!(report.results.len(), 1);
        assert_eq!(report.results[0].status, TestPointStatus::Skipped);
        assert!(report.results[0].exit.is_none());
        assert!(!config.playground_root.join("g/1.out").exists());
        assert_eq!(report.exit_code(), 1);
        let _ = std::fs::remove_dir_all(&config.playground_root);
    }

    #[test]
    fn test_point_without_details_is_an_internal_error() {
        let (config, manifest) = fixture(false);
        let manifest = Manifest::new(
            vec![TestGroup {
                name: "g".to_string(),
                test_points: vec![7],
            }],
            manifest.details.clone(),
        );
        let judge = Judge::new(&config, &manifest, executor());
        let mut ctx = RunContext::new();
        judge
            .run_in(&mut ctx, &GroupSelection::All, &RunOptions::default())
            .unwrap();

        assert_eq!(ctx.report().results[0].status, TestPointStatus::InternalError);
        assert_eq!(ctx.ledger().outcome(7), Some(false));
        let _ = std::fs::remove_dir_all(&config.playground_root);
    }

    #[test]
    fn test_repeated_id_is_judged_once() {
        let (config, manifest) = fixture(false);
        let manifest = Manifest::new(
            vec![TestGroup {
                name: "g".to_string(),
                test_points: vec![1, 1],
            }],
            manifest.details.clone(),
        );
        let judge = Judge::new(&config, &manifest, executor());
        let report = judge.run(&GroupSelection::All, &RunOptions::default()).unwrap();
        assert_eq!(report.results.len(), 1);
        let _ = std::fs::remove_dir_all(&config.playground_root);
    }
}
