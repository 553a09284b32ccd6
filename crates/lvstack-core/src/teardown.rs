//! Ordered removal of an LVM stack: logical volumes, then the volume group,
//! then the physical volumes that backed it.

use crate::command::{run_checked, CommandFailure, CommandRunner};
use crate::error::{LvStackError, LvStackResult};
use crate::naming::mapper_device_path;
use crate::tools::ToolSet;
use log::{debug, info, warn};
use lvstack_provider::GroupProvider;
use serde::Serialize;
use std::fmt;

/// Teardown phases, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum TeardownStage {
    Units,
    Group,
    Members,
}

impl fmt::Display for TeardownStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TeardownStage::Units => "Units",
            TeardownStage::Group => "Group",
            TeardownStage::Members => "Members",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageFailure {
    pub stage: TeardownStage,
    pub failure: CommandFailure,
}

/// Aggregate of every command that failed during one teardown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeardownError {
    pub group: String,
    /// Last stage that was attempted.
    pub reached: TeardownStage,
    pub failures: Vec<StageFailure>,
    /// What was removed before and despite the failures.
    pub report: TeardownReport,
}

impl TeardownError {
    /// Distinct stages with at least one failure, in execution order.
    pub fn stages(&self) -> Vec<TeardownStage> {
        let mut stages: Vec<TeardownStage> = self.failures.iter().map(|f| f.stage).collect();
        stages.sort();
        stages.dedup();
        stages
    }

    /// Names of the entities that failed during `stage`.
    pub fn failed_targets(&self, stage: TeardownStage) -> Vec<&str> {
        self.failures
            .iter()
            .filter(|f| f.stage == stage)
            .map(|f| f.failure.target.as_str())
            .collect()
    }
}

impl fmt::Display for TeardownError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "teardown of volume group `{}` failed (reached {} stage)",
            self.group, self.reached
        )?;
        for entry in &self.failures {
            write!(
                f,
                "; {} `{}`: {}",
                entry.stage, entry.failure.target, entry.failure
            )?;
        }
        Ok(())
    }
}

impl std::error::Error for TeardownError {}

/// What a teardown call actually removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeardownReport {
    pub group: String,
    /// `false` when the group was already absent and nothing ran.
    pub found: bool,
    pub removed_units: Vec<String>,
    pub group_removed: bool,
    pub removed_members: Vec<String>,
}

impl TeardownReport {
    fn new(group: &str, found: bool) -> Self {
        Self {
            group: group.to_string(),
            found,
            removed_units: Vec::new(),
            group_removed: false,
            removed_members: Vec::new(),
        }
    }
}

/// Removes a volume group and everything attached to it.
///
/// Not safe to run concurrently against the same group; callers serialize.
pub struct StackTeardown<'a, R: ?Sized, P> {
    runner: &'a R,
    provider: &'a P,
    tools: &'a ToolSet,
    namespace: &'a str,
}

impl<'a, R, P> StackTeardown<'a, R, P>
where
    R: CommandRunner + ?Sized,
    P: GroupProvider,
    LvStackError: From<P::Error>,
{
    pub fn new(runner: &'a R, provider: &'a P, tools: &'a ToolSet, namespace: &'a str) -> Self {
        Self {
            runner,
            provider,
            tools,
            namespace,
        }
    }

    pub fn teardown(&self, group_name: &str) -> LvStackResult<TeardownReport> {
        let Some(group) = self.provider.group(group_name)? else {
            info!("volume group '{group_name}' is not found; nothing to remove");
            return Ok(TeardownReport::new(group_name, false));
        };

        let mut report = TeardownReport::new(group_name, true);
        let mut failures = Vec::new();

        for unit in &group.units {
            info!("removing logical volume '{}'", unit.name);
            let device = mapper_device_path(self.namespace, group_name, &unit.name);
            match self.remove(&unit.name, &self.tools.lvremove, &["--force", device.as_str()]) {
                Ok(()) => report.removed_units.push(unit.name.clone()),
                Err(failure) => failures.push(StageFailure {
                    stage: TeardownStage::Units,
                    failure,
                }),
            }
        }

        if !failures.is_empty() {
            warn!(
                "leaving volume group '{group_name}' in place: {} logical volume(s) could not be removed",
                failures.len()
            );
            return Err(TeardownError {
                group: group_name.to_string(),
                reached: TeardownStage::Units,
                failures,
                report,
            }
            .into());
        }

        info!("removing volume group '{group_name}'");
        let mut reached = TeardownStage::Group;
        match self.remove(group_name, &self.tools.vgremove, &[group_name]) {
            Ok(()) => report.group_removed = true,
            Err(failure) => failures.push(StageFailure {
                stage: TeardownStage::Group,
                failure,
            }),
        }

        // Members come from the snapshot taken before vgremove; the group can
        // no longer be asked for them.
        for member in &group.members {
            reached = TeardownStage::Members;
            info!("removing physical volume '{}'", member.name);
            match self.remove(&member.name, &self.tools.pvremove, &[member.name.as_str()]) {
                Ok(()) => report.removed_members.push(member.name.clone()),
                Err(failure) => failures.push(StageFailure {
                    stage: TeardownStage::Members,
                    failure,
                }),
            }
        }

        if failures.is_empty() {
            Ok(report)
        } else {
            Err(TeardownError {
                group: group_name.to_string(),
                reached,
                failures,
                report,
            }
            .into())
        }
    }

    fn remove(&self, target: &str, program: &str, args: &[&str]) -> Result<(), CommandFailure> {
        match run_checked(self.runner, target, program, args) {
            Ok(output) => {
                debug!("{program} output: {}", output.stdout.trim_end());
                Ok(())
            }
            Err(failure) => {
                warn!("failed to remove '{target}': {failure}");
                Err(failure)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_lists_stages_in_order_without_duplicates() {
        let failure = |target: &str| CommandFailure {
            target: target.to_string(),
            command: format!("pvremove {target}"),
            status: Some(5),
            diagnostic: String::new(),
        };
        let err = TeardownError {
            group: "vg1".into(),
            reached: TeardownStage::Members,
            failures: vec![
                StageFailure {
                    stage: TeardownStage::Members,
                    failure: failure("pv1"),
                },
                StageFailure {
                    stage: TeardownStage::Group,
                    failure: failure("vg1"),
                },
                StageFailure {
                    stage: TeardownStage::Members,
                    failure: failure("pv2"),
                },
            ],
            report: TeardownReport::new("vg1", true),
        };

        assert_eq!(
            err.stages(),
            vec![TeardownStage::Group, TeardownStage::Members]
        );
        assert_eq!(err.failed_targets(TeardownStage::Members), vec!["pv1", "pv2"]);
        let rendered = err.to_string();
        assert!(rendered.starts_with("teardown of volume group `vg1` failed (reached Members stage)"));
        assert!(rendered.contains("Members `pv2`: `pvremove pv2` exited with code 5"));
    }
}
