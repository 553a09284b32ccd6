//! Single entry point that bundles configuration, the command runner, and the
//! group provider for callers that need more than one component.

use crate::command::CommandRunner;
use crate::config::LvStackConfig;
use crate::error::{LvStackError, LvStackResult};
use crate::mounts::{MountEntry, MountInspector};
use crate::naming::mapper_device_path;
use crate::run_state::{RunState, RunStateQuery};
use crate::teardown::{StackTeardown, TeardownReport};
use crate::tools::ToolSet;
use log::warn;
use lvstack_provider::{GroupProvider, LayeredGroup};
use std::sync::Arc;

/// Result of a teardown gated on the host run state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatedTeardown {
    Completed(TeardownReport),
    /// The host was in a state the caller did not allow; nothing ran.
    Refused(RunState),
}

#[derive(Debug, Clone)]
pub struct StorageService<R, P> {
    config: Arc<LvStackConfig>,
    tools: ToolSet,
    runner: R,
    provider: P,
}

impl<R, P> StorageService<R, P>
where
    R: CommandRunner,
    P: GroupProvider,
    LvStackError: From<P::Error>,
{
    pub fn new(config: Arc<LvStackConfig>, tools: ToolSet, runner: R, provider: P) -> Self {
        Self {
            config,
            tools,
            runner,
            provider,
        }
    }

    pub fn config(&self) -> &LvStackConfig {
        &self.config
    }

    pub fn tools(&self) -> &ToolSet {
        &self.tools
    }

    pub fn mount_inspector(&self) -> MountInspector<'_, R> {
        MountInspector::new(&self.runner, &self.tools, self.config.mapper_namespace())
    }

    pub fn is_layered(&self, mount_point: &str) -> LvStackResult<bool> {
        self.mount_inspector().is_layered(mount_point)
    }

    /// `is_layered` for the configured `device.mount_point`.
    pub fn is_default_mount_layered(&self) -> LvStackResult<bool> {
        self.is_layered(&self.config.device.mount_point)
    }

    pub fn mount_entries(&self) -> LvStackResult<Vec<MountEntry>> {
        self.mount_inspector().entries()
    }

    pub fn teardown(&self, group: &str) -> LvStackResult<TeardownReport> {
        StackTeardown::new(
            &self.runner,
            &self.provider,
            &self.tools,
            self.config.mapper_namespace(),
        )
        .teardown(group)
    }

    /// Query the run state first and only tear down when it is in `allowed`.
    pub fn teardown_when(&self, group: &str, allowed: &[RunState]) -> LvStackResult<GatedTeardown> {
        let state = self.current_state()?;
        if !allowed.contains(&state) {
            warn!("not removing volume group '{group}' while the host is {state}");
            return Ok(GatedTeardown::Refused(state));
        }
        self.teardown(group).map(GatedTeardown::Completed)
    }

    pub fn current_state(&self) -> LvStackResult<RunState> {
        RunStateQuery::new(&self.runner, &self.tools.rs_state).current_state()
    }

    /// Composition of `group`; unlike teardown, absence is an error here.
    pub fn describe_group(&self, group: &str) -> LvStackResult<LayeredGroup> {
        self.provider
            .group(group)?
            .ok_or_else(|| LvStackError::GroupNotFound(group.to_string()))
    }

    pub fn device_path(&self, group: &str, unit: &str) -> String {
        mapper_device_path(self.config.mapper_namespace(), group, unit)
    }
}
