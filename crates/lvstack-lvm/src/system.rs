//! System-backed `GroupProvider` implementation.

use crate::parse::{looks_like_lvm_name, members_of, parse_names, PV_SEPARATOR};
use log::debug;
use lvstack_core::command::command_line;
use lvstack_core::{
    CommandOutput, CommandRunner, LvStackConfig, LvStackError, LvStackResult, SystemCommandRunner,
    ToolSet,
};
use lvstack_provider::{GroupProvider, LayeredGroup};

/// Provider that inspects volume groups via the host LVM report commands.
#[derive(Debug, Clone)]
pub struct SystemLvmProvider<R = SystemCommandRunner> {
    runner: R,
    vgs: String,
    lvs: String,
    pvs: String,
}

impl SystemLvmProvider<SystemCommandRunner> {
    /// Build a provider from configuration, resolving the report binaries.
    pub fn from_config(config: &LvStackConfig) -> LvStackResult<Self> {
        let tools = ToolSet::resolve(config)?;
        Ok(Self::with_runner(
            SystemCommandRunner::new(config.command_timeout()),
            &tools,
        ))
    }
}

impl<R> SystemLvmProvider<R>
where
    R: CommandRunner,
{
    pub fn with_runner(runner: R, tools: &ToolSet) -> Self {
        Self {
            runner,
            vgs: tools.vgs.clone(),
            lvs: tools.lvs.clone(),
            pvs: tools.pvs.clone(),
        }
    }

    fn group_exists(&self, name: &str) -> LvStackResult<bool> {
        let args = ["--noheadings", "--options", "vg_name", name];
        let out = self.run(&self.vgs, &args)?;
        if out.success() {
            return Ok(parse_names(&out.stdout).iter().any(|vg| vg == name));
        }

        if reports_group_absent(&out, name) {
            debug!(
                "{} reports volume group '{name}' absent: {}",
                self.vgs,
                out.diagnostic()
            );
            return Ok(false);
        }

        Err(report_failure(&self.vgs, &args, &out))
    }

    fn unit_names(&self, group: &str) -> LvStackResult<Vec<String>> {
        let args = ["--noheadings", "--options", "lv_name", group];
        let out = self.run(&self.lvs, &args)?;
        if !out.success() {
            return Err(report_failure(&self.lvs, &args, &out));
        }
        Ok(parse_names(&out.stdout))
    }

    fn member_names(&self, group: &str) -> LvStackResult<Vec<String>> {
        let args = [
            "--noheadings",
            "--separator",
            PV_SEPARATOR,
            "--options",
            "pv_name,vg_name",
        ];
        let out = self.run(&self.pvs, &args)?;
        if !out.success() {
            return Err(report_failure(&self.pvs, &args, &out));
        }
        Ok(members_of(&out.stdout, group))
    }

    fn run(&self, program: &str, args: &[&str]) -> LvStackResult<CommandOutput> {
        self.runner.run(program, args).map_err(|err| {
            LvStackError::Provider(format!(
                "unable to run `{}`: {err}",
                command_line(program, args)
            ))
        })
    }
}

impl<R> GroupProvider for SystemLvmProvider<R>
where
    R: CommandRunner,
{
    type Error = LvStackError;

    fn group(&self, name: &str) -> LvStackResult<Option<LayeredGroup>> {
        if !looks_like_lvm_name(name) {
            return Err(LvStackError::InvalidConfig(format!(
                "`{name}` is not a valid volume group name"
            )));
        }

        if !self.group_exists(name)? {
            return Ok(None);
        }

        let units = self.unit_names(name)?;
        let members = self.member_names(name)?;
        Ok(Some(LayeredGroup::new(name, units, members)))
    }
}

/// True only for LVM's own absence message about `name`. Any other
/// diagnostic, even one mentioning "not found", stays a failure.
fn reports_group_absent(out: &CommandOutput, name: &str) -> bool {
    let absent = format!("Volume group \"{name}\" not found");
    out.stderr
        .lines()
        .chain(out.stdout.lines())
        .any(|line| line.trim() == absent)
}

fn report_failure(program: &str, args: &[&str], out: &CommandOutput) -> LvStackError {
    let line = command_line(program, args);
    let diagnostic = out.diagnostic();
    let lower = diagnostic.to_ascii_lowercase();
    let diagnostic = if diagnostic.is_empty() {
        "no additional output".to_string()
    } else {
        diagnostic
    };

    if lower.contains("permission denied")
        || lower.contains("operation not permitted")
        || lower.contains("must be root")
    {
        return LvStackError::Provider(format!(
            "`{line}` was refused: {diagnostic}. LVM inspection usually requires root (exit code {})",
            out.status
        ));
    }

    LvStackError::Provider(format!(
        "`{line}` failed: {diagnostic} (exit code {})",
        out.status
    ))
}
