//! Host lifecycle state as reported by `rs_state --type=run`.

use crate::command::{command_line, CommandRunner};
use crate::error::{LvStackError, LvStackResult};
use log::info;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

const RUN_STATE_ARGS: &[&str] = &["--type=run"];

/// Closed set of lifecycle phases a host can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub enum RunState {
    Booting,
    BootingReboot,
    Operational,
    Stranded,
    ShuttingDownReboot,
    ShuttingDownTerminate,
    ShuttingDownStop,
}

impl RunState {
    pub const ALL: [RunState; 7] = [
        RunState::Booting,
        RunState::BootingReboot,
        RunState::Operational,
        RunState::Stranded,
        RunState::ShuttingDownReboot,
        RunState::ShuttingDownTerminate,
        RunState::ShuttingDownStop,
    ];

    /// Literal token printed by the state utility.
    pub fn as_str(self) -> &'static str {
        match self {
            RunState::Booting => "booting",
            RunState::BootingReboot => "booting:reboot",
            RunState::Operational => "operational",
            RunState::Stranded => "stranded",
            RunState::ShuttingDownReboot => "shutting-down:reboot",
            RunState::ShuttingDownTerminate => "shutting-down:terminate",
            RunState::ShuttingDownStop => "shutting-down:stop",
        }
    }

    pub fn is_booting(self) -> bool {
        matches!(self, RunState::Booting | RunState::BootingReboot)
    }

    pub fn is_shutting_down(self) -> bool {
        matches!(
            self,
            RunState::ShuttingDownReboot
                | RunState::ShuttingDownTerminate
                | RunState::ShuttingDownStop
        )
    }

    /// The host is going away for good, so its storage will not be reattached.
    pub fn is_terminating(self) -> bool {
        self == RunState::ShuttingDownTerminate
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<RunState> for String {
    fn from(state: RunState) -> Self {
        state.as_str().to_string()
    }
}

impl FromStr for RunState {
    type Err = LvStackError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        RunState::ALL
            .into_iter()
            .find(|state| state.as_str() == value)
            .ok_or_else(|| LvStackError::Query(format!("unrecognized run state {value:?}")))
    }
}

/// Queries the host's current lifecycle state.
pub struct RunStateQuery<'a, R: ?Sized> {
    runner: &'a R,
    program: &'a str,
}

impl<'a, R> RunStateQuery<'a, R>
where
    R: CommandRunner + ?Sized,
{
    pub fn new(runner: &'a R, program: &'a str) -> Self {
        Self { runner, program }
    }

    /// Run the state utility once and map its output onto `RunState`.
    ///
    /// Any failure is an error; there is no fallback state.
    pub fn current_state(&self) -> LvStackResult<RunState> {
        let line = command_line(self.program, RUN_STATE_ARGS);
        let output = self
            .runner
            .run(self.program, RUN_STATE_ARGS)
            .map_err(|err| LvStackError::Query(format!("unable to run `{line}`: {err}")))?;
        if !output.success() {
            return Err(LvStackError::Query(format!(
                "`{line}` exited with code {}: {}",
                output.status,
                output.diagnostic()
            )));
        }

        let state: RunState = output.stdout.trim_end().parse()?;
        info!("the host run state is: {state}");
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::fake::ScriptedRunner;
    use crate::command::CommandOutput;

    fn query_with(output: CommandOutput) -> LvStackResult<RunState> {
        let runner = ScriptedRunner::default().respond("rs_state --type=run", output);
        RunStateQuery::new(&runner, "rs_state").current_state()
    }

    #[test]
    fn operational_token_parses() {
        let state = query_with(CommandOutput::new("operational\n", "", 0)).unwrap();
        assert_eq!(state, RunState::Operational);
    }

    #[test]
    fn unknown_token_is_a_query_error() {
        let err = query_with(CommandOutput::new("unknown-state\n", "", 0)).unwrap_err();
        assert!(matches!(err, LvStackError::Query(_)), "{err:?}");
    }

    #[test]
    fn leading_garbage_is_not_trimmed_away() {
        let err = query_with(CommandOutput::new(" operational", "", 0)).unwrap_err();
        assert!(matches!(err, LvStackError::Query(_)), "{err:?}");
    }

    #[test]
    fn failing_utility_is_a_query_error() {
        let err = query_with(CommandOutput::new("", "rs_state: not found", 127)).unwrap_err();
        assert!(err.to_string().contains("exited with code 127"), "{err}");
    }

    #[test]
    fn missing_utility_is_a_query_error() {
        let runner = ScriptedRunner::default();
        let err = RunStateQuery::new(&runner, "rs_state")
            .current_state()
            .unwrap_err();
        assert!(matches!(err, LvStackError::Query(_)), "{err:?}");
    }

    #[test]
    fn tokens_round_trip() {
        for state in RunState::ALL {
            assert_eq!(state.to_string().parse::<RunState>().unwrap(), state);
        }
        assert_eq!(
            "shutting-down:terminate".parse::<RunState>().unwrap(),
            RunState::ShuttingDownTerminate
        );
    }

    #[test]
    fn predicates_partition_states() {
        assert!(RunState::BootingReboot.is_booting());
        assert!(RunState::ShuttingDownStop.is_shutting_down());
        assert!(!RunState::Operational.is_shutting_down());
        assert!(RunState::ShuttingDownTerminate.is_terminating());
        assert!(!RunState::ShuttingDownReboot.is_terminating());
    }
}
