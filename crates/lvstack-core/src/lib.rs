#![forbid(unsafe_code)]

//! Core building blocks for inspecting and dismantling LVM-backed storage.
//!
//! Every component reaches the host through an injected `CommandRunner`, so
//! binaries wire in `SystemCommandRunner` while tests script the output.

pub mod command;
pub mod config;
pub mod error;
pub mod logging;
pub mod mounts;
pub mod naming;
pub mod run_state;
pub mod service;
pub mod teardown;
pub mod tools;

pub use command::{CommandFailure, CommandOutput, CommandRunner, SystemCommandRunner};
pub use config::{LvStackConfig, DEFAULT_CONFIG_PATH};
pub use error::{LvStackError, LvStackResult};
pub use lvstack_provider::{GroupProvider, LayeredGroup, Member, Unit};
pub use mounts::{MountEntry, MountInspector, MountParseError};
pub use naming::{escape, mapper_device_path, mapper_name};
pub use run_state::{RunState, RunStateQuery};
pub use service::{GatedTeardown, StorageService};
pub use teardown::{StackTeardown, StageFailure, TeardownError, TeardownReport, TeardownStage};
pub use tools::ToolSet;
