//! Error types shared across lvstack crates.

use crate::command::CommandFailure;
use crate::teardown::TeardownError;
use std::time::Duration;
use thiserror::Error;

pub type LvStackResult<T> = Result<T, LvStackError>;

#[derive(Debug, Error)]
pub enum LvStackError {
    #[error("volume group not found: {0}")]
    GroupNotFound(String),

    #[error(transparent)]
    Command(#[from] CommandFailure),

    #[error(transparent)]
    Teardown(#[from] TeardownError),

    #[error("run state query failed: {0}")]
    Query(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("provider error: {0}")]
    Provider(String),

    #[error("`{command}` timed out after {after:?}")]
    Timeout { command: String, after: Duration },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("toml parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("toml serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
