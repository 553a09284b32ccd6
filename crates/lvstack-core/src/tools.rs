//! Resolution of the external binaries lvstack invokes.

use crate::config::LvStackConfig;
use crate::error::{LvStackError, LvStackResult};
use std::env;
use std::path::{Path, PathBuf};

const SEARCH_DIRS: &[&str] = &[
    "/usr/sbin",
    "/sbin",
    "/usr/bin",
    "/bin",
    "/usr/local/sbin",
    "/usr/local/bin",
];

/// Program names (or absolute paths) for every tool a component may run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSet {
    pub mount: String,
    pub lvdisplay: String,
    pub lvremove: String,
    pub vgremove: String,
    pub pvremove: String,
    pub vgs: String,
    pub lvs: String,
    pub pvs: String,
    pub rs_state: String,
}

impl Default for ToolSet {
    /// Bare program names, left for the OS to look up on `PATH`.
    fn default() -> Self {
        Self {
            mount: "mount".into(),
            lvdisplay: "lvdisplay".into(),
            lvremove: "lvremove".into(),
            vgremove: "vgremove".into(),
            pvremove: "pvremove".into(),
            vgs: "vgs".into(),
            lvs: "lvs".into(),
            pvs: "pvs".into(),
            rs_state: "rs_state".into(),
        }
    }
}

impl ToolSet {
    /// Resolve every tool from config overrides, well-known directories, then `PATH`.
    ///
    /// Overrides must exist. Tools that cannot be found anywhere keep their
    /// bare name so a missing binary surfaces as a command failure at use time
    /// instead of blocking unrelated operations.
    pub fn resolve(config: &LvStackConfig) -> LvStackResult<Self> {
        let resolve = |tool: &str| resolve_tool(tool, config.commands.override_for(tool));
        Ok(Self {
            mount: resolve("mount")?,
            lvdisplay: resolve("lvdisplay")?,
            lvremove: resolve("lvremove")?,
            vgremove: resolve("vgremove")?,
            pvremove: resolve("pvremove")?,
            vgs: resolve("vgs")?,
            lvs: resolve("lvs")?,
            pvs: resolve("pvs")?,
            rs_state: resolve("rs_state")?,
        })
    }
}

fn resolve_tool(tool: &str, configured: Option<&str>) -> LvStackResult<String> {
    if let Some(path) = configured {
        let candidate = Path::new(path);
        if !candidate.exists() {
            return Err(LvStackError::InvalidConfig(format!(
                "{tool} binary not found at {}",
                candidate.display()
            )));
        }
        return Ok(path.to_string());
    }

    if let Some(found) = SEARCH_DIRS
        .iter()
        .map(|dir| Path::new(dir).join(tool))
        .find(|candidate| candidate.exists())
    {
        return Ok(found.to_string_lossy().into_owned());
    }

    Ok(find_in_path(tool)
        .map(|path| path.to_string_lossy().into_owned())
        .unwrap_or_else(|| tool.to_string()))
}

fn find_in_path(binary: &str) -> Option<PathBuf> {
    let paths = env::var_os("PATH")?;
    env::split_paths(&paths).find_map(|dir| {
        let candidate = dir.join(binary);
        if candidate.exists() {
            Some(candidate)
        } else {
            None
        }
    })
}
