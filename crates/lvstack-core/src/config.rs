//! Configuration model and helpers used by lvstack.

use crate::error::{LvStackError, LvStackResult};
use directories_next::ProjectDirs;
use log::{info, warn};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/lvstack.toml";
pub const CONFIG_PATH_ENV: &str = "LVSTACK_CONFIG";
const USER_FILE_NAME: &str = "lvstack.toml";
const APP_QUALIFIER: &str = "io";
const APP_ORGANIZATION: &str = "lvstack";
const APP_NAME: &str = "lvstack";

/// The storage device a host manages.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DeviceCfg {
    #[serde(default = "default_mount_point")]
    pub mount_point: String,

    #[serde(default = "default_nickname")]
    pub nickname: String,

    #[serde(default = "default_filesystem")]
    pub filesystem: String,
}

fn default_mount_point() -> String {
    "/mnt/storage".to_string()
}

fn default_nickname() -> String {
    "data_storage".to_string()
}

fn default_filesystem() -> String {
    "ext4".to_string()
}

impl Default for DeviceCfg {
    fn default() -> Self {
        Self {
            mount_point: default_mount_point(),
            nickname: default_nickname(),
            filesystem: default_filesystem(),
        }
    }
}

/// Where device-mapper exposes layered devices.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MapperCfg {
    #[serde(default = "default_mapper_namespace")]
    pub namespace: String,
}

fn default_mapper_namespace() -> String {
    "/dev/mapper".to_string()
}

impl Default for MapperCfg {
    fn default() -> Self {
        Self {
            namespace: default_mapper_namespace(),
        }
    }
}

/// Optional tool path overrides and execution limits.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CommandsCfg {
    /// Unset means commands may run indefinitely.
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    #[serde(default)]
    pub mount_path: Option<String>,

    #[serde(default)]
    pub lvdisplay_path: Option<String>,

    #[serde(default)]
    pub lvremove_path: Option<String>,

    #[serde(default)]
    pub vgremove_path: Option<String>,

    #[serde(default)]
    pub pvremove_path: Option<String>,

    #[serde(default)]
    pub vgs_path: Option<String>,

    #[serde(default)]
    pub lvs_path: Option<String>,

    #[serde(default)]
    pub pvs_path: Option<String>,

    #[serde(default)]
    pub rs_state_path: Option<String>,
}

impl CommandsCfg {
    /// Every configured override paired with the tool it replaces.
    pub fn overrides(&self) -> Vec<(&'static str, &str)> {
        [
            ("mount", &self.mount_path),
            ("lvdisplay", &self.lvdisplay_path),
            ("lvremove", &self.lvremove_path),
            ("vgremove", &self.vgremove_path),
            ("pvremove", &self.pvremove_path),
            ("vgs", &self.vgs_path),
            ("lvs", &self.lvs_path),
            ("pvs", &self.pvs_path),
            ("rs_state", &self.rs_state_path),
        ]
        .into_iter()
        .filter_map(|(tool, path)| {
            path.as_deref()
                .map(str::trim)
                .filter(|path| !path.is_empty())
                .map(|path| (tool, path))
        })
        .collect()
    }

    pub fn override_for(&self, tool: &str) -> Option<&str> {
        self.overrides()
            .into_iter()
            .find(|(name, _)| *name == tool)
            .map(|(_, path)| path)
    }
}

/// Top-level configuration snapshot loaded from disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct LvStackConfig {
    #[serde(default)]
    pub device: DeviceCfg,

    #[serde(default)]
    pub mapper: MapperCfg,

    #[serde(default)]
    pub commands: CommandsCfg,

    #[serde(skip)]
    pub path: PathBuf,

    #[serde(skip)]
    pub format: ConfigFormat,
}

/// Tracks whether we parsed TOML or YAML so writes preserve format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfigFormat {
    #[default]
    Toml,
    Yaml,
}

impl LvStackConfig {
    /// Return the canonical system-wide configuration path.
    pub fn default_path() -> &'static Path {
        Path::new(DEFAULT_CONFIG_PATH)
    }

    /// Resolve the per-user configuration path.
    pub fn user_config_path() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.config_dir().join(USER_FILE_NAME))
    }

    /// Load `path` when present, otherwise fall back to built-in defaults.
    ///
    /// A missing system-wide default path is first retried at the per-user
    /// configuration directory. Any other missing path falls straight back to
    /// defaults. Files that exist but fail to parse are always errors.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> LvStackResult<Self> {
        let target = path.as_ref();
        if target.exists() {
            return Self::load(target);
        }

        if target == Self::default_path() {
            if let Some(user_path) = Self::user_config_path().filter(|p| p.exists()) {
                info!(
                    "configuration missing at {}; using per-user config at {}",
                    target.display(),
                    user_path.display()
                );
                return Self::load(&user_path);
            }
        }

        warn!(
            "configuration missing at {}; using built-in defaults",
            target.display()
        );
        Ok(Self {
            path: target.to_path_buf(),
            ..Self::default()
        })
    }

    /// Read a config file from disk, detect format, and validate basics.
    pub fn load<P: AsRef<Path>>(path: P) -> LvStackResult<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let is_toml = matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some(ext) if ext.eq_ignore_ascii_case("toml")
        );
        let mut cfg = if is_toml {
            toml::from_str::<Self>(&contents)?
        } else {
            serde_yaml::from_str::<Self>(&contents)?
        };

        cfg.path = path.to_path_buf();
        cfg.format = if is_toml {
            ConfigFormat::Toml
        } else {
            ConfigFormat::Yaml
        };

        if cfg.mapper.namespace.trim().is_empty() {
            return Err(LvStackError::InvalidConfig(
                "mapper.namespace cannot be empty".to_string(),
            ));
        }

        Ok(cfg)
    }

    /// Perform a best-effort validation pass and return human-readable issues.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        let mount_point = self.device.mount_point.trim();
        if mount_point.is_empty() {
            issues.push("device.mount_point cannot be empty".to_string());
        } else if !mount_point.starts_with('/') {
            issues.push(format!(
                "device.mount_point must be an absolute path: {mount_point}"
            ));
        }

        if !self.mapper.namespace.starts_with('/') {
            issues.push(format!(
                "mapper.namespace must be an absolute path: {}",
                self.mapper.namespace
            ));
        }

        if self.commands.timeout_secs == Some(0) {
            issues.push("commands.timeout_secs must be greater than 0 when set".to_string());
        }

        for (tool, path) in self.commands.overrides() {
            if !Path::new(path).exists() {
                issues.push(format!("commands.{tool}_path points at a missing file: {path}"));
            }
        }

        issues
    }

    /// Mapper namespace without a trailing slash.
    pub fn mapper_namespace(&self) -> &str {
        let trimmed = self.mapper.namespace.trim_end_matches('/');
        if trimmed.is_empty() {
            "/"
        } else {
            trimmed
        }
    }

    /// Translate the configured timeout into a `Duration`, if any.
    pub fn command_timeout(&self) -> Option<Duration> {
        self.commands.timeout_secs.map(Duration::from_secs)
    }

    /// Render the configuration in its on-disk format.
    pub fn render(&self) -> LvStackResult<String> {
        Ok(match self.format {
            ConfigFormat::Toml => toml::to_string_pretty(self)?,
            ConfigFormat::Yaml => serde_yaml::to_string(self)?,
        })
    }

    /// Persist the configuration back to its original on-disk format.
    pub fn save(&self) -> LvStackResult<()> {
        let payload = self.render()?;
        fs::write(&self.path, payload)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn load_toml_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lvstack.toml");
        fs::write(&path, "[device]\nmount_point = \"/srv/data\"\n").unwrap();

        let cfg = LvStackConfig::load(&path).unwrap();
        assert_eq!(cfg.device.mount_point, "/srv/data");
        assert_eq!(cfg.device.nickname, "data_storage");
        assert_eq!(cfg.mapper_namespace(), "/dev/mapper");
        assert_eq!(cfg.command_timeout(), None);
        assert_eq!(cfg.format, ConfigFormat::Toml);
        assert_eq!(cfg.path, path);
    }

    #[test]
    fn load_yaml_by_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lvstack.yaml");
        fs::write(
            &path,
            "mapper:\n  namespace: /dev/mapper/\ncommands:\n  timeout_secs: 30\n",
        )
        .unwrap();

        let cfg = LvStackConfig::load(&path).unwrap();
        assert_eq!(cfg.format, ConfigFormat::Yaml);
        assert_eq!(cfg.mapper_namespace(), "/dev/mapper");
        assert_eq!(cfg.command_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn load_rejects_empty_namespace() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lvstack.toml");
        fs::write(&path, "[mapper]\nnamespace = \"  \"\n").unwrap();

        let err = LvStackConfig::load(&path).unwrap_err();
        assert!(matches!(err, LvStackError::InvalidConfig(_)), "{err:?}");
    }

    #[test]
    fn missing_custom_path_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        let cfg = LvStackConfig::load_or_default(&path).unwrap();
        assert_eq!(cfg.path, path);
        assert_eq!(cfg.device.mount_point, "/mnt/storage");
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn validate_reports_each_issue() {
        let mut cfg = LvStackConfig::default();
        cfg.device.mount_point = "mnt/storage".into();
        cfg.mapper.namespace = "dev/mapper".into();
        cfg.commands.timeout_secs = Some(0);
        cfg.commands.lvremove_path = Some("/nonexistent/lvremove".into());

        let issues = cfg.validate();
        assert_eq!(issues.len(), 4, "{issues:?}");
        assert!(issues.iter().any(|i| i.contains("commands.lvremove_path")));
    }

    #[test]
    fn save_round_trips_through_original_format() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lvstack.toml");
        fs::write(&path, "[device]\nnickname = \"logs\"\n").unwrap();

        let mut cfg = LvStackConfig::load(&path).unwrap();
        cfg.commands.timeout_secs = Some(45);
        cfg.save().unwrap();

        let reloaded = LvStackConfig::load(&path).unwrap();
        assert_eq!(reloaded.device.nickname, "logs");
        assert_eq!(reloaded.commands.timeout_secs, Some(45));
    }

    #[test]
    fn overrides_skip_blank_entries() {
        let commands = CommandsCfg {
            vgs_path: Some("  ".into()),
            pvs_path: Some("/opt/lvm/pvs".into()),
            ..CommandsCfg::default()
        };
        assert_eq!(commands.overrides(), vec![("pvs", "/opt/lvm/pvs")]);
        assert_eq!(commands.override_for("pvs"), Some("/opt/lvm/pvs"));
        assert_eq!(commands.override_for("vgs"), None);
    }
}
