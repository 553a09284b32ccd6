//! Mount-table inspection.
//!
//! The table comes from `mount` with no arguments, one entry per line:
//! `<device> on <mount point> type <fs> (<options>)`.

use crate::command::{run_checked, CommandRunner};
use crate::error::LvStackResult;
use crate::tools::ToolSet;
use log::{debug, info, warn};
use serde::Serialize;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

const ON_SEPARATOR: &str = " on ";
const TYPE_SEPARATOR: &str = " type ";

/// One parsed line of the mount table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MountEntry {
    pub device: String,
    pub mount_point: String,
    pub fs_type: String,
    pub options: Vec<String>,
}

/// Why a mount-table line was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MountParseError {
    #[error("line is empty")]
    Empty,
    #[error("missing `on` separator")]
    MissingOn,
    #[error("missing `type` separator")]
    MissingType,
    #[error("missing parenthesised option list")]
    MissingOptions,
    #[error("empty {0} field")]
    EmptyField(&'static str),
}

impl FromStr for MountEntry {
    type Err = MountParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim_end();
        if line.trim().is_empty() {
            return Err(MountParseError::Empty);
        }

        let (device, rest) = line
            .split_once(ON_SEPARATOR)
            .ok_or(MountParseError::MissingOn)?;
        // Mount points may contain spaces; the fs type never does.
        let type_at = rest
            .rfind(TYPE_SEPARATOR)
            .ok_or(MountParseError::MissingType)?;
        let mount_point = &rest[..type_at];
        let tail = &rest[type_at + TYPE_SEPARATOR.len()..];
        let (fs_type, options) = tail
            .split_once(" (")
            .ok_or(MountParseError::MissingOptions)?;
        let options = options
            .strip_suffix(')')
            .ok_or(MountParseError::MissingOptions)?;

        let device = device.trim();
        let fs_type = fs_type.trim();
        if device.is_empty() {
            return Err(MountParseError::EmptyField("device"));
        }
        if mount_point.is_empty() {
            return Err(MountParseError::EmptyField("mount point"));
        }
        if fs_type.is_empty() {
            return Err(MountParseError::EmptyField("filesystem type"));
        }

        Ok(Self {
            device: device.to_string(),
            mount_point: mount_point.to_string(),
            fs_type: fs_type.to_string(),
            options: options
                .split(',')
                .map(str::trim)
                .filter(|opt| !opt.is_empty())
                .map(str::to_string)
                .collect(),
        })
    }
}

/// Parse every well-formed line, skipping the rest.
pub fn parse_mount_table(table: &str) -> impl Iterator<Item = MountEntry> + '_ {
    table
        .lines()
        .filter_map(|line| match line.parse::<MountEntry>() {
            Ok(entry) => Some(entry),
            Err(MountParseError::Empty) => None,
            Err(err) => {
                debug!("skipping mount line {line:?}: {err}");
                None
            }
        })
}

/// Answers whether a mount point is backed by a layered (LVM) device.
pub struct MountInspector<'a, R: ?Sized> {
    runner: &'a R,
    mount: &'a str,
    lvdisplay: &'a str,
    namespace: &'a str,
}

impl<'a, R> MountInspector<'a, R>
where
    R: CommandRunner + ?Sized,
{
    pub fn new(runner: &'a R, tools: &'a ToolSet, namespace: &'a str) -> Self {
        Self {
            runner,
            mount: &tools.mount,
            lvdisplay: &tools.lvdisplay,
            namespace,
        }
    }

    /// Return `true` only when the first entry for `mount_point` is a
    /// mapper-namespaced device that `lvdisplay` recognises.
    pub fn is_layered(&self, mount_point: &str) -> LvStackResult<bool> {
        info!("checking whether {mount_point} is backed by an LVM device");
        let Some(entry) = self.mount_entry(mount_point)? else {
            info!("{mount_point} is not mounted");
            return Ok(false);
        };

        let device = entry.device.as_str();
        if !self.in_namespace(device) {
            info!("{device} is not under {}", self.namespace);
            return Ok(false);
        }

        match self.runner.run(self.lvdisplay, &[device]) {
            Ok(output) if output.success() => {
                info!("{device} is an LVM device");
                Ok(true)
            }
            Ok(output) => {
                info!(
                    "{} {device} returned {}: {}",
                    self.lvdisplay,
                    output.status,
                    output.diagnostic()
                );
                Ok(false)
            }
            Err(err) => {
                warn!("unable to run {} {device}: {err}", self.lvdisplay);
                Ok(false)
            }
        }
    }

    /// First mount-table entry whose mount point equals `mount_point`.
    pub fn mount_entry(&self, mount_point: &str) -> LvStackResult<Option<MountEntry>> {
        let table = self.table()?;
        let found = parse_mount_table(&table).find(|entry| entry.mount_point == mount_point);
        Ok(found)
    }

    /// The full parsed mount table.
    pub fn entries(&self) -> LvStackResult<Vec<MountEntry>> {
        let table = self.table()?;
        let entries = parse_mount_table(&table).collect();
        Ok(entries)
    }

    fn table(&self) -> LvStackResult<String> {
        let output = run_checked(self.runner, "mount table", self.mount, &[])?;
        Ok(output.stdout)
    }

    fn in_namespace(&self, device: &str) -> bool {
        Path::new(device)
            .strip_prefix(self.namespace)
            .map(|rest| !rest.as_os_str().is_empty())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::fake::ScriptedRunner;
    use crate::command::CommandOutput;
    use crate::error::LvStackError;

    const LVM_LINE: &str =
        "/dev/mapper/data--storage-data--lv on /mnt/storage type ext4 (rw,relatime)";

    fn table(lines: &[&str]) -> CommandOutput {
        CommandOutput::new(format!("{}\n", lines.join("\n")), "", 0)
    }

    #[test]
    fn parses_standard_line() {
        let entry: MountEntry = LVM_LINE.parse().unwrap();
        assert_eq!(entry.device, "/dev/mapper/data--storage-data--lv");
        assert_eq!(entry.mount_point, "/mnt/storage");
        assert_eq!(entry.fs_type, "ext4");
        assert_eq!(entry.options, vec!["rw", "relatime"]);
    }

    #[test]
    fn parses_mount_point_with_spaces() {
        let entry: MountEntry = "/dev/sdb1 on /media/my disk type vfat (rw)".parse().unwrap();
        assert_eq!(entry.mount_point, "/media/my disk");
        assert_eq!(entry.fs_type, "vfat");
    }

    #[test]
    fn rejects_malformed_lines() {
        assert_eq!("".parse::<MountEntry>(), Err(MountParseError::Empty));
        assert_eq!(
            "/dev/sda1 /boot ext4 rw 0 0".parse::<MountEntry>(),
            Err(MountParseError::MissingOn)
        );
        assert_eq!(
            "/dev/disk1 on / (apfs, local)".parse::<MountEntry>(),
            Err(MountParseError::MissingType)
        );
        assert_eq!(
            "/dev/sda1 on /boot type ext4".parse::<MountEntry>(),
            Err(MountParseError::MissingOptions)
        );
    }

    #[test]
    fn layered_when_namespaced_and_lvdisplay_succeeds() {
        let tools = ToolSet::default();
        let runner = ScriptedRunner::default()
            .respond("mount", table(&["proc on /proc type proc (rw)", LVM_LINE]))
            .respond(
                "lvdisplay /dev/mapper/data--storage-data--lv",
                CommandOutput::new("--- Logical volume ---", "", 0),
            );
        let inspector = MountInspector::new(&runner, &tools, "/dev/mapper");

        assert!(inspector.is_layered("/mnt/storage").unwrap());
        assert_eq!(
            runner.calls(),
            vec!["mount", "lvdisplay /dev/mapper/data--storage-data--lv"]
        );
    }

    #[test]
    fn not_layered_when_lvdisplay_fails() {
        let tools = ToolSet::default();
        let runner = ScriptedRunner::default()
            .respond("mount", table(&[LVM_LINE]))
            .respond(
                "lvdisplay /dev/mapper/data--storage-data--lv",
                CommandOutput::new("", "Failed to find logical volume", 5),
            );
        let inspector = MountInspector::new(&runner, &tools, "/dev/mapper");

        assert!(!inspector.is_layered("/mnt/storage").unwrap());
    }

    #[test]
    fn not_layered_when_lvdisplay_cannot_run() {
        let tools = ToolSet::default();
        let runner = ScriptedRunner::default().respond("mount", table(&[LVM_LINE]));
        let inspector = MountInspector::new(&runner, &tools, "/dev/mapper");

        assert!(!inspector.is_layered("/mnt/storage").unwrap());
    }

    #[test]
    fn raw_device_skips_lvdisplay() {
        let tools = ToolSet::default();
        let runner = ScriptedRunner::default()
            .respond("mount", table(&["/dev/xvdb on /mnt/storage type ext4 (rw)"]));
        let inspector = MountInspector::new(&runner, &tools, "/dev/mapper");

        assert!(!inspector.is_layered("/mnt/storage").unwrap());
        assert_eq!(runner.calls(), vec!["mount"]);
    }

    #[test]
    fn namespace_match_is_component_wise() {
        let tools = ToolSet::default();
        let runner = ScriptedRunner::default()
            .respond("mount", table(&["/dev/mapperx/vg-lv on /data type xfs (rw)"]));
        let inspector = MountInspector::new(&runner, &tools, "/dev/mapper");

        assert!(!inspector.is_layered("/data").unwrap());
        assert_eq!(runner.calls(), vec!["mount"]);
    }

    #[test]
    fn unmatched_mount_point_is_false() {
        let tools = ToolSet::default();
        let runner = ScriptedRunner::default().respond("mount", table(&[LVM_LINE]));
        let inspector = MountInspector::new(&runner, &tools, "/dev/mapper");

        assert!(!inspector.is_layered("/mnt/elsewhere").unwrap());
        assert_eq!(runner.calls(), vec!["mount"]);
    }

    #[test]
    fn first_match_wins_over_later_duplicates() {
        let tools = ToolSet::default();
        let runner = ScriptedRunner::default()
            .respond(
                "mount",
                table(&[
                    "garbage line",
                    "/dev/xvdb on /mnt/storage type ext4 (rw)",
                    LVM_LINE,
                ]),
            )
            .respond(
                "lvdisplay /dev/mapper/data--storage-data--lv",
                CommandOutput::new("", "", 0),
            );
        let inspector = MountInspector::new(&runner, &tools, "/dev/mapper");

        assert!(!inspector.is_layered("/mnt/storage").unwrap());
        assert_eq!(runner.calls(), vec!["mount"]);
    }

    #[test]
    fn malformed_lines_do_not_hide_later_match() {
        let tools = ToolSet::default();
        let runner = ScriptedRunner::default()
            .respond("mount", table(&["not a mount line", "", LVM_LINE]))
            .respond(
                "lvdisplay /dev/mapper/data--storage-data--lv",
                CommandOutput::new("", "", 0),
            );
        let inspector = MountInspector::new(&runner, &tools, "/dev/mapper");

        assert!(inspector.is_layered("/mnt/storage").unwrap());
    }

    #[test]
    fn entries_and_lookup_read_the_live_table() {
        let tools = ToolSet::default();
        let runner = ScriptedRunner::default().respond(
            "mount",
            table(&["proc on /proc type proc (rw)", "junk", LVM_LINE]),
        );
        let inspector = MountInspector::new(&runner, &tools, "/dev/mapper");

        let entries = inspector.entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].mount_point, "/proc");

        let entry = inspector.mount_entry("/mnt/storage").unwrap().unwrap();
        assert_eq!(entry.device, "/dev/mapper/data--storage-data--lv");
        assert!(inspector.mount_entry("/srv").unwrap().is_none());
    }

    #[test]
    fn failing_mount_command_is_an_error() {
        let tools = ToolSet::default();
        let runner = ScriptedRunner::default()
            .respond("mount", CommandOutput::new("", "mount: permission denied", 1));
        let inspector = MountInspector::new(&runner, &tools, "/dev/mapper");

        let err = inspector.is_layered("/mnt/storage").unwrap_err();
        assert!(matches!(err, LvStackError::Command(_)), "{err:?}");
        assert_eq!(runner.calls(), vec!["mount"]);
    }
}
