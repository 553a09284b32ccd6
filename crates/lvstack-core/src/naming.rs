//! Device-mapper naming convention for LVM logical volumes.
//!
//! Device-mapper joins the group and volume names with a single `-`, so any
//! literal `-` inside either name is doubled first.

/// Double every `-` so the result can be joined with a single separator.
pub fn escape(name: &str) -> String {
    name.replace('-', "--")
}

/// Composite device-mapper name for `unit` inside `group`.
pub fn mapper_name(group: &str, unit: &str) -> String {
    format!("{}-{}", escape(group), escape(unit))
}

/// Full device path under `namespace` (normally `/dev/mapper`).
pub fn mapper_device_path(namespace: &str, group: &str, unit: &str) -> String {
    format!(
        "{}/{}",
        namespace.trim_end_matches('/'),
        mapper_name(group, unit)
    )
}
