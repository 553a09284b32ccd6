//! Parsers for `--noheadings` LVM report output.

pub(crate) const PV_SEPARATOR: &str = "|";

/// One `pv_name|vg_name` row; `group` is empty for orphan PVs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PvRow {
    pub(crate) name: String,
    pub(crate) group: String,
}

/// Single-column report: one trimmed, non-empty name per line.
pub(crate) fn parse_names(payload: &str) -> Vec<String> {
    payload
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Two-column `pvs` report joined by `PV_SEPARATOR`.
pub(crate) fn parse_pv_rows(payload: &str) -> Vec<PvRow> {
    payload
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let (name, group) = line.split_once(PV_SEPARATOR)?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some(PvRow {
                name: name.to_string(),
                group: group.trim().to_string(),
            })
        })
        .collect()
}

/// Members of `group`, in the order `pvs` reported them.
pub(crate) fn members_of(payload: &str, group: &str) -> Vec<String> {
    parse_pv_rows(payload)
        .into_iter()
        .filter(|row| row.group == group)
        .map(|row| row.name)
        .collect()
}

/// Lightweight check that `name` is a legal LVM volume group or volume name.
///
/// Names reach the CLIs as bare arguments, so a leading `-` would be taken as
/// an option.
pub fn looks_like_lvm_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.starts_with('-')
        && name
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '+' | '_' | '.' | '-'))
}
