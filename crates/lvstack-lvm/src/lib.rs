#![forbid(unsafe_code)]

//! System provider for LVM volume groups.
//!
//! `system` answers `GroupProvider` queries with the host `vgs`/`lvs`/`pvs`
//! CLIs; `parse` keeps their report formats separate so both stay testable.

mod parse;
mod system;

pub use parse::looks_like_lvm_name;
pub use system::SystemLvmProvider;
