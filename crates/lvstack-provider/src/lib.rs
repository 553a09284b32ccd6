#![forbid(unsafe_code)]

//! Provider contracts shared across lvstack.
//!
//! The core crate drives teardown through these traits so it never depends on
//! a concrete volume-manager integration.

pub mod lvm;

pub use lvm::{GroupProvider, LayeredGroup, Member, Unit};
