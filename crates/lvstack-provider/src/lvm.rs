//! Provider contract for layered (LVM) volume groups.
//!
//! A `LayeredGroup` is a point-in-time snapshot. Callers fetch it fresh for
//! every operation and must not cache it across mutations.

use serde::Serialize;
use std::error::Error;

/// Logical volume carved out of a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Unit {
    pub name: String,
}

/// Physical volume contributed to a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Member {
    /// Device path as reported by the volume manager (e.g. `/dev/xvdb`).
    pub name: String,
}

/// Composition of a volume group at query time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayeredGroup {
    pub name: String,
    pub units: Vec<Unit>,
    pub members: Vec<Member>,
}

impl LayeredGroup {
    /// Build a snapshot from plain unit and member names.
    pub fn new<U, M>(name: impl Into<String>, units: U, members: M) -> Self
    where
        U: IntoIterator,
        U::Item: Into<String>,
        M: IntoIterator,
        M::Item: Into<String>,
    {
        Self {
            name: name.into(),
            units: units
                .into_iter()
                .map(|name| Unit { name: name.into() })
                .collect(),
            members: members
                .into_iter()
                .map(|name| Member { name: name.into() })
                .collect(),
        }
    }

    pub fn unit_names(&self) -> Vec<&str> {
        self.units.iter().map(|unit| unit.name.as_str()).collect()
    }

    pub fn member_names(&self) -> Vec<&str> {
        self.members.iter().map(|member| member.name.as_str()).collect()
    }
}

/// Structured query over volume-group composition.
pub trait GroupProvider {
    type Error: Error + Send + Sync + 'static;

    /// Return the current composition of `name`, or `None` when the group does not exist.
    fn group(&self, name: &str) -> Result<Option<LayeredGroup>, Self::Error>;
}

impl<T> GroupProvider for &T
where
    T: GroupProvider + ?Sized,
{
    type Error = T::Error;

    fn group(&self, name: &str) -> Result<Option<LayeredGroup>, Self::Error> {
        (**self).group(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_preserves_reported_order() {
        let group = LayeredGroup::new("vg1", ["lv2", "lv1"], ["/dev/xvdc", "/dev/xvdb"]);
        assert_eq!(group.unit_names(), vec!["lv2", "lv1"]);
        assert_eq!(group.member_names(), vec!["/dev/xvdc", "/dev/xvdb"]);
    }
}
