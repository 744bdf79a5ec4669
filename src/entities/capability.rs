// 🔧 Capability Entity - a discrete manufacturing ability
// Row of Produktionskapabiliteter(kapabilitet_id, navn)

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a capability (`kapabilitet_id`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilityId(pub i64);

impl fmt::Display for CapabilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for CapabilityId {
    fn from(id: i64) -> Self {
        CapabilityId(id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capability {
    pub id: CapabilityId,
    pub name: String,
}

impl Capability {
    pub fn new(id: impl Into<CapabilityId>, name: impl Into<String>) -> Self {
        Capability {
            id: id.into(),
            name: name.into(),
        }
    }
}
