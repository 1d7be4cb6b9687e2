//! Registry slot identifiers

use civiclens_core::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Named specialization slot in the classifier registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotId {
    /// Broad multi-class classifier, trusted for streetlights
    General,
    /// Lightweight pothole/garbage specialist
    Common,
    /// Garbage vs. not-garbage specialist
    Garbage,
}

impl SlotId {
    pub const ALL: [SlotId; 3] = [SlotId::General, SlotId::Common, SlotId::Garbage];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Common => "common",
            Self::Garbage => "garbage",
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            Self::General => 0,
            Self::Common => 1,
            Self::Garbage => 2,
        }
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SlotId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "general" => Ok(Self::General),
            "common" => Ok(Self::Common),
            "garbage" => Ok(Self::Garbage),
            other => Err(Error::UnknownSlot(other.to_string())),
        }
    }
}
