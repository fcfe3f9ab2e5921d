use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Address of one slot inside a category.
///
/// Anonymous ids sort before named ones so snapshots list the numbered pool
/// first, in numeric order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SlotId {
    Anonymous(u32),
    Named(String),
}

impl SlotId {
    pub fn named(name: impl Into<String>) -> Self {
        SlotId::Named(name.into())
    }

    pub fn is_named(&self) -> bool {
        matches!(self, SlotId::Named(_))
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotId::Anonymous(id) => write!(f, "{}", id),
            SlotId::Named(name) => write!(f, "'{}'", name),
        }
    }
}

/// Non-owning reference to an object that sits in slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OccupantRef(pub u64);

/// The object whose slot categories are being managed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HolderId(pub u64);

impl fmt::Display for OccupantRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for HolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl FromStr for HolderId {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);
        digits
            .parse::<u64>()
            .map(HolderId)
            .map_err(|err| format!("invalid holder id '{}': {}", value, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_ids_sort_before_named() {
        let mut ids = vec![
            SlotId::named("right"),
            SlotId::Anonymous(2),
            SlotId::named("left"),
            SlotId::Anonymous(1),
        ];
        ids.sort();
        assert_eq!(
            ids,
            vec![
                SlotId::Anonymous(1),
                SlotId::Anonymous(2),
                SlotId::named("left"),
                SlotId::named("right"),
            ]
        );
    }

    #[test]
    fn holder_id_accepts_dbref_form() {
        assert_eq!("#12".parse::<HolderId>(), Ok(HolderId(12)));
        assert_eq!(" 7 ".parse::<HolderId>(), Ok(HolderId(7)));
        assert!("twelve".parse::<HolderId>().is_err());
    }
}
