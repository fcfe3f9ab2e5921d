use crate::slots::id::{OccupantRef, SlotId};
use crate::slots::Bindings;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Why a category could not satisfy a reservation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shortfall {
    /// The named slot already has an occupant (or was claimed earlier in the
    /// same request).
    Occupied(SlotId),
    Anonymous { requested: u32, vacant: u32 },
}

impl fmt::Display for Shortfall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shortfall::Occupied(slot) => write!(f, "slot {} is occupied", slot),
            Shortfall::Anonymous { requested, vacant } => write!(
                f,
                "{} numbered slots requested but only {} vacant",
                requested, vacant
            ),
        }
    }
}

#[derive(Debug, Error)]
pub enum SlotError {
    #[error("no slots named '{category}' have been added")]
    UnknownCategory { category: String },

    #[error("category '{category}' has no slot named '{slot}'")]
    UnknownSlotName { category: String, slot: String },

    #[error("not enough room in '{category}': {shortfall}")]
    InsufficientCapacity { category: String, shortfall: Shortfall },

    #[error("invalid slot requirement: {0}")]
    InvalidRequirementFormat(String),

    #[error("{occupant} does not declare any slots")]
    NoRequirement { occupant: OccupantRef },

    #[error("evicted current occupants but could not attach replacement: {source}")]
    ReplaceFailed {
        evicted: Bindings,
        #[source]
        source: Box<SlotError>,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SlotError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        SlotError::InvalidRequirementFormat(message.into())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("slot store io failed for {}: {message}", .path.display())]
    Io { path: PathBuf, message: String },

    #[error("slot store data corrupt in {}: {message}", .path.display())]
    Corrupt { path: PathBuf, message: String },

    #[error("slot store encode failed: {0}")]
    Encode(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_message_names_category_and_shortfall() {
        let err = SlotError::InsufficientCapacity {
            category: "addons".to_string(),
            shortfall: Shortfall::Anonymous {
                requested: 3,
                vacant: 1,
            },
        };
        assert_eq!(
            err.to_string(),
            "not enough room in 'addons': 3 numbered slots requested but only 1 vacant"
        );

        let err = SlotError::InsufficientCapacity {
            category: "addons".to_string(),
            shortfall: Shortfall::Occupied(SlotId::named("right")),
        };
        assert_eq!(
            err.to_string(),
            "not enough room in 'addons': slot 'right' is occupied"
        );
    }
}
