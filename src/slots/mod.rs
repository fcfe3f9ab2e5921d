pub mod allocator;
pub mod category;
pub mod compact;
pub mod error;
pub mod id;
pub mod occupant;
pub mod requirement;
pub mod resolver;

use std::collections::BTreeMap;

/// Every slot of one category with its occupant, if any.
pub type SlotMap = BTreeMap<id::SlotId, Option<id::OccupantRef>>;

/// Occupied slots grouped by category.
pub type Bindings = BTreeMap<String, BTreeMap<id::SlotId, id::OccupantRef>>;

/// Where one occupant sits: category to slot ids.
pub type Placement = BTreeMap<String, Vec<id::SlotId>>;
