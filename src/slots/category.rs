use crate::slots::compact::{self, Renumbered};
use crate::slots::id::{OccupantRef, SlotId};
use crate::slots::SlotMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ceiling on numbered slots in one category.
pub const MAX_NUMBERED_SLOTS: u32 = 65_536;

/// One named pool of slots on a holder.
///
/// Numbered slots are always `1..=n`: growth appends, removal trims from the
/// top. The allocator keeps occupied numbers below vacant ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotCategory {
    name: String,
    named: BTreeMap<String, Option<OccupantRef>>,
    anonymous: Vec<Option<OccupantRef>>,
}

impl SlotCategory {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            named: BTreeMap::new(),
            anonymous: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds vacant named slots that do not exist yet and `count` numbered
    /// slots after the current highest one, stopping at `MAX_NUMBERED_SLOTS`.
    pub fn declare<'a>(&mut self, named: impl IntoIterator<Item = &'a str>, count: u32) {
        for slot in named {
            self.named.entry(slot.to_string()).or_insert(None);
        }
        let count = count.min(self.numbered_room());
        let count = usize::try_from(count).unwrap_or(0);
        self.anonymous.resize(self.anonymous.len() + count, None);
    }

    /// How many more numbered slots fit under `MAX_NUMBERED_SLOTS`.
    pub fn numbered_room(&self) -> u32 {
        MAX_NUMBERED_SLOTS.saturating_sub(self.anonymous_count())
    }

    /// `None` when the slot does not exist, `Some(None)` when it is vacant.
    pub fn get(&self, slot: &SlotId) -> Option<Option<OccupantRef>> {
        match slot {
            SlotId::Named(name) => self.named.get(name).copied(),
            SlotId::Anonymous(id) => anonymous_index(*id)
                .and_then(|index| self.anonymous.get(index))
                .copied(),
        }
    }

    pub fn named_occupant(&self, name: &str) -> Option<Option<OccupantRef>> {
        self.named.get(name).copied()
    }

    pub fn named_count(&self) -> usize {
        self.named.len()
    }

    pub fn anonymous_count(&self) -> u32 {
        u32::try_from(self.anonymous.len()).unwrap_or(u32::MAX)
    }

    pub fn occupied_count(&self) -> usize {
        self.iter().filter(|(_, occupant)| occupant.is_some()).count()
    }

    /// Vacant numbered slots, read off the compact layout.
    pub fn vacant_anonymous(&self) -> u32 {
        let vacant = self.anonymous.len() - compact::occupied_prefix(&self.anonymous);
        u32::try_from(vacant).unwrap_or(u32::MAX)
    }

    pub fn vacant_named(&self) -> usize {
        self.named.values().filter(|occupant| occupant.is_none()).count()
    }

    /// The `count` lowest vacant numbered ids.
    pub fn lowest_vacant_anonymous(&self, count: u32) -> Vec<SlotId> {
        let first = compact::occupied_prefix(&self.anonymous);
        (first..self.anonymous.len())
            .take(usize::try_from(count).unwrap_or(usize::MAX))
            .map(|index| SlotId::Anonymous(compact::slot_number(index)))
            .collect()
    }

    pub fn vacant_slots(&self) -> Vec<SlotId> {
        self.iter()
            .filter(|(_, occupant)| occupant.is_none())
            .map(|(slot, _)| slot)
            .collect()
    }

    pub fn slots_of(&self, occupant: OccupantRef) -> Vec<SlotId> {
        self.iter()
            .filter(|(_, held)| *held == Some(occupant))
            .map(|(slot, _)| slot)
            .collect()
    }

    /// Occupied numbered slots, highest first, optionally only those held by
    /// `occupant`.
    pub fn occupied_anonymous_desc(&self, occupant: Option<OccupantRef>) -> Vec<u32> {
        self.anonymous
            .iter()
            .enumerate()
            .rev()
            .filter(|(_, held)| match (held, occupant) {
                (Some(held), Some(occupant)) => *held == occupant,
                (Some(_), None) => true,
                (None, _) => false,
            })
            .map(|(index, _)| compact::slot_number(index))
            .collect()
    }

    /// Places `occupant` in an existing slot. Returns false if the slot does
    /// not exist.
    pub fn bind(&mut self, slot: &SlotId, occupant: OccupantRef) -> bool {
        match self.entry_mut(slot) {
            Some(entry) => {
                *entry = Some(occupant);
                true
            }
            None => false,
        }
    }

    /// Empties a slot and returns whoever was in it.
    pub fn vacate(&mut self, slot: &SlotId) -> Option<OccupantRef> {
        self.entry_mut(slot).and_then(Option::take)
    }

    pub fn remove_named(&mut self, name: &str) -> Option<Option<OccupantRef>> {
        self.named.remove(name)
    }

    /// Removes up to `count` of the highest numbered slots, highest first.
    pub fn remove_highest(&mut self, count: u32) -> Vec<(u32, Option<OccupantRef>)> {
        let count = usize::try_from(count).unwrap_or(usize::MAX);
        let keep = self.anonymous.len().saturating_sub(count);
        let removed = self.anonymous.split_off(keep);
        removed
            .into_iter()
            .enumerate()
            .rev()
            .map(|(offset, occupant)| (compact::slot_number(keep + offset), occupant))
            .collect()
    }

    pub fn compact(&mut self) -> Vec<Renumbered> {
        compact::compact(&mut self.anonymous)
    }

    pub fn is_compact(&self) -> bool {
        compact::is_compact(&self.anonymous)
    }

    pub fn iter(&self) -> impl Iterator<Item = (SlotId, Option<OccupantRef>)> + '_ {
        let numbered = self
            .anonymous
            .iter()
            .enumerate()
            .map(|(index, occupant)| (SlotId::Anonymous(compact::slot_number(index)), *occupant));
        let named = self
            .named
            .iter()
            .map(|(name, occupant)| (SlotId::Named(name.clone()), *occupant));
        numbered.chain(named)
    }

    pub fn snapshot(&self) -> SlotMap {
        self.iter().collect()
    }

    pub(crate) fn to_record(&self) -> CategoryRecord {
        CategoryRecord {
            named: self.named.clone(),
            anonymous: self
                .anonymous
                .iter()
                .enumerate()
                .map(|(index, occupant)| (compact::slot_number(index), *occupant))
                .collect(),
        }
    }

    /// Rebuilds a category from its stored form. Numbered slots must run from
    /// 1 without gaps.
    pub(crate) fn from_record(name: &str, record: CategoryRecord) -> Result<Self, String> {
        let mut anonymous = Vec::with_capacity(record.anonymous.len());
        for (expected, (id, occupant)) in (1u32..).zip(record.anonymous) {
            if id != expected {
                return Err(format!(
                    "category '{}' numbered slots skip from {} to {}",
                    name,
                    expected.saturating_sub(1),
                    id
                ));
            }
            anonymous.push(occupant);
        }
        Ok(Self {
            name: name.to_string(),
            named: record.named,
            anonymous,
        })
    }

    fn entry_mut(&mut self, slot: &SlotId) -> Option<&mut Option<OccupantRef>> {
        match slot {
            SlotId::Named(name) => self.named.get_mut(name),
            SlotId::Anonymous(id) => {
                anonymous_index(*id).and_then(|index| self.anonymous.get_mut(index))
            }
        }
    }
}

/// Stored form of a category, one YAML mapping per pool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct CategoryRecord {
    #[serde(default)]
    pub named: BTreeMap<String, Option<OccupantRef>>,
    #[serde(default)]
    pub anonymous: BTreeMap<u32, Option<OccupantRef>>,
}

fn anonymous_index(id: u32) -> Option<usize> {
    id.checked_sub(1).and_then(|index| usize::try_from(index).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: OccupantRef = OccupantRef(10);
    const B: OccupantRef = OccupantRef(11);

    fn addons() -> SlotCategory {
        let mut category = SlotCategory::new("addons");
        category.declare(["left", "right"], 2);
        category
    }

    #[test]
    fn declare_merges_names_and_appends_numbers() {
        let mut category = addons();
        category.bind(&SlotId::named("left"), A);
        category.declare(["left", "y"], 3);

        assert_eq!(category.named_count(), 3);
        assert_eq!(category.anonymous_count(), 5);
        assert_eq!(category.get(&SlotId::named("left")), Some(Some(A)));
        assert_eq!(category.get(&SlotId::named("y")), Some(None));
        assert_eq!(category.get(&SlotId::Anonymous(5)), Some(None));
        assert_eq!(category.get(&SlotId::Anonymous(6)), None);
        assert_eq!(category.get(&SlotId::Anonymous(0)), None);
    }

    #[test]
    fn snapshot_lists_numbers_then_names() {
        let snapshot = addons().snapshot();
        let keys: Vec<SlotId> = snapshot.keys().cloned().collect();
        assert_eq!(
            keys,
            vec![
                SlotId::Anonymous(1),
                SlotId::Anonymous(2),
                SlotId::named("left"),
                SlotId::named("right"),
            ]
        );
        assert!(snapshot.values().all(Option::is_none));
    }

    #[test]
    fn vacancy_counts_follow_bindings() {
        let mut category = addons();
        assert_eq!(category.vacant_anonymous(), 2);
        category.bind(&SlotId::Anonymous(1), A);
        assert_eq!(category.vacant_anonymous(), 1);
        assert_eq!(category.lowest_vacant_anonymous(5), vec![SlotId::Anonymous(2)]);
        assert_eq!(category.vacant_named(), 2);
        assert!(!category.bind(&SlotId::named("nope"), A));
    }

    #[test]
    fn declare_stops_at_the_numbered_ceiling() {
        let mut category = SlotCategory::new("addons");
        category.declare([], 10);
        assert_eq!(category.numbered_room(), MAX_NUMBERED_SLOTS - 10);
        category.declare(["left"], u32::MAX);
        assert_eq!(category.anonymous_count(), MAX_NUMBERED_SLOTS);
        assert_eq!(category.numbered_room(), 0);
        assert_eq!(category.named_count(), 1);
    }

    #[test]
    fn remove_highest_trims_from_the_top() {
        let mut category = addons();
        category.declare([], 1);
        category.bind(&SlotId::Anonymous(3), B);
        let removed = category.remove_highest(2);
        assert_eq!(removed, vec![(3, Some(B)), (2, None)]);
        assert_eq!(category.anonymous_count(), 1);
        assert_eq!(category.remove_highest(9), vec![(1, None)]);
        assert!(category.remove_highest(1).is_empty());
    }

    #[test]
    fn occupied_anonymous_filters_by_occupant() {
        let mut category = addons();
        category.declare([], 1);
        category.bind(&SlotId::Anonymous(1), A);
        category.bind(&SlotId::Anonymous(2), B);
        category.bind(&SlotId::Anonymous(3), A);
        assert_eq!(category.occupied_anonymous_desc(Some(A)), vec![3, 1]);
        assert_eq!(category.occupied_anonymous_desc(None), vec![3, 2, 1]);
        assert_eq!(
            category.slots_of(A),
            vec![SlotId::Anonymous(1), SlotId::Anonymous(3)]
        );
    }

    #[test]
    fn record_round_trip_and_gap_detection() {
        let mut category = addons();
        category.bind(&SlotId::named("right"), B);
        let record = category.to_record();
        assert_eq!(
            SlotCategory::from_record("addons", record.clone()),
            Ok(category)
        );

        let mut gapped = record;
        gapped.anonymous.remove(&1);
        let err = SlotCategory::from_record("addons", gapped).expect_err("gap");
        assert!(err.contains("skip from 0 to 2"), "{err}");
    }
}
