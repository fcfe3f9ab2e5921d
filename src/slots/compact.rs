use crate::slots::id::OccupantRef;

/// An occupant that changed numbered slot during compaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Renumbered {
    pub occupant: OccupantRef,
    pub from: u32,
    pub to: u32,
}

/// Packs occupied numbered slots into the lowest ids.
///
/// `slots[i]` is numbered slot `i + 1`. Occupied entries keep their relative
/// order and move to the front; vacancies collect at the end. Returns every
/// occupant whose id changed.
pub fn compact(slots: &mut Vec<Option<OccupantRef>>) -> Vec<Renumbered> {
    if is_compact(slots) {
        return Vec::new();
    }
    let total = slots.len();
    let mut moves = Vec::new();
    let mut packed = Vec::with_capacity(total);
    for (index, entry) in slots.iter().enumerate() {
        if let Some(occupant) = entry {
            if index != packed.len() {
                moves.push(Renumbered {
                    occupant: *occupant,
                    from: slot_number(index),
                    to: slot_number(packed.len()),
                });
            }
            packed.push(Some(*occupant));
        }
    }
    packed.resize(total, None);
    *slots = packed;
    moves
}

/// True when no vacancy sits below an occupied numbered slot.
pub fn is_compact(slots: &[Option<OccupantRef>]) -> bool {
    slots
        .iter()
        .skip_while(|entry| entry.is_some())
        .all(Option::is_none)
}

/// Length of the leading run of occupied slots. On a compact pool this is the
/// occupied count, so vacancies are `len - occupied_prefix` without a scan.
pub fn occupied_prefix(slots: &[Option<OccupantRef>]) -> usize {
    slots.partition_point(Option::is_some)
}

pub(crate) fn slot_number(index: usize) -> u32 {
    u32::try_from(index).map_or(u32::MAX, |index| index.saturating_add(1))
}
