use crate::slots::category::SlotCategory;
use crate::slots::error::{Shortfall, SlotError};
use crate::slots::id::{OccupantRef, SlotId};
use crate::slots::requirement::{named_slots, total_count, RequirementEntry, SlotSelector};
use crate::slots::Placement;
use std::collections::{BTreeMap, BTreeSet};

/// Slots an attach will claim, by category. Categories that would gain
/// nothing are left out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReservationPlan {
    slots: Placement,
}

impl ReservationPlan {
    pub fn slots(&self) -> &Placement {
        &self.slots
    }

    pub fn into_slots(self) -> Placement {
        self.slots
    }
}

/// Stages an attach. Fails on the first category (in selector order) that
/// cannot be satisfied.
pub fn plan_attach(
    categories: &BTreeMap<String, SlotCategory>,
    selector: &SlotSelector,
) -> Result<ReservationPlan, SlotError> {
    let mut plan = ReservationPlan::default();
    match selector {
        SlotSelector::Detailed(requirement) => {
            for (name, entries) in requirement.categories() {
                let category = lookup(categories, name)?;
                let slots = reserve_detailed(category, entries)?;
                if !slots.is_empty() {
                    plan.slots.insert(name.to_string(), slots);
                }
            }
        }
        SlotSelector::Categories(names) => {
            for name in names {
                let category = lookup(categories, name)?;
                let slots = category.vacant_slots();
                if !slots.is_empty() {
                    plan.slots.insert(name.clone(), slots);
                }
            }
        }
    }
    Ok(plan)
}

/// Stages a drop. Missing categories and slots are skipped; with no
/// `occupant` every matching occupied slot is chosen.
pub fn plan_drop(
    categories: &BTreeMap<String, SlotCategory>,
    occupant: Option<OccupantRef>,
    selector: &SlotSelector,
) -> Placement {
    let mut plan = Placement::new();
    let matches = |held: Option<OccupantRef>| match (held, occupant) {
        (Some(held), Some(occupant)) => held == occupant,
        (Some(_), None) => true,
        (None, _) => false,
    };
    match selector {
        SlotSelector::Detailed(requirement) => {
            for (name, entries) in requirement.categories() {
                let Some(category) = categories.get(name) else {
                    continue;
                };
                let mut seen = BTreeSet::new();
                let mut slots: Vec<SlotId> = named_slots(entries)
                    .filter(|slot| seen.insert(*slot))
                    .filter(|slot| category.named_occupant(slot).is_some_and(matches))
                    .map(SlotId::named)
                    .collect();
                let count = usize::try_from(total_count(entries)).unwrap_or(usize::MAX);
                slots.extend(
                    category
                        .occupied_anonymous_desc(occupant)
                        .into_iter()
                        .take(count)
                        .map(SlotId::Anonymous),
                );
                if !slots.is_empty() {
                    plan.insert(name.to_string(), slots);
                }
            }
        }
        SlotSelector::Categories(names) => {
            for name in names {
                let Some(category) = categories.get(name) else {
                    continue;
                };
                let slots: Vec<SlotId> = category
                    .iter()
                    .filter(|(_, held)| matches(*held))
                    .map(|(slot, _)| slot)
                    .collect();
                if !slots.is_empty() {
                    plan.insert(name.clone(), slots);
                }
            }
        }
    }
    plan
}

fn lookup<'a>(
    categories: &'a BTreeMap<String, SlotCategory>,
    name: &str,
) -> Result<&'a SlotCategory, SlotError> {
    categories.get(name).ok_or_else(|| SlotError::UnknownCategory {
        category: name.to_string(),
    })
}

fn reserve_detailed(
    category: &SlotCategory,
    entries: &[RequirementEntry],
) -> Result<Vec<SlotId>, SlotError> {
    let mut claimed = BTreeSet::new();
    let mut slots = Vec::new();
    for slot in named_slots(entries) {
        match category.named_occupant(slot) {
            None => {
                return Err(SlotError::UnknownSlotName {
                    category: category.name().to_string(),
                    slot: slot.to_string(),
                })
            }
            Some(Some(_)) => return Err(occupied(category, slot)),
            Some(None) => {
                if !claimed.insert(slot) {
                    return Err(occupied(category, slot));
                }
                slots.push(SlotId::named(slot));
            }
        }
    }

    let requested = total_count(entries);
    let vacant = category.vacant_anonymous();
    if requested > vacant {
        return Err(SlotError::InsufficientCapacity {
            category: category.name().to_string(),
            shortfall: Shortfall::Anonymous { requested, vacant },
        });
    }
    slots.extend(category.lowest_vacant_anonymous(requested));
    Ok(slots)
}

fn occupied(category: &SlotCategory, slot: &str) -> SlotError {
    SlotError::InsufficientCapacity {
        category: category.name().to_string(),
        shortfall: Shortfall::Occupied(SlotId::named(slot)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slots::requirement::SlotRequirement;

    const A: OccupantRef = OccupantRef(1);
    const B: OccupantRef = OccupantRef(2);

    fn state() -> BTreeMap<String, SlotCategory> {
        let mut addons = SlotCategory::new("addons");
        addons.declare(["left", "right"], 3);
        addons.bind(&SlotId::named("left"), A);
        addons.bind(&SlotId::Anonymous(1), B);
        let mut body = SlotCategory::new("body");
        body.declare(["torso"], 0);
        BTreeMap::from([("addons".to_string(), addons), ("body".to_string(), body)])
    }

    #[test]
    fn detailed_plan_takes_lowest_vacant_numbers() {
        let selector: SlotSelector = SlotRequirement::new()
            .with_count("addons", 2)
            .with_named("addons", "right")
            .with_named("body", "torso")
            .into();
        let plan = plan_attach(&state(), &selector).expect("plan");
        assert_eq!(
            plan.slots(),
            &Placement::from([
                (
                    "addons".to_string(),
                    vec![SlotId::named("right"), SlotId::Anonymous(2), SlotId::Anonymous(3)]
                ),
                ("body".to_string(), vec![SlotId::named("torso")]),
            ])
        );
    }

    #[test]
    fn detailed_plan_reports_each_failure_kind() {
        let categories = state();
        let cases = [
            (SlotRequirement::new().with_named("legs", "left"), "unknown category"),
            (SlotRequirement::new().with_named("addons", "up"), "unknown slot"),
            (SlotRequirement::new().with_named("addons", "left"), "occupied"),
            (
                SlotRequirement::new()
                    .with_named("addons", "right")
                    .with_named("addons", "right"),
                "claimed twice",
            ),
            (SlotRequirement::new().with_count("addons", 3), "too many"),
        ];
        for (requirement, label) in cases {
            let err = plan_attach(&categories, &requirement.into()).expect_err(label);
            match label {
                "unknown category" => assert!(matches!(err, SlotError::UnknownCategory { .. })),
                "unknown slot" => assert!(matches!(err, SlotError::UnknownSlotName { .. })),
                _ => assert!(matches!(err, SlotError::InsufficientCapacity { .. }), "{label}"),
            }
        }
    }

    #[test]
    fn bulk_plan_claims_every_vacancy_and_skips_full_categories() {
        let mut categories = state();
        if let Some(body) = categories.get_mut("body") {
            body.bind(&SlotId::named("torso"), A);
        }
        let plan = plan_attach(&categories, &SlotSelector::categories(["addons", "body"]))
            .expect("plan");
        assert_eq!(
            plan.into_slots(),
            Placement::from([(
                "addons".to_string(),
                vec![SlotId::Anonymous(2), SlotId::Anonymous(3), SlotId::named("right")]
            )])
        );
    }

    #[test]
    fn drop_plan_respects_occupant_filter() {
        let categories = state();
        let everything = SlotSelector::categories(["addons", "body", "legs"]);
        assert_eq!(
            plan_drop(&categories, Some(B), &everything),
            Placement::from([("addons".to_string(), vec![SlotId::Anonymous(1)])])
        );
        assert_eq!(
            plan_drop(&categories, None, &everything),
            Placement::from([(
                "addons".to_string(),
                vec![SlotId::Anonymous(1), SlotId::named("left")]
            )])
        );

        let named: SlotSelector = SlotRequirement::new()
            .with_named("addons", "left")
            .with_named("addons", "right")
            .with_named("addons", "ghost")
            .into();
        assert_eq!(
            plan_drop(&categories, Some(B), &named),
            Placement::new()
        );
        assert_eq!(
            plan_drop(&categories, None, &named),
            Placement::from([("addons".to_string(), vec![SlotId::named("left")])])
        );
    }
}
