use crate::persistence::SlotStore;
use crate::slots::category::{SlotCategory, MAX_NUMBERED_SLOTS};
use crate::slots::error::SlotError;
use crate::slots::id::{HolderId, OccupantRef, SlotId};
use crate::slots::occupant::RequirementProvider;
use crate::slots::requirement::{named_slots, total_count, SlotRequirement, SlotSelector};
use crate::slots::resolver::{plan_attach, plan_drop};
use crate::slots::{Bindings, Placement, SlotMap};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

/// Result of a successful replace: who was evicted, and where the new
/// occupant went.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Replaced {
    pub evicted: Bindings,
    pub attached: Bindings,
}

/// Free capacity of one category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Vacancies {
    pub named: usize,
    pub anonymous: u32,
}

/// Slot operations for one holder. Each call commits at most once; a failed
/// check writes nothing.
#[derive(Debug)]
pub struct Allocator<S> {
    holder: HolderId,
    store: S,
}

impl<S: SlotStore> Allocator<S> {
    pub fn new(holder: HolderId, store: S) -> Self {
        Self { holder, store }
    }

    pub fn holder(&self) -> HolderId {
        self.holder
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Creates categories or grows existing ones. Named slots already present
    /// are left as they are; counts append numbered slots after the highest.
    /// Returns the resulting slots of every category mentioned. A category
    /// may not grow past `MAX_NUMBERED_SLOTS` numbered slots.
    pub fn add(
        &mut self,
        requirement: &SlotRequirement,
    ) -> Result<BTreeMap<String, SlotMap>, SlotError> {
        requirement.validate()?;
        let mut existing = self.load(requirement.categories().map(|(name, _)| name))?;
        let mut updated = Vec::new();
        let mut result = BTreeMap::new();
        for (name, entries) in requirement.categories() {
            let mut category = existing
                .remove(name)
                .unwrap_or_else(|| SlotCategory::new(name));
            let count = total_count(entries);
            if count > category.numbered_room() {
                return Err(SlotError::invalid(format!(
                    "'{}' has {} numbered slots, adding {} would pass the limit of {}",
                    name,
                    category.anonymous_count(),
                    count,
                    MAX_NUMBERED_SLOTS
                )));
            }
            category.declare(named_slots(entries), count);
            result.insert(name.to_string(), category.snapshot());
            updated.push(category);
        }
        self.store.commit(self.holder, &updated, &[])?;
        for category in &updated {
            info!(
                holder = %self.holder,
                category = category.name(),
                named = category.named_count(),
                numbered = category.anonymous_count(),
                "slots added"
            );
        }
        Ok(result)
    }

    /// Removes whole categories (category list) or individual slots (named
    /// slots plus a count of the highest numbered ones). Whatever was in the
    /// removed slots is returned; nothing else keeps track of it.
    pub fn delete(
        &mut self,
        selector: &SlotSelector,
    ) -> Result<BTreeMap<String, SlotMap>, SlotError> {
        selector.validate()?;
        let mut removed = BTreeMap::new();
        match selector {
            SlotSelector::Categories(names) => {
                let names: BTreeSet<&str> = names.iter().map(String::as_str).collect();
                let existing = self.load(names.iter().copied())?;
                let mut gone = Vec::new();
                for (name, category) in existing {
                    info!(holder = %self.holder, category = %name, "slot category deleted");
                    removed.insert(name.clone(), category.snapshot());
                    gone.push(name);
                }
                self.store.commit(self.holder, &[], &gone)?;
            }
            SlotSelector::Detailed(requirement) => {
                let mut existing = self.load(requirement.categories().map(|(name, _)| name))?;
                let mut updated = Vec::new();
                for (name, entries) in requirement.categories() {
                    let Some(mut category) = existing.remove(name) else {
                        continue;
                    };
                    self.log_compaction(&mut category);
                    let mut slots = SlotMap::new();
                    for slot in named_slots(entries) {
                        if let Some(occupant) = category.remove_named(slot) {
                            slots.insert(SlotId::named(slot), occupant);
                        }
                    }
                    for (id, occupant) in category.remove_highest(total_count(entries)) {
                        slots.insert(SlotId::Anonymous(id), occupant);
                    }
                    if !slots.is_empty() {
                        debug!(holder = %self.holder, category = name, removed = slots.len(), "slots deleted");
                        removed.insert(name.to_string(), slots);
                    }
                    updated.push(category);
                }
                self.store.commit(self.holder, &updated, &[])?;
            }
        }
        Ok(removed)
    }

    /// Reserves every slot `selector` asks for, or nothing at all.
    pub fn attach(
        &mut self,
        occupant: OccupantRef,
        selector: &SlotSelector,
    ) -> Result<Bindings, SlotError> {
        selector.validate()?;
        let mut categories = self.load(selector.category_names())?;
        let plan = match plan_attach(&categories, selector) {
            Ok(plan) => plan,
            Err(err) => {
                debug!(holder = %self.holder, %occupant, error = %err, "attach rejected");
                return Err(err);
            }
        };

        let mut bindings = Bindings::new();
        let mut updated = Vec::new();
        for (name, slots) in plan.into_slots() {
            let Some(mut category) = categories.remove(&name) else {
                continue;
            };
            let mut bound = BTreeMap::new();
            for slot in slots {
                if category.bind(&slot, occupant) {
                    bound.insert(slot, occupant);
                }
            }
            debug!(holder = %self.holder, %occupant, category = %name, slots = bound.len(), "attached");
            bindings.insert(name, bound);
            updated.push(category);
        }
        self.store.commit(self.holder, &updated, &[])?;
        Ok(bindings)
    }

    /// Attaches `occupant` where it declares it belongs.
    pub fn attach_natural<P>(
        &mut self,
        occupant: OccupantRef,
        provider: &P,
    ) -> Result<Bindings, SlotError>
    where
        P: RequirementProvider + ?Sized,
    {
        let selector = provider
            .requirement(occupant)
            .ok_or(SlotError::NoRequirement { occupant })?;
        self.attach(occupant, &selector)
    }

    /// Vacates slots. With an occupant only its own slots are touched; with
    /// `None` whoever sits in the selected slots is evicted. No selector means
    /// every category. Slots or categories that are not there are skipped.
    pub fn drop(
        &mut self,
        occupant: Option<OccupantRef>,
        selector: Option<&SlotSelector>,
    ) -> Result<Bindings, SlotError> {
        let everything;
        let selector = match selector {
            Some(selector) => {
                selector.validate()?;
                selector
            }
            None => {
                everything = SlotSelector::Categories(self.store.category_names(self.holder)?);
                &everything
            }
        };
        let mut categories = self.load(selector.category_names())?;
        let plan = plan_drop(&categories, occupant, selector);

        let mut vacated = Bindings::new();
        let mut updated = Vec::new();
        for (name, slots) in plan {
            let Some(mut category) = categories.remove(&name) else {
                continue;
            };
            let mut emptied = BTreeMap::new();
            for slot in slots {
                if let Some(previous) = category.vacate(&slot) {
                    emptied.insert(slot, previous);
                }
            }
            if emptied.keys().any(|slot| !slot.is_named()) {
                self.log_compaction(&mut category);
            }
            debug!(holder = %self.holder, category = %name, slots = emptied.len(), "vacated");
            vacated.insert(name, emptied);
            updated.push(category);
        }
        self.store.commit(self.holder, &updated, &[])?;
        Ok(vacated)
    }

    /// Evicts whoever holds the selected slots, then attaches `occupant`
    /// there. The eviction stands even when the attach fails; the error then
    /// carries what was evicted.
    pub fn replace(
        &mut self,
        occupant: OccupantRef,
        selector: &SlotSelector,
    ) -> Result<Replaced, SlotError> {
        let evicted = self.drop(None, Some(selector))?;
        match self.attach(occupant, selector) {
            Ok(attached) => Ok(Replaced { evicted, attached }),
            Err(source) => Err(SlotError::ReplaceFailed {
                evicted,
                source: Box::new(source),
            }),
        }
    }

    pub fn replace_natural<P>(
        &mut self,
        occupant: OccupantRef,
        provider: &P,
    ) -> Result<Replaced, SlotError>
    where
        P: RequirementProvider + ?Sized,
    {
        let selector = provider
            .requirement(occupant)
            .ok_or(SlotError::NoRequirement { occupant })?;
        self.replace(occupant, &selector)
    }

    /// Every slot `occupant` holds, by category. Categories where it holds
    /// nothing are left out.
    pub fn where_is(&self, occupant: OccupantRef) -> Result<Placement, SlotError> {
        Ok(self
            .load_all()?
            .into_iter()
            .filter_map(|(name, category)| {
                let slots = category.slots_of(occupant);
                (!slots.is_empty()).then_some((name, slots))
            })
            .collect())
    }

    pub fn all(&self) -> Result<BTreeMap<String, SlotMap>, SlotError> {
        Ok(self
            .load_all()?
            .into_iter()
            .map(|(name, category)| (name, category.snapshot()))
            .collect())
    }

    pub fn vacancies(&self, category: &str) -> Result<Vacancies, SlotError> {
        let category = self
            .load([category])?
            .remove(category)
            .ok_or_else(|| SlotError::UnknownCategory {
                category: category.to_string(),
            })?;
        Ok(Vacancies {
            named: category.vacant_named(),
            anonymous: category.vacant_anonymous(),
        })
    }

    fn load<'a>(
        &self,
        names: impl IntoIterator<Item = &'a str>,
    ) -> Result<BTreeMap<String, SlotCategory>, SlotError> {
        let mut categories = BTreeMap::new();
        for name in names {
            if categories.contains_key(name) {
                continue;
            }
            if let Some(category) = self.store.get_category(self.holder, name)? {
                categories.insert(name.to_string(), self.repaired(category));
            }
        }
        Ok(categories)
    }

    fn load_all(&self) -> Result<BTreeMap<String, SlotCategory>, SlotError> {
        Ok(self
            .store
            .get_categories(self.holder)?
            .into_iter()
            .map(|(name, category)| (name, self.repaired(category)))
            .collect())
    }

    fn repaired(&self, mut category: SlotCategory) -> SlotCategory {
        if !category.is_compact() {
            warn!(
                holder = %self.holder,
                category = category.name(),
                "stored numbered slots were not compact, compacting"
            );
            category.compact();
        }
        category
    }

    fn log_compaction(&self, category: &mut SlotCategory) {
        for moved in category.compact() {
            debug!(
                holder = %self.holder,
                category = category.name(),
                occupant = %moved.occupant,
                from = moved.from,
                to = moved.to,
                "renumbered"
            );
        }
    }
}
