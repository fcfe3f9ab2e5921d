pub mod file;
pub mod memory;

use crate::slots::category::SlotCategory;
use crate::slots::error::StoreError;
use crate::slots::id::{HolderId, OccupantRef};
use std::collections::BTreeMap;

/// Where a holder's slot categories live between commands.
///
/// The allocator reads through this on every call and writes only committed
/// changes. Implementations decide how (and whether) to cache.
pub trait SlotStore {
    fn holders(&self) -> Result<Vec<HolderId>, StoreError>;

    fn category_names(&self, holder: HolderId) -> Result<Vec<String>, StoreError>;

    fn get_category(&self, holder: HolderId, name: &str)
        -> Result<Option<SlotCategory>, StoreError>;

    fn set_category(&mut self, holder: HolderId, category: &SlotCategory)
        -> Result<(), StoreError>;

    fn remove_category(&mut self, holder: HolderId, name: &str)
        -> Result<Option<SlotCategory>, StoreError>;

    fn get_categories(&self, holder: HolderId) -> Result<BTreeMap<String, SlotCategory>, StoreError> {
        let mut categories = BTreeMap::new();
        for name in self.category_names(holder)? {
            if let Some(category) = self.get_category(holder, &name)? {
                categories.insert(name, category);
            }
        }
        Ok(categories)
    }

    /// Writes every updated category and drops every removed one as one
    /// change to the holder.
    fn commit(
        &mut self,
        holder: HolderId,
        updated: &[SlotCategory],
        removed: &[String],
    ) -> Result<(), StoreError> {
        for category in updated {
            self.set_category(holder, category)?;
        }
        for name in removed {
            self.remove_category(holder, name)?;
        }
        Ok(())
    }
}

impl<T: SlotStore + ?Sized> SlotStore for &mut T {
    fn holders(&self) -> Result<Vec<HolderId>, StoreError> {
        (**self).holders()
    }

    fn category_names(&self, holder: HolderId) -> Result<Vec<String>, StoreError> {
        (**self).category_names(holder)
    }

    fn get_category(
        &self,
        holder: HolderId,
        name: &str,
    ) -> Result<Option<SlotCategory>, StoreError> {
        (**self).get_category(holder, name)
    }

    fn set_category(&mut self, holder: HolderId, category: &SlotCategory) -> Result<(), StoreError> {
        (**self).set_category(holder, category)
    }

    fn remove_category(
        &mut self,
        holder: HolderId,
        name: &str,
    ) -> Result<Option<SlotCategory>, StoreError> {
        (**self).remove_category(holder, name)
    }

    fn get_categories(&self, holder: HolderId) -> Result<BTreeMap<String, SlotCategory>, StoreError> {
        (**self).get_categories(holder)
    }

    fn commit(
        &mut self,
        holder: HolderId,
        updated: &[SlotCategory],
        removed: &[String],
    ) -> Result<(), StoreError> {
        (**self).commit(holder, updated, removed)
    }
}

/// Every holder that has `occupant` in at least one slot.
pub fn holders_of<S: SlotStore + ?Sized>(
    store: &S,
    occupant: OccupantRef,
) -> Result<Vec<HolderId>, StoreError> {
    let mut found = Vec::new();
    for holder in store.holders()? {
        let categories = store.get_categories(holder)?;
        if categories
            .values()
            .any(|category| !category.slots_of(occupant).is_empty())
        {
            found.push(holder);
        }
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryStore;
    use super::*;
    use crate::slots::id::SlotId;

    #[test]
    fn holders_of_finds_every_holder_with_the_occupant() {
        let mut store = MemoryStore::new();
        let occupant = OccupantRef(5);
        for (holder, bound) in [(HolderId(1), true), (HolderId(2), false), (HolderId(3), true)] {
            let mut category = SlotCategory::new("body");
            category.declare(["torso"], 1);
            if bound {
                category.bind(&SlotId::Anonymous(1), occupant);
            }
            store.set_category(holder, &category).expect("set");
        }
        assert_eq!(
            holders_of(&store, occupant),
            Ok(vec![HolderId(1), HolderId(3)])
        );
        assert_eq!(holders_of(&store, OccupantRef(6)), Ok(Vec::new()));
    }
}
