use crate::persistence::SlotStore;
use crate::slots::category::SlotCategory;
use crate::slots::error::StoreError;
use crate::slots::id::HolderId;
use std::collections::BTreeMap;

/// Keeps every holder's categories in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    holders: BTreeMap<HolderId, BTreeMap<String, SlotCategory>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.holders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holders.is_empty()
    }
}

impl SlotStore for MemoryStore {
    fn holders(&self) -> Result<Vec<HolderId>, StoreError> {
        Ok(self.holders.keys().copied().collect())
    }

    fn category_names(&self, holder: HolderId) -> Result<Vec<String>, StoreError> {
        Ok(self
            .holders
            .get(&holder)
            .map(|categories| categories.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn get_category(
        &self,
        holder: HolderId,
        name: &str,
    ) -> Result<Option<SlotCategory>, StoreError> {
        Ok(self
            .holders
            .get(&holder)
            .and_then(|categories| categories.get(name))
            .cloned())
    }

    fn set_category(&mut self, holder: HolderId, category: &SlotCategory) -> Result<(), StoreError> {
        self.holders
            .entry(holder)
            .or_default()
            .insert(category.name().to_string(), category.clone());
        Ok(())
    }

    fn remove_category(
        &mut self,
        holder: HolderId,
        name: &str,
    ) -> Result<Option<SlotCategory>, StoreError> {
        let Some(categories) = self.holders.get_mut(&holder) else {
            return Ok(None);
        };
        let removed = categories.remove(name);
        if categories.is_empty() {
            self.holders.remove(&holder);
        }
        Ok(removed)
    }

    fn get_categories(&self, holder: HolderId) -> Result<BTreeMap<String, SlotCategory>, StoreError> {
        Ok(self.holders.get(&holder).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removing_last_category_forgets_holder() {
        let mut store = MemoryStore::new();
        let holder = HolderId(9);
        store
            .commit(
                holder,
                &[SlotCategory::new("addons"), SlotCategory::new("body")],
                &[],
            )
            .expect("commit");
        assert_eq!(store.category_names(holder), Ok(vec!["addons".to_string(), "body".to_string()]));
        assert_eq!(store.len(), 1);

        store
            .commit(holder, &[], &["addons".to_string(), "body".to_string()])
            .expect("commit");
        assert!(store.is_empty());
        assert_eq!(store.remove_category(holder, "addons"), Ok(None));
        assert_eq!(store.get_category(holder, "addons"), Ok(None));
    }
}
