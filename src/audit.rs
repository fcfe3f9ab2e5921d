use crate::persistence::SlotStore;
use crate::slots::id::HolderId;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HolderAudit {
    pub holder: Option<HolderId>,
    pub categories: usize,
    pub named_slots: usize,
    pub numbered_slots: u64,
    pub occupied_slots: usize,
    pub occupants: usize,
    pub violations: Vec<String>,
}

#[derive(Debug, Default)]
pub struct AuditReport {
    pub holders: Vec<HolderAudit>,
    pub errors: Vec<String>,
    pub missing: Vec<HolderId>,
}

impl AuditReport {
    pub fn violation_count(&self) -> usize {
        self.holders.iter().map(|audit| audit.violations.len()).sum()
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.violation_count() == 0
    }
}

/// Counts one holder's slots and lists every numbered pool with a vacancy
/// below an occupied slot.
pub fn audit_holder<S: SlotStore + ?Sized>(store: &S, holder: HolderId) -> Result<HolderAudit, String> {
    let categories = store
        .get_categories(holder)
        .map_err(|err| format!("holder {}: {}", holder, err))?;
    let mut audit = HolderAudit {
        holder: Some(holder),
        categories: categories.len(),
        ..HolderAudit::default()
    };
    let mut occupants = BTreeSet::new();
    for category in categories.values() {
        audit.named_slots += category.named_count();
        audit.numbered_slots += u64::from(category.anonymous_count());
        audit.occupied_slots += category.occupied_count();
        occupants.extend(category.iter().filter_map(|(_, occupant)| occupant));
        if !category.is_compact() {
            audit.violations.push(format!(
                "holder {} category '{}': vacant numbered slot below an occupied one",
                holder,
                category.name()
            ));
        }
    }
    audit.occupants = occupants.len();
    Ok(audit)
}

/// Audits `holders`, or every stored holder when the list is empty.
pub fn audit_store<S: SlotStore + ?Sized>(store: &S, holders: &[HolderId]) -> AuditReport {
    let mut report = AuditReport::default();
    let targets = if holders.is_empty() {
        match store.holders() {
            Ok(all) => all,
            Err(err) => {
                report.errors.push(err.to_string());
                return report;
            }
        }
    } else {
        let known: BTreeSet<HolderId> = match store.holders() {
            Ok(all) => all.into_iter().collect(),
            Err(err) => {
                report.errors.push(err.to_string());
                return report;
            }
        };
        report.missing = holders
            .iter()
            .filter(|holder| !known.contains(holder))
            .copied()
            .collect();
        holders.to_vec()
    };
    for holder in targets {
        match audit_holder(store, holder) {
            Ok(audit) => report.holders.push(audit),
            Err(err) => report.errors.push(err),
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::memory::MemoryStore;
    use crate::slots::category::SlotCategory;
    use crate::slots::id::{OccupantRef, SlotId};

    fn store() -> MemoryStore {
        let mut store = MemoryStore::new();
        let mut addons = SlotCategory::new("addons");
        addons.declare(["left"], 2);
        addons.bind(&SlotId::named("left"), OccupantRef(1));
        addons.bind(&SlotId::Anonymous(1), OccupantRef(1));
        store.set_category(HolderId(1), &addons).expect("seed");

        let mut gapped = SlotCategory::new("body");
        gapped.declare([], 2);
        gapped.bind(&SlotId::Anonymous(2), OccupantRef(2));
        store.set_category(HolderId(2), &gapped).expect("seed");
        store
    }

    #[test]
    fn counts_slots_and_occupants() {
        let audit = audit_holder(&store(), HolderId(1)).expect("audit");
        assert_eq!(audit.categories, 1);
        assert_eq!(audit.named_slots, 1);
        assert_eq!(audit.numbered_slots, 2);
        assert_eq!(audit.occupied_slots, 2);
        assert_eq!(audit.occupants, 1);
        assert!(audit.violations.is_empty());
    }

    #[test]
    fn reports_non_compact_pools_and_missing_holders() {
        let store = store();
        let report = audit_store(&store, &[]);
        assert_eq!(report.holders.len(), 2);
        assert_eq!(report.violation_count(), 1);
        assert!(!report.is_clean());

        let report = audit_store(&store, &[HolderId(1), HolderId(9)]);
        assert_eq!(report.missing, vec![HolderId(9)]);
        assert!(report.is_clean());
    }
}
