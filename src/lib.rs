pub mod audit;
mod config;
pub mod persistence;
pub mod slots;
pub mod telemetry;

pub use persistence::file::FileStore;
pub use persistence::memory::MemoryStore;
pub use persistence::{holders_of, SlotStore};
pub use slots::allocator::{Allocator, Replaced, Vacancies};
pub use slots::category::SlotCategory;
pub use slots::error::{Shortfall, SlotError, StoreError};
pub use slots::id::{HolderId, OccupantRef, SlotId};
pub use slots::occupant::{spawn_attached, FallbackProvider, RequirementProvider, Spawner};
pub use slots::requirement::{RequirementEntry, SlotRequirement, SlotSelector};
pub use slots::{Bindings, Placement, SlotMap};

pub fn run(args: &[String]) -> Result<(), String> {
    let config = config::AppConfig::from_args(args)?;
    telemetry::logging::init(&config.root, &config.log_level)?;
    let store = FileStore::from_root(&config.root, config.cache_holders);
    let report = audit::audit_store(&store, &config.holders);

    let named: usize = report.holders.iter().map(|audit| audit.named_slots).sum();
    let numbered: u64 = report.holders.iter().map(|audit| audit.numbered_slots).sum();
    let occupied: usize = report.holders.iter().map(|audit| audit.occupied_slots).sum();
    tracing::info!(
        root = %config.root.display(),
        holders = report.holders.len(),
        violations = report.violation_count(),
        errors = report.errors.len(),
        "slot audit finished"
    );

    println!("slotkeeper: slot audit");
    println!("- root: {}", store.root().display());
    println!("- holders: {}", report.holders.len());
    println!("- named slots: {}", named);
    println!("- numbered slots: {}", numbered);
    println!("- occupied slots: {}", occupied);
    for holder in &report.missing {
        println!("- holder {} has no stored slots", holder);
    }
    for audit in &report.holders {
        for violation in &audit.violations {
            eprintln!("slotkeeper: {}", violation);
        }
    }
    for err in &report.errors {
        eprintln!("slotkeeper: {}", err);
    }

    if report.is_clean() {
        Ok(())
    } else {
        Err(format!(
            "slotkeeper: {} violation(s), {} unreadable holder(s)",
            report.violation_count(),
            report.errors.len()
        ))
    }
}
