use crate::persistence::SlotStore;
use crate::slots::allocator::Allocator;
use crate::slots::error::SlotError;
use crate::slots::id::OccupantRef;
use crate::slots::requirement::SlotSelector;
use crate::slots::Bindings;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// Looks up the slots an occupant declares it needs.
pub trait RequirementProvider {
    fn requirement(&self, occupant: OccupantRef) -> Option<SlotSelector>;
}

impl RequirementProvider for HashMap<OccupantRef, SlotSelector> {
    fn requirement(&self, occupant: OccupantRef) -> Option<SlotSelector> {
        self.get(&occupant).cloned()
    }
}

impl RequirementProvider for BTreeMap<OccupantRef, SlotSelector> {
    fn requirement(&self, occupant: OccupantRef) -> Option<SlotSelector> {
        self.get(&occupant).cloned()
    }
}

impl<F> RequirementProvider for F
where
    F: Fn(OccupantRef) -> Option<SlotSelector>,
{
    fn requirement(&self, occupant: OccupantRef) -> Option<SlotSelector> {
        self(occupant)
    }
}

/// Asks `primary` first and falls back to `secondary`, e.g. per-object
/// attributes over a type-wide default.
#[derive(Debug, Clone)]
pub struct FallbackProvider<P, S> {
    primary: P,
    secondary: S,
}

impl<P, S> FallbackProvider<P, S> {
    pub fn new(primary: P, secondary: S) -> Self {
        Self { primary, secondary }
    }
}

impl<P: RequirementProvider, S: RequirementProvider> RequirementProvider for FallbackProvider<P, S> {
    fn requirement(&self, occupant: OccupantRef) -> Option<SlotSelector> {
        self.primary
            .requirement(occupant)
            .or_else(|| self.secondary.requirement(occupant))
    }
}

/// Creates and destroys occupant objects. The allocator never does either.
pub trait Spawner {
    fn spawn(&mut self) -> Result<OccupantRef, String>;
    fn destroy(&mut self, occupant: OccupantRef);
}

#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("spawn failed: {0}")]
    Spawn(String),
    #[error("attach failed: {0}")]
    Attach(#[source] SlotError),
}

/// Spawns an occupant and attaches it where it naturally goes. If the
/// attach fails the new occupant is destroyed again.
pub fn spawn_attached<S, W, P>(
    allocator: &mut Allocator<S>,
    spawner: &mut W,
    provider: &P,
) -> Result<(OccupantRef, Bindings), SpawnError>
where
    S: SlotStore,
    W: Spawner + ?Sized,
    P: RequirementProvider + ?Sized,
{
    let occupant = spawner.spawn().map_err(SpawnError::Spawn)?;
    match allocator.attach_natural(occupant, provider) {
        Ok(bindings) => Ok((occupant, bindings)),
        Err(err) => {
            tracing::debug!(%occupant, error = %err, "destroying occupant that could not be attached");
            spawner.destroy(occupant);
            Err(SpawnError::Attach(err))
        }
    }
}
