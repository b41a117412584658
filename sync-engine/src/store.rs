use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::prediction::{FixtureId, FixtureState, Prediction, Side};
use crate::storage::{MemoryStorage, Storage};

/// Derived synchronization state of one fixture. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Pending value equals the last acknowledged value.
    Synced,
    /// Differs from the snapshot and will go out with the next flush.
    Dirty,
    /// Differs from the snapshot but one side is blank; held back.
    Incomplete,
    /// The server refused exactly this value.
    Rejected,
}

/// Pending local predictions layered over the last server-acknowledged
/// snapshot, scoped to one prediction set.
pub struct PredictionStore<S: Storage = MemoryStorage> {
    storage: S,
    states: HashMap<FixtureId, FixtureState>,
    rejected: HashMap<FixtureId, Prediction>,
}

impl PredictionStore<MemoryStorage> {
    pub fn new() -> Self {
        Self::with_storage(MemoryStorage::new())
    }
}

impl Default for PredictionStore<MemoryStorage> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Storage> PredictionStore<S> {
    pub fn with_storage(storage: S) -> Self {
        Self {
            storage,
            states: HashMap::new(),
            rejected: HashMap::new(),
        }
    }

    /// Current value shown to the user; blank when the fixture is unknown.
    pub fn get(&self, id: FixtureId) -> Result<Prediction> {
        Ok(self.storage.pending(id)?.unwrap_or(Prediction::EMPTY))
    }

    /// Last acknowledged value, blank if the server never held one.
    pub fn snapshot(&self, id: FixtureId) -> Result<Prediction> {
        Ok(self.storage.snapshot(id)?.unwrap_or(Prediction::EMPTY))
    }

    /// Full replace. Out-of-range scores are dropped and `false` is returned.
    pub fn set(&mut self, id: FixtureId, prediction: Prediction) -> Result<bool> {
        if !prediction.in_range() {
            debug!(fixture_id = id, %prediction, "ignoring out-of-range prediction");
            return Ok(false);
        }
        self.storage.set_pending(id, prediction)?;
        Ok(true)
    }

    pub fn set_field(&mut self, id: FixtureId, side: Side, value: Option<u8>) -> Result<bool> {
        let current = self.get(id)?;
        self.set(id, current.with(side, value))
    }

    pub fn status(&self, id: FixtureId) -> Result<SyncStatus> {
        let pending = self.get(id)?;
        if pending == self.snapshot(id)? {
            return Ok(SyncStatus::Synced);
        }
        if !pending.is_complete() {
            return Ok(SyncStatus::Incomplete);
        }
        if self.rejected.get(&id) == Some(&pending) {
            return Ok(SyncStatus::Rejected);
        }
        Ok(SyncStatus::Dirty)
    }

    pub fn is_dirty(&self, id: FixtureId) -> Result<bool> {
        Ok(self.get(id)? != self.snapshot(id)?)
    }

    pub fn fixture_ids(&self) -> Result<Vec<FixtureId>> {
        self.storage.fixture_ids()
    }

    pub fn len(&self) -> Result<usize> {
        self.storage.len()
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.storage.len()? == 0)
    }

    pub fn fixture_state(&self, id: FixtureId) -> Option<FixtureState> {
        self.states.get(&id).copied()
    }

    /// Fixtures loaded from the catalog that still accept predictions.
    pub fn open_fixtures(&self) -> Vec<FixtureId> {
        let mut ids: Vec<_> = self
            .states
            .iter()
            .filter(|(_, state)| state.is_open())
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Fails for fixtures the catalog reports as started or over.
    /// Fixtures never loaded are treated as open.
    pub fn ensure_editable(&self, id: FixtureId) -> Result<()> {
        match self.fixture_state(id) {
            Some(state) if !state.is_open() => Err(Error::FixtureLocked { fixture_id: id, state }),
            _ => Ok(()),
        }
    }

    pub(crate) fn storage(&self) -> &S {
        &self.storage
    }

    pub(crate) fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub(crate) fn set_fixture_state(&mut self, id: FixtureId, state: FixtureState) {
        self.states.insert(id, state);
    }

    pub(crate) fn mark_rejected(&mut self, id: FixtureId, prediction: Prediction) {
        self.rejected.insert(id, prediction);
    }

    pub(crate) fn clear_rejected(&mut self, id: FixtureId) {
        self.rejected.remove(&id);
    }

    pub(crate) fn remove(&mut self, id: FixtureId) -> Result<()> {
        self.states.remove(&id);
        self.rejected.remove(&id);
        self.storage.remove(id)
    }

    pub(crate) fn clear(&mut self) -> Result<()> {
        self.states.clear();
        self.rejected.clear();
        self.storage.clear()
    }
}
