use std::collections::HashMap;

use super::Storage;
use crate::error::Result;
use crate::prediction::{FixtureId, Prediction};

#[derive(Debug, Default)]
pub struct MemoryStorage {
    pending: HashMap<FixtureId, Prediction>,
    snapshot: HashMap<FixtureId, Prediction>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn pending(&self, id: FixtureId) -> Result<Option<Prediction>> {
        Ok(self.pending.get(&id).copied())
    }

    fn set_pending(&mut self, id: FixtureId, prediction: Prediction) -> Result<()> {
        self.pending.insert(id, prediction);
        Ok(())
    }

    fn snapshot(&self, id: FixtureId) -> Result<Option<Prediction>> {
        Ok(self.snapshot.get(&id).copied())
    }

    fn set_snapshot(&mut self, id: FixtureId, prediction: Prediction) -> Result<()> {
        self.snapshot.insert(id, prediction);
        Ok(())
    }

    fn remove(&mut self, id: FixtureId) -> Result<()> {
        self.pending.remove(&id);
        self.snapshot.remove(&id);
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.pending.clear();
        self.snapshot.clear();
        Ok(())
    }

    fn fixture_ids(&self) -> Result<Vec<FixtureId>> {
        let mut ids: Vec<_> = self.pending.keys().copied().collect();
        ids.sort_unstable();
        Ok(ids)
    }

    fn len(&self) -> Result<usize> {
        Ok(self.pending.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remove_drops_both_maps() {
        let mut storage = MemoryStorage::new();
        storage.set_pending(1, Prediction::new(1, 0)).unwrap();
        storage.set_snapshot(1, Prediction::new(1, 0)).unwrap();
        storage.remove(1).unwrap();
        assert!(storage.pending(1).unwrap().is_none());
        assert!(storage.snapshot(1).unwrap().is_none());
    }

    #[test]
    fn fixture_ids_are_sorted_and_follow_pending() {
        let mut storage = MemoryStorage::new();
        storage.set_pending(9, Prediction::EMPTY).unwrap();
        storage.set_pending(2, Prediction::EMPTY).unwrap();
        storage.set_snapshot(5, Prediction::EMPTY).unwrap();
        assert_eq!(storage.fixture_ids().unwrap(), vec![2, 9]);
        assert_eq!(storage.len().unwrap(), 2);
    }
}
