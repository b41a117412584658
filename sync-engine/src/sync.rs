use std::collections::HashMap;

use tracing::{debug, warn};

use crate::client::SaveOutcome;
use crate::error::Result;
use crate::prediction::{FixtureId, PredictionEntry};
use crate::storage::Storage;
use crate::store::PredictionStore;

/// The complete, changed predictions that a flush sends to the server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Changeset {
    pub entries: Vec<PredictionEntry>,
}

impl Changeset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects every fixture whose pending value differs from its snapshot.
    /// Incomplete predictions are held back. Output is ordered by fixture id.
    ///
    /// A rejected value is still dirty, so it rides along with any later
    /// flush that something else triggers. Rejection alone never schedules
    /// one.
    pub fn diff<S: Storage>(store: &PredictionStore<S>) -> Result<Self> {
        let storage = store.storage();
        let mut entries = Vec::new();

        for id in storage.fixture_ids()? {
            let Some(pending) = storage.pending(id)? else {
                continue;
            };
            if pending == store.snapshot(id)? {
                continue;
            }
            if let Some(entry) = pending.to_entry(id) {
                entries.push(entry);
            }
        }

        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: FixtureId) -> Option<&PredictionEntry> {
        self.entries.iter().find(|e| e.fixture_id == id)
    }

    pub fn fixture_ids(&self) -> impl Iterator<Item = FixtureId> + '_ {
        self.entries.iter().map(|e| e.fixture_id)
    }
}

/// What one flush did to the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Fixtures whose sent value is now the snapshot.
    pub saved: Vec<FixtureId>,
    /// Fixtures the server refused; they stay dirty.
    pub rejected: Vec<FixtureId>,
    /// Acknowledged fixtures that left the store while the request was out.
    pub stale: usize,
    /// Ids in the response that were never part of the batch.
    pub unexpected: usize,
}

impl SyncReport {
    pub fn total_acknowledged(&self) -> usize {
        self.saved.len() + self.rejected.len()
    }

    pub fn has_rejections(&self) -> bool {
        !self.rejected.is_empty()
    }
}

impl<S: Storage> PredictionStore<S> {
    /// Applies a server response to the batch that produced it.
    ///
    /// Saved fixtures advance their snapshot to the value that was *sent*,
    /// so edits made while the request was in flight remain dirty. Rejected
    /// fixtures keep both pending value and snapshot.
    pub fn acknowledge(&mut self, sent: &Changeset, outcome: &SaveOutcome) -> Result<SyncReport> {
        let mut report = SyncReport::default();
        let sent_by_id: HashMap<FixtureId, &PredictionEntry> =
            sent.entries.iter().map(|e| (e.fixture_id, e)).collect();

        for &id in &outcome.saved {
            let Some(entry) = sent_by_id.get(&id) else {
                warn!(fixture_id = id, "server acknowledged a fixture that was not sent");
                report.unexpected += 1;
                continue;
            };
            if self.storage().pending(id)?.is_none() {
                debug!(fixture_id = id, "saved fixture left the store during flush");
                report.stale += 1;
                continue;
            }
            self.storage_mut().set_snapshot(id, entry.prediction())?;
            self.clear_rejected(id);
            report.saved.push(id);
        }

        for &id in &outcome.rejected {
            let Some(entry) = sent_by_id.get(&id) else {
                warn!(fixture_id = id, "server rejected a fixture that was not sent");
                report.unexpected += 1;
                continue;
            };
            if self.storage().pending(id)?.is_none() {
                report.stale += 1;
                continue;
            }
            self.mark_rejected(id, entry.prediction());
            report.rejected.push(id);
        }

        let answered = outcome.saved.len() + outcome.rejected.len();
        if answered < sent.len() {
            debug!(
                sent = sent.len(),
                answered,
                "server left some fixtures unanswered; they stay dirty"
            );
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prediction::{Prediction, Side};
    use crate::store::SyncStatus;

    fn store_with(entries: &[(FixtureId, Prediction, Prediction)]) -> PredictionStore {
        let mut store = PredictionStore::new();
        for &(id, pending, snapshot) in entries {
            store.storage_mut().set_snapshot(id, snapshot).unwrap();
            store.set(id, pending).unwrap();
        }
        store
    }

    fn outcome(saved: &[FixtureId], rejected: &[FixtureId]) -> SaveOutcome {
        SaveOutcome { saved: saved.to_vec(), rejected: rejected.to_vec() }
    }

    #[test]
    fn diff_skips_unchanged_and_incomplete() {
        let store = store_with(&[
            (1, Prediction::new(1, 0), Prediction::new(1, 0)),
            (2, Prediction::new(2, 2), Prediction::EMPTY),
            (3, Prediction { home: Some(3), away: None }, Prediction::EMPTY),
            (4, Prediction::new(0, 1), Prediction::new(0, 2)),
        ]);

        let changeset = Changeset::diff(&store).unwrap();
        let ids: Vec<_> = changeset.fixture_ids().collect();
        assert_eq!(ids, vec![2, 4]);
        assert_eq!(changeset.get(4).unwrap().away, 1);
    }

    #[test]
    fn diff_is_idempotent() {
        let store = store_with(&[
            (1, Prediction::new(4, 1), Prediction::EMPTY),
            (2, Prediction::new(2, 2), Prediction::new(1, 1)),
        ]);
        assert_eq!(Changeset::diff(&store).unwrap(), Changeset::diff(&store).unwrap());
    }

    #[test]
    fn saved_entries_leave_the_diff() {
        let mut store = store_with(&[
            (1, Prediction::new(4, 1), Prediction::EMPTY),
            (2, Prediction::new(2, 2), Prediction::new(1, 1)),
        ]);
        let sent = Changeset::diff(&store).unwrap();
        let report = store.acknowledge(&sent, &outcome(&[1, 2], &[])).unwrap();

        assert_eq!(report.saved, vec![1, 2]);
        assert!(Changeset::diff(&store).unwrap().is_empty());
        assert_eq!(store.status(1).unwrap(), SyncStatus::Synced);
    }

    #[test]
    fn rejected_entry_stays_in_diff_unchanged() {
        let mut store = store_with(&[
            (1, Prediction::new(4, 1), Prediction::EMPTY),
            (2, Prediction::new(2, 2), Prediction::new(1, 1)),
        ]);
        let sent = Changeset::diff(&store).unwrap();
        let report = store.acknowledge(&sent, &outcome(&[1], &[2])).unwrap();

        assert_eq!(report.rejected, vec![2]);
        assert_eq!(store.snapshot(2).unwrap(), Prediction::new(1, 1));
        let next = Changeset::diff(&store).unwrap();
        assert_eq!(next.entries, vec![PredictionEntry { fixture_id: 2, home: 2, away: 2 }]);
        assert_eq!(store.status(2).unwrap(), SyncStatus::Rejected);
    }

    #[test]
    fn snapshot_takes_sent_value_not_current() {
        let mut store = store_with(&[(1, Prediction::new(1, 0), Prediction::EMPTY)]);
        let sent = Changeset::diff(&store).unwrap();

        // User keeps typing while the request is out.
        store.set_field(1, Side::Home, Some(2)).unwrap();
        store.acknowledge(&sent, &outcome(&[1], &[])).unwrap();

        assert_eq!(store.snapshot(1).unwrap(), Prediction::new(1, 0));
        assert_eq!(store.get(1).unwrap(), Prediction::new(2, 0));
        assert_eq!(Changeset::diff(&store).unwrap().len(), 1);
    }

    #[test]
    fn unexpected_and_stale_ids_are_counted() {
        let mut store = store_with(&[
            (1, Prediction::new(1, 1), Prediction::EMPTY),
            (2, Prediction::new(2, 1), Prediction::EMPTY),
        ]);
        let sent = Changeset::diff(&store).unwrap();
        store.remove(2).unwrap();

        let report = store.acknowledge(&sent, &outcome(&[1, 2, 77], &[])).unwrap();
        assert_eq!(report.saved, vec![1]);
        assert_eq!(report.stale, 1);
        assert_eq!(report.unexpected, 1);
        assert!(store.storage().snapshot(2).unwrap().is_none());
    }

    #[test]
    fn large_mixed_response_is_matched_by_id() {
        let entries: Vec<_> = (0..2_000)
            .map(|id| (id, Prediction::new((id % 10) as u8, 1), Prediction::EMPTY))
            .collect();
        let mut store = store_with(&entries);
        let sent = Changeset::diff(&store).unwrap();

        // Answer in reverse order, every third fixture refused.
        let (rejected, saved): (Vec<FixtureId>, Vec<FixtureId>) =
            (0..2_000).rev().partition(|id| id % 3 == 0);
        let report = store.acknowledge(&sent, &outcome(&saved, &rejected)).unwrap();

        assert_eq!(report.saved.len(), saved.len());
        assert_eq!(report.rejected.len(), rejected.len());
        assert_eq!(report.unexpected, 0);
        assert_eq!(store.status(1_999).unwrap(), SyncStatus::Synced);
        assert_eq!(store.status(1_998).unwrap(), SyncStatus::Rejected);
        assert_eq!(store.snapshot(1_997).unwrap(), Prediction::new(7, 1));
    }
}
