use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;
use crate::prediction::{Fixture, FixtureId, Prediction};
use crate::storage::Storage;
use crate::store::PredictionStore;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeReport {
    /// Fixtures seen for the first time.
    pub inserted: usize,
    /// Known, clean fixtures that took the server value.
    pub adopted: usize,
    /// Fixtures whose unsynced local edit was preserved.
    pub kept_local: usize,
    /// Fixtures missing from the new collection.
    pub dropped: usize,
}

impl MergeReport {
    pub fn total_changes(&self) -> usize {
        self.inserted + self.adopted + self.dropped
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MergeDecision {
    Insert,
    Adopt,
    KeepLocal,
}

pub(crate) fn resolve_entry(pending: Option<Prediction>, snapshot: Prediction) -> MergeDecision {
    match pending {
        None => MergeDecision::Insert,
        Some(pending) if pending != snapshot => MergeDecision::KeepLocal,
        Some(_) => MergeDecision::Adopt,
    }
}

impl<S: Storage> PredictionStore<S> {
    /// Folds a freshly loaded fixture collection into the store.
    ///
    /// A server read never overwrites an unacknowledged local edit. Clean
    /// fixtures take the server prediction as both pending value and
    /// snapshot; fixtures absent from `fixtures` are dropped. An empty
    /// collection tears the store down.
    pub fn merge_fixtures(&mut self, fixtures: &[Fixture]) -> Result<MergeReport> {
        let mut report = MergeReport::default();

        if fixtures.is_empty() {
            report.dropped = self.len()?;
            self.clear()?;
            info!(dropped = report.dropped, "fixture collection empty, store cleared");
            return Ok(report);
        }

        let incoming: HashSet<FixtureId> = fixtures.iter().map(|f| f.id).collect();
        for id in self.fixture_ids()? {
            if !incoming.contains(&id) {
                self.remove(id)?;
                report.dropped += 1;
            }
        }

        for fixture in fixtures {
            self.set_fixture_state(fixture.id, fixture.state);
            let server = fixture.prediction.unwrap_or(Prediction::EMPTY);
            let pending = self.storage().pending(fixture.id)?;

            match resolve_entry(pending, self.snapshot(fixture.id)?) {
                MergeDecision::KeepLocal => {
                    debug!(fixture_id = fixture.id, "keeping unsynced local edit over server read");
                    report.kept_local += 1;
                }
                decision => {
                    let storage = self.storage_mut();
                    storage.set_pending(fixture.id, server)?;
                    storage.set_snapshot(fixture.id, server)?;
                    self.clear_rejected(fixture.id);
                    if decision == MergeDecision::Insert {
                        report.inserted += 1;
                    } else {
                        report.adopted += 1;
                    }
                }
            }
        }

        info!(
            inserted = report.inserted,
            adopted = report.adopted,
            kept_local = report.kept_local,
            dropped = report.dropped,
            "merged fixture collection"
        );
        Ok(report)
    }
}
