//! Async driver that owns one prediction set and keeps it in sync.
//!
//! All store mutation happens synchronously under a short-lived lock; the
//! only suspension point is the batched save. The save runs in its own task
//! so an in-flight request always completes and its response is applied even
//! if the caller stops waiting or the engine is dropped.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use rand::Rng;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::client::{BatchSyncClient, SaveOutcome};
use crate::config::EngineConfig;
use crate::digit;
use crate::error::{Error, Result};
use crate::fill::{self, FillPlan};
use crate::merge::MergeReport;
use crate::prediction::{Fixture, FixtureId, Prediction, Side};
use crate::scheduler::{FlushReason, FlushSignal, SaveScheduler, SchedulerAction, SchedulerState};
use crate::storage::{MemoryStorage, Storage};
use crate::store::{PredictionStore, SyncStatus};
use crate::sync::{Changeset, SyncReport};

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Another flush was in flight; this trigger was coalesced into it.
    AlreadyInFlight,
    /// Nothing was dirty, no request was made.
    Empty,
    Synced(SyncReport),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FillOutcome {
    /// `existing` targeted fixtures already hold a complete prediction.
    NeedsConfirmation { existing: usize },
    Applied { count: usize },
}

/// Broadcast to subscribers so timer-driven flushes can surface results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    FlushStarted { entries: usize, reason: FlushReason },
    Flushed(SyncReport),
    FlushFailed { error: String },
}

struct Inner<S: Storage> {
    store: PredictionStore<S>,
    scheduler: SaveScheduler,
    timer: Option<JoinHandle<()>>,
}

impl<S: Storage> Inner<S> {
    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

struct Shared<S: Storage> {
    inner: Mutex<Inner<S>>,
    client: Arc<dyn BatchSyncClient>,
    config: EngineConfig,
    events: broadcast::Sender<SyncEvent>,
}

pub struct SyncEngine<S: Storage + Send + 'static = MemoryStorage> {
    shared: Arc<Shared<S>>,
}

impl SyncEngine<MemoryStorage> {
    /// Must be called from within a tokio runtime.
    pub fn new(client: Arc<dyn BatchSyncClient>, config: EngineConfig) -> Result<Self> {
        Self::with_store(PredictionStore::new(), client, config)
    }
}

impl<S: Storage + Send + 'static> SyncEngine<S> {
    pub fn with_store(
        store: PredictionStore<S>,
        client: Arc<dyn BatchSyncClient>,
        config: EngineConfig,
    ) -> Result<Self> {
        config.validate()?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let shared = Arc::new(Shared {
            inner: Mutex::new(Inner {
                store,
                scheduler: SaveScheduler::new(),
                timer: None,
            }),
            client,
            config,
            events,
        });
        Ok(Self { shared })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.shared.events.subscribe()
    }

    /// Folds a fresh fixture read into the store without losing unsynced
    /// edits. An empty collection clears the set and drops any pending
    /// debounce.
    pub fn load_fixtures(&self, fixtures: &[Fixture]) -> Result<MergeReport> {
        let mut inner = self.shared.lock();
        let report = inner.store.merge_fixtures(fixtures)?;
        if fixtures.is_empty() {
            inner.scheduler.cancel();
            inner.cancel_timer();
        }
        Ok(report)
    }

    /// Applies one raw text-change event from a score field and returns the
    /// digit now shown for that side.
    pub fn edit(&self, fixture_id: FixtureId, side: Side, raw: &str) -> Result<Option<u8>> {
        let mut inner = self.shared.lock();
        inner.store.ensure_editable(fixture_id)?;

        let current = inner.store.get(fixture_id)?.get(side);
        let value = digit::reconcile(raw, current);
        if value == current {
            return Ok(value);
        }

        inner.store.set_field(fixture_id, side, value)?;
        debug!(fixture_id, ?side, ?value, "field edited");
        self.shared.schedule(&mut inner);
        Ok(value)
    }

    pub fn set_prediction(&self, fixture_id: FixtureId, prediction: Prediction) -> Result<()> {
        let mut inner = self.shared.lock();
        inner.store.ensure_editable(fixture_id)?;
        if inner.store.get(fixture_id)? == prediction {
            return Ok(());
        }
        if inner.store.set(fixture_id, prediction)? {
            self.shared.schedule(&mut inner);
        }
        Ok(())
    }

    /// Forced flush: cancels the debounce and sends immediately, unless a
    /// request is already in flight.
    pub async fn flush(&self, signal: FlushSignal) -> Result<FlushOutcome> {
        let action = {
            let mut inner = self.shared.lock();
            let action = inner.scheduler.on_signal(signal);
            if action == SchedulerAction::Flush {
                inner.cancel_timer();
            }
            action
        };

        match action {
            SchedulerAction::Flush => {
                Arc::clone(&self.shared)
                    .run_flush(FlushReason::Signal(signal))
                    .await
            }
            _ => Ok(FlushOutcome::AlreadyInFlight),
        }
    }

    /// Last flush before the prediction set goes away.
    pub async fn teardown(self) -> Result<FlushOutcome> {
        self.flush(FlushSignal::Teardown).await
    }

    /// Bulk-fills `targets` (default: every loaded fixture still open).
    /// Locked fixtures are skipped. Without `confirmed`, a fill that would
    /// overwrite complete predictions is refused with the count at stake.
    pub fn random_fill<R: Rng + ?Sized>(
        &self,
        targets: Option<&[FixtureId]>,
        confirmed: bool,
        rng: &mut R,
    ) -> Result<FillOutcome> {
        let mut inner = self.shared.lock();
        let ids: Vec<FixtureId> = match targets {
            Some(ids) => {
                let mut ids: Vec<_> = ids
                    .iter()
                    .copied()
                    .filter(|&id| inner.store.ensure_editable(id).is_ok())
                    .collect();
                ids.sort_unstable();
                ids.dedup();
                ids
            }
            None => inner.store.open_fixtures(),
        };

        if !confirmed {
            if let Some(existing) = fill::needs_confirmation(&inner.store, &ids)? {
                return Ok(FillOutcome::NeedsConfirmation { existing });
            }
        }

        let plan = FillPlan::generate(&ids, self.shared.config.scoring_mode, rng);
        let count = plan.apply(&mut inner.store)?;
        info!(count, mode = ?self.shared.config.scoring_mode, "random fill applied");
        if count > 0 {
            self.shared.schedule(&mut inner);
        }
        Ok(FillOutcome::Applied { count })
    }

    pub fn prediction(&self, fixture_id: FixtureId) -> Result<Prediction> {
        self.shared.lock().store.get(fixture_id)
    }

    pub fn status(&self, fixture_id: FixtureId) -> Result<SyncStatus> {
        self.shared.lock().store.status(fixture_id)
    }

    pub fn is_synced(&self, fixture_id: FixtureId) -> Result<bool> {
        Ok(self.status(fixture_id)? == SyncStatus::Synced)
    }

    pub fn is_flushing(&self) -> bool {
        self.shared.lock().scheduler.is_flushing()
    }

    pub fn scheduler_state(&self) -> SchedulerState {
        self.shared.lock().scheduler.state()
    }

    /// What the next flush would send, computed now.
    pub fn pending_changes(&self) -> Result<Changeset> {
        Changeset::diff(&self.shared.lock().store)
    }

    /// Fixtures whose local value differs from the snapshot, incomplete ones included.
    pub fn dirty_count(&self) -> Result<usize> {
        let inner = self.shared.lock();
        let mut count = 0;
        for id in inner.store.fixture_ids()? {
            if inner.store.is_dirty(id)? {
                count += 1;
            }
        }
        Ok(count)
    }
}

impl<S: Storage + Send + 'static> Drop for SyncEngine<S> {
    fn drop(&mut self) {
        self.shared.lock().cancel_timer();
    }
}

impl<S: Storage + Send + 'static> Shared<S> {
    fn lock(&self) -> MutexGuard<'_, Inner<S>> {
        // Every critical section leaves the store consistent.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn schedule(self: &Arc<Self>, inner: &mut Inner<S>) {
        if let SchedulerAction::ArmTimer { generation } = inner.scheduler.on_edit() {
            self.arm_timer(inner, generation);
        }
    }

    fn arm_timer(self: &Arc<Self>, inner: &mut Inner<S>, generation: u64) {
        inner.cancel_timer();
        let weak: Weak<Self> = Arc::downgrade(self);
        // The quiet period runs from the edit, not from the task's first poll.
        let deadline = Instant::now() + self.config.debounce;
        inner.timer = Some(tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if let Some(shared) = weak.upgrade() {
                shared.on_timer(generation).await;
            }
        }));
    }

    async fn on_timer(self: Arc<Self>, generation: u64) {
        let action = {
            let mut inner = self.lock();
            let action = inner.scheduler.on_timer(generation);
            if action == SchedulerAction::Flush {
                // Detach rather than abort: this is the running task.
                inner.timer = None;
            }
            action
        };

        if action == SchedulerAction::Flush {
            if let Err(e) = self.run_flush(FlushReason::Debounce).await {
                debug!(error = %e, "debounced flush failed");
            }
        }
    }

    /// Runs one flush. The scheduler must already be in `Flushing`.
    async fn run_flush(self: Arc<Self>, reason: FlushReason) -> Result<FlushOutcome> {
        let changeset = {
            let mut inner = self.lock();
            match Changeset::diff(&inner.store) {
                Ok(changeset) if changeset.is_empty() => {
                    debug!(?reason, "nothing to flush");
                    self.complete_flush(&mut inner);
                    return Ok(FlushOutcome::Empty);
                }
                Ok(changeset) => changeset,
                Err(e) => {
                    self.complete_flush(&mut inner);
                    return Err(e);
                }
            }
        };

        debug!(?reason, entries = changeset.len(), "flushing predictions");
        let _ = self.events.send(SyncEvent::FlushStarted {
            entries: changeset.len(),
            reason,
        });

        let shared = Arc::clone(&self);
        let request = tokio::spawn(async move {
            let result = shared.client.save(&changeset.entries).await;
            shared.handle_response(&changeset, result)
        });

        match request.await {
            Ok(outcome) => outcome,
            Err(e) => {
                let mut inner = self.lock();
                self.complete_flush(&mut inner);
                let error = Error::Transport(format!("flush task failed: {e}"));
                let _ = self.events.send(SyncEvent::FlushFailed { error: error.to_string() });
                Err(error)
            }
        }
    }

    fn handle_response(
        self: &Arc<Self>,
        sent: &Changeset,
        result: Result<SaveOutcome>,
    ) -> Result<FlushOutcome> {
        let mut inner = self.lock();
        let outcome = result.and_then(|outcome| inner.store.acknowledge(sent, &outcome));

        let flushed = match outcome {
            Ok(report) => {
                info!(
                    saved = report.saved.len(),
                    rejected = report.rejected.len(),
                    stale = report.stale,
                    "flush complete"
                );
                let _ = self.events.send(SyncEvent::Flushed(report.clone()));
                Ok(FlushOutcome::Synced(report))
            }
            Err(e) => {
                warn!(error = %e, entries = sent.len(), "flush failed, batch stays dirty");
                let _ = self.events.send(SyncEvent::FlushFailed { error: e.to_string() });
                Err(e)
            }
        };

        self.complete_flush(&mut inner);
        flushed
    }

    fn complete_flush(self: &Arc<Self>, inner: &mut Inner<S>) {
        if let SchedulerAction::ArmTimer { generation } = inner.scheduler.on_flush_complete() {
            debug!("edits arrived during flush, re-arming debounce");
            self.arm_timer(inner, generation);
        }
    }
}
