//! Offline-first batched sync for match score predictions.
//!
//! Edits land in a [`PredictionStore`] immediately. The store remembers the
//! last server-acknowledged value per fixture, so "what needs saving" is
//! always a diff. A [`SyncEngine`] debounces edits into a single batched save,
//! honours forced flush signals, and never runs two saves at once.
//!
//! # Example
//! ```rust
//! use sync_engine::{Changeset, Fixture, FixtureState, Prediction, PredictionStore, SaveOutcome, Side, SyncStatus};
//!
//! let mut store = PredictionStore::new();
//! store
//!     .merge_fixtures(&[Fixture::new(7, FixtureState::NotStarted)])
//!     .unwrap();
//!
//! store.set_field(7, Side::Home, Some(2)).unwrap();
//! assert_eq!(store.status(7).unwrap(), SyncStatus::Incomplete);
//! store.set_field(7, Side::Away, Some(1)).unwrap();
//!
//! let changeset = Changeset::diff(&store).unwrap();
//! assert_eq!(changeset.len(), 1);
//!
//! let outcome = SaveOutcome::all_saved(&changeset.entries);
//! store.acknowledge(&changeset, &outcome).unwrap();
//! assert_eq!(store.get(7).unwrap(), Prediction::new(2, 1));
//! assert!(Changeset::diff(&store).unwrap().is_empty());
//! ```

mod client;
mod config;
mod digit;
mod engine;
mod error;
mod fill;
mod merge;
mod prediction;
mod scheduler;
mod storage;
mod store;
mod sync;

#[cfg(feature = "http")]
pub use client::HttpBatchClient;
pub use client::{BatchSyncClient, SaveOutcome, SaveRequest};
pub use config::{EngineConfig, DEFAULT_DEBOUNCE_MS};
pub use digit::reconcile;
pub use engine::{FillOutcome, FlushOutcome, SyncEngine, SyncEvent};
pub use error::{Error, Result};
pub use fill::{needs_confirmation, FillPlan, MatchOutcome, ScoringMode};
pub use merge::MergeReport;
pub use prediction::{Fixture, FixtureId, FixtureState, Prediction, PredictionEntry, Side, MAX_SCORE};
pub use scheduler::{FlushReason, FlushSignal, SaveScheduler, SchedulerAction, SchedulerState};
pub use storage::{MemoryStorage, Storage};
pub use store::{PredictionStore, SyncStatus};
pub use sync::{Changeset, SyncReport};
