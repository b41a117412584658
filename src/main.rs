//! Prediction sync demo
//!
//! Runs a headless session against an in-process server:
//! - score fields receiving raw keystrokes, including overwrite bursts
//! - edits coalesced by the debounce into one batched save
//! - a fixture kicking off between the load and the save (partial rejection)
//! - a background refresh that must not clobber unsynced edits
//! - random fill with the overwrite confirmation gate
//!
//! Set `RUST_LOG=debug` to watch the scheduler.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::SeedableRng;
use sync_engine::{
    BatchSyncClient, EngineConfig, FillOutcome, Fixture, FixtureId, FixtureState, FlushOutcome,
    FlushSignal, Prediction, PredictionEntry, Result, SaveOutcome, SaveRequest, Side, SyncEngine,
    SyncEvent,
};

/// Accepts predictions for fixtures that have not started. Requests pass
/// through the JSON wire format so the demo exercises the same payloads a
/// real endpoint would see.
#[derive(Default)]
struct SimulatedServer {
    states: Mutex<HashMap<FixtureId, FixtureState>>,
    saved: Mutex<HashMap<FixtureId, Prediction>>,
}

impl SimulatedServer {
    fn with_fixtures(fixtures: &[(FixtureId, FixtureState)]) -> Self {
        let server = Self::default();
        server.lock_states().extend(fixtures.iter().copied());
        server
    }

    fn lock_states(&self) -> std::sync::MutexGuard<'_, HashMap<FixtureId, FixtureState>> {
        self.states.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_saved(&self) -> std::sync::MutexGuard<'_, HashMap<FixtureId, Prediction>> {
        self.saved.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn kick_off(&self, id: FixtureId) {
        self.lock_states().insert(id, FixtureState::Live);
    }

    fn fixtures(&self) -> Vec<Fixture> {
        let states = self.lock_states();
        let saved = self.lock_saved();
        let mut fixtures: Vec<Fixture> = states
            .iter()
            .map(|(&id, &state)| Fixture {
                id,
                state,
                prediction: saved.get(&id).copied(),
            })
            .collect();
        fixtures.sort_by_key(|f| f.id);
        fixtures
    }
}

#[async_trait]
impl BatchSyncClient for SimulatedServer {
    async fn save(&self, entries: &[PredictionEntry]) -> Result<SaveOutcome> {
        let body = SaveRequest { predictions: entries.to_vec() }.to_json()?;
        tokio::time::sleep(Duration::from_millis(40)).await;

        let request = SaveRequest::from_json(&body)?;
        let states = self.lock_states();
        let mut saved = self.lock_saved();
        let mut outcome = SaveOutcome::default();
        for entry in request.predictions {
            match states.get(&entry.fixture_id) {
                Some(state) if state.is_open() => {
                    saved.insert(entry.fixture_id, entry.prediction());
                    outcome.saved.push(entry.fixture_id);
                }
                _ => outcome.rejected.push(entry.fixture_id),
            }
        }

        let reply = outcome.to_json()?;
        SaveOutcome::from_json(&reply)
    }
}

fn print_board(engine: &SyncEngine, ids: &[FixtureId]) -> Result<()> {
    for &id in ids {
        println!(
            "  fixture {id:>3}  {:<5} {:?}",
            engine.prediction(id)?.to_string(),
            engine.status(id)?
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = EngineConfig::from_env().with_debounce(Duration::from_millis(300));
    let server = Arc::new(SimulatedServer::with_fixtures(&[
        (101, FixtureState::NotStarted),
        (102, FixtureState::NotStarted),
        (103, FixtureState::NotStarted),
        (104, FixtureState::Finished),
    ]));
    let ids: Vec<FixtureId> = vec![101, 102, 103, 104];

    let engine = SyncEngine::new(server.clone(), config)?;
    let mut events = engine.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                SyncEvent::FlushStarted { entries, reason } => {
                    println!("-> saving {entries} prediction(s) ({reason:?})")
                }
                SyncEvent::Flushed(report) => println!(
                    "<- saved {:?}, rejected {:?}",
                    report.saved, report.rejected
                ),
                SyncEvent::FlushFailed { error } => println!("<- save failed: {error}"),
            }
        }
    });

    let report = engine.load_fixtures(&server.fixtures())?;
    println!("loaded {} fixtures", report.inserted);

    println!("\ntyping scores (101: 2-1, 102: 0-3 typed as \"0\" then \"03\")");
    engine.edit(101, Side::Home, "2")?;
    engine.edit(101, Side::Away, "1")?;
    engine.edit(102, Side::Home, "0")?;
    engine.edit(102, Side::Away, "0")?;
    engine.edit(102, Side::Away, "03")?;
    engine.edit(103, Side::Home, "1")?;
    engine.edit(103, Side::Away, "1")?;
    if let Err(e) = engine.edit(104, Side::Home, "5") {
        println!("fixture 104 refused: {e}");
    }

    // Kickoff happens after the user typed but before the batch lands.
    server.kick_off(103);
    tokio::time::sleep(Duration::from_millis(500)).await;
    print_board(&engine, &ids)?;

    println!("\nrefresh while 101 has an unsynced edit");
    engine.edit(101, Side::Home, "24")?;
    let report = engine.load_fixtures(&server.fixtures())?;
    println!(
        "merge kept {} local edit(s), adopted {}",
        report.kept_local, report.adopted
    );
    let outcome = engine.flush(FlushSignal::KeyboardDismissed).await?;
    if let FlushOutcome::Synced(report) = outcome {
        println!("keyboard dismissed, {} acknowledged", report.total_acknowledged());
    }
    print_board(&engine, &ids)?;

    println!("\nrandom fill");
    let mut rng = StdRng::seed_from_u64(2024);
    if let FillOutcome::NeedsConfirmation { existing } = engine.random_fill(None, false, &mut rng)? {
        println!("{existing} prediction(s) would be overwritten, confirming");
        engine.random_fill(None, true, &mut rng)?;
    }
    print_board(&engine, &ids)?;

    let outcome = engine.teardown().await?;
    println!("\nteardown: {outcome:?}");

    let stored = server.fixtures();
    println!(
        "server state: {}",
        serde_json::to_string_pretty(&stored).map_err(sync_engine::Error::from)?
    );
    Ok(())
}
