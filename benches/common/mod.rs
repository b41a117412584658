#![allow(dead_code)]

use sync_engine::{Fixture, FixtureId, FixtureState, Prediction, PredictionStore};

pub fn prediction_for(idx: usize) -> Prediction {
    Prediction::new((idx % 5) as u8, (idx * 7 % 4) as u8)
}

pub fn state_for(idx: usize) -> FixtureState {
    match idx % 10 {
        0 => FixtureState::Finished,
        1 => FixtureState::Live,
        _ => FixtureState::NotStarted,
    }
}

/// A matchday catalog where every fixture already carries a saved prediction.
pub fn create_fixtures(count: usize) -> Vec<Fixture> {
    (0..count)
        .map(|i| Fixture::new(i as FixtureId, state_for(i)).with_prediction(prediction_for(i)))
        .collect()
}

pub fn create_store(count: usize) -> PredictionStore {
    let mut store = PredictionStore::new();
    store.merge_fixtures(&create_fixtures(count)).unwrap();
    store
}

/// Store with every `stride`-th open fixture edited locally.
pub fn create_dirty_store(count: usize, stride: usize) -> PredictionStore {
    let mut store = create_store(count);
    for id in store.open_fixtures().into_iter().step_by(stride.max(1)) {
        let edited = prediction_for(id as usize + 1);
        store.set(id, Prediction::new(edited.home.unwrap_or(0), 9)).unwrap();
    }
    store
}
