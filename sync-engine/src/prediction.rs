use std::fmt;

use serde::{Deserialize, Serialize};

pub type FixtureId = i64;

/// Largest score a single side can hold; the input widget shows one digit.
pub const MAX_SCORE: u8 = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Home,
    Away,
}

/// A predicted scoreline. Either side may still be blank while the user types.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Prediction {
    pub home: Option<u8>,
    pub away: Option<u8>,
}

impl Prediction {
    pub const EMPTY: Prediction = Prediction { home: None, away: None };

    pub fn new(home: u8, away: u8) -> Self {
        Self { home: Some(home), away: Some(away) }
    }

    pub fn is_complete(&self) -> bool {
        self.home.is_some() && self.away.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.home.is_none() && self.away.is_none()
    }

    pub fn get(&self, side: Side) -> Option<u8> {
        match side {
            Side::Home => self.home,
            Side::Away => self.away,
        }
    }

    /// Copy with one side replaced, the other preserved.
    pub fn with(self, side: Side, value: Option<u8>) -> Self {
        match side {
            Side::Home => Self { home: value, ..self },
            Side::Away => Self { away: value, ..self },
        }
    }

    pub fn in_range(&self) -> bool {
        self.home.map_or(true, |v| v <= MAX_SCORE) && self.away.map_or(true, |v| v <= MAX_SCORE)
    }

    pub(crate) fn to_entry(self, fixture_id: FixtureId) -> Option<PredictionEntry> {
        match (self.home, self.away) {
            (Some(home), Some(away)) => Some(PredictionEntry { fixture_id, home, away }),
            _ => None,
        }
    }
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = |v: Option<u8>| v.map_or_else(|| "_".to_string(), |v| v.to_string());
        write!(f, "{}-{}", side(self.home), side(self.away))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixtureState {
    NotStarted,
    Live,
    Finished,
    Cancelled,
}

impl FixtureState {
    /// Only matches that have not kicked off accept predictions.
    pub fn is_open(self) -> bool {
        matches!(self, FixtureState::NotStarted)
    }
}

/// A match as delivered by the fixture catalog. Read-only to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fixture {
    pub id: FixtureId,
    pub state: FixtureState,
    #[serde(default)]
    pub prediction: Option<Prediction>,
}

impl Fixture {
    pub fn new(id: FixtureId, state: FixtureState) -> Self {
        Self { id, state, prediction: None }
    }

    pub fn with_prediction(mut self, prediction: Prediction) -> Self {
        self.prediction = Some(prediction);
        self
    }
}

/// One complete prediction as sent to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionEntry {
    pub fixture_id: FixtureId,
    pub home: u8,
    pub away: u8,
}

impl PredictionEntry {
    pub fn prediction(&self) -> Prediction {
        Prediction::new(self.home, self.away)
    }
}
