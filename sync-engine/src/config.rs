use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::fill::ScoringMode;

pub const DEFAULT_DEBOUNCE_MS: u64 = 800;
const MIN_DEBOUNCE_MS: u64 = 50;
const MAX_DEBOUNCE_MS: u64 = 10_000;

const DEBOUNCE_ENV: &str = "PREDICTION_DEBOUNCE_MS";
const SCORING_MODE_ENV: &str = "PREDICTION_SCORING_MODE";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Quiet period after the last edit before a flush.
    #[serde(rename = "debounce_ms", with = "millis")]
    pub debounce: Duration,
    pub scoring_mode: ScoringMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            scoring_mode: ScoringMode::default(),
        }
    }
}

impl EngineConfig {
    /// Reads overrides from the environment; missing or unparsable values
    /// fall back to the defaults.
    pub fn from_env() -> Self {
        let debounce_ms = env::var(DEBOUNCE_ENV)
            .ok()
            .and_then(|val| val.parse::<u64>().ok())
            .unwrap_or(DEFAULT_DEBOUNCE_MS)
            .clamp(MIN_DEBOUNCE_MS, MAX_DEBOUNCE_MS);
        let scoring_mode = env::var(SCORING_MODE_ENV)
            .ok()
            .and_then(|val| val.parse::<ScoringMode>().ok())
            .unwrap_or_default();

        Self {
            debounce: Duration::from_millis(debounce_ms),
            scoring_mode,
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_scoring_mode(mut self, mode: ScoringMode) -> Self {
        self.scoring_mode = mode;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.debounce.is_zero() {
            return Err(Error::Config("debounce must be greater than zero".into()));
        }
        Ok(())
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
