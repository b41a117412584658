use std::collections::HashSet;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::prediction::{FixtureId, Prediction, MAX_SCORE};
use crate::storage::Storage;
use crate::store::PredictionStore;

/// How a prediction set is scored, which decides what a random pick looks like.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMode {
    /// Exact scoreline, each side 0-9.
    #[default]
    Score,
    /// Home win, draw or away win.
    Outcome,
}

impl FromStr for ScoringMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "score" => Ok(ScoringMode::Score),
            "outcome" => Ok(ScoringMode::Outcome),
            other => Err(Error::Config(format!("unknown scoring mode '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOutcome {
    HomeWin,
    Draw,
    AwayWin,
}

impl MatchOutcome {
    /// Scoreline used to store a categorical pick.
    pub fn prediction(self) -> Prediction {
        match self {
            MatchOutcome::HomeWin => Prediction::new(1, 0),
            MatchOutcome::Draw => Prediction::new(0, 0),
            MatchOutcome::AwayWin => Prediction::new(0, 1),
        }
    }
}

/// Generated predictions waiting to be written over the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FillPlan {
    pub predictions: Vec<(FixtureId, Prediction)>,
}

impl FillPlan {
    pub fn generate<R: Rng + ?Sized>(ids: &[FixtureId], mode: ScoringMode, rng: &mut R) -> Self {
        let predictions = ids
            .iter()
            .map(|&id| {
                let prediction = match mode {
                    ScoringMode::Score => Prediction::new(
                        rng.gen_range(0..=MAX_SCORE),
                        rng.gen_range(0..=MAX_SCORE),
                    ),
                    ScoringMode::Outcome => {
                        let outcome = match rng.gen_range(0..3) {
                            0 => MatchOutcome::HomeWin,
                            1 => MatchOutcome::Draw,
                            _ => MatchOutcome::AwayWin,
                        };
                        outcome.prediction()
                    }
                };
                (id, prediction)
            })
            .collect();
        Self { predictions }
    }

    pub fn len(&self) -> usize {
        self.predictions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predictions.is_empty()
    }

    /// Overwrites every targeted fixture. No merge with existing values.
    pub fn apply<S: Storage>(&self, store: &mut PredictionStore<S>) -> Result<usize> {
        let mut written = 0;
        for &(id, prediction) in &self.predictions {
            if store.set(id, prediction)? {
                written += 1;
            }
        }
        Ok(written)
    }
}

/// Number of targeted fixtures that already hold a complete prediction, or
/// `None` when a fill would overwrite nothing.
pub fn needs_confirmation<S: Storage>(
    store: &PredictionStore<S>,
    ids: &[FixtureId],
) -> Result<Option<usize>> {
    let mut seen = HashSet::new();
    let mut existing = 0;
    for &id in ids {
        if seen.insert(id) && store.get(id)?.is_complete() {
            existing += 1;
        }
    }
    Ok((existing > 0).then_some(existing))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn score_mode_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let ids: Vec<FixtureId> = (0..200).collect();
        let plan = FillPlan::generate(&ids, ScoringMode::Score, &mut rng);

        assert_eq!(plan.len(), 200);
        assert!(plan.predictions.iter().all(|(_, p)| p.is_complete() && p.in_range()));
    }

    #[test]
    fn outcome_mode_picks_one_of_three() {
        let mut rng = StdRng::seed_from_u64(11);
        let ids: Vec<FixtureId> = (0..300).collect();
        let plan = FillPlan::generate(&ids, ScoringMode::Outcome, &mut rng);
        let allowed = [
            MatchOutcome::HomeWin.prediction(),
            MatchOutcome::Draw.prediction(),
            MatchOutcome::AwayWin.prediction(),
        ];

        assert!(plan.predictions.iter().all(|(_, p)| allowed.contains(p)));
        for outcome in allowed {
            assert!(plan.predictions.iter().any(|(_, p)| *p == outcome));
        }
    }

    #[test]
    fn confirmation_counts_complete_targets_only() {
        let mut store = PredictionStore::new();
        store.set(1, Prediction::new(1, 1)).unwrap();
        store.set(2, Prediction { home: Some(2), away: None }).unwrap();
        store.set(3, Prediction::new(0, 4)).unwrap();
        store.set(4, Prediction::new(2, 2)).unwrap();

        assert_eq!(needs_confirmation(&store, &[2, 5]).unwrap(), None);
        assert_eq!(needs_confirmation(&store, &[1, 2, 3]).unwrap(), Some(2));
        assert_eq!(needs_confirmation(&store, &[]).unwrap(), None);
    }

    #[test]
    fn confirmation_counts_repeated_targets_once() {
        let mut store = PredictionStore::new();
        store.set(1, Prediction::new(3, 1)).unwrap();

        assert_eq!(needs_confirmation(&store, &[1, 1, 1]).unwrap(), Some(1));
        assert_eq!(needs_confirmation(&store, &[2, 1, 2, 1]).unwrap(), Some(1));
    }

    #[test]
    fn apply_overwrites_existing() {
        let mut store = PredictionStore::new();
        store.set(1, Prediction::new(9, 9)).unwrap();
        let plan = FillPlan { predictions: vec![(1, Prediction::new(0, 1)), (2, Prediction::new(3, 0))] };

        assert_eq!(plan.apply(&mut store).unwrap(), 2);
        assert_eq!(store.get(1).unwrap(), Prediction::new(0, 1));
        assert_eq!(store.get(2).unwrap(), Prediction::new(3, 0));
    }

    #[test]
    fn scoring_mode_parses_case_insensitively() {
        assert_eq!(" Outcome ".parse::<ScoringMode>().unwrap(), ScoringMode::Outcome);
        assert!("goals".parse::<ScoringMode>().is_err());
    }
}
