mod memory;

pub use memory::MemoryStorage;

use crate::error::Result;
use crate::prediction::{FixtureId, Prediction};

/// Backing maps for one prediction set: the local pending value per fixture
/// and the last value the server acknowledged.
pub trait Storage {
    fn pending(&self, id: FixtureId) -> Result<Option<Prediction>>;
    fn set_pending(&mut self, id: FixtureId, prediction: Prediction) -> Result<()>;

    fn snapshot(&self, id: FixtureId) -> Result<Option<Prediction>>;
    fn set_snapshot(&mut self, id: FixtureId, prediction: Prediction) -> Result<()>;

    /// Drops both the pending entry and the snapshot for `id`.
    fn remove(&mut self, id: FixtureId) -> Result<()>;
    fn clear(&mut self) -> Result<()>;

    /// Every fixture with a pending entry, in ascending order.
    fn fixture_ids(&self) -> Result<Vec<FixtureId>>;
    fn len(&self) -> Result<usize>;
}
