use anyhow::Result;

use crate::types::{Run, RunEvent, RunId};

pub mod memory;

pub use memory::InMemoryRunStore;

/// Where generation runs and their progress events are kept.
pub trait RunStore: Send + Sync {
    fn create_run(&self, run: Run) -> Result<()>;
    fn get_run(&self, run_id: &RunId) -> Result<Option<Run>>;
    fn update_run(&self, run: Run) -> Result<()>;
    /// Newest first.
    fn list_runs(&self) -> Result<Vec<Run>>;
    fn append_event(&self, event: RunEvent) -> Result<()>;
}
