use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::RunStore;
use crate::types::{Run, RunEvent, RunId};

#[derive(Clone, Default)]
pub struct InMemoryRunStore {
    runs: Arc<RwLock<HashMap<RunId, Run>>>,
}

impl InMemoryRunStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("run store lock poisoned")
}

impl RunStore for InMemoryRunStore {
    fn create_run(&self, run: Run) -> Result<()> {
        let mut runs = self.runs.write().map_err(poisoned)?;
        if runs.contains_key(&run.id) {
            return Err(anyhow!("Run {} already exists", run.id));
        }
        runs.insert(run.id, run);
        Ok(())
    }

    fn get_run(&self, run_id: &RunId) -> Result<Option<Run>> {
        let runs = self.runs.read().map_err(poisoned)?;
        Ok(runs.get(run_id).cloned())
    }

    fn update_run(&self, run: Run) -> Result<()> {
        let mut runs = self.runs.write().map_err(poisoned)?;
        match runs.get_mut(&run.id) {
            Some(existing) => {
                *existing = run;
                Ok(())
            }
            None => Err(anyhow!("Run {} not found", run.id)),
        }
    }

    fn list_runs(&self) -> Result<Vec<Run>> {
        let runs = self.runs.read().map_err(poisoned)?;
        let mut all: Vec<Run> = runs.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }

    fn append_event(&self, event: RunEvent) -> Result<()> {
        let mut runs = self.runs.write().map_err(poisoned)?;
        let run = runs
            .get_mut(&event.run_id)
            .ok_or_else(|| anyhow!("Run {} not found", event.run_id))?;
        run.events.push(event);
        Ok(())
    }
}
