use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{RunEvent, RunId, RunState, Variant};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskOutput {
    pub task: String,
    pub agent: String,
    pub output: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: RunId,
    pub topic: String,
    pub variant: Variant,
    pub state: RunState,
    pub task_outputs: Vec<TaskOutput>,
    pub markdown: Option<String>,
    pub error: Option<String>,
    pub events: Vec<RunEvent>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Run {
    pub fn new(topic: String, variant: Variant) -> Self {
        Self {
            id: RunId::new_v4(),
            topic,
            variant,
            state: RunState::Running,
            task_outputs: Vec::new(),
            markdown: None,
            error: None,
            events: Vec::new(),
            created_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn complete(&mut self, task_outputs: Vec<TaskOutput>, markdown: String) {
        self.state = RunState::Completed;
        self.task_outputs = task_outputs;
        self.markdown = Some(markdown);
        self.finished_at = Some(Utc::now());
    }

    pub fn fail(&mut self, error: String) {
        self.state = RunState::Failed;
        self.error = Some(error);
        self.finished_at = Some(Utc::now());
    }

    pub fn download_filename(&self) -> String {
        self.variant.download_filename(&self.topic)
    }
}
