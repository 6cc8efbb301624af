use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::RunId;

/// Progress emitted by a crew while it works through its tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CrewEvent {
    TaskStarted { task: String, agent: String },
    ToolUsed { task: String, tool: String, success: bool },
    TaskCompleted { task: String, agent: String },
    /// Terminal event, emitted once per run by the caller of the crew.
    Finished { success: bool, message: Option<String> },
}

impl CrewEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CrewEvent::Finished { .. })
    }

    pub fn describe(&self) -> String {
        match self {
            CrewEvent::TaskStarted { task, agent } => format!("{} started '{}'", agent, task),
            CrewEvent::ToolUsed { task, tool, success } => {
                let outcome = if *success { "ok" } else { "failed" };
                format!("'{}' used {} ({})", task, tool, outcome)
            }
            CrewEvent::TaskCompleted { task, agent } => format!("{} finished '{}'", agent, task),
            CrewEvent::Finished { success: true, .. } => "Blog post generated successfully!".to_string(),
            CrewEvent::Finished { success: false, message } => format!(
                "An error occurred: {}",
                message.as_deref().unwrap_or("unknown error")
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunEvent {
    pub run_id: RunId,
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: CrewEvent,
}

impl RunEvent {
    pub fn new(run_id: RunId, event: CrewEvent) -> Self {
        Self {
            run_id,
            at: Utc::now(),
            event,
        }
    }
}
