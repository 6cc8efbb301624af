pub mod event;
pub mod run;

pub use event::{CrewEvent, RunEvent};
pub use run::{Run, TaskOutput};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type RunId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Running,
    Completed,
    Failed,
}

impl RunState {
    pub fn as_str(&self) -> &str {
        match self {
            RunState::Running => "Running",
            RunState::Completed => "Completed",
            RunState::Failed => "Failed",
        }
    }

    pub fn is_finished(&self) -> bool {
        !matches!(self, RunState::Running)
    }
}

/// Which tool wiring a blog crew runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Search API called in-process.
    Direct,
    /// Research tools served by a remote MCP server.
    Mcp,
}

impl Variant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Direct => "direct",
            Variant::Mcp => "mcp",
        }
    }

    /// Download file name for a finished post on this topic.
    pub fn download_filename(&self, topic: &str) -> String {
        let stem = sanitize_filename_stem(topic.trim());
        match self {
            Variant::Direct => format!("{}_blog_post.md", stem),
            Variant::Mcp => format!("{}_blog.md", stem.to_lowercase()),
        }
    }
}

fn sanitize_filename_stem(topic: &str) -> String {
    let stem: String = topic
        .chars()
        .filter_map(|c| match c {
            ' ' => Some('_'),
            c if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' => Some(c),
            _ => None,
        })
        .collect();
    let stem = stem.trim_matches('.');
    if stem.is_empty() {
        "untitled".to_string()
    } else {
        stem.to_string()
    }
}
