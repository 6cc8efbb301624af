use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DefinitionError {
    #[error("crew '{0}' has no tasks")]
    NoTasks(String),
    #[error("duplicate agent name '{0}'")]
    DuplicateAgent(String),
    #[error("duplicate task name '{0}'")]
    DuplicateTask(String),
    #[error("task '{task}' is assigned to unknown agent '{agent}'")]
    UnknownAgent { task: String, agent: String },
    #[error("task '{task}' uses '{context}' as context, which is not an earlier task")]
    InvalidContext { task: String, context: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolType {
    WebSearch,
    MultiEngineSearch,
    #[serde(rename = "extract_web_content_from_links")]
    ExtractWebContent,
    KeywordResearch,
}

impl ToolType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolType::WebSearch => "web_search",
            ToolType::MultiEngineSearch => "multi_engine_search",
            ToolType::ExtractWebContent => "extract_web_content_from_links",
            ToolType::KeywordResearch => "keyword_research",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "web_search" => Some(ToolType::WebSearch),
            "multi_engine_search" => Some(ToolType::MultiEngineSearch),
            "extract_web_content_from_links" => Some(ToolType::ExtractWebContent),
            "keyword_research" => Some(ToolType::KeywordResearch),
            _ => None,
        }
    }

    pub fn all() -> Vec<Self> {
        vec![
            ToolType::WebSearch,
            ToolType::MultiEngineSearch,
            ToolType::ExtractWebContent,
            ToolType::KeywordResearch,
        ]
    }

    /// The tools served by the research tool server.
    pub fn research_suite() -> Vec<Self> {
        vec![
            ToolType::MultiEngineSearch,
            ToolType::ExtractWebContent,
            ToolType::KeywordResearch,
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDefinition {
    pub name: String,
    pub role: String,
    pub goal: String,
    pub backstory: String,

    #[serde(default)]
    pub tools: Vec<ToolType>,
    #[serde(default)]
    pub allow_delegation: bool,

    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Upper bound on individual tool calls per task.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDefinition {
    pub name: String,
    pub description: String,
    pub expected_output: String,
    pub agent: String,
    #[serde(default)]
    pub context: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Process {
    #[default]
    Sequential,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrewDefinition {
    pub name: String,
    pub agents: Vec<AgentDefinition>,
    pub tasks: Vec<TaskDefinition>,
    #[serde(default)]
    pub process: Process,
}

fn default_temperature() -> f32 {
    0.4
}

fn default_max_iterations() -> usize {
    8
}

impl AgentDefinition {
    pub fn new(
        name: impl Into<String>,
        role: impl Into<String>,
        goal: impl Into<String>,
        backstory: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            goal: goal.into(),
            backstory: backstory.into(),
            tools: Vec::new(),
            allow_delegation: false,
            temperature: default_temperature(),
            max_iterations: default_max_iterations(),
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolType>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_delegation(mut self, allow: bool) -> Self {
        self.allow_delegation = allow;
        self
    }

    /// Substitutes `{key}` placeholders into the role, goal and backstory.
    pub fn render(&self, inputs: &HashMap<String, String>) -> AgentDefinition {
        AgentDefinition {
            role: interpolate(&self.role, inputs),
            goal: interpolate(&self.goal, inputs),
            backstory: interpolate(&self.backstory, inputs),
            ..self.clone()
        }
    }
}

impl TaskDefinition {
    /// Substitutes `{key}` placeholders from `inputs` into the task text.
    pub fn render(&self, inputs: &HashMap<String, String>) -> TaskDefinition {
        TaskDefinition {
            description: interpolate(&self.description, inputs),
            expected_output: interpolate(&self.expected_output, inputs),
            ..self.clone()
        }
    }
}

/// Single pass over the template: substituted values are never rescanned,
/// and unknown `{key}`s are left as written.
fn interpolate(template: &str, inputs: &HashMap<String, String>) -> String {
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        rendered.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let value = after
            .find('}')
            .and_then(|close| inputs.get(&after[..close]).map(|v| (close, v)));
        match value {
            Some((close, value)) => {
                rendered.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                rendered.push('{');
                rest = after;
            }
        }
    }
    rendered.push_str(rest);
    rendered
}

impl CrewDefinition {
    pub fn agent(&self, name: &str) -> Option<&AgentDefinition> {
        self.agents.iter().find(|a| a.name == name)
    }

    /// Tools used by any agent of the crew, in first-use order.
    pub fn required_tools(&self) -> Vec<ToolType> {
        let mut seen = Vec::new();
        for tool in self.agents.iter().flat_map(|a| a.tools.iter()) {
            if !seen.contains(tool) {
                seen.push(*tool);
            }
        }
        seen
    }

    pub fn validate(&self) -> Result<(), DefinitionError> {
        if self.tasks.is_empty() {
            return Err(DefinitionError::NoTasks(self.name.clone()));
        }

        let mut agent_names = HashSet::new();
        for agent in &self.agents {
            if !agent_names.insert(agent.name.as_str()) {
                return Err(DefinitionError::DuplicateAgent(agent.name.clone()));
            }
        }

        let mut earlier_tasks = HashSet::new();
        for task in &self.tasks {
            if earlier_tasks.contains(task.name.as_str()) {
                return Err(DefinitionError::DuplicateTask(task.name.clone()));
            }
            if !agent_names.contains(task.agent.as_str()) {
                return Err(DefinitionError::UnknownAgent {
                    task: task.name.clone(),
                    agent: task.agent.clone(),
                });
            }
            if let Some(bad) = task
                .context
                .iter()
                .find(|c| !earlier_tasks.contains(c.as_str()))
            {
                return Err(DefinitionError::InvalidContext {
                    task: task.name.clone(),
                    context: bad.clone(),
                });
            }
            earlier_tasks.insert(task.name.as_str());
        }

        Ok(())
    }
}
