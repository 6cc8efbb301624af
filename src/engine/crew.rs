use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::sync::Arc;

use super::executor::{AgentExecutor, ExecutorConfig};
use super::observer::{CrewObserver, NoopObserver};
use crate::definitions::{AgentDefinition, CrewDefinition, TaskDefinition};
use crate::providers::LLMProvider;
use crate::tools::runtime::ToolRuntime;
use crate::types::{CrewEvent, TaskOutput};

/// Everything a finished crew produced.
#[derive(Debug, Clone)]
pub struct CrewOutput {
    pub tasks: Vec<TaskOutput>,
    /// Output of the last task, without surrounding code fences.
    pub raw: String,
}

/// A crew definition bound to a model and a set of tools.
pub struct Crew {
    definition: CrewDefinition,
    executor: AgentExecutor,
}

impl Crew {
    pub fn new(
        definition: CrewDefinition,
        llm_provider: Arc<dyn LLMProvider>,
        tool_runtime: Arc<ToolRuntime>,
    ) -> Self {
        Self {
            definition,
            executor: AgentExecutor::new(llm_provider, tool_runtime, ExecutorConfig::default()),
        }
    }

    pub fn definition(&self) -> &CrewDefinition {
        &self.definition
    }

    pub async fn kickoff(&self, inputs: &HashMap<String, String>) -> Result<CrewOutput> {
        self.kickoff_with(inputs, &NoopObserver).await
    }

    /// Runs every task in order, reporting progress to `observer`.
    pub async fn kickoff_with(
        &self,
        inputs: &HashMap<String, String>,
        observer: &dyn CrewObserver,
    ) -> Result<CrewOutput> {
        self.definition.validate()?;
        self.check_tools()?;

        log::info!(
            "crew '{}' starting {} tasks",
            self.definition.name,
            self.definition.tasks.len()
        );

        let agents: Vec<AgentDefinition> = self
            .definition
            .agents
            .iter()
            .map(|a| a.render(inputs))
            .collect();

        let mut outputs: Vec<TaskOutput> = Vec::new();
        for task in &self.definition.tasks {
            let task = task.render(inputs);
            let agent = agents
                .iter()
                .find(|a| a.name == task.agent)
                .ok_or_else(|| anyhow!("Unknown agent '{}'", task.agent))?;

            observer.on_event(CrewEvent::TaskStarted {
                task: task.name.clone(),
                agent: agent.role.clone(),
            });
            log::info!("task '{}' assigned to {}", task.name, agent.role);

            let context = gather_context(&task, &outputs);
            let coworkers: Vec<&AgentDefinition> = agents
                .iter()
                .filter(|a| a.name != agent.name)
                .collect();

            let execution = self
                .executor
                .execute_task(agent, &task, &context, &coworkers, observer)
                .await?;

            log::info!(
                "task '{}' finished after {} tool calls ({} chars)",
                task.name,
                execution.tool_calls,
                execution.output.chars().count()
            );
            observer.on_event(CrewEvent::TaskCompleted {
                task: task.name.clone(),
                agent: agent.role.clone(),
            });

            outputs.push(TaskOutput {
                task: task.name.clone(),
                agent: agent.name.clone(),
                output: execution.output,
            });
        }

        let raw = outputs
            .last()
            .map(|o| strip_code_fences(&o.output))
            .unwrap_or_default();

        Ok(CrewOutput {
            tasks: outputs,
            raw,
        })
    }

    fn check_tools(&self) -> Result<()> {
        let runtime = self.executor.tool_runtime();
        for agent in &self.definition.agents {
            if let Some(missing) = agent.tools.iter().find(|t| !runtime.contains(t.as_str())) {
                return Err(anyhow!(
                    "Tool '{}' needed by {} is not available",
                    missing.as_str(),
                    agent.role
                ));
            }
        }
        Ok(())
    }
}

/// Outputs of the listed context tasks, or of every earlier task when none are listed.
fn gather_context(task: &TaskDefinition, outputs: &[TaskOutput]) -> String {
    outputs
        .iter()
        .filter(|o| task.context.is_empty() || task.context.contains(&o.task))
        .map(|o| o.output.trim())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Removes one pair of surrounding Markdown code fences, e.g. ```` ```markdown ... ``` ````.
pub fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => return trimmed.to_string(),
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
        .to_string()
}
