use anyhow::{anyhow, Result};
use serde_json::Value;
use std::sync::Arc;

use super::observer::CrewObserver;
use crate::definitions::{AgentDefinition, TaskDefinition};
use crate::providers::{LLMProvider, Message};
use crate::tools::runtime::ToolRuntime;
use crate::tools::{ToolCall, ToolContext};
use crate::types::CrewEvent;

pub const DELEGATE_WORK: &str = "delegate_work";
pub const ASK_QUESTION: &str = "ask_question";

/// Configuration for the Agent Executor
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Tool output beyond this many characters is cut before it reaches the model.
    pub max_tool_output_chars: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_tool_output_chars: 8000,
        }
    }
}

/// Result of one task executed by one agent
#[derive(Debug, Clone)]
pub struct TaskExecution {
    pub output: String,
    pub tool_calls: usize,
}

/// Runs a single task for an agent: prompt, tool loop, final answer.
pub struct AgentExecutor {
    llm_provider: Arc<dyn LLMProvider>,
    tool_runtime: Arc<ToolRuntime>,
    config: ExecutorConfig,
}

impl AgentExecutor {
    pub fn new(
        llm_provider: Arc<dyn LLMProvider>,
        tool_runtime: Arc<ToolRuntime>,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            llm_provider,
            tool_runtime,
            config,
        }
    }

    pub fn tool_runtime(&self) -> &ToolRuntime {
        &self.tool_runtime
    }

    /// Execute a rendered task. `context` is the output of earlier tasks;
    /// `coworkers` are the agents this one may delegate to.
    pub async fn execute_task(
        &self,
        agent: &AgentDefinition,
        task: &TaskDefinition,
        context: &str,
        coworkers: &[&AgentDefinition],
        observer: &dyn CrewObserver,
    ) -> Result<TaskExecution> {
        let coworkers: &[&AgentDefinition] = if agent.allow_delegation { coworkers } else { &[] };

        let mut messages = vec![
            Message::system(self.build_system_prompt(agent, coworkers)),
            Message::user(build_task_prompt(task, context)),
        ];

        let tool_context = ToolContext::new(agent.name.as_str(), task.name.as_str());
        let budget = agent.max_iterations;
        let mut tool_calls = 0;

        loop {
            let response = self
                .llm_provider
                .complete_with_temperature(messages.clone(), agent.temperature)
                .await?;

            let calls = parse_tool_calls(&response);
            if calls.is_empty() {
                return Ok(TaskExecution {
                    output: clean_final_answer(&response),
                    tool_calls,
                });
            }

            if tool_calls >= budget {
                log::warn!(
                    "{} used all {} tool calls on '{}', forcing a final answer",
                    agent.name,
                    budget,
                    task.name
                );
                messages.push(Message::assistant(response));
                return Ok(TaskExecution {
                    output: self.force_final_answer(messages, agent).await?,
                    tool_calls,
                });
            }

            let mut tool_outputs = Vec::new();
            let mut skipped = 0;
            for call in calls {
                if tool_calls >= budget {
                    skipped += 1;
                    tool_outputs.push(format!(
                        "Tool {} result: Error: tool call budget exhausted, not executed",
                        call.name
                    ));
                    continue;
                }
                tool_calls += 1;
                let outcome = self
                    .dispatch(agent, &call, &tool_context, coworkers)
                    .await;

                let (success, text) = match outcome {
                    Ok((success, text)) => (success, text),
                    Err(e) => {
                        log::warn!("{} tool {} failed: {}", agent.name, call.name, e);
                        (false, format!("Error: {}", e))
                    }
                };
                observer.on_event(CrewEvent::ToolUsed {
                    task: task.name.clone(),
                    tool: call.name.clone(),
                    success,
                });
                tool_outputs.push(format!(
                    "Tool {} result: {}",
                    call.name,
                    truncate_chars(&text, self.config.max_tool_output_chars)
                ));
            }

            messages.push(Message::assistant(response));
            messages.push(Message::user(format!(
                "Tool execution results:\n{}",
                tool_outputs.join("\n")
            )));

            if skipped > 0 {
                log::warn!(
                    "{} asked for {} calls beyond its budget of {} on '{}', forcing a final answer",
                    agent.name,
                    skipped,
                    budget,
                    task.name
                );
                return Ok(TaskExecution {
                    output: self.force_final_answer(messages, agent).await?,
                    tool_calls,
                });
            }
        }
    }

    /// One last completion with tools off; tool-call lines in it are dropped.
    async fn force_final_answer(
        &self,
        mut messages: Vec<Message>,
        agent: &AgentDefinition,
    ) -> Result<String> {
        messages.push(Message::user(
            "You have used all of your tool calls. Reply now with your final answer only, without calling any tool.",
        ));
        let forced = self
            .llm_provider
            .complete_with_temperature(messages, agent.temperature)
            .await?;
        Ok(clean_final_answer(&strip_tool_call_lines(&forced)))
    }

    async fn dispatch(
        &self,
        agent: &AgentDefinition,
        call: &ToolCall,
        context: &ToolContext,
        coworkers: &[&AgentDefinition],
    ) -> Result<(bool, String)> {
        if !coworkers.is_empty() && (call.name == DELEGATE_WORK || call.name == ASK_QUESTION) {
            let answer = self.consult_coworker(call, coworkers).await?;
            return Ok((true, answer));
        }

        if !agent.tools.iter().any(|t| t.as_str() == call.name) {
            return Err(anyhow!(
                "Tool '{}' is not available to {}",
                call.name,
                agent.role
            ));
        }

        let result = self.tool_runtime.execute(call, context).await?;
        Ok((result.success, result.to_text()))
    }

    /// One completion by a coworker, speaking in its own persona, without tools.
    async fn consult_coworker(
        &self,
        call: &ToolCall,
        coworkers: &[&AgentDefinition],
    ) -> Result<String> {
        let wanted = call.params["coworker"]
            .as_str()
            .ok_or_else(|| anyhow!("Missing coworker"))?;
        let request = call.params["task"]
            .as_str()
            .or_else(|| call.params["question"].as_str())
            .ok_or_else(|| anyhow!("Missing task or question"))?;
        let context = call.params["context"].as_str().unwrap_or("");

        let coworker = find_coworker(coworkers, wanted).ok_or_else(|| {
            anyhow!(
                "Unknown coworker '{}'. Available: {}",
                wanted,
                coworkers
                    .iter()
                    .map(|c| c.role.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        })?;

        log::info!("{} consulted via {}", coworker.name, call.name);

        let mut prompt = request.to_string();
        if !context.trim().is_empty() {
            prompt.push_str(&format!("\n\nContext:\n{}", context));
        }
        let answer = self
            .llm_provider
            .complete_with_temperature(
                vec![
                    Message::system(persona(coworker)),
                    Message::user(prompt),
                ],
                coworker.temperature,
            )
            .await?;
        Ok(clean_final_answer(&answer))
    }

    fn build_system_prompt(&self, agent: &AgentDefinition, coworkers: &[&AgentDefinition]) -> String {
        let mut prompt = persona(agent);

        let schemas = self.tool_runtime.get_schemas(&agent.tools);
        if schemas.is_empty() && coworkers.is_empty() {
            return prompt;
        }

        prompt.push_str("\n\nYou have access to the following tools:\n");
        for schema in &schemas {
            prompt.push_str(&format!(
                "- {}: {}\n  parameters: {}\n",
                schema["name"].as_str().unwrap_or_default(),
                schema["description"].as_str().unwrap_or_default(),
                schema["parameters"]
            ));
        }
        if !coworkers.is_empty() {
            let roles = coworkers
                .iter()
                .map(|c| c.role.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            prompt.push_str(&format!(
                "- {}: Hand a piece of work to a coworker and get their result back.\n  \
                 parameters: {{\"coworker\": one of [{}], \"task\": string, \"context\": string}}\n",
                DELEGATE_WORK, roles
            ));
            prompt.push_str(&format!(
                "- {}: Ask a coworker a question.\n  \
                 parameters: {{\"coworker\": one of [{}], \"question\": string, \"context\": string}}\n",
                ASK_QUESTION, roles
            ));
        }

        prompt.push_str(
            "\nTo use a tool, put a single line of JSON on its own line:\n\
             {\"tool\": \"<tool name>\", \"params\": {...}}\n\
             Tool results arrive in the next message. Once you have what you need, \
             reply with the final answer only and no tool calls.",
        );
        prompt
    }
}

fn persona(agent: &AgentDefinition) -> String {
    format!(
        "You are {}. {}\nYour personal goal is: {}",
        agent.role,
        agent.backstory.trim(),
        agent.goal
    )
}

fn build_task_prompt(task: &TaskDefinition, context: &str) -> String {
    let mut prompt = format!(
        "Current task: {}\n\nYour final answer must meet this expectation: {}\n\
         Return the complete content itself, not a description of it.",
        task.description.trim(),
        task.expected_output.trim()
    );
    if !context.trim().is_empty() {
        prompt.push_str(&format!(
            "\n\nContext from earlier work:\n{}",
            context.trim()
        ));
    }
    prompt
}

fn find_coworker<'a>(
    coworkers: &[&'a AgentDefinition],
    wanted: &str,
) -> Option<&'a AgentDefinition> {
    let wanted = wanted.trim();
    coworkers
        .iter()
        .find(|c| c.role.eq_ignore_ascii_case(wanted) || c.name.eq_ignore_ascii_case(wanted))
        .copied()
}

/// Tool calls are single lines of the form `{"tool": "name", "params": {...}}`.
pub fn parse_tool_calls(response: &str) -> Vec<ToolCall> {
    response
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with('{') && line.contains("\"tool\""))
        .filter_map(|line| serde_json::from_str::<Value>(line).ok())
        .filter_map(|parsed| {
            let name = parsed.get("tool")?.as_str()?.to_string();
            let params = parsed
                .get("params")
                .cloned()
                .unwrap_or_else(|| Value::Object(Default::default()));
            Some(ToolCall { name, params })
        })
        .collect()
}

fn strip_tool_call_lines(response: &str) -> String {
    response
        .lines()
        .filter(|line| parse_tool_calls(line).is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn clean_final_answer(response: &str) -> String {
    let trimmed = response.trim();
    let prefix = "final answer:";
    if trimmed.len() >= prefix.len()
        && trimmed.is_char_boundary(prefix.len())
        && trimmed[..prefix.len()].eq_ignore_ascii_case(prefix)
    {
        trimmed[prefix.len()..].trim().to_string()
    } else {
        trimmed.to_string()
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}... [truncated]", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definitions::ToolType;
    use crate::engine::observer::NoopObserver;
    use crate::providers::search::MockSearchProvider;
    use crate::providers::ScriptedLLMProvider;
    use crate::tools::runtime::ToolConfig;
    use std::sync::Mutex;

    fn runtime() -> Arc<ToolRuntime> {
        Arc::new(
            ToolRuntime::new(ToolConfig {
                search_provider: Some(Arc::new(MockSearchProvider::new())),
                ..Default::default()
            })
            .unwrap(),
        )
    }

    fn task() -> TaskDefinition {
        TaskDefinition {
            name: "research".to_string(),
            description: "Research Rust".to_string(),
            expected_output: "Bullet points".to_string(),
            agent: "researcher".to_string(),
            context: vec![],
        }
    }

    fn researcher() -> AgentDefinition {
        AgentDefinition::new("researcher", "Researcher", "Find facts", "Careful.")
            .with_tools(vec![ToolType::WebSearch])
    }

    #[test]
    fn test_parse_tool_calls() {
        let response = "Let me search.\n{\"tool\": \"web_search\", \"params\": {\"query\": \"rust\"}}\n{\"tool\": \"keyword_research\"}\n{not json \"tool\"}";
        let calls = parse_tool_calls(response);
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].name, "web_search");
        assert_eq!(calls[0].params["query"], "rust");
        assert_eq!(calls[1].params, serde_json::json!({}));
    }

    #[test]
    fn test_clean_final_answer() {
        assert_eq!(clean_final_answer("  Final Answer: # Title\n"), "# Title");
        assert_eq!(clean_final_answer("FINAL ANSWER:x"), "x");
        assert_eq!(clean_final_answer("# Title"), "# Title");
        assert_eq!(clean_final_answer("é"), "é");
    }

    #[test]
    fn test_truncate_chars_marks_cut() {
        assert_eq!(truncate_chars("abcdef", 3), "abc... [truncated]");
        assert_eq!(truncate_chars("abc", 3), "abc");
    }

    #[tokio::test]
    async fn test_direct_answer_without_tools() {
        let llm = Arc::new(ScriptedLLMProvider::new(["Final Answer: - fact one"]));
        let executor = AgentExecutor::new(llm.clone(), runtime(), ExecutorConfig::default());

        let result = executor
            .execute_task(&researcher(), &task(), "", &[], &NoopObserver)
            .await
            .unwrap();

        assert_eq!(result.output, "- fact one");
        assert_eq!(result.tool_calls, 0);

        let prompt = &llm.prompts()[0];
        assert!(prompt[0].content.contains("You are Researcher."));
        assert!(prompt[0].content.contains("web_search"));
        assert!(prompt[1].content.contains("Research Rust"));
        assert!(!prompt[1].content.contains("Context from earlier work"));
    }

    #[tokio::test]
    async fn test_tool_round_feeds_results_back() {
        let llm = Arc::new(ScriptedLLMProvider::new([
            "{\"tool\": \"web_search\", \"params\": {\"query\": \"rust\", \"num_results\": 2}}",
            "- Rust is fast",
        ]));
        let executor = AgentExecutor::new(llm.clone(), runtime(), ExecutorConfig::default());

        let events = Mutex::new(Vec::new());
        let observer = |event: CrewEvent| events.lock().unwrap().push(event);

        let result = executor
            .execute_task(&researcher(), &task(), "earlier notes", &[], &observer)
            .await
            .unwrap();

        assert_eq!(result.output, "- Rust is fast");
        assert_eq!(result.tool_calls, 1);

        let second = &llm.prompts()[1];
        assert_eq!(second.len(), 4);
        assert!(second[3].content.starts_with("Tool execution results:"));
        assert!(second[3].content.contains("Mock Result 2 for rust"));
        assert!(second[1].content.contains("earlier notes"));

        assert_eq!(
            events.lock().unwrap().clone(),
            vec![CrewEvent::ToolUsed {
                task: "research".to_string(),
                tool: "web_search".to_string(),
                success: true
            }]
        );
    }

    #[tokio::test]
    async fn test_tool_errors_are_reported_not_fatal() {
        let llm = Arc::new(ScriptedLLMProvider::new([
            "{\"tool\": \"keyword_research\", \"params\": {\"topic\": \"x\"}}",
            "{\"tool\": \"web_search\", \"params\": {}}",
            "done",
        ]));
        let executor = AgentExecutor::new(llm.clone(), runtime(), ExecutorConfig::default());

        let result = executor
            .execute_task(&researcher(), &task(), "", &[], &NoopObserver)
            .await
            .unwrap();

        assert_eq!(result.output, "done");
        let prompts = llm.prompts();
        assert!(prompts[1][3].content.contains("not available"));
        assert!(prompts[2][5].content.contains("Error: Missing query"));
    }

    #[tokio::test]
    async fn test_budget_exhaustion_forces_final_answer() {
        let call = "{\"tool\": \"web_search\", \"params\": {\"query\": \"loop\"}}";
        let llm = Arc::new(
            ScriptedLLMProvider::new([call, call, call]).with_fallback(format!("Summary\n{}", call)),
        );
        let executor = AgentExecutor::new(llm.clone(), runtime(), ExecutorConfig::default());

        let mut agent = researcher();
        agent.max_iterations = 2;

        let result = executor
            .execute_task(&agent, &task(), "", &[], &NoopObserver)
            .await
            .unwrap();

        assert_eq!(result.tool_calls, 2);
        assert_eq!(result.output, "Summary");
        // Two single-call responses, the over-budget response, then the forced answer.
        assert_eq!(llm.call_count(), 4);
        let last = llm.prompts().last().unwrap().clone();
        assert!(last.last().unwrap().content.contains("used all of your tool calls"));
    }

    #[tokio::test]
    async fn test_budget_counts_each_call_in_a_response() {
        let call = "{\"tool\": \"web_search\", \"params\": {\"query\": \"many\"}}";
        let burst = vec![call; 5].join("\n");
        let llm = Arc::new(ScriptedLLMProvider::new([burst.as_str(), "Final Answer: - enough"]));
        let executor = AgentExecutor::new(llm.clone(), runtime(), ExecutorConfig::default());

        let events = Mutex::new(Vec::new());
        let observer = |event: CrewEvent| events.lock().unwrap().push(event);

        let mut agent = researcher();
        agent.max_iterations = 2;

        let result = executor
            .execute_task(&agent, &task(), "", &[], &observer)
            .await
            .unwrap();

        assert_eq!(result.tool_calls, 2);
        assert_eq!(result.output, "- enough");
        assert_eq!(events.lock().unwrap().len(), 2);
        assert_eq!(llm.call_count(), 2);

        let last = llm.prompts().last().unwrap().clone();
        let results = &last[3].content;
        assert_eq!(results.matches("Mock Result 1 for many").count(), 2);
        assert_eq!(results.matches("budget exhausted").count(), 3);
        assert!(last[4].content.contains("used all of your tool calls"));
    }

    #[tokio::test]
    async fn test_unknown_coworker_is_a_tool_error() {
        let llm = Arc::new(ScriptedLLMProvider::new([
            "{\"tool\": \"delegate_work\", \"params\": {\"coworker\": \"Editor\", \"task\": \"polish\"}}",
            "# Post",
        ]));
        let executor = AgentExecutor::new(llm.clone(), runtime(), ExecutorConfig::default());

        let events = Mutex::new(Vec::new());
        let observer = |event: CrewEvent| events.lock().unwrap().push(event);

        let analyst = AgentDefinition::new("researcher", "Senior Research Analyst", "g", "b");
        let writer = AgentDefinition::new("writer", "Writer", "Write", "Wordy.").with_delegation(true);

        let result = executor
            .execute_task(&writer, &task(), "", &[&analyst], &observer)
            .await
            .unwrap();

        assert_eq!(result.output, "# Post");
        assert_eq!(result.tool_calls, 1);
        // No coworker completion was requested.
        assert_eq!(llm.call_count(), 2);

        let feedback = &llm.prompts()[1][3].content;
        assert!(feedback.contains("Error: Unknown coworker 'Editor'"));
        assert!(feedback.contains("Available: Senior Research Analyst"));
        assert_eq!(
            events.lock().unwrap().clone(),
            vec![CrewEvent::ToolUsed {
                task: "research".to_string(),
                tool: "delegate_work".to_string(),
                success: false
            }]
        );
    }

    #[tokio::test]
    async fn test_delegation_consults_coworker() {
        let llm = Arc::new(ScriptedLLMProvider::new([
            "{\"tool\": \"ask_question\", \"params\": {\"coworker\": \"senior research analyst\", \"question\": \"Is the data current?\"}}",
            "Yes, all sources are from 2025.",
            "# Post",
        ]));
        let executor = AgentExecutor::new(llm.clone(), runtime(), ExecutorConfig::default());

        let analyst = AgentDefinition::new("researcher", "Senior Research Analyst", "g", "b");
        let writer = AgentDefinition::new("writer", "Writer", "Write", "Wordy.").with_delegation(true);

        let result = executor
            .execute_task(&writer, &task(), "", &[&analyst], &NoopObserver)
            .await
            .unwrap();

        assert_eq!(result.output, "# Post");
        let prompts = llm.prompts();
        assert!(prompts[0][0].content.contains("ask_question"));
        assert!(prompts[1][0].content.starts_with("You are Senior Research Analyst."));
        assert!(prompts[2][3].content.contains("all sources are from 2025"));
    }

    #[tokio::test]
    async fn test_delegation_ignored_without_flag() {
        let llm = Arc::new(ScriptedLLMProvider::new([
            "{\"tool\": \"delegate_work\", \"params\": {\"coworker\": \"Researcher\", \"task\": \"do it\"}}",
            "fine",
        ]));
        let executor = AgentExecutor::new(llm.clone(), runtime(), ExecutorConfig::default());

        let writer = AgentDefinition::new("writer", "Writer", "Write", "Wordy.");
        let other = researcher();
        let result = executor
            .execute_task(&writer, &task(), "", &[&other], &NoopObserver)
            .await
            .unwrap();

        assert_eq!(result.output, "fine");
        let prompts = llm.prompts();
        assert!(!prompts[0][0].content.contains("delegate_work"));
        assert!(prompts[1][3].content.contains("not available"));
    }
}
