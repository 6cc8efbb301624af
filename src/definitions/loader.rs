use anyhow::{anyhow, Context, Result};
use std::path::Path;

use super::schema::CrewDefinition;

impl CrewDefinition {
    /// Parses and validates a crew from YAML.
    ///
    /// ```yaml
    /// name: my-crew
    /// agents:
    ///   - name: researcher
    ///     role: Researcher
    ///     goal: Find things out
    ///     backstory: Curious.
    ///     tools: [web_search]
    /// tasks:
    ///   - name: research
    ///     description: Research {topic}
    ///     expected_output: Notes
    ///     agent: researcher
    /// ```
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let yaml = yaml
            .trim()
            .trim_start_matches("```yaml")
            .trim_start_matches("```")
            .trim_end_matches("```");

        let crew: CrewDefinition =
            serde_yaml::from_str(yaml).map_err(|e| anyhow!("Failed to parse crew YAML: {}", e))?;
        crew.validate()?;
        Ok(crew)
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading crew file {}", path.display()))?;
        Self::from_yaml(&raw).with_context(|| format!("loading crew file {}", path.display()))
    }
}
