pub mod builtin;
pub mod loader;
pub mod schema;

pub use builtin::{crew_for, direct_blog_crew, mcp_blog_crew};
pub use schema::{
    AgentDefinition, CrewDefinition, DefinitionError, Process, TaskDefinition, ToolType,
};
