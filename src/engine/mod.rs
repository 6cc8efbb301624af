pub mod crew;
pub mod executor;
pub mod observer;

pub use crew::{strip_code_fences, Crew, CrewOutput};
pub use executor::{AgentExecutor, ExecutorConfig, TaskExecution};
pub use observer::{CrewObserver, NoopObserver};
