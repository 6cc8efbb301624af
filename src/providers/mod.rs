pub mod llm;
pub mod search;

pub use llm::{LLMProvider, Message, MockLLMProvider, OpenAICompatibleProvider, ScriptedLLMProvider};
pub use search::{
    KeywordSource, MockKeywordSource, MockSearchProvider, SearchOptions, SearchProvider,
    SearchResult, SerpApiClient, SerperSearchProvider, TrendTimeline,
};
