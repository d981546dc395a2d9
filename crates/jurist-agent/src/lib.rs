pub mod anthropic;
pub mod exa;
mod http;
pub mod ollama;

pub use anthropic::AnthropicBackend;
pub use exa::ExaSearch;
pub use ollama::OllamaBackend;
