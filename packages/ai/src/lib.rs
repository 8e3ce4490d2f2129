// ABOUTME: Anthropic integration for generative proposal drafting
// ABOUTME: Structured JSON generation with markdown-fence tolerant parsing

pub mod service;

// Re-export service types
pub use service::{
    extract_json, AIService, AIServiceConfig, AIServiceError, AIServiceResult, AIResponse, Usage,
};
