pub mod logging;

pub mod api;
pub mod config;
pub mod database;
pub mod document;
pub mod errors;
pub mod formats;
pub mod llm_providers;
pub mod llm_service;
pub mod models;
pub mod prompts;
pub mod quiz_service;
pub mod response_parser;
pub mod topic_partitioner;

pub use api::{create_router, ApiResponse, AppState};
pub use config::Config;
pub use database::Database;
pub use errors::*;
pub use formats::{rules_for, FormatRule, QuizFormat};
pub use llm_providers::{LLMProvider, LLMProviderFactory, LLMProviderType, LanguageModel};
pub use llm_service::LLMService;
pub use models::*;
pub use quiz_service::QuizService;
pub use response_parser::JsonResponseParser;
