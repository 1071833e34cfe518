#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use drilr::{
    api::{create_router, AppState},
    Database, LLMService, LanguageModel, QuizService,
};

/// A model that replays canned replies in order and records every prompt it sees.
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String>>>,
    prompts: Mutex<Vec<String>>,
    params: Mutex<Vec<(f32, u32)>>,
}

impl ScriptedModel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_replies<I, S>(replies: I) -> Arc<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let model = Self::default();
        model
            .replies
            .lock()
            .unwrap()
            .extend(replies.into_iter().map(|r| Ok(r.into())));
        Arc::new(model)
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        self.replies.lock().unwrap().push_back(Ok(reply.into()));
    }

    pub fn push_failure(&self, message: &str) {
        self.replies.lock().unwrap().push_back(Err(anyhow!(message.to_string())));
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn params(&self) -> Vec<(f32, u32)> {
        self.params.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn invoke(&self, prompt: &str, temperature: f32, max_tokens: u32) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.params.lock().unwrap().push((temperature, max_tokens));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(anyhow!("no scripted reply left")))
    }

    fn provider_name(&self) -> &str {
        "Scripted"
    }

    fn model_name(&self) -> &str {
        "scripted-test-model"
    }
}

pub fn service_with(model: &Arc<ScriptedModel>) -> LLMService {
    LLMService::with_model(model.clone())
}

pub async fn test_database() -> Database {
    Database::new("sqlite::memory:").await.unwrap()
}

pub async fn test_quiz_service(model: &Arc<ScriptedModel>) -> QuizService {
    QuizService::new(test_database().await, service_with(model))
}

pub async fn test_server(model: &Arc<ScriptedModel>) -> axum_test::TestServer {
    let state = AppState {
        quiz_service: test_quiz_service(model).await,
    };
    axum_test::TestServer::new(create_router(state)).unwrap()
}

/// A well-formed generation reply with `count` questions on `topic`.
pub fn quiz_reply(summary: &str, topic: &str, count: u32) -> String {
    let questions: Vec<serde_json::Value> = (1..=count)
        .map(|n| {
            serde_json::json!({
                "number": n,
                "topic": topic,
                "question": format!("{} question {}?", topic, n),
                "options": ["A", "B", "C", "D"],
                "answer": "A",
                "explanation": format!("From the {} section.", topic),
            })
        })
        .collect();
    serde_json::json!({ "summary": summary, "questions": questions }).to_string()
}
