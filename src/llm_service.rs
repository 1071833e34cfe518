use serde::de::Error as _;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::LLMConfig;
use crate::errors::{ParseError, QuizError};
use crate::formats::QuizFormat;
use crate::llm_providers::{LLMProviderFactory, LLMProviderType, LanguageModel};
use crate::models::{GradeResult, QuizQuestion, QuizResult, TopicSummary};
use crate::prompts;
use crate::response_parser::{strip_code_fences, JsonResponseParser};

use crate::log_llm_operation;

const DEFAULT_FEEDBACK: &str = "No feedback provided.";

/// Sampling settings for one kind of model call.
#[derive(Debug, Clone, Copy)]
struct CallParams {
    temperature: f32,
    max_tokens: u32,
}

const QUIZ_GENERATION: CallParams = CallParams { temperature: 0.3, max_tokens: 2048 };
const TOPIC_SUMMARY: CallParams = CallParams { temperature: 0.3, max_tokens: 1024 };
const TOPIC_DETECTION: CallParams = CallParams { temperature: 0.2, max_tokens: 512 };
const GRADING: CallParams = CallParams { temperature: 0.0, max_tokens: 256 };

/// Quiz generation, topic extraction and free-response grading on top of a
/// [`LanguageModel`]. Every public operation makes exactly one model call.
#[derive(Clone)]
pub struct LLMService {
    model: Arc<dyn LanguageModel>,
    json_parser: JsonResponseParser,
}

impl LLMService {
    pub fn new_with_provider(
        api_key: String,
        base_url: Option<String>,
        provider_type: LLMProviderType,
        model: Option<String>,
    ) -> Self {
        let provider = LLMProviderFactory::create_provider(provider_type, api_key, base_url, model);
        Self::with_model(Arc::new(provider))
    }

    pub fn from_config(config: &LLMConfig) -> Self {
        Self::new_with_provider(
            config.api_key.clone(),
            config.base_url.clone(),
            config.provider,
            config.model.clone(),
        )
    }

    pub fn with_model(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            model,
            json_parser: JsonResponseParser,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.model.provider_name()
    }

    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    async fn invoke(&self, operation: &str, prompt: &str, params: CallParams) -> anyhow::Result<String> {
        log_llm_operation!(start, operation, provider = self.provider_name(), prompt_length = prompt.len());
        let started = Instant::now();

        match self.model.invoke(prompt, params.temperature, params.max_tokens).await {
            Ok(text) => {
                log_llm_operation!(
                    success,
                    operation,
                    provider = self.provider_name(),
                    duration_ms = started.elapsed().as_millis() as u64
                );
                debug!(operation = operation, response_content = %text, "Raw LLM response");
                Ok(text)
            }
            Err(e) => {
                log_llm_operation!(error, operation, provider = self.provider_name(), error = e);
                Err(e)
            }
        }
    }

    fn parse_reply(&self, operation: &str, raw: &str) -> Result<Value, ParseError> {
        self.json_parser.parse(raw).inspect_err(|e| {
            log_llm_operation!(unparseable, operation, error = e, raw = raw);
        })
    }

    /// Generates `count` questions in `format` from `material`.
    ///
    /// Transport failures and unparseable replies are both fatal here: there is
    /// no sensible quiz to fall back to.
    pub async fn generate_quiz(
        &self,
        material: &str,
        format: QuizFormat,
        count: u32,
    ) -> Result<QuizResult, QuizError> {
        info!(
            format = %format,
            question_count = count,
            material_length = material.len(),
            "Generating quiz"
        );

        let prompt = prompts::build_quiz_prompt(material, format, count);
        let raw = self
            .invoke("generate_quiz", &prompt, QUIZ_GENERATION)
            .await
            .map_err(QuizError::Generation)?;

        let value = self.parse_reply("generate_quiz", &raw)?;
        let mut quiz = quiz_from_value(value, format, &raw).inspect_err(|e| {
            log_llm_operation!(unparseable, "generate_quiz", error = e, raw = raw);
        })?;

        for (index, question) in quiz.questions.iter_mut().enumerate() {
            question.number = index as u32 + 1;
        }

        info!(
            format = %format,
            question_count = quiz.questions.len(),
            summary = %quiz.summary,
            "Successfully generated quiz"
        );
        Ok(quiz)
    }

    /// Topic/definition/summary triples for the summarize view. Best effort:
    /// any failure yields an empty list.
    pub async fn extract_topics(&self, material: &str) -> Vec<TopicSummary> {
        let prompt = prompts::build_topic_summary_prompt(material);
        let raw = match self.invoke("extract_topics", &prompt, TOPIC_SUMMARY).await {
            Ok(raw) => raw,
            Err(_) => return Vec::new(),
        };

        let Ok(value) = self.parse_reply("extract_topics", &raw) else {
            return Vec::new();
        };

        let entries = match value {
            Value::Object(mut map) => map.remove("topics").unwrap_or(Value::Null),
            other => other,
        };

        match serde_json::from_value::<Vec<TopicSummary>>(entries) {
            Ok(topics) => {
                let topics: Vec<TopicSummary> = topics
                    .into_iter()
                    .filter(|t| !t.topic.trim().is_empty())
                    .collect();
                info!(topic_count = topics.len(), "Extracted topic summaries");
                topics
            }
            Err(e) => {
                log_llm_operation!(unparseable, "extract_topics", error = e, raw = raw);
                Vec::new()
            }
        }
    }

    /// Short topic labels for the topic picker.
    pub async fn try_detect_topics(&self, material: &str) -> Result<Vec<String>, QuizError> {
        let prompt = prompts::build_topic_detection_prompt(material);
        let raw = self
            .invoke("detect_topics", &prompt, TOPIC_DETECTION)
            .await
            .map_err(QuizError::Generation)?;

        let value = self.parse_reply("detect_topics", &raw)?;
        let topics = topics_from_value(value, &raw).inspect_err(|e| {
            log_llm_operation!(unparseable, "detect_topics", error = e, raw = raw);
        })?;

        info!(topic_count = topics.len(), topics = ?topics, "Detected topics");
        Ok(topics)
    }

    /// Like [`try_detect_topics`](Self::try_detect_topics) but never fails.
    pub async fn detect_topics(&self, material: &str) -> Vec<String> {
        self.try_detect_topics(material).await.unwrap_or_else(|e| {
            warn!(error = %e, "Topic detection failed, continuing without topics");
            Vec::new()
        })
    }

    /// Scores a free-response answer against the reference answer.
    ///
    /// Missing inputs are rejected before any model call. Once the call is
    /// made, transport and parse failures both degrade to
    /// [`GradeResult::invalid_response`].
    pub async fn grade_free_response(
        &self,
        question: &str,
        user_answer: &str,
        correct_answer: &str,
    ) -> Result<GradeResult, QuizError> {
        let missing: Vec<&str> = [
            ("question", question),
            ("user_answer", user_answer),
            ("correct_answer", correct_answer),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if !missing.is_empty() {
            return Err(QuizError::Validation(format!(
                "Missing required field(s): {}",
                missing.join(", ")
            )));
        }

        info!(
            question = %question.chars().take(100).collect::<String>(),
            answer_length = user_answer.len(),
            "Grading free-response answer"
        );

        let prompt = prompts::build_grading_prompt(question, user_answer, correct_answer);
        let Ok(raw) = self.invoke("grade_answer", &prompt, GRADING).await else {
            return Ok(GradeResult::invalid_response());
        };

        let grade = match self.parse_reply("grade_answer", &raw) {
            Ok(value) => grade_from_value(&value),
            Err(_) => GradeResult::invalid_response(),
        };

        info!(
            score = grade.score,
            confidence = grade.confidence,
            feedback = %grade.feedback.chars().take(100).collect::<String>(),
            "Graded free-response answer"
        );
        Ok(grade)
    }
}

fn malformed(raw: &str, message: &str) -> ParseError {
    ParseError {
        extracted: strip_code_fences(raw).to_string(),
        source: serde_json::Error::custom(message),
    }
}

/// Reads `{summary, questions}` with missing fields defaulted. A bare array
/// is taken as the question list.
fn quiz_from_value(value: Value, format: QuizFormat, raw: &str) -> Result<QuizResult, ParseError> {
    let (summary, questions) = match value {
        Value::Object(mut map) => {
            let summary = match map.remove("summary") {
                Some(Value::String(s)) => s,
                Some(Value::Array(items)) => items
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
                _ => String::new(),
            };
            (summary, map.remove("questions").unwrap_or(Value::Null))
        }
        Value::Array(items) => (String::new(), Value::Array(items)),
        _ => return Err(malformed(raw, "expected a JSON object or array")),
    };

    let mut questions: Vec<QuizQuestion> = match questions {
        Value::Array(items) => items
            .iter()
            .filter(|item| item.is_object())
            .enumerate()
            .map(|(index, item)| question_from_value(item, index as u32 + 1))
            .collect(),
        _ => Vec::new(),
    };

    for question in &mut questions {
        if format.rule().requires_options {
            let option_count = question.options.as_ref().map_or(0, Vec::len);
            if option_count != 4 {
                log_llm_operation!(
                    warn,
                    "generate_quiz",
                    format!("question {} has {} options, expected 4", question.number, option_count)
                );
            }
        } else {
            question.options = None;
        }
    }

    Ok(QuizResult { summary, questions })
}

/// Scalars are read as their string form; anything else counts as absent.
fn text_field(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn question_from_value(value: &Value, position: u32) -> QuizQuestion {
    let number = match value.get("number") {
        Some(Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Some(Value::String(s)) => s.trim().parse::<u32>().ok(),
        _ => None,
    };

    let options = value.get("options").and_then(Value::as_array).map(|items| {
        items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                Value::Bool(b) => Some(b.to_string()),
                _ => None,
            })
            .collect()
    });

    QuizQuestion {
        number: number.filter(|n| *n > 0).unwrap_or(position),
        topic: text_field(value, "topic").unwrap_or_default(),
        question: text_field(value, "question").unwrap_or_default(),
        options,
        answer: text_field(value, "answer").unwrap_or_default(),
        explanation: text_field(value, "explanation").unwrap_or_default(),
        user_answer: text_field(value, "user_answer").or_else(|| text_field(value, "userAnswer")),
    }
}

fn topics_from_value(value: Value, raw: &str) -> Result<Vec<String>, ParseError> {
    let list = match value {
        Value::Object(mut map) => map.remove("topics").unwrap_or(Value::Null),
        other => other,
    };

    match list {
        Value::Array(items) => Ok(items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|topic| !topic.is_empty())
            .map(str::to_string)
            .collect()),
        Value::Null => Ok(Vec::new()),
        _ => Err(malformed(raw, "expected a list of topics")),
    }
}

fn number_field(value: &Value, key: &str) -> Option<f64> {
    let number = match value.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

fn grade_from_value(value: &Value) -> GradeResult {
    let score = number_field(value, "score").unwrap_or(0.0).clamp(0.0, 1.0);
    let score = (score * 10.0).round() / 10.0;

    let confidence = number_field(value, "confidence")
        .unwrap_or(0.0)
        .round()
        .clamp(0.0, 100.0) as u8;

    let feedback = value
        .get("feedback")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .unwrap_or(DEFAULT_FEEDBACK)
        .to_string();

    GradeResult {
        score,
        feedback,
        confidence,
    }
}
