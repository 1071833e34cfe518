use tracing::{debug, info};

use crate::database::Database;
use crate::document;
use crate::errors::QuizError;
use crate::formats::QuizFormat;
use crate::llm_service::LLMService;
use crate::models::*;
use crate::topic_partitioner;

use crate::{log_db_operation, log_validation};

/// Orchestrates generation, grading and quiz history on top of the model and
/// the database.
#[derive(Clone)]
pub struct QuizService {
    db: Database,
    llm_service: LLMService,
}

impl QuizService {
    pub fn new(db: Database, llm_service: LLMService) -> Self {
        Self { db, llm_service }
    }

    /// Validates the request, then generates either from the whole material or
    /// per selected topic. Nothing reaches the model until the format is known
    /// to be supported.
    pub async fn generate_quiz(&self, request: &GenerateQuizRequest) -> Result<QuizResult, QuizError> {
        let material = require_material(request.study_material.as_deref())?;

        if request.num == 0 {
            log_validation!(failure, "generate_quiz", error = "num must be at least 1");
            return Err(QuizError::Validation(
                "Number of questions must be at least 1".to_string(),
            ));
        }

        let format: QuizFormat = request.format.parse()?;

        let topics = request
            .selected_topics
            .as_deref()
            .map(topic_partitioner::normalize_topics)
            .unwrap_or_default();

        if topics.is_empty() {
            self.llm_service.generate_quiz(material, format, request.num).await
        } else {
            debug!(topics = ?topics, "Using per-topic generation");
            topic_partitioner::generate_per_topic(&self.llm_service, material, format, request.num, &topics)
                .await
        }
    }

    /// Topic summaries for the material; empty on blank input or any model failure.
    pub async fn summarize(&self, study_material: Option<&str>) -> Vec<TopicSummary> {
        match study_material.map(str::trim).filter(|m| !m.is_empty()) {
            Some(material) => self.llm_service.extract_topics(material).await,
            None => Vec::new(),
        }
    }

    pub async fn detect_topics(&self, study_material: Option<&str>) -> Result<Vec<String>, QuizError> {
        let material = require_material(study_material)?;
        self.llm_service.try_detect_topics(material).await
    }

    pub async fn grade(&self, request: &GradeRequest) -> Result<GradeResult, QuizError> {
        self.llm_service
            .grade_free_response(
                request.question.as_deref().unwrap_or_default(),
                request.user_answer.as_deref().unwrap_or_default(),
                request.correct_answer.as_deref().unwrap_or_default(),
            )
            .await
    }

    /// Extracts upload text on the blocking pool; PDF and DOCX parsing are CPU-bound.
    pub async fn extract_upload(&self, file_name: String, bytes: Vec<u8>) -> Result<String, QuizError> {
        let extracted = tokio::task::spawn_blocking(move || document::extract_text(&file_name, &bytes))
            .await
            .map_err(|e| QuizError::Validation(format!("Could not read uploaded file: {}", e)))?;

        extracted.map_err(|e| QuizError::Validation(format!("Could not read uploaded file: {:#}", e)))
    }

    pub async fn save_quiz(&self, request: &SaveQuizRequest) -> Result<i64, QuizError> {
        validate_save_request(request)?;

        let id = self.db.save_quiz(request).await.map_err(storage_error("save_quiz"))?;
        info!(quiz_id = id, score = request.score, total = request.total, "Quiz saved to history");
        Ok(id)
    }

    pub async fn get_history(&self) -> Result<Vec<QuizHistoryRecord>, QuizError> {
        self.db.get_all_quizzes().await.map_err(storage_error("get_all_quizzes"))
    }

    pub async fn get_quiz(&self, id: i64) -> Result<Option<QuizHistoryRecord>, QuizError> {
        self.db.get_quiz(id).await.map_err(storage_error("get_quiz"))
    }

    /// `None` when no quiz with this id exists.
    pub async fn get_quiz_questions(&self, id: i64) -> Result<Option<Vec<StoredQuestion>>, QuizError> {
        if self.get_quiz(id).await?.is_none() {
            return Ok(None);
        }
        self.db
            .get_quiz_questions(id)
            .await
            .map(Some)
            .map_err(storage_error("get_quiz_questions"))
    }
}

fn storage_error(operation: &'static str) -> impl Fn(anyhow::Error) -> QuizError {
    move |error| {
        log_db_operation!(error, operation, error = error);
        QuizError::Storage(error)
    }
}

fn require_material(study_material: Option<&str>) -> Result<&str, QuizError> {
    match study_material.filter(|m| !m.trim().is_empty()) {
        Some(material) => Ok(material),
        None => {
            log_validation!(failure, "study_material", error = "missing or blank");
            Err(QuizError::Validation("No study material provided".to_string()))
        }
    }
}

pub fn validate_save_request(request: &SaveQuizRequest) -> Result<(), QuizError> {
    if request.questions.is_empty() {
        return Err(QuizError::Validation("A quiz must contain at least one question".to_string()));
    }
    if request.score < 0 || request.total < request.score {
        return Err(QuizError::Validation(format!(
            "Invalid score {} out of {}",
            request.score, request.total
        )));
    }
    if request.format.trim().is_empty() {
        return Err(QuizError::Validation("Quiz format is required".to_string()));
    }
    Ok(())
}
