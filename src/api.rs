use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    errors::{ApiError, ErrorContext, QuizError},
    models::*,
    quiz_service::QuizService,
};

// Import logging macros
use crate::{log_api_error, log_api_start, log_api_success, log_api_warn};

#[derive(Clone)]
pub struct AppState {
    pub quiz_service: QuizService,
}

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, (StatusCode, Json<ApiResponse<()>>)>;

fn quiz_error_response(error: QuizError, context: ErrorContext) -> (StatusCode, Json<ApiResponse<()>>) {
    ApiError::from(error).to_response_with_context(context)
}

// Quiz generation endpoints
pub async fn generate_quiz(
    State(state): State<AppState>,
    Json(request): Json<GenerateQuizRequest>,
) -> ApiResult<QuizResult> {
    log_api_start!(
        "generate_quiz",
        format = request.format,
        material_length = request.study_material.as_deref().map_or(0, str::len)
    );

    match state.quiz_service.generate_quiz(&request).await {
        Ok(quiz) => {
            log_api_success!("generate_quiz", count = quiz.questions.len(), "quiz generated");
            Ok(Json(ApiResponse::success(quiz)))
        }
        Err(e) => {
            let context = ErrorContext::new("generate_quiz", "quiz");
            let context = match &e {
                QuizError::Generation(_) => {
                    context.with_user_message("Quiz generation is temporarily unavailable. Please try again.")
                }
                QuizError::MalformedOutput(_) => {
                    context.with_user_message("The quiz could not be generated from the model's reply. Please try again.")
                }
                _ => context,
            };
            Err(quiz_error_response(e, context))
        }
    }
}

pub async fn upload_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<ExtractedText> {
    log_api_start!("upload_document");

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                log_api_warn!("upload_document", format!("malformed multipart body: {}", e));
                let error = ApiError::BadRequest(format!("Malformed upload: {}", e));
                return Err(error.to_response_with_context(ErrorContext::new("upload_document", "document")));
            }
        };

        if field.name() != Some("file") {
            debug!(field = ?field.name(), "Skipping multipart field");
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(|e| {
            ApiError::BadRequest(format!("Could not read uploaded file: {}", e))
                .to_response_with_context(ErrorContext::new("upload_document", "document").with_id(&file_name))
        })?;

        info!(file_name = %file_name, size = bytes.len(), "Received upload");

        return match state.quiz_service.extract_upload(file_name.clone(), bytes.to_vec()).await {
            Ok(text) => {
                log_api_success!("upload_document", count = text.len(), "text extracted");
                Ok(Json(ApiResponse::success(ExtractedText { text })))
            }
            Err(e) => {
                let context = ErrorContext::new("upload_document", "document").with_id(&file_name);
                Err(quiz_error_response(e, context))
            }
        };
    }

    log_api_warn!("upload_document", "no file field in upload");
    let error = ApiError::BadRequest("No file uploaded".to_string());
    Err(error.to_response_with_context(ErrorContext::new("upload_document", "document")))
}

// Topic endpoints
pub async fn summarize(
    State(state): State<AppState>,
    Json(request): Json<StudyMaterialRequest>,
) -> ApiResult<Vec<TopicSummary>> {
    log_api_start!("summarize");

    let topics = state.quiz_service.summarize(request.study_material.as_deref()).await;
    log_api_success!("summarize", count = topics.len(), "topics summarized");
    Ok(Json(ApiResponse::success(topics)))
}

pub async fn detect_topics(
    State(state): State<AppState>,
    Json(request): Json<StudyMaterialRequest>,
) -> ApiResult<DetectedTopics> {
    log_api_start!("detect_topics");

    match state.quiz_service.detect_topics(request.study_material.as_deref()).await {
        Ok(topics) => {
            log_api_success!("detect_topics", count = topics.len(), "topics detected");
            Ok(Json(ApiResponse::success(DetectedTopics { topics })))
        }
        Err(e) => {
            log_api_error!("detect_topics", error = e, "topic detection failed");
            let context = ErrorContext::new("detect_topics", "topics");
            Err(quiz_error_response(e, context))
        }
    }
}

// Grading endpoints
pub async fn grade_answer(
    State(state): State<AppState>,
    Json(request): Json<GradeRequest>,
) -> ApiResult<GradeResult> {
    log_api_start!("grade_answer");

    match state.quiz_service.grade(&request).await {
        Ok(grade) => {
            log_api_success!("grade_answer", format!("score {:.1}, confidence {}", grade.score, grade.confidence));
            Ok(Json(ApiResponse::success(grade)))
        }
        Err(e) => {
            let context = ErrorContext::new("grade_answer", "answer");
            Err(quiz_error_response(e, context))
        }
    }
}

// Quiz history endpoints
pub async fn save_quiz(
    State(state): State<AppState>,
    Json(request): Json<SaveQuizRequest>,
) -> ApiResult<SavedQuiz> {
    log_api_start!("save_quiz");

    match state.quiz_service.save_quiz(&request).await {
        Ok(id) => {
            log_api_success!("save_quiz", quiz_id = id, "quiz saved");
            Ok(Json(ApiResponse::success(SavedQuiz { id })))
        }
        Err(e) => {
            let context = ErrorContext::new("save_quiz", "quiz");
            Err(quiz_error_response(e, context))
        }
    }
}

pub async fn get_quiz_history(State(state): State<AppState>) -> ApiResult<Vec<QuizHistoryRecord>> {
    log_api_start!("get_quiz_history");

    match state.quiz_service.get_history().await {
        Ok(quizzes) => {
            log_api_success!("get_quiz_history", count = quizzes.len(), "history listed");
            Ok(Json(ApiResponse::success(quizzes)))
        }
        Err(e) => {
            log_api_error!("get_quiz_history", error = e, "database error listing history");
            Err(quiz_error_response(e, ErrorContext::new("get_quiz_history", "quiz")))
        }
    }
}

pub async fn get_quiz(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<QuizHistoryRecord> {
    log_api_start!("get_quiz", quiz_id = id);

    match state.quiz_service.get_quiz(id).await {
        Ok(Some(quiz)) => {
            log_api_success!("get_quiz", quiz_id = id, "quiz retrieved");
            Ok(Json(ApiResponse::success(quiz)))
        }
        Ok(None) => {
            log_api_warn!("get_quiz", quiz_id = id, "quiz not found");
            let error = ApiError::NotFound(format!("Quiz with ID '{}' not found", id));
            let context = ErrorContext::new("get_quiz", "quiz")
                .with_id(&id.to_string())
                .with_user_message("Quiz not found");
            Err(error.to_response_with_context(context))
        }
        Err(e) => {
            log_api_error!("get_quiz", quiz_id = id, error = e, "database error retrieving quiz");
            let context = ErrorContext::new("get_quiz", "quiz").with_id(&id.to_string());
            Err(quiz_error_response(e, context))
        }
    }
}

pub async fn get_quiz_questions(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Vec<StoredQuestion>> {
    log_api_start!("get_quiz_questions", quiz_id = id);

    match state.quiz_service.get_quiz_questions(id).await {
        Ok(Some(questions)) => {
            log_api_success!("get_quiz_questions", count = questions.len(), "questions retrieved");
            Ok(Json(ApiResponse::success(questions)))
        }
        Ok(None) => {
            log_api_warn!("get_quiz_questions", quiz_id = id, "quiz not found");
            let error = ApiError::NotFound(format!("Quiz with ID '{}' not found", id));
            let context = ErrorContext::new("get_quiz_questions", "quiz")
                .with_id(&id.to_string())
                .with_user_message("Quiz not found");
            Err(error.to_response_with_context(context))
        }
        Err(e) => {
            let context = ErrorContext::new("get_quiz_questions", "quiz").with_id(&id.to_string());
            Err(quiz_error_response(e, context))
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Quiz routes
        .route("/api/quiz/generate", post(generate_quiz))
        .route("/api/upload", post(upload_document))

        // Topic routes
        .route("/api/summarize", post(summarize))
        .route("/api/topics/detect", post(detect_topics))

        // Grading
        .route("/api/grade", post(grade_answer))

        // History routes
        .route("/api/quiz/history", post(save_quiz).get(get_quiz_history))
        .route("/api/quiz/history/:id", get(get_quiz))
        .route("/api/quiz/history/:id/questions", get(get_quiz_questions))

        .with_state(state)
}
