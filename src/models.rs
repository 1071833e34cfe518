use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
    #[serde(default)]
    pub number: u32,
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>, // exactly 4 for multiple choice, absent otherwise
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default, alias = "userAnswer", skip_serializing_if = "Option::is_none")]
    pub user_answer: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuizResult {
    pub summary: String, // comma-joined topics
    pub questions: Vec<QuizQuestion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeResult {
    pub score: f64, // 0.0..=1.0 in 0.1 steps
    pub feedback: String,
    pub confidence: u8, // 0..=100
}

impl GradeResult {
    /// Sentinel returned when the grader's reply cannot be used.
    pub fn invalid_response() -> Self {
        Self {
            score: 0.0,
            feedback: "Invalid response.".to_string(),
            confidence: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicSummary {
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub definition: String,
    #[serde(default)]
    pub summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizHistoryRecord {
    pub id: i64,
    pub format: String,
    pub score: i64,
    pub total: i64,
    pub study_material_excerpt: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredQuestion {
    pub id: i64,
    pub quiz_id: i64,
    pub question: String,
    pub options: Option<Vec<String>>,
    pub correct_answer: Option<String>,
    pub user_answer: Option<String>,
}

// Request bodies

fn default_format() -> String {
    "multiple choice".to_string()
}

fn default_question_count() -> u32 {
    5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateQuizRequest {
    #[serde(default, alias = "studyMaterial")]
    pub study_material: Option<String>,
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default = "default_question_count")]
    pub num: u32,
    #[serde(default, alias = "selectedTopics")]
    pub selected_topics: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyMaterialRequest {
    #[serde(default, alias = "studyMaterial")]
    pub study_material: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeRequest {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default, alias = "userAnswer")]
    pub user_answer: Option<String>,
    #[serde(default, alias = "correctAnswer")]
    pub correct_answer: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnsweredQuestion {
    pub question: String,
    #[serde(default)]
    pub options: Option<Vec<String>>,
    pub answer: String,
    #[serde(default, alias = "userAnswer")]
    pub user_answer: Option<String>,
}

impl From<QuizQuestion> for AnsweredQuestion {
    fn from(question: QuizQuestion) -> Self {
        Self {
            question: question.question,
            options: question.options,
            answer: question.answer,
            user_answer: question.user_answer,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveQuizRequest {
    pub format: String,
    pub score: i64,
    pub total: i64,
    #[serde(default, alias = "studyMaterial")]
    pub study_material: String,
    pub questions: Vec<AnsweredQuestion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectedTopics {
    pub topics: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedText {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedQuiz {
    pub id: i64,
}
