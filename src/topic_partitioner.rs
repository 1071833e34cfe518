//! Routes paragraphs of study material to caller-selected topics and runs one
//! quiz generation per topic.
//!
//! Routing is a coarse character-level heuristic, not a semantic match: each
//! paragraph goes to the first selected topic whose lowercased similarity
//! ratio against it is above [`SIMILARITY_THRESHOLD`]. Paragraphs matching no
//! topic are dropped.

use futures_util::future::join_all;
use regex::Regex;
use similar::TextDiff;
use std::sync::LazyLock;
use tracing::{debug, info};

use crate::errors::QuizError;
use crate::formats::QuizFormat;
use crate::llm_service::LLMService;
use crate::models::{QuizQuestion, QuizResult};

pub const SIMILARITY_THRESHOLD: f64 = 0.5;

/// Topic given to fallback questions generated from the whole material.
pub const FALLBACK_TOPIC: &str = "General";

static BLANK_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\r?\n[ \t]*\r?\n").expect("valid paragraph regex"));

/// Paragraphs of the material routed to one topic, in material order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicSection {
    pub topic: String,
    pub paragraphs: Vec<String>,
}

impl TopicSection {
    pub fn text(&self) -> String {
        self.paragraphs.join("\n\n")
    }

    pub fn is_empty(&self) -> bool {
        self.paragraphs.is_empty()
    }
}

/// `2 * LCS / (len(a) + len(b))` over characters; 1.0 for two empty strings.
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    TextDiff::from_chars(a, b).ratio() as f64
}

pub fn split_paragraphs(material: &str) -> Vec<&str> {
    BLANK_LINE
        .split(material)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

/// Collapses duplicate topics (keeping first occurrence) and blank entries.
pub fn normalize_topics(topics: &[String]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::with_capacity(topics.len());
    for topic in topics {
        let topic = topic.trim();
        if !topic.is_empty() && !seen.iter().any(|t| t == topic) {
            seen.push(topic.to_string());
        }
    }
    seen
}

/// One section per selected topic, in the caller's order, each holding the
/// paragraphs routed to it.
pub fn partition(material: &str, selected_topics: &[String]) -> Vec<TopicSection> {
    let topics = normalize_topics(selected_topics);
    let lowered: Vec<String> = topics.iter().map(|t| t.to_lowercase()).collect();
    let mut sections: Vec<TopicSection> = topics
        .iter()
        .map(|topic| TopicSection {
            topic: topic.clone(),
            paragraphs: Vec::new(),
        })
        .collect();

    for paragraph in split_paragraphs(material) {
        let paragraph_lower = paragraph.to_lowercase();
        let matched = lowered
            .iter()
            .position(|topic| similarity_ratio(topic, &paragraph_lower) > SIMILARITY_THRESHOLD);

        match matched {
            Some(index) => sections[index].paragraphs.push(paragraph.to_string()),
            None => debug!(
                paragraph = %paragraph.chars().take(60).collect::<String>(),
                "Paragraph matched no selected topic"
            ),
        }
    }

    sections
}

/// Generates a quiz per selected topic and merges the results.
///
/// Questions keep `selected_topics` order and are renumbered 1..N across the
/// whole quiz. When no topic receives any paragraph, one quiz is generated from
/// the entire material and tagged [`FALLBACK_TOPIC`]. The summary is always the
/// selected topics joined by ", ", on either path.
pub async fn generate_per_topic(
    llm_service: &LLMService,
    material: &str,
    format: QuizFormat,
    count: u32,
    selected_topics: &[String],
) -> Result<QuizResult, QuizError> {
    let sections = partition(material, selected_topics);
    let summary = sections
        .iter()
        .map(|s| s.topic.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    let populated: Vec<(String, String)> = sections
        .iter()
        .filter(|s| !s.is_empty())
        .map(|s| (s.topic.clone(), s.text()))
        .collect();

    info!(
        selected_topics = sections.len(),
        matched_topics = populated.len(),
        "Generating per-topic quiz"
    );

    let results = join_all(
        populated
            .iter()
            .map(|(_, text)| llm_service.generate_quiz(text, format, count)),
    )
    .await;

    let mut questions: Vec<QuizQuestion> = Vec::new();
    for ((topic, _), result) in populated.iter().zip(results) {
        for mut question in result?.questions {
            question.topic = topic.clone();
            questions.push(question);
        }
    }

    if questions.is_empty() {
        info!("No per-topic questions produced, falling back to the whole material");
        questions = llm_service
            .generate_quiz(material, format, count)
            .await?
            .questions
            .into_iter()
            .map(|mut question| {
                question.topic = FALLBACK_TOPIC.to_string();
                question
            })
            .collect();
    }

    for (index, question) in questions.iter_mut().enumerate() {
        question.number = index as u32 + 1;
    }

    Ok(QuizResult { summary, questions })
}
