use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::QuizError;

/// Quiz question styles the generator knows how to prompt for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizFormat {
    MultipleChoice,
    FillInTheBlank,
    FreeResponse,
}

/// Generation constraints for one format, spliced into the quiz prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatRule {
    pub label: &'static str,
    pub requires_options: bool,
    pub answer_constraint: &'static str,
    pub explanation_requirement: &'static str,
}

const MULTIPLE_CHOICE: FormatRule = FormatRule {
    label: "multiple choice",
    requires_options: true,
    answer_constraint: "Give every question exactly 4 entries in \"options\". Exactly one option must be correct, and \"answer\" must repeat that option's text word for word. The other three options must be plausible but clearly wrong according to the study material.",
    explanation_requirement: "In \"explanation\", say why the correct option is right and, briefly, why the others are not, using only facts stated in the study material.",
};

const FILL_IN_THE_BLANK: FormatRule = FormatRule {
    label: "fill-in-the-blank",
    requires_options: false,
    answer_constraint: "Write each question as a sentence taken from the study material with one key term replaced by \"_____\". Do not include an \"options\" field. \"answer\" is the exact missing term.",
    explanation_requirement: "In \"explanation\", quote or paraphrase the part of the study material that contains the missing term.",
};

const FREE_RESPONSE: FormatRule = FormatRule {
    label: "free response",
    requires_options: false,
    answer_constraint: "Write open-ended conceptual questions that need one to three sentences to answer. Do not include an \"options\" field. \"answer\" is a concise model answer.",
    explanation_requirement: "In \"explanation\", list the key points a complete answer must mention, all drawn from the study material.",
};

impl QuizFormat {
    pub const ALL: [QuizFormat; 3] = [
        QuizFormat::MultipleChoice,
        QuizFormat::FillInTheBlank,
        QuizFormat::FreeResponse,
    ];

    pub fn rule(self) -> FormatRule {
        match self {
            QuizFormat::MultipleChoice => MULTIPLE_CHOICE,
            QuizFormat::FillInTheBlank => FILL_IN_THE_BLANK,
            QuizFormat::FreeResponse => FREE_RESPONSE,
        }
    }

    pub fn label(self) -> &'static str {
        self.rule().label
    }
}

impl fmt::Display for QuizFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for QuizFormat {
    type Err = QuizError;

    /// Case-insensitive; spaces, hyphens and underscores are interchangeable.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s
            .trim()
            .to_lowercase()
            .replace(['-', '_'], " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");

        match normalized.as_str() {
            "multiple choice" => Ok(QuizFormat::MultipleChoice),
            "fill in the blank" => Ok(QuizFormat::FillInTheBlank),
            "free response" => Ok(QuizFormat::FreeResponse),
            _ => Err(QuizError::UnsupportedFormat(s.to_string())),
        }
    }
}

pub fn rules_for(format: &str) -> Result<FormatRule, QuizError> {
    format.parse::<QuizFormat>().map(QuizFormat::rule)
}
