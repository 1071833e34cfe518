//! Prompt templates sent to the language model.
//!
//! Study material is always embedded verbatim between triple quotes so the
//! model reads it as data. Every template asks for bare JSON with no prose or
//! markdown around it; the response parser still tolerates fences.

use crate::formats::{FormatRule, QuizFormat};

fn question_schema(rule: &FormatRule) -> String {
    let options = if rule.requires_options {
        "\n      \"options\": [\"<option 1>\", \"<option 2>\", \"<option 3>\", \"<option 4>\"],"
    } else {
        ""
    };

    format!(
        r#"{{
  "summary": "<topic 1>, <topic 2>, ...",
  "questions": [
    {{
      "number": 1,
      "topic": "<one of the topics listed in summary>",
      "question": "<question text>",{options}
      "answer": "<correct answer>",
      "explanation": "<why the answer is correct, citing the study material>"
    }}
  ]
}}"#
    )
}

/// Builds the quiz generation prompt for `count` questions in `format`.
pub fn build_quiz_prompt(material: &str, format: QuizFormat, count: u32) -> String {
    let rule = format.rule();
    let schema = question_schema(&rule);

    format!(
        r#"You are Drilr, a study assistant that turns study material into well-structured quiz questions.

Study material:
"""
{material}
"""

Follow these steps:
1. Identify the main topics of the study material. Put them, comma-separated, in "summary" before writing any question.
2. Write exactly {count} {label} questions. Set each question's "topic" to the listed topic it tests, as a one-word or short-phrase label.
3. {answer_constraint}
4. {explanation_requirement} Use only the study material above; never rely on outside knowledge, and do not ask about anything the material does not state.
5. Number the questions 1 to {count} in "number".

Respond with a single JSON object in exactly this shape and nothing else: no markdown, no code fences, no commentary.
{schema}"#,
        label = rule.label,
        answer_constraint = rule.answer_constraint,
        explanation_requirement = rule.explanation_requirement,
    )
}

pub fn build_topic_summary_prompt(material: &str) -> String {
    format!(
        r#"You are Drilr, a study assistant. Read the study material below and list its key topics.

Study material:
"""
{material}
"""

For every key topic give a short name, a one-sentence definition and a two to three sentence summary of what the material says about it. Use only the study material.

Respond with a JSON array and nothing else: no markdown, no code fences, no commentary.
[
  {{"topic": "<name>", "definition": "<one sentence>", "summary": "<two to three sentences>"}}
]"#
    )
}

pub fn build_topic_detection_prompt(material: &str) -> String {
    format!(
        r#"You are Drilr, a study assistant. List the distinct topics covered by the study material below.

Study material:
"""
{material}
"""

Each topic must be a short label of one to four words, in the order the material introduces them. Do not invent topics the material does not cover.

Respond with a JSON object and nothing else: no markdown, no code fences, no commentary.
{{"topics": ["<topic 1>", "<topic 2>"]}}"#
    )
}

pub fn build_grading_prompt(question: &str, user_answer: &str, correct_answer: &str) -> String {
    format!(
        r#"You are a fair and encouraging teacher grading a student's free-response answer.

Question:
"""
{question}
"""

Reference answer:
"""
{correct_answer}
"""

Student answer:
"""
{user_answer}
"""

Grading rubric:
- Grade understanding, not memorization. An answer that expresses the same ideas as the reference answer in different words is fully correct.
- Do not deduct for phrasing, spelling mistakes, typos, grammar, or leaving out a minor detail.
- Deduct when a core idea of the reference answer is missing.
- Deduct when the answer states something incorrect.
- Be generous: when in doubt between two scores, choose the higher one.
- Score from 0.0 to 1.0 in steps of 0.1.

Respond with a JSON object and nothing else: no markdown, no code fences, no commentary.
{{"score": <0.0 to 1.0>, "feedback": "<one or two sentences for the student>", "confidence": <integer 0 to 100, how sure you are of the score>}}"#
    )
}
