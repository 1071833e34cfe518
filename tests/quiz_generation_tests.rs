mod common;

use common::{quiz_reply, service_with, test_quiz_service, ScriptedModel};
use drilr::{GenerateQuizRequest, QuizError, QuizFormat};

const MATERIAL: &str = "Photosynthesis turns light into chemical energy.\n\nMitochondria produce ATP.";

fn request(format: &str, num: u32) -> GenerateQuizRequest {
    GenerateQuizRequest {
        study_material: Some(MATERIAL.to_string()),
        format: format.to_string(),
        num,
        selected_topics: None,
    }
}

#[tokio::test]
async fn test_well_formed_reply_is_returned() {
    let model = ScriptedModel::with_replies([quiz_reply("S", "Plants", 1)]);
    let service = service_with(&model);

    let quiz = service
        .generate_quiz(MATERIAL, QuizFormat::MultipleChoice, 1)
        .await
        .unwrap();

    assert_eq!(quiz.summary, "S");
    assert_eq!(quiz.questions.len(), 1);
    assert_eq!(quiz.questions[0].number, 1);
    assert_eq!(quiz.questions[0].options.as_ref().map(Vec::len), Some(4));
    assert_eq!(model.calls(), 1);
}

#[tokio::test]
async fn test_fenced_reply_parses_like_bare_json() {
    let fenced = format!("Here you go:\n```json\n{}\n```", quiz_reply("Cells", "Cells", 2));
    let model = ScriptedModel::with_replies([fenced]);

    let quiz = service_with(&model)
        .generate_quiz(MATERIAL, QuizFormat::MultipleChoice, 2)
        .await
        .unwrap();

    assert_eq!(quiz.summary, "Cells");
    assert_eq!(quiz.questions.len(), 2);
}

#[tokio::test]
async fn test_missing_summary_defaults_to_empty() {
    let reply = r#"{"questions": [{"number": 1, "topic": "Energy", "question": "What makes ATP?", "answer": "Mitochondria", "explanation": "Stated in the material."}]}"#;
    let model = ScriptedModel::with_replies([reply]);

    let quiz = service_with(&model)
        .generate_quiz(MATERIAL, QuizFormat::FreeResponse, 1)
        .await
        .unwrap();

    assert_eq!(quiz.summary, "");
    assert_eq!(quiz.questions.len(), 1);
    assert_eq!(quiz.questions[0].options, None);
}

#[tokio::test]
async fn test_malformed_reply_fails_without_retry() {
    let model = ScriptedModel::with_replies(["Sure! Here are five questions about plants."]);

    let result = service_with(&model)
        .generate_quiz(MATERIAL, QuizFormat::MultipleChoice, 5)
        .await;

    match result {
        Err(QuizError::MalformedOutput(e)) => {
            assert_eq!(e.extracted, "Sure! Here are five questions about plants.");
        }
        other => panic!("expected MalformedOutput, got {:?}", other),
    }
    assert_eq!(model.calls(), 1);
}

#[tokio::test]
async fn test_transport_failure_is_generation_error() {
    let model = ScriptedModel::new();
    model.push_failure("connection refused");

    let result = service_with(&model)
        .generate_quiz(MATERIAL, QuizFormat::MultipleChoice, 5)
        .await;

    assert!(matches!(result, Err(QuizError::Generation(_))));
    assert_eq!(model.calls(), 1);
}

#[tokio::test]
async fn test_prompt_carries_material_count_and_parameters() {
    let model = ScriptedModel::with_replies([quiz_reply("S", "Plants", 3)]);

    service_with(&model)
        .generate_quiz(MATERIAL, QuizFormat::FillInTheBlank, 3)
        .await
        .unwrap();

    let prompt = &model.prompts()[0];
    assert!(prompt.contains(MATERIAL));
    assert!(prompt.contains("exactly 3 fill-in-the-blank questions"));
    assert!(!prompt.contains("\"options\": ["));
    assert_eq!(model.params(), vec![(0.3, 2048)]);
}

#[tokio::test]
async fn test_unsupported_format_rejected_before_model_call() {
    let model = ScriptedModel::new();
    let service = test_quiz_service(&model).await;

    let result = service.generate_quiz(&request("essay", 5)).await;

    assert!(matches!(result, Err(QuizError::UnsupportedFormat(ref f)) if f == "essay"));
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_blank_material_and_zero_count_rejected() {
    let model = ScriptedModel::new();
    let service = test_quiz_service(&model).await;

    let mut blank = request("multiple choice", 5);
    blank.study_material = Some("   ".to_string());
    assert!(matches!(service.generate_quiz(&blank).await, Err(QuizError::Validation(_))));

    let zero = request("multiple choice", 0);
    assert!(matches!(service.generate_quiz(&zero).await, Err(QuizError::Validation(_))));

    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_format_name_is_case_insensitive() {
    let model = ScriptedModel::with_replies([quiz_reply("S", "Plants", 1)]);
    let service = test_quiz_service(&model).await;

    let quiz = service.generate_quiz(&request("Multiple-Choice", 1)).await.unwrap();

    assert_eq!(quiz.questions.len(), 1);
    assert!(model.prompts()[0].contains("multiple choice questions"));
}

#[tokio::test]
async fn test_blank_topic_list_uses_whole_material() {
    let model = ScriptedModel::with_replies([quiz_reply("Energy", "Energy", 1)]);
    let service = test_quiz_service(&model).await;

    let mut req = request("multiple choice", 1);
    req.selected_topics = Some(vec!["  ".to_string()]);
    let quiz = service.generate_quiz(&req).await.unwrap();

    assert_eq!(quiz.summary, "Energy");
    assert_eq!(model.calls(), 1);
    assert!(model.prompts()[0].contains(MATERIAL));
}

#[tokio::test]
async fn test_whole_document_questions_numbered_from_one() {
    let reply = r#"{"summary": "Cells", "questions": [
        {"topic": "Cells", "question": "Q1", "answer": "A1"},
        {"number": 7, "topic": "Cells", "question": "Q2", "answer": "A2"},
        {"number": 7, "topic": "Cells", "question": "Q3", "answer": "A3"}
    ]}"#;
    let model = ScriptedModel::with_replies([reply]);

    let quiz = service_with(&model)
        .generate_quiz(MATERIAL, QuizFormat::FreeResponse, 3)
        .await
        .unwrap();

    let numbers: Vec<u32> = quiz.questions.iter().map(|q| q.number).collect();
    assert_eq!(numbers, vec![1, 2, 3]);
}
