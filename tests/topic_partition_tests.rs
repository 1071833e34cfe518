mod common;

use common::{quiz_reply, service_with, test_quiz_service, ScriptedModel};
use drilr::topic_partitioner::{generate_per_topic, FALLBACK_TOPIC};
use drilr::{GenerateQuizRequest, QuizError, QuizFormat};

const ANIMALS: &str = "Cats purr.\n\nDogs bark.";

fn topics(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_questions_renumbered_across_topics() {
    let model = ScriptedModel::with_replies([
        quiz_reply("ignored", "Felines", 2),
        quiz_reply("ignored", "Canines", 1),
    ]);

    let quiz = generate_per_topic(
        &service_with(&model),
        ANIMALS,
        QuizFormat::MultipleChoice,
        2,
        &topics(&["cats", "dogs"]),
    )
    .await
    .unwrap();

    let numbers: Vec<u32> = quiz.questions.iter().map(|q| q.number).collect();
    let tags: Vec<&str> = quiz.questions.iter().map(|q| q.topic.as_str()).collect();
    assert_eq!(numbers, vec![1, 2, 3]);
    assert_eq!(tags, vec!["cats", "cats", "dogs"]);
    assert_eq!(quiz.questions[0].question, "Felines question 1?");
    assert_eq!(quiz.summary, "cats, dogs");

    let prompts = model.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[0].contains("Cats purr.") && !prompts[0].contains("Dogs bark."));
    assert!(prompts[1].contains("Dogs bark.") && !prompts[1].contains("Cats purr."));
}

#[tokio::test]
async fn test_no_matching_topic_falls_back_to_whole_material() {
    let model = ScriptedModel::with_replies([quiz_reply("Animals", "Animals", 2)]);

    let quiz = generate_per_topic(
        &service_with(&model),
        ANIMALS,
        QuizFormat::MultipleChoice,
        2,
        &topics(&["quantum physics"]),
    )
    .await
    .unwrap();

    assert_eq!(model.calls(), 1);
    assert!(model.prompts()[0].contains(ANIMALS));
    assert_eq!(quiz.questions.len(), 2);
    assert!(quiz.questions.iter().all(|q| q.topic == FALLBACK_TOPIC));
    assert_eq!(quiz.questions[1].number, 2);
    // The summary names the requested topics even though none of them matched.
    assert_eq!(quiz.summary, "quantum physics");
}

#[tokio::test]
async fn test_padded_paragraphs_fall_back_to_general() {
    let material = "Para about cats.\n\nPara about dogs.";
    let model = ScriptedModel::with_replies([quiz_reply("Pets", "Pets", 1)]);

    let quiz = generate_per_topic(
        &service_with(&model),
        material,
        QuizFormat::FreeResponse,
        1,
        &topics(&["cats", "dogs"]),
    )
    .await
    .unwrap();

    assert_eq!(model.calls(), 1);
    assert_eq!(quiz.questions[0].topic, "General");
    assert_eq!(quiz.summary, "cats, dogs");
}

#[tokio::test]
async fn test_empty_per_topic_replies_trigger_fallback() {
    let model = ScriptedModel::with_replies([
        r#"{"summary": "cats", "questions": []}"#.to_string(),
        quiz_reply("Animals", "Animals", 1),
    ]);

    let quiz = generate_per_topic(
        &service_with(&model),
        ANIMALS,
        QuizFormat::MultipleChoice,
        1,
        &topics(&["cats"]),
    )
    .await
    .unwrap();

    assert_eq!(model.calls(), 2);
    assert!(model.prompts()[1].contains(ANIMALS));
    assert_eq!(quiz.questions[0].topic, "General");
    assert_eq!(quiz.summary, "cats");
}

#[tokio::test]
async fn test_any_topic_failure_fails_the_request() {
    let model = ScriptedModel::with_replies([quiz_reply("cats", "cats", 1)]);
    model.push_failure("upstream timeout");

    let result = generate_per_topic(
        &service_with(&model),
        ANIMALS,
        QuizFormat::MultipleChoice,
        1,
        &topics(&["cats", "dogs"]),
    )
    .await;

    assert!(matches!(result, Err(QuizError::Generation(_))));
}

#[tokio::test]
async fn test_duplicate_topics_generate_once() {
    let model = ScriptedModel::with_replies([quiz_reply("cats", "cats", 1)]);
    let service = test_quiz_service(&model).await;

    let quiz = service
        .generate_quiz(&GenerateQuizRequest {
            study_material: Some(ANIMALS.to_string()),
            format: "multiple choice".to_string(),
            num: 1,
            selected_topics: Some(topics(&["cats", "cats"])),
        })
        .await
        .unwrap();

    assert_eq!(model.calls(), 1);
    assert_eq!(quiz.summary, "cats");
    assert_eq!(quiz.questions.len(), 1);
}
