use drilr::llm_providers::LLMProviderType;
use drilr::{GradeResult, LLMService, QuizError, QuizFormat};

// Nothing listens on the discard port, so every request fails at the transport level.
const UNREACHABLE: &str = "http://127.0.0.1:9";

fn unreachable_service(provider: LLMProviderType) -> LLMService {
    LLMService::new_with_provider("test-api-key".to_string(), Some(UNREACHABLE.to_string()), provider, None)
}

#[test]
fn test_all_providers_expose_names() {
    let cases = vec![
        (LLMProviderType::OpenAI, "OpenAI", "gpt-4o-mini"),
        (LLMProviderType::Gemini, "Gemini", "gemini-2.0-flash-exp"),
    ];

    for (provider, name, model) in cases {
        let service = LLMService::new_with_provider("test-api-key".to_string(), None, provider, None);
        assert_eq!(service.provider_name(), name);
        assert_eq!(service.model_name(), model);
    }
}

#[test]
fn test_model_override_is_used() {
    let service = LLMService::new_with_provider(
        "test-api-key".to_string(),
        None,
        LLMProviderType::Gemini,
        Some("gemini-1.5-pro".to_string()),
    );
    assert_eq!(service.model_name(), "gemini-1.5-pro");
}

#[tokio::test]
async fn test_transport_errors_per_operation() {
    for provider in [LLMProviderType::OpenAI, LLMProviderType::Gemini] {
        let service = unreachable_service(provider);

        let quiz = service
            .generate_quiz("Cells divide by mitosis.", QuizFormat::MultipleChoice, 3)
            .await;
        assert!(matches!(quiz, Err(QuizError::Generation(_))), "{:?}", provider);

        let topics = service.try_detect_topics("Cells divide by mitosis.").await;
        assert!(matches!(topics, Err(QuizError::Generation(_))), "{:?}", provider);

        assert!(service.extract_topics("Cells divide by mitosis.").await.is_empty());

        let grade = service
            .grade_free_response("How do cells divide?", "Mitosis", "By mitosis.")
            .await
            .unwrap();
        assert_eq!(grade, GradeResult::invalid_response());
    }
}
