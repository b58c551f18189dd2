//! Tests for the multi-model fallback client
//!
//! These tests drive `FallbackClient` with a scripted backend and check which
//! models are called, in which order, and what text comes back.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::error::{FailureClass, FailureClassifier, ServiceError};
    use crate::explain::{
        ExplainRequest, FallbackClient, ImagePayload, Language, ModelAttempt, CONFIGURATION_MISSING_MESSAGE,
        DEFAULT_PLAN, QUOTA_MESSAGE,
    };
    use crate::tests::support::{
        image_rejected_error, internal_error, overloaded_error, quota_error, ScriptedBackend,
    };

    const ANSWER: &str = r#"{"part_name": "Aorta", "description": "The main artery of the body."}"#;

    fn request_with_image() -> ExplainRequest {
        ExplainRequest::new(
            "Mesh_42",
            "Human heart",
            Some(ImagePayload::jpeg(vec![0xFF, 0xD8, 0xFF])),
            Language::default(),
        )
        .unwrap()
    }

    fn text_request() -> ExplainRequest {
        ExplainRequest::new("Piston", "V8 engine", None, Language::new("Hindi")).unwrap()
    }

    #[tokio::test]
    async fn test_first_model_answers() {
        let client = FallbackClient::new(ScriptedBackend::answering(ANSWER));

        let outcome = client.run(&request_with_image()).await;

        assert_eq!(outcome.text, ANSWER);
        assert_eq!(outcome.answered_by.as_deref(), Some(DEFAULT_PLAN[0].model_id));
        assert_eq!(outcome.attempts.len(), 1);
        assert!(outcome.attempts[0].failure.is_none());
        assert_eq!(
            client.backend().called_models(),
            vec![(DEFAULT_PLAN[0].model_id.to_string(), true)]
        );
    }

    #[tokio::test]
    async fn test_overloaded_moves_to_next_model_without_retry() {
        let first = DEFAULT_PLAN[0].model_id;
        let backend = ScriptedBackend::new(move |model, _| {
            if model == first {
                Err(overloaded_error())
            } else {
                Ok("second model answer".to_string())
            }
        });
        let client = FallbackClient::new(backend);

        let text = client.query(&request_with_image()).await;

        assert_eq!(text, "second model answer");
        let calls = client.backend().called_models();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].0, DEFAULT_PLAN[0].model_id);
        assert_eq!(calls[1].0, DEFAULT_PLAN[1].model_id);
    }

    #[tokio::test]
    async fn test_quota_stops_immediately() {
        let client = FallbackClient::new(ScriptedBackend::new(|_, _| Err(quota_error())));

        let outcome = client.run(&request_with_image()).await;

        assert_eq!(outcome.text, QUOTA_MESSAGE);
        assert!(!outcome.is_answer());
        assert_eq!(client.backend().calls().len(), 1);
        assert_eq!(outcome.attempts[0].failure, Some(FailureClass::Quota));
    }

    #[tokio::test]
    async fn test_rejected_image_is_retried_text_only_on_same_model() {
        let backend = ScriptedBackend::new(|_, with_image| {
            if with_image {
                Err(image_rejected_error())
            } else {
                Ok("text only answer".to_string())
            }
        });
        let client = FallbackClient::new(backend);

        let outcome = client.run(&request_with_image()).await;

        assert_eq!(outcome.text, "text only answer");
        assert_eq!(outcome.answered_by.as_deref(), Some(DEFAULT_PLAN[0].model_id));
        assert_eq!(
            client.backend().called_models(),
            vec![
                (DEFAULT_PLAN[0].model_id.to_string(), true),
                (DEFAULT_PLAN[0].model_id.to_string(), false),
            ]
        );
    }

    #[tokio::test]
    async fn test_text_only_prompt_omits_marker_instruction() {
        let backend = ScriptedBackend::new(|_, with_image| {
            if with_image {
                Err(image_rejected_error())
            } else {
                Ok("ok".to_string())
            }
        });
        let client = FallbackClient::new(backend);
        client.query(&request_with_image()).await;

        let calls = client.backend().calls();
        assert!(calls[0].prompt.to_lowercase().contains("red"));
        assert!(!calls[1].prompt.to_lowercase().contains("red marker"));
    }

    #[tokio::test]
    async fn test_failed_text_retry_advances_to_next_model() {
        let first = DEFAULT_PLAN[0].model_id;
        let backend = ScriptedBackend::new(move |model, with_image| match (model == first, with_image) {
            (true, true) => Err(image_rejected_error()),
            (true, false) => Err(internal_error()),
            (false, _) => Ok("from the next model".to_string()),
        });
        let client = FallbackClient::new(backend);

        let outcome = client.run(&request_with_image()).await;

        assert_eq!(outcome.text, "from the next model");
        assert_eq!(outcome.attempts.len(), 3);
        assert_eq!(outcome.attempts[1].failure, Some(FailureClass::Unknown));
        assert_eq!(outcome.answered_by.as_deref(), Some(DEFAULT_PLAN[1].model_id));
    }

    #[tokio::test]
    async fn test_rejected_image_after_first_model_advances_without_retry() {
        let first = DEFAULT_PLAN[0].model_id;
        let backend = ScriptedBackend::new(move |model, with_image| {
            if model == first {
                Err(overloaded_error())
            } else if with_image {
                Err(image_rejected_error())
            } else {
                Ok("text answer".to_string())
            }
        });
        let client = FallbackClient::new(backend);

        let outcome = client.run(&request_with_image()).await;

        let calls = client.backend().called_models();
        assert_eq!(
            &calls[..3],
            &[
                (DEFAULT_PLAN[0].model_id.to_string(), true),
                (DEFAULT_PLAN[1].model_id.to_string(), true),
                (DEFAULT_PLAN[2].model_id.to_string(), true),
            ]
        );
        assert_eq!(outcome.attempts[1].failure, Some(FailureClass::PayloadRejected));
        assert_eq!(outcome.answered_by.as_deref(), Some(DEFAULT_PLAN[3].model_id));
        assert_eq!(calls.len(), DEFAULT_PLAN.len());
    }

    #[tokio::test]
    async fn test_text_only_plan_entry_gets_no_image() {
        let last = DEFAULT_PLAN[DEFAULT_PLAN.len() - 1];
        assert!(!last.uses_image);

        let backend = ScriptedBackend::new(move |model, _| {
            if model == last.model_id {
                Ok("lite answer".to_string())
            } else {
                Err(overloaded_error())
            }
        });
        let client = FallbackClient::new(backend);

        assert_eq!(client.query(&request_with_image()).await, "lite answer");
        let calls = client.backend().called_models();
        assert_eq!(calls.len(), DEFAULT_PLAN.len());
        assert_eq!(calls.last(), Some(&(last.model_id.to_string(), false)));
    }

    #[tokio::test]
    async fn test_exhausted_plan_returns_diagnostic() {
        let client = FallbackClient::new(ScriptedBackend::new(|_, _| Err(internal_error())));

        let outcome = client.run(&text_request()).await;

        assert!(!outcome.is_answer());
        assert!(outcome.text.contains("internal error"));
        assert!(outcome.text.contains(&DEFAULT_PLAN.len().to_string()));
        assert_eq!(outcome.attempts.len(), DEFAULT_PLAN.len());
        assert!(outcome.attempts.iter().all(|a| !a.with_image));
    }

    #[tokio::test]
    async fn test_unconfigured_backend_is_never_called() {
        let client = FallbackClient::new(ScriptedBackend::unconfigured());

        assert_eq!(client.query(&request_with_image()).await, CONFIGURATION_MISSING_MESSAGE);
        assert!(client.backend().calls().is_empty());
    }

    #[tokio::test]
    async fn test_empty_answer_counts_as_failure() {
        let first = DEFAULT_PLAN[0].model_id;
        let backend = ScriptedBackend::new(move |model, _| {
            if model == first {
                Ok("   ".to_string())
            } else {
                Ok("real answer".to_string())
            }
        });
        let client = FallbackClient::new(backend);

        let outcome = client.run(&request_with_image()).await;
        assert_eq!(outcome.text, "real answer");
        assert_eq!(outcome.attempts[0].failure, Some(FailureClass::Unknown));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_model_times_out_and_falls_through() {
        let backend = ScriptedBackend::answering("too late").with_delay(Duration::from_secs(60));
        let client = FallbackClient::new(backend)
            .with_plan(&[ModelAttempt::new("slow-model", false)])
            .with_attempt_timeout(Duration::from_secs(1));

        let outcome = client.run(&text_request()).await;

        assert!(!outcome.is_answer());
        assert!(outcome.text.contains("did not answer"));
    }

    #[tokio::test]
    async fn test_empty_plan() {
        let client = FallbackClient::new(ScriptedBackend::answering("unused")).with_plan(&[]);
        let text = client.query(&text_request()).await;
        assert!(!text.is_empty());
        assert!(client.backend().calls().is_empty());
    }

    struct EverythingIsQuota;

    impl FailureClassifier for EverythingIsQuota {
        fn classify(&self, _error: &ServiceError) -> FailureClass {
            FailureClass::Quota
        }
    }

    #[tokio::test]
    async fn test_custom_classifier_drives_recovery() {
        let client = FallbackClient::new(ScriptedBackend::new(|_, _| Err(internal_error())))
            .with_classifier(EverythingIsQuota);

        assert_eq!(client.query(&text_request()).await, QUOTA_MESSAGE);
        assert_eq!(client.backend().calls().len(), 1);
    }
}
