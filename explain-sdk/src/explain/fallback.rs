//! Multi-model fallback client
//!
//! Walks the fixed [`ModelAttempt`] plan until one model answers. The recovery
//! path after a failure depends only on its [`FailureClass`]:
//!
//! - `Quota`: stop immediately and answer with [`QUOTA_MESSAGE`]
//! - `Overloaded`: move on to the next model
//! - `PayloadRejected` on the first plan entry with an image attached: retry
//!   the same model once without the image, then move on. Later entries treat
//!   it like `Unknown`.
//! - `Unknown`: remember the error and move on
//!
//! [`FallbackClient::query`] never fails. Every path ends in text the UI can
//! display, either the model's answer or a short notice.

use std::time::Duration;

use log::{debug, error, info, warn};

use crate::core::GenerativeBackend;
use crate::error::{DefaultClassifier, FailureClass, FailureClassifier, Result, ServiceError};
use crate::services::gemini::GeminiClient;
use crate::util::{generate_request_id, sanitize_for_logging, truncate_string};

use super::plan::{ModelAttempt, DEFAULT_PLAN};
use super::prompt::build_prompt;
use super::request::{ExplainRequest, ImagePayload};

/// Answer when the account quota is exhausted
pub const QUOTA_MESSAGE: &str =
    "AI quota exceeded for now. Please wait a minute and try again.";

/// Answer when no credential is configured
pub const CONFIGURATION_MISSING_MESSAGE: &str =
    "AI explanations are not configured. Add a GEMINI_API_KEY and reload.";

/// Default bound for a single model call
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(20);

/// Longest error excerpt embedded in the exhausted-plan message
const MAX_ERROR_EXCERPT: usize = 160;

/// One model call made while running the plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    pub model_id: String,
    pub with_image: bool,
    /// `None` when the call succeeded
    pub failure: Option<FailureClass>,
    pub error: Option<String>,
}

/// Result of running the plan, with the calls that were made
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    /// Model text, or a user-facing notice
    pub text: String,
    /// Model that produced `text`; `None` when `text` is a notice
    pub answered_by: Option<String>,
    pub attempts: Vec<AttemptRecord>,
}

impl QueryOutcome {
    fn answer(text: String, model_id: &str, attempts: Vec<AttemptRecord>) -> Self {
        Self {
            text,
            answered_by: Some(model_id.to_string()),
            attempts,
        }
    }

    fn notice(text: impl Into<String>, attempts: Vec<AttemptRecord>) -> Self {
        Self {
            text: text.into(),
            answered_by: None,
            attempts,
        }
    }

    /// Whether a model answered
    pub fn is_answer(&self) -> bool {
        self.answered_by.is_some()
    }
}

/// Client that tries an ordered list of models
pub struct FallbackClient<B, C = DefaultClassifier> {
    backend: B,
    classifier: C,
    plan: Vec<ModelAttempt>,
    attempt_timeout: Duration,
}

impl<B: GenerativeBackend> FallbackClient<B, DefaultClassifier> {
    /// Client over `backend` with the default plan and classifier
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            classifier: DefaultClassifier,
            plan: DEFAULT_PLAN.to_vec(),
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
        }
    }
}

impl FallbackClient<GeminiClient, DefaultClassifier> {
    /// Client over Gemini, bounded by the client's configured attempt timeout
    pub fn gemini(client: GeminiClient) -> Self {
        let timeout = client.attempt_timeout();
        Self::new(client).with_attempt_timeout(timeout)
    }
}

impl<B: GenerativeBackend, C: FailureClassifier> FallbackClient<B, C> {
    /// Replace the error classifier
    pub fn with_classifier<C2: FailureClassifier>(self, classifier: C2) -> FallbackClient<B, C2> {
        FallbackClient {
            backend: self.backend,
            classifier,
            plan: self.plan,
            attempt_timeout: self.attempt_timeout,
        }
    }

    /// Replace the model plan
    pub fn with_plan(mut self, plan: &[ModelAttempt]) -> Self {
        self.plan = plan.to_vec();
        self
    }

    /// Bound every model call by `timeout`
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    pub fn plan(&self) -> &[ModelAttempt] {
        &self.plan
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Model text or a displayable notice. Never empty, never an error.
    pub async fn query(&self, request: &ExplainRequest) -> String {
        self.run(request).await.text
    }

    /// Run the plan and report every call that was made
    pub async fn run(&self, request: &ExplainRequest) -> QueryOutcome {
        let query_id = generate_request_id();
        let mut attempts = Vec::new();

        if !self.backend.is_configured() {
            warn!("[{}] no credential configured, skipping {} models", query_id, self.plan.len());
            return QueryOutcome::notice(CONFIGURATION_MISSING_MESSAGE, attempts);
        }

        info!(
            "[{}] explaining \"{}\" in \"{}\" ({}, image: {})",
            query_id,
            request.target_label(),
            request.context_label(),
            request.language(),
            request.image().is_some()
        );

        let mut last_error: Option<String> = None;

        for (index, attempt) in self.plan.iter().enumerate() {
            let image = if attempt.uses_image { request.image() } else { None };

            let err = match self.call(attempt.model_id, request, image).await {
                Ok(text) => {
                    attempts.push(record(attempt.model_id, image.is_some(), None));
                    info!("[{}] answered by {}", query_id, attempt.model_id);
                    return QueryOutcome::answer(text, attempt.model_id, attempts);
                }
                Err(err) => err,
            };

            let class = self.classifier.classify(&err);
            warn!(
                "[{}] {} failed ({}): {}",
                query_id,
                attempt.model_id,
                class,
                sanitize_for_logging(&err.to_string())
            );
            attempts.push(record(attempt.model_id, image.is_some(), Some((class, &err))));

            match class {
                FailureClass::Quota => {
                    return QueryOutcome::notice(QUOTA_MESSAGE, attempts);
                }
                FailureClass::PayloadRejected if index == 0 && image.is_some() => {
                    debug!("[{}] retrying {} without the image", query_id, attempt.model_id);
                    let text_only = request.without_image();

                    match self.call(attempt.model_id, &text_only, None).await {
                        Ok(text) => {
                            attempts.push(record(attempt.model_id, false, None));
                            info!("[{}] answered by {} (text only)", query_id, attempt.model_id);
                            return QueryOutcome::answer(text, attempt.model_id, attempts);
                        }
                        Err(retry_err) => {
                            let retry_class = self.classifier.classify(&retry_err);
                            warn!(
                                "[{}] {} text-only retry failed ({}): {}",
                                query_id,
                                attempt.model_id,
                                retry_class,
                                sanitize_for_logging(&retry_err.to_string())
                            );
                            attempts.push(record(attempt.model_id, false, Some((retry_class, &retry_err))));

                            if retry_class == FailureClass::Quota {
                                return QueryOutcome::notice(QUOTA_MESSAGE, attempts);
                            }
                            last_error = Some(retry_err.to_string());
                        }
                    }
                }
                FailureClass::Overloaded | FailureClass::PayloadRejected | FailureClass::Unknown => {
                    last_error = Some(err.to_string());
                }
            }
        }

        error!("[{}] all {} models failed", query_id, self.plan.len());
        QueryOutcome::notice(exhausted_message(self.plan.len(), last_error.as_deref()), attempts)
    }

    async fn call(
        &self,
        model_id: &str,
        request: &ExplainRequest,
        image: Option<&ImagePayload>,
    ) -> Result<String> {
        let prompt = build_prompt(request, image.is_some());

        let text = tokio::time::timeout(
            self.attempt_timeout,
            self.backend.generate(model_id, &prompt, image),
        )
        .await
        .map_err(|_| {
            ServiceError::timeout(format!(
                "{} did not answer within {:?}",
                model_id, self.attempt_timeout
            ))
        })??;

        if text.trim().is_empty() {
            return Err(ServiceError::parsing(format!("{} returned an empty answer", model_id)));
        }

        Ok(text)
    }
}

fn record(model_id: &str, with_image: bool, failure: Option<(FailureClass, &ServiceError)>) -> AttemptRecord {
    AttemptRecord {
        model_id: model_id.to_string(),
        with_image,
        failure: failure.map(|(class, _)| class),
        error: failure.map(|(_, err)| err.to_string()),
    }
}

/// Diagnostic notice shown when every model failed
pub fn exhausted_message(models_tried: usize, last_error: Option<&str>) -> String {
    match last_error {
        Some(err) => format!(
            "The AI could not explain this part right now ({} models tried). Last error: {}",
            models_tried,
            truncate_string(&sanitize_for_logging(err), MAX_ERROR_EXCERPT)
        ),
        None => "No AI models are available to explain this part.".to_string(),
    }
}
