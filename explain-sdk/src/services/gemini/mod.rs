//! Gemini API client implementation
//!
//! This module provides a typed client for the Gemini `generateContent` REST
//! endpoint. Every call names its model explicitly so the fallback client can
//! walk a plan of models with one client instance.

mod models;
pub use models::*;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::Client;

use crate::config::{ConfigProviderExt, GeminiConfig, ServiceConfig, DEFAULT_PROVIDER};
use crate::core::{GenerativeBackend, ServiceClient};
use crate::error::{ErrorContext, Result, ServiceError};
use crate::explain::ImagePayload;
use crate::services::common::{build_http_client, parse_error_response, UserAgent};

/// Header carrying the API key
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini API client
pub struct GeminiClient {
    /// HTTP client
    http_client: Client,

    /// Configuration
    config: GeminiConfig,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.config.base_url)
            .field("configured", &self.config.has_credential())
            .finish()
    }
}

impl GeminiClient {
    /// Create a client from the process environment (`GEMINI_API_KEY`, ...)
    pub fn from_env() -> Result<Self> {
        Self::from_provider(&**DEFAULT_PROVIDER)
    }

    /// Create a client from any configuration provider
    pub fn from_provider<P: ConfigProviderExt>(provider: &P) -> Result<Self> {
        let config = GeminiConfig::from_provider(provider)?;
        if !config.has_credential() {
            warn!("Gemini client: no API key configured, explanations are disabled");
        }
        Self::new_with_config(config)
    }

    /// Create a new Gemini client with custom configuration
    pub fn new_with_config(config: GeminiConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.attempt_timeout_seconds);

        let http_client = build_http_client(
            Some(UserAgent {
                extra: Some("Gemini-Client".to_string()),
                ..UserAgent::default()
            }),
            Some(timeout),
        )?;

        Ok(Self { http_client, config })
    }

    /// Create a new builder for the Gemini client
    pub fn builder() -> GeminiClientBuilder {
        GeminiClientBuilder::default()
    }

    /// Configured per-attempt timeout
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.config.attempt_timeout_seconds)
    }

    /// Send a `generateContent` request to `model_id`
    pub async fn generate_content(
        &self,
        model_id: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        if !self.config.has_credential() {
            return Err(ServiceError::configuration("No Gemini API key configured"));
        }

        let endpoint = format!("models/{}:generateContent", model_id);
        let url = format!("{}/{}", self.config.base_url, endpoint);
        debug!("Sending request to Gemini: POST {}", url);

        let start_time = Instant::now();

        let response = self
            .http_client
            .post(&url)
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                ServiceError::from(e).with_context(ErrorContext::for_service("gemini").endpoint(model_id))
            })?;

        let status = response.status();

        if !status.is_success() {
            let error = parse_error_response("gemini", model_id, response).await;
            debug!("Gemini {} failed with {} after {:?}", model_id, status, start_time.elapsed());
            return Err(error);
        }

        let body = response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| ServiceError::parsing(format!("Failed to parse Gemini response: {}", e)))?;

        if let Some(tokens) = body.usage_metadata.as_ref().and_then(|u| u.total_token_count) {
            info!("Gemini {} answered in {:?}, {} tokens", model_id, start_time.elapsed(), tokens);
        } else {
            info!("Gemini {} answered in {:?}", model_id, start_time.elapsed());
        }

        Ok(body)
    }
}

#[async_trait]
impl ServiceClient for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn version(&self) -> &str {
        "v1beta"
    }

    async fn health_check(&self) -> Result<bool> {
        if !self.config.has_credential() {
            return Ok(false);
        }

        let url = format!("{}/models", self.config.base_url);
        match self
            .http_client
            .get(&url)
            .header(API_KEY_HEADER, &self.config.api_key)
            .send()
            .await
        {
            Ok(response) => Ok(response.status().is_success()),
            Err(e) => {
                warn!("Gemini health check failed: {}", e);
                Ok(false)
            }
        }
    }
}

#[async_trait]
impl GenerativeBackend for GeminiClient {
    fn is_configured(&self) -> bool {
        self.config.has_credential()
    }

    async fn generate(
        &self,
        model_id: &str,
        prompt: &str,
        image: Option<&ImagePayload>,
    ) -> Result<String> {
        let mut parts = vec![Part::text(prompt)];
        if let Some(image) = image {
            parts.push(Part::inline(image.mime_type.clone(), image.to_base64()));
        }

        let request = GenerateContentRequest::user(parts).with_temperature(self.config.temperature);
        let response = self.generate_content(model_id, &request).await?;

        if let Some(reason) = response.block_reason() {
            return Err(ServiceError::service(format!("Prompt blocked by {}: {}", model_id, reason)));
        }

        response.text().ok_or_else(|| {
            let finish = response
                .candidates
                .first()
                .and_then(|c| c.finish_reason.clone())
                .unwrap_or_else(|| "no candidates".to_string());
            ServiceError::parsing(format!("Empty response from {} ({})", model_id, finish))
        })
    }
}

/// Builder for Gemini client
#[derive(Default)]
pub struct GeminiClientBuilder {
    /// API key for authentication
    api_key: Option<String>,

    /// Base URL for the API
    base_url: Option<String>,

    /// Per-attempt timeout
    timeout_seconds: Option<u64>,

    /// Sampling temperature
    temperature: Option<f32>,
}

impl GeminiClientBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the API key
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the base URL
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set the per-attempt timeout in seconds
    pub fn timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = Some(seconds);
        self
    }

    /// Set the sampling temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Build the Gemini client
    ///
    /// Values not set explicitly come from the environment, then from defaults.
    pub fn build(self) -> Result<GeminiClient> {
        let mut config = GeminiConfig::from_provider(&**DEFAULT_PROVIDER).unwrap_or_default();

        if let Some(api_key) = self.api_key {
            config.api_key = api_key;
        }

        if let Some(base_url) = self.base_url {
            config.base_url = base_url.trim_end_matches('/').to_string();
        }

        if let Some(timeout) = self.timeout_seconds {
            config.attempt_timeout_seconds = timeout;
        }

        if let Some(temperature) = self.temperature {
            config.temperature = temperature;
        }

        config.validate()?;

        GeminiClient::new_with_config(config)
    }
}
