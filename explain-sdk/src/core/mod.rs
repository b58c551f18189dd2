//! Core abstractions for the explain SDK
//!
//! This module provides the trait interfaces that sit between the explanation
//! pipeline and the transport:
//!
//! - `ServiceClient`: descriptive metadata and health check for a client
//! - `GenerativeBackend`: a model endpoint that turns a prompt (and optional
//!   image) into text; the fallback client only talks to this trait

use async_trait::async_trait;

use crate::error::Result;
use crate::explain::ImagePayload;

/// Base trait for service clients
#[async_trait]
pub trait ServiceClient: Send + Sync {
    /// The client name/identifier
    fn name(&self) -> &str;

    /// The base URL for the service
    fn base_url(&self) -> &str;

    /// Service API version
    fn version(&self) -> &str;

    /// Health check for the service
    async fn health_check(&self) -> Result<bool>;
}

/// A multi-model generative service
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Whether a credential is available. An unconfigured backend is never called.
    fn is_configured(&self) -> bool;

    /// Run one generation against `model_id`.
    ///
    /// `image`, when present, is sent as an inline part after the prompt.
    async fn generate(
        &self,
        model_id: &str,
        prompt: &str,
        image: Option<&ImagePayload>,
    ) -> Result<String>;
}
