//! # Explain SDK
//!
//! Point-and-explain for 3D models: click a part, get a short AI explanation
//! pinned next to it.
//!
//! This crate provides:
//!
//! - A typed Gemini client
//! - A fallback client that walks an ordered list of models and always
//!   produces displayable text
//! - A tolerant parser for model answers
//! - Screen projection and label layout
//! - The annotation controller that ties clicks, captures, queries, labels
//!   and speech together
//!
//! ## Architecture
//!
//! - `GenerativeBackend`: the seam between the pipeline and the transport
//! - `FailureClassifier`: maps a `ServiceError` to the recovery path taken by
//!   the fallback client
//! - `SceneHost`, `AnnotationSurface`, `SpeechOutput`: the seams between the
//!   controller and the viewer
//! - `ServiceError`: error handling for everything below the fallback client

pub mod core;
pub use core::{GenerativeBackend, ServiceClient};

pub mod services;
pub use services::gemini;

pub mod error;
pub use error::{DefaultClassifier, ErrorContext, FailureClass, FailureClassifier, Result, ServiceError};

pub mod config;
pub use config::{ConfigProvider, ExplainerSettings, GeminiConfig, ServiceConfig};

pub mod explain;
pub use explain::{
    parse_response, ExplainRequest, ExplainResult, FallbackClient, ImagePayload, Language, QueryOutcome,
};

pub mod annotation;
pub use annotation::AnnotationController;

mod util;

/// Fallback client over Gemini configured from the environment
pub fn gemini_fallback_client() -> Result<FallbackClient<gemini::GeminiClient>> {
    Ok(FallbackClient::gemini(gemini::GeminiClient::from_env()?))
}

#[cfg(test)]
mod tests;
