//! Failure classification for model fallback
//!
//! The fallback client decides how to recover from a failed model call based
//! only on a [`FailureClass`]. Transport-specific error shapes are mapped to
//! that enumeration here, behind the [`FailureClassifier`] trait, so a
//! different backend can plug in its own rules.

use std::fmt;

use super::ServiceError;

/// Recovery-relevant category of a failed model call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureClass {
    /// Account quota or rate limit exhausted; no other model will do better
    Quota,
    /// The model is temporarily overloaded; try the next one
    Overloaded,
    /// The request payload (usually the image part) was refused
    PayloadRejected,
    /// Anything else
    Unknown,
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Quota => write!(f, "quota"),
            Self::Overloaded => write!(f, "overloaded"),
            Self::PayloadRejected => write!(f, "payload_rejected"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Maps a transport error to a [`FailureClass`]
pub trait FailureClassifier: Send + Sync {
    fn classify(&self, error: &ServiceError) -> FailureClass;
}

/// Classifier for Gemini REST errors
///
/// Checks the HTTP status first, then the Google status code, then falls back
/// to matching substrings of the message.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultClassifier;

const QUOTA_MARKERS: &[&str] = &["quota", "rate limit", "resource_exhausted", "resource has been exhausted"];
const OVERLOAD_MARKERS: &[&str] = &["overloaded", "unavailable", "try again later"];
const PAYLOAD_MARKERS: &[&str] = &[
    "image",
    "mime",
    "inline_data",
    "inlinedata",
    "payload",
    "unsupported",
];

impl FailureClassifier for DefaultClassifier {
    fn classify(&self, error: &ServiceError) -> FailureClass {
        let code = error.error_code().map(str::to_ascii_uppercase);
        let message = error.to_string().to_lowercase();

        match error.status_code() {
            Some(429) => return FailureClass::Quota,
            Some(503) => return FailureClass::Overloaded,
            Some(400) | Some(413) | Some(415) if mentions_payload(&message) => {
                return FailureClass::PayloadRejected
            }
            _ => {}
        }

        match code.as_deref() {
            Some("RESOURCE_EXHAUSTED") => return FailureClass::Quota,
            Some("UNAVAILABLE") => return FailureClass::Overloaded,
            _ => {}
        }

        if matches!(error.root(), ServiceError::RateLimit(_))
            || QUOTA_MARKERS.iter().any(|m| message.contains(m))
        {
            FailureClass::Quota
        } else if OVERLOAD_MARKERS.iter().any(|m| message.contains(m)) {
            FailureClass::Overloaded
        } else if message.contains("unable to process input image")
            || (matches!(error.root(), ServiceError::Validation(_)) && mentions_payload(&message))
        {
            FailureClass::PayloadRejected
        } else {
            FailureClass::Unknown
        }
    }
}

fn mentions_payload(message: &str) -> bool {
    PAYLOAD_MARKERS.iter().any(|m| message.contains(m))
}
