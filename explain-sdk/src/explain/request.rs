//! Explanation request types

use std::fmt;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ServiceError};

/// Language tag requested from the model ("English", "Hindi", ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Language(String);

impl Default for Language {
    fn default() -> Self {
        Self("English".to_string())
    }
}

impl Language {
    pub fn new(tag: impl Into<String>) -> Self {
        let tag = tag.into();
        if tag.trim().is_empty() {
            Self::default()
        } else {
            Self(tag.trim().to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Speech synthesis locale for this language
    pub fn locale(&self) -> &'static str {
        match self.0.to_lowercase().as_str() {
            "hindi" => "hi-IN",
            "spanish" => "es-ES",
            "french" => "fr-FR",
            "german" => "de-DE",
            "tamil" => "ta-IN",
            "telugu" => "te-IN",
            "bengali" => "bn-IN",
            "marathi" => "mr-IN",
            "japanese" => "ja-JP",
            _ => "en-US",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Encoded image attached to a request
#[derive(Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl fmt::Debug for ImagePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImagePayload")
            .field("mime_type", &self.mime_type)
            .field("bytes", &self.data.len())
            .finish()
    }
}

impl ImagePayload {
    /// Wrap raw JPEG bytes
    pub fn jpeg(data: Vec<u8>) -> Self {
        Self {
            mime_type: "image/jpeg".to_string(),
            data,
        }
    }

    /// Decode a `data:<mime>;base64,<payload>` URI as produced by canvas capture
    pub fn from_data_uri(uri: &str) -> Result<Self> {
        let (header, payload) = uri
            .split_once(',')
            .ok_or_else(|| ServiceError::validation("Data URI has no payload separator"))?;

        let mime_type = header
            .strip_prefix("data:")
            .and_then(|rest| rest.strip_suffix(";base64"))
            .filter(|mime| mime.starts_with("image/"))
            .ok_or_else(|| ServiceError::validation(format!("Unsupported data URI header: {}", header)))?;

        let data = BASE64
            .decode(payload.trim())
            .map_err(|e| ServiceError::validation(format!("Invalid base64 image payload: {}", e)))?;

        if data.is_empty() {
            return Err(ServiceError::validation("Image payload is empty"));
        }

        Ok(Self {
            mime_type: mime_type.to_string(),
            data,
        })
    }

    /// Base64 form sent as inline data
    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.data)
    }
}

/// One explanation query. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct ExplainRequest {
    target_label: String,
    context_label: String,
    image: Option<ImagePayload>,
    language: Language,
}

impl ExplainRequest {
    pub fn new(
        target_label: impl Into<String>,
        context_label: impl Into<String>,
        image: Option<ImagePayload>,
        language: Language,
    ) -> Result<Self> {
        let target_label = target_label.into().trim().to_string();
        let context_label = context_label.into().trim().to_string();

        if target_label.is_empty() {
            return Err(ServiceError::validation("Target label must not be empty"));
        }
        if context_label.is_empty() {
            return Err(ServiceError::validation("Context label must not be empty"));
        }

        Ok(Self {
            target_label,
            context_label,
            image,
            language,
        })
    }

    pub fn target_label(&self) -> &str {
        &self.target_label
    }

    pub fn context_label(&self) -> &str {
        &self.context_label
    }

    pub fn image(&self) -> Option<&ImagePayload> {
        self.image.as_ref()
    }

    pub fn language(&self) -> &Language {
        &self.language
    }

    /// Text-only copy, used when a model refuses the image part
    pub fn without_image(&self) -> Self {
        Self {
            image: None,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_locale() {
        assert_eq!(Language::new("Hindi").locale(), "hi-IN");
        assert_eq!(Language::new("hindi").locale(), "hi-IN");
        assert_eq!(Language::new("Klingon").locale(), "en-US");
        assert_eq!(Language::new("  ").as_str(), "English");
    }

    #[test]
    fn test_image_from_data_uri() {
        let uri = format!("data:image/jpeg;base64,{}", BASE64.encode([0xFFu8, 0xD8, 0xFF]));
        let image = ImagePayload::from_data_uri(&uri).unwrap();

        assert_eq!(image.mime_type, "image/jpeg");
        assert_eq!(image.data, vec![0xFF, 0xD8, 0xFF]);
        assert_eq!(image.to_base64(), "/9j/");
    }

    #[test]
    fn test_image_from_bad_data_uri() {
        assert!(ImagePayload::from_data_uri("not a uri").is_err());
        assert!(ImagePayload::from_data_uri("data:text/plain;base64,aGk=").is_err());
        assert!(ImagePayload::from_data_uri("data:image/jpeg;base64,***").is_err());
    }

    #[test]
    fn test_request_validation() {
        assert!(ExplainRequest::new("", "Heart", None, Language::default()).is_err());
        assert!(ExplainRequest::new("Aorta", " ", None, Language::default()).is_err());

        let image = ImagePayload::jpeg(vec![1, 2, 3]);
        let request = ExplainRequest::new("Aorta", "Heart", Some(image), Language::default()).unwrap();
        assert!(request.image().is_some());
        assert!(request.without_image().image().is_none());
        assert_eq!(request.without_image().target_label(), "Aorta");
    }
}
