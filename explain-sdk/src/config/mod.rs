//! Configuration management for the explain pipeline
//!
//! This module provides utilities for loading and validating configuration
//! for the Gemini backend and the annotation front end, with support for
//! environment variables.

use std::env;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use crate::error::{Result, ServiceError};
use crate::explain::Language;
use once_cell::sync::Lazy;

/// Default Gemini REST endpoint
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Base trait for configuration providers
pub trait ConfigProvider: Send + Sync {
    /// Get a string configuration value
    fn get_string(&self, key: &str) -> Result<String>;
}

/// Extension methods for configuration providers
pub trait ConfigProviderExt: ConfigProvider {
    /// Get an integer configuration value
    fn get_int(&self, key: &str) -> Result<i64> {
        let value = self.get_string(key)?;
        value.trim().parse::<i64>()
            .map_err(|e| ServiceError::configuration(format!("Invalid integer for key {}: {}", key, e)))
    }

    /// Get a float configuration value
    fn get_float(&self, key: &str) -> Result<f64> {
        let value = self.get_string(key)?;
        value.trim().parse::<f64>()
            .map_err(|e| ServiceError::configuration(format!("Invalid float for key {}: {}", key, e)))
    }

    /// Get a string configuration value with a default
    fn get_string_or(&self, key: &str, default: &str) -> String {
        self.get_string(key).unwrap_or_else(|_| default.to_string())
    }

    /// Get an integer configuration value with a default
    fn get_int_or(&self, key: &str, default: i64) -> i64 {
        self.get_int(key).unwrap_or(default)
    }

    /// Get a float configuration value with a default
    fn get_float_or(&self, key: &str, default: f64) -> f64 {
        self.get_float(key).unwrap_or(default)
    }
}

impl<T: ConfigProvider> ConfigProviderExt for T {}

/// Environment variable based configuration provider
#[derive(Debug, Clone, Default)]
pub struct EnvConfigProvider {
    /// Optional prefix for environment variables
    prefix: Option<String>,

    /// Optional namespace for variables (e.g., "GEMINI")
    namespace: Option<String>,
}

impl EnvConfigProvider {
    /// Create a new environment variable config provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a prefix for environment variables
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Set a namespace for environment variables
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Format a configuration key as an environment variable
    fn format_key(&self, key: &str) -> String {
        let mut env_key = String::new();

        if let Some(ref prefix) = self.prefix {
            env_key.push_str(prefix);
            env_key.push('_');
        }

        if let Some(ref namespace) = self.namespace {
            env_key.push_str(namespace);
            env_key.push('_');
        }

        // Uppercase and replace non-alphanumeric with underscores
        env_key.push_str(&key.to_uppercase().replace(|c: char| !c.is_ascii_alphanumeric(), "_"));

        env_key
    }
}

impl ConfigProvider for EnvConfigProvider {
    fn get_string(&self, key: &str) -> Result<String> {
        let env_key = self.format_key(key);

        env::var(&env_key)
            .map_err(|e| {
                match e {
                    env::VarError::NotPresent => {
                        ServiceError::configuration(format!("Environment variable not set: {}", env_key))
                    }
                    env::VarError::NotUnicode(_) => {
                        ServiceError::configuration(format!("Environment variable is not valid unicode: {}", env_key))
                    }
                }
            })
    }
}

/// In-memory config provider for testing or static configuration
#[derive(Debug, Clone, Default)]
pub struct MemoryConfigProvider {
    values: HashMap<String, String>,
}

impl MemoryConfigProvider {
    /// Create a new empty memory config provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a memory config provider with initial values
    pub fn with_values(values: HashMap<String, String>) -> Self {
        Self { values }
    }

    /// Set a configuration value
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: ToString,
    {
        self.values.insert(key.into(), value.to_string());
    }
}

impl ConfigProvider for MemoryConfigProvider {
    fn get_string(&self, key: &str) -> Result<String> {
        self.values
            .get(key)
            .cloned()
            .ok_or_else(|| ServiceError::configuration(format!("Configuration key not found: {}", key)))
    }
}

/// Layered provider: the first layer that has a key wins
///
/// The CLI puts flag overrides in a [`MemoryConfigProvider`] in front of the
/// environment.
#[derive(Default)]
pub struct CompositeConfigProvider {
    layers: Vec<Box<dyn ConfigProvider>>,
}

impl CompositeConfigProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a layer with lower precedence than the existing ones
    pub fn layer(mut self, provider: impl ConfigProvider + 'static) -> Self {
        self.layers.push(Box::new(provider));
        self
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl ConfigProvider for CompositeConfigProvider {
    fn get_string(&self, key: &str) -> Result<String> {
        self.layers
            .iter()
            .find_map(|layer| layer.get_string(key).ok())
            .ok_or_else(|| ServiceError::configuration(format!("Configuration key not found in any layer: {}", key)))
    }
}

/// Global default configuration provider (unprefixed environment)
pub static DEFAULT_PROVIDER: Lazy<Arc<EnvConfigProvider>> = Lazy::new(|| {
    Arc::new(EnvConfigProvider::new())
});

/// Trait for service-specific configuration
pub trait ServiceConfig: Debug + Send + Sync {
    /// Validate this configuration
    fn validate(&self) -> Result<()>;

    /// Service name
    fn service_name(&self) -> &str;
}

/// Configuration for the Gemini generative API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// API key; empty means the client is not configured
    pub api_key: String,

    /// Base URL (can be changed for proxies and tests)
    pub base_url: String,

    /// Upper bound for a single model call, in seconds
    pub attempt_timeout_seconds: u64,

    /// Sampling temperature
    pub temperature: f32,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            attempt_timeout_seconds: 20,
            temperature: 0.4,
        }
    }
}

impl GeminiConfig {
    /// Load configuration from a config provider
    ///
    /// A missing API key is not an error: the client is built unconfigured and
    /// the pipeline answers with the configuration-missing message instead.
    pub fn from_provider<P: ConfigProvider + ConfigProviderExt>(provider: &P) -> Result<Self> {
        let defaults = Self::default();
        let api_key = provider.get_string_or("gemini_api_key", "").trim().to_string();
        let base_url = provider.get_string_or("gemini_base_url", &defaults.base_url);
        let attempt_timeout_seconds = provider
            .get_int_or("gemini_attempt_timeout_seconds", defaults.attempt_timeout_seconds as i64);
        let temperature = provider.get_float_or("gemini_temperature", defaults.temperature as f64) as f32;

        if attempt_timeout_seconds <= 0 {
            return Err(ServiceError::configuration(format!(
                "gemini_attempt_timeout_seconds must be positive, got {}",
                attempt_timeout_seconds
            )));
        }

        let config = Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            attempt_timeout_seconds: attempt_timeout_seconds as u64,
            temperature,
        };

        config.validate()?;
        Ok(config)
    }

    /// Whether a credential is present
    pub fn has_credential(&self) -> bool {
        !self.api_key.is_empty()
    }
}

impl ServiceConfig for GeminiConfig {
    fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(ServiceError::configuration("Gemini base URL is required"));
        }

        if self.attempt_timeout_seconds == 0 {
            return Err(ServiceError::configuration("Gemini attempt timeout must be positive"));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ServiceError::configuration(format!(
                "Gemini temperature must be within 0.0..=2.0, got {}",
                self.temperature
            )));
        }

        Ok(())
    }

    fn service_name(&self) -> &str {
        "gemini"
    }
}

/// Front-end settings for the annotation controller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplainerSettings {
    /// Language requested from the model until the user picks another
    pub default_language: Language,

    /// JPEG quality used when capturing the canvas
    pub jpeg_quality: f32,
}

impl Default for ExplainerSettings {
    fn default() -> Self {
        Self {
            default_language: Language::default(),
            jpeg_quality: 0.9,
        }
    }
}

impl ExplainerSettings {
    /// Load settings from a config provider
    pub fn from_provider<P: ConfigProvider + ConfigProviderExt>(provider: &P) -> Result<Self> {
        let defaults = Self::default();
        let language = provider.get_string_or("explainer_language", defaults.default_language.as_str());
        let jpeg_quality = provider.get_float_or("explainer_jpeg_quality", defaults.jpeg_quality as f64) as f32;

        let settings = Self {
            default_language: Language::new(language),
            jpeg_quality,
        };

        settings.validate()?;
        Ok(settings)
    }
}

impl ServiceConfig for ExplainerSettings {
    fn validate(&self) -> Result<()> {
        if !(self.jpeg_quality > 0.0 && self.jpeg_quality <= 1.0) {
            return Err(ServiceError::configuration(format!(
                "JPEG quality must be within (0.0, 1.0], got {}",
                self.jpeg_quality
            )));
        }

        if self.default_language.as_str().trim().is_empty() {
            return Err(ServiceError::configuration("Default language must not be empty"));
        }

        Ok(())
    }

    fn service_name(&self) -> &str {
        "explainer"
    }
}
