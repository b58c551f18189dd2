//! The fixed model fallback plan

/// One step of the fallback plan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelAttempt {
    pub model_id: &'static str,
    pub uses_image: bool,
}

impl ModelAttempt {
    pub const fn new(model_id: &'static str, uses_image: bool) -> Self {
        Self { model_id, uses_image }
    }
}

/// Models tried in order until one answers.
///
/// Vision-capable models come first; the last entry is a text-only model that
/// still answers from the part name when every image-capable model is busy.
pub const DEFAULT_PLAN: &[ModelAttempt] = &[
    ModelAttempt::new("gemini-2.5-flash", true),
    ModelAttempt::new("gemini-2.0-flash", true),
    ModelAttempt::new("gemini-1.5-flash", true),
    ModelAttempt::new("gemini-2.0-flash-lite", false),
];
