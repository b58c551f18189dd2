//! Explanation pipeline
//!
//! Request types, the model plan, prompt construction, the fallback client
//! and answer parsing.

pub mod fallback;
pub mod parser;
pub mod plan;
pub mod prompt;
pub mod request;

pub use fallback::{
    AttemptRecord, FallbackClient, QueryOutcome, CONFIGURATION_MISSING_MESSAGE, DEFAULT_ATTEMPT_TIMEOUT,
    QUOTA_MESSAGE,
};
pub use parser::{
    parse_response, parse_with_tier, ExplainResult, ParseTier, HEURISTIC_SPLIT_LIMIT, NO_EXPLANATION_PLACEHOLDER,
};
pub use plan::{ModelAttempt, DEFAULT_PLAN};
pub use prompt::build_prompt;
pub use request::{ExplainRequest, ImagePayload, Language};
