//! Service-specific client implementations
//!
//! This module contains client implementations for external generative services.

pub mod gemini;
pub mod common;

pub use common::UserAgent;
