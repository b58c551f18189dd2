//! Unit tests for the explain SDK
//!
//! This module contains tests for the pipeline components, with fakes for
//! the model backend and the viewer.

pub mod fallback_tests;
pub mod support;
