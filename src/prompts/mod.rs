//! Prompt module for LLM-based operations.
//!
//! This module provides the prompt and text templates used by the question answerer.

pub mod research;

pub use research::*;
