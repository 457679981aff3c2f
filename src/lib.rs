//! # rustresearcher
//!
//! AI Research Assistant - asks a hosted chat-completion model whether a
//! question is research-related, answers it with study guidance, and finds
//! candidate papers per subject tag within a publication-year window.
//!
//! ## Modules
//!
//! - [`assistant`] - Submission flow (probe, answer, paper search)
//! - [`answerer`] - Question classification and guidance
//! - [`finder`] - Per-tag paper retrieval and year filtering
//! - [`source`] - Google Scholar and OpenAlex result streams
//! - [`completion`] - OpenAI-compatible chat completion client
//! - [`config`] / [`secrets`] - Settings and API key storage
//! - [`error`] - Custom error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rustresearcher::{assistant::{Assistant, Outcome}, config::Settings, query::{Query, YearRange}, secrets::SecretStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::from_env(&SecretStore::default())?;
//!     let assistant = Assistant::from_settings(&settings)?;
//!     let query = Query::new(
//!         "How do transformers handle long contexts?",
//!         &["Machine Learning".to_string()],
//!         YearRange::new(2020, 2023),
//!     )?;
//!     if let Outcome::Answered { retrieval, .. } = assistant.submit(&query).await? {
//!         println!("Found {} papers", retrieval.papers.len());
//!     }
//!     Ok(())
//! }
//! ```

pub mod answerer;
pub mod assistant;
pub mod completion;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod export;
pub mod fields;
pub mod finder;
pub mod prompts;
pub mod query;
pub mod render;
pub mod secrets;
pub mod source;

pub use error::{ResearchError, Result};
