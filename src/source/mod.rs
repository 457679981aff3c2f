//! Scholarly search providers.
//!
//! A search produces a lazy, finite, non-restartable stream of raw
//! publications. Nothing is fetched until the first pull, and the stream
//! reports running out of results as [`Pull::Exhausted`] rather than as an
//! error. Any `Err` from [`ResultStream::next`] is a hard provider failure.

pub mod gscholar;
pub mod openalex;

use crate::config::{Settings, SourceKind};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::future::Future;

pub use gscholar::{GoogleScholar, ScholarStream};
pub use openalex::{OpenAlex, OpenAlexStream};

/// Publication year as the provider reported it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawYear {
    Number(i64),
    Text(String),
}

impl RawYear {
    /// Parse as an integer year; `None` when the value is not a number
    pub fn parse(&self) -> Option<i32> {
        match self {
            Self::Number(n) => i32::try_from(*n).ok(),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Bibliographic part of a raw result
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Bib {
    pub title: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub pub_year: Option<RawYear>,
}

/// One raw search result, before normalisation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawPublication {
    pub bib: Bib,
    pub pub_url: Option<String>,
}

/// Outcome of a single pull
#[derive(Debug, Clone)]
pub enum Pull {
    Item(RawPublication),
    Exhausted,
}

/// Pull-based result stream
pub trait ResultStream {
    /// Pull the next result. Once `Exhausted` is returned, later pulls return it too.
    fn next(&mut self) -> impl Future<Output = Result<Pull>> + Send;
}

/// A scholarly search backend
pub trait ScholarSource {
    type Stream: ResultStream + Send;

    /// Start a search. No request is sent until the stream is pulled.
    fn search(&self, query: &str) -> Self::Stream;

    fn name(&self) -> &'static str;
}

/// Provider chosen at runtime
#[derive(Debug, Clone)]
pub enum AnySource {
    GoogleScholar(GoogleScholar),
    OpenAlex(OpenAlex),
}

impl AnySource {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(match settings.source {
            SourceKind::GoogleScholar => Self::GoogleScholar(GoogleScholar::new(settings)?),
            SourceKind::OpenAlex => Self::OpenAlex(OpenAlex::new(settings)?),
        })
    }
}

pub enum AnyStream {
    GoogleScholar(ScholarStream),
    OpenAlex(OpenAlexStream),
}

impl ResultStream for AnyStream {
    async fn next(&mut self) -> Result<Pull> {
        match self {
            Self::GoogleScholar(stream) => stream.next().await,
            Self::OpenAlex(stream) => stream.next().await,
        }
    }
}

impl ScholarSource for AnySource {
    type Stream = AnyStream;

    fn search(&self, query: &str) -> AnyStream {
        match self {
            Self::GoogleScholar(source) => AnyStream::GoogleScholar(source.search(query)),
            Self::OpenAlex(source) => AnyStream::OpenAlex(source.search(query)),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::GoogleScholar(source) => source.name(),
            Self::OpenAlex(source) => source.name(),
        }
    }
}
