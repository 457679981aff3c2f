//! OpenAlex result stream.
//!
//! Alternative to Google Scholar backed by the OpenAlex works API. Pages are
//! requested on demand; the stream ends on an empty page or once `meta.count`
//! results have been handed out.

use super::{Bib, Pull, RawPublication, RawYear, ResultStream, ScholarSource};
use crate::config::Settings;
use crate::error::{ResearchError, Result};
use serde::Deserialize;
use std::collections::VecDeque;
use tracing::{debug, info};

/// OpenAlex API base URL
pub const OPENALEX_API_BASE: &str = "https://api.openalex.org";

/// Small pages: the finder never reads more than a handful per query
const PER_PAGE: u32 = 25;

/// Email for polite pool access
const POLITE_EMAIL: &str = "rustresearcher@example.com";

const SELECT_FIELDS: &str =
    "id,title,display_name,publication_year,doi,abstract_inverted_index,primary_location,best_oa_location";

/// OpenAlex search provider
#[derive(Debug, Clone)]
pub struct OpenAlex {
    client: reqwest::Client,
    base_url: String,
}

impl OpenAlex {
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .user_agent(format!("rustresearcher/{} (mailto:{})", env!("CARGO_PKG_VERSION"), POLITE_EMAIL))
            .build()
            .map_err(|e| ResearchError::Config(format!("Failed to build HTTP client: {}", e)))?;

        let base_url = settings
            .openalex_url
            .as_deref()
            .unwrap_or(OPENALEX_API_BASE)
            .trim_end_matches('/')
            .to_string();

        Ok(Self { client, base_url })
    }
}

impl ScholarSource for OpenAlex {
    type Stream = OpenAlexStream;

    fn search(&self, query: &str) -> OpenAlexStream {
        OpenAlexStream {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            query: query.to_string(),
            next_page: 1,
            delivered: 0,
            total: None,
            buffer: VecDeque::new(),
            finished: false,
        }
    }

    fn name(&self) -> &'static str {
        "openalex"
    }
}

/// Lazy stream over OpenAlex result pages
pub struct OpenAlexStream {
    client: reqwest::Client,
    base_url: String,
    query: String,
    next_page: u32,
    delivered: u64,
    total: Option<u64>,
    buffer: VecDeque<RawPublication>,
    finished: bool,
}

impl OpenAlexStream {
    fn pop(&mut self) -> Option<RawPublication> {
        let item = self.buffer.pop_front()?;
        self.delivered += 1;
        Some(item)
    }
}

impl ResultStream for OpenAlexStream {
    async fn next(&mut self) -> Result<Pull> {
        if let Some(item) = self.pop() {
            return Ok(Pull::Item(item));
        }
        if self.finished || self.total.is_some_and(|total| self.delivered >= total) {
            self.finished = true;
            return Ok(Pull::Exhausted);
        }

        let url = build_search_url(&self.base_url, &self.query, self.next_page);
        debug!(url = %url, page = self.next_page, "Fetching OpenAlex page");

        let body = fetch_page(&self.client, &url).await?;
        let (total, works) = parse_response(&body)?;
        info!(query = %self.query, page = self.next_page, count = works.len(), "Parsed OpenAlex results");

        self.next_page += 1;
        self.total = Some(total);
        if works.is_empty() {
            self.finished = true;
        }
        self.buffer.extend(works);

        Ok(self.pop().map(Pull::Item).unwrap_or(Pull::Exhausted))
    }
}

/// OpenAlex API response structures
#[derive(Debug, Deserialize)]
struct OpenAlexResponse {
    meta: OpenAlexMeta,
    results: Vec<OpenAlexWork>,
}

#[derive(Debug, Deserialize)]
struct OpenAlexMeta {
    count: u64,
}

#[derive(Debug, Deserialize)]
struct OpenAlexWork {
    title: Option<String>,
    display_name: Option<String>,
    publication_year: Option<i64>,
    doi: Option<String>,
    #[serde(rename = "abstract_inverted_index")]
    abstract_index: Option<serde_json::Value>,
    primary_location: Option<OpenAlexLocation>,
    best_oa_location: Option<OpenAlexLocation>,
}

#[derive(Debug, Deserialize)]
struct OpenAlexLocation {
    landing_page_url: Option<String>,
}

/// Build OpenAlex API search URL
fn build_search_url(base_url: &str, query: &str, page: u32) -> String {
    format!(
        "{}/works?search={}&per-page={}&page={}&mailto={}&filter=type:article&select={}",
        base_url,
        urlencoding::encode(query),
        PER_PAGE,
        page,
        POLITE_EMAIL,
        SELECT_FIELDS
    )
}

/// Fetch page content from OpenAlex API
async fn fetch_page(client: &reqwest::Client, url: &str) -> Result<String> {
    let response = client.get(url).send().await?;
    let status = response.status();

    if !status.is_success() {
        return Err(ResearchError::Api {
            code: status.as_u16(),
            message: format!("OpenAlex API error: {}", status),
        });
    }

    Ok(response.text().await?)
}

/// Parse OpenAlex API response into the total hit count and raw publications
fn parse_response(json_str: &str) -> Result<(u64, Vec<RawPublication>)> {
    let response: OpenAlexResponse = serde_json::from_str(json_str)
        .map_err(|e| ResearchError::Parse(format!("Failed to parse OpenAlex response: {}", e)))?;

    let works = response
        .results
        .into_iter()
        .map(|work| {
            let landing = work
                .primary_location
                .and_then(|l| l.landing_page_url)
                .or_else(|| work.best_oa_location.and_then(|l| l.landing_page_url));

            RawPublication {
                bib: Bib {
                    title: work.display_name.or(work.title),
                    abstract_text: work
                        .abstract_index
                        .as_ref()
                        .map(reconstruct_abstract)
                        .filter(|a| !a.is_empty()),
                    pub_year: work.publication_year.map(RawYear::Number),
                },
                pub_url: landing.or(work.doi),
            }
        })
        .collect();

    Ok((response.meta.count, works))
}

/// Reconstruct abstract text from inverted index
/// OpenAlex provides abstract as inverted index for legal reasons.
fn reconstruct_abstract(inverted_index: &serde_json::Value) -> String {
    let Some(obj) = inverted_index.as_object() else {
        return String::new();
    };

    let mut words: Vec<(i64, &str)> = Vec::new();
    for (word, positions) in obj {
        if let Some(pos_array) = positions.as_array() {
            words.extend(
                pos_array
                    .iter()
                    .filter_map(|p| p.as_i64())
                    .map(|p| (p, word.as_str())),
            );
        }
    }

    words.sort_by_key(|(pos, _)| *pos);
    words.iter().map(|(_, w)| *w).collect::<Vec<_>>().join(" ")
}
