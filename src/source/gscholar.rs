//! Google Scholar result stream.
//!
//! Result pages are fetched on demand, ten results at a time, and parsed
//! from HTML. A page shorter than ten results is the last one. A first page
//! with no results and no no-match notice is a parse failure, not exhaustion.

use super::{Pull, RawPublication, RawYear, ResultStream, ScholarSource};
use crate::config::Settings;
use crate::error::{ResearchError, Result};
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::VecDeque;
use tracing::{debug, info, warn};
use url::Url;

/// Default Google Scholar URL
pub const DEFAULT_SCHOLAR_URL: &str = "https://scholar.google.com";

/// Results per Google Scholar page
const PAGE_SIZE: u32 = 10;

/// Source data type filter: articles only, excludes books
const SDT_ARTICLES: &str = "0,5";

/// Shown by Google Scholar when a query has no results at all
const NO_MATCH_MARKER: &str = "did not match any articles";

/// User agent string for requests
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Google Scholar search provider
#[derive(Debug, Clone)]
pub struct GoogleScholar {
    client: reqwest::Client,
    base_url: String,
}

impl GoogleScholar {
    pub fn new(settings: &Settings) -> Result<Self> {
        let base_url = settings
            .scholar_url
            .as_deref()
            .unwrap_or(DEFAULT_SCHOLAR_URL)
            .trim_end_matches('/')
            .to_string();

        let mut builder = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(settings.request_timeout)
            .cookie_store(true);

        if let Some(proxy_url) = settings.proxy.as_deref() {
            let proxy = reqwest::Proxy::all(proxy_url).map_err(|e| {
                ResearchError::Config(format!("Invalid proxy URL '{}': {}", proxy_url, e))
            })?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| ResearchError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, base_url })
    }
}

impl ScholarSource for GoogleScholar {
    type Stream = ScholarStream;

    fn search(&self, query: &str) -> ScholarStream {
        ScholarStream {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            query: query.to_string(),
            next_start: 0,
            buffer: VecDeque::new(),
            last_page_seen: false,
        }
    }

    fn name(&self) -> &'static str {
        "gscholar"
    }
}

/// Lazy stream over Google Scholar result pages
pub struct ScholarStream {
    client: reqwest::Client,
    base_url: String,
    query: String,
    next_start: u32,
    buffer: VecDeque<RawPublication>,
    last_page_seen: bool,
}

impl ResultStream for ScholarStream {
    async fn next(&mut self) -> Result<Pull> {
        if let Some(item) = self.buffer.pop_front() {
            return Ok(Pull::Item(item));
        }
        if self.last_page_seen {
            return Ok(Pull::Exhausted);
        }

        let url = build_search_url(&self.base_url, &self.query, self.next_start)?;
        debug!(start = self.next_start, url = %url, "Fetching page");

        let html = fetch_page(&self.client, &url).await?;
        let page = parse_result_items(&html)?;
        info!(query = %self.query, start = self.next_start, count = page.len(), "Parsed results");

        if page.is_empty() {
            if is_captcha_page(&html) {
                warn!(query = %self.query, "CAPTCHA detected");
                return Err(ResearchError::Captcha);
            }
            if self.next_start == 0 && !html.contains(NO_MATCH_MARKER) {
                warn!(query = %self.query, bytes = html.len(), "First page is not a result page");
                return Err(ResearchError::Parse(
                    "Google Scholar returned a page without results or a no-match notice".to_string(),
                ));
            }
        }

        self.next_start += PAGE_SIZE;
        self.last_page_seen = page.len() < PAGE_SIZE as usize;
        self.buffer.extend(page);

        Ok(self
            .buffer
            .pop_front()
            .map(Pull::Item)
            .unwrap_or(Pull::Exhausted))
    }
}

/// Build Google Scholar search URL
fn build_search_url(base_url: &str, query: &str, start: u32) -> Result<Url> {
    let mut url = Url::parse(&format!("{}/scholar", base_url))
        .map_err(|e| ResearchError::Config(format!("Invalid base URL: {}", e)))?;

    url.query_pairs_mut()
        .append_pair("q", query)
        .append_pair("hl", "en-US") // Force English locale for consistent parsing
        .append_pair("start", &start.to_string())
        .append_pair("as_sdt", SDT_ARTICLES);

    Ok(url)
}

/// Fetch page content using HTTP client
async fn fetch_page(client: &reqwest::Client, url: &Url) -> Result<String> {
    let response = client
        .get(url.as_str())
        .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8")
        .header("Accept-Language", "en-US,en;q=0.9")
        .header("Cache-Control", "no-cache")
        .header("Upgrade-Insecure-Requests", "1")
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(ResearchError::Api {
            code: status.as_u16(),
            message: format!("Google Scholar HTTP error: {}", status),
        });
    }

    Ok(response.text().await?)
}

/// Block page detection. Only consulted for pages without result items,
/// since snippets may contain the same wording.
fn is_captcha_page(html: &str) -> bool {
    html.contains("Solving the above CAPTCHA")
        || html.contains("unusual traffic")
        || html.contains("gs_captcha_ccl")
        || html.contains("captcha-form")
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| ResearchError::Parse(e.to_string()))
}

/// Parse Google Scholar HTML into raw publications, in page order.
///
/// Items without a title are kept with `title: None`.
pub fn parse_result_items(html: &str) -> Result<Vec<RawPublication>> {
    let document = Html::parse_document(html);

    let item_selector = selector("div.gs_r.gs_or.gs_scl")?;
    let title_selector = selector("h3.gs_rt")?;
    let link_selector = selector("h3.gs_rt a")?;
    let meta_selector = selector("div.gs_a")?;
    let snippet_selector = selector("div.gs_rs")?;

    let year_regex =
        Regex::new(r"\b(19|20)\d{2}\b").map_err(|e| ResearchError::Parse(e.to_string()))?;

    let mut results = Vec::new();

    for item in document.select(&item_selector) {
        let mut raw = RawPublication::default();

        if let Some(link) = item.select(&link_selector).next() {
            raw.bib.title = Some(link.text().collect::<String>());
            raw.pub_url = link.value().attr("href").map(str::to_string);
        } else if let Some(title_elem) = item.select(&title_selector).next() {
            // Citation-only entries have a title without a link
            raw.bib.title = Some(title_elem.text().collect::<String>());
        }
        raw.bib.title = raw
            .bib
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        // "Authors - Venue, 2021 - publisher"
        if let Some(meta_elem) = item.select(&meta_selector).next() {
            let meta_text = meta_elem.text().collect::<String>();
            raw.bib.pub_year = meta_text
                .split(" - ")
                .nth(1)
                .and_then(|venue_year| year_regex.find(venue_year))
                .map(|m| RawYear::Text(m.as_str().to_string()));
        }

        raw.bib.abstract_text = item
            .select(&snippet_selector)
            .next()
            .map(|s| s.text().collect::<String>().trim().to_string())
            .filter(|s| !s.is_empty());

        results.push(raw);
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn result_item(title: &str, href: &str, meta: &str, snippet: &str) -> String {
        format!(
            r#"<div class="gs_r gs_or gs_scl"><div class="gs_ri">
                <h3 class="gs_rt"><a href="{href}">{title}</a></h3>
                <div class="gs_a">{meta}</div>
                <div class="gs_rs">{snippet}</div>
            </div></div>"#
        )
    }

    #[test]
    fn test_build_search_url() -> Result<()> {
        let url = build_search_url("https://scholar.google.com", "quantum error correction Physics", 10)?;
        assert!(url.as_str().contains("q=quantum+error+correction+Physics"));
        assert!(url.as_str().contains("start=10"));
        assert!(!url.as_str().contains("as_ylo"));
        Ok(())
    }

    #[test]
    fn test_parse_empty_html() -> Result<()> {
        assert!(parse_result_items("<html><body></body></html>")?.is_empty());
        Ok(())
    }

    #[test]
    fn test_parse_result_items() -> Result<()> {
        let html = format!(
            "<html><body>{}{}</body></html>",
            result_item(
                "Attention is all you need",
                "https://arxiv.org/abs/1706.03762",
                "A Vaswani, N Shazeer - Advances in neural information processing systems, 2017 - proceedings.neurips.cc",
                "The dominant sequence transduction models..."
            ),
            r#"<div class="gs_r gs_or gs_scl"><h3 class="gs_rt">[CITATION] Untitled notes</h3><div class="gs_a">J Doe - Unknown venue</div></div>"#
        );

        let items = parse_result_items(&html)?;
        assert_eq!(items.len(), 2);

        assert_eq!(items[0].bib.title.as_deref(), Some("Attention is all you need"));
        assert_eq!(items[0].pub_url.as_deref(), Some("https://arxiv.org/abs/1706.03762"));
        assert_eq!(items[0].bib.pub_year, Some(RawYear::Text("2017".into())));
        assert!(items[0].bib.abstract_text.is_some());

        assert!(items[1].pub_url.is_none());
        assert!(items[1].bib.pub_year.is_none());
        assert!(items[1].bib.abstract_text.is_none());
        Ok(())
    }
}
