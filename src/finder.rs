//! Paper retrieval per subject tag with publication-year filtering.
//!
//! For each tag one search is started for `"{topic} {tag}"` and at most
//! [`RESULTS_PER_TAG`] raw results are pulled from it. The year filter is
//! applied to those pulls; it never causes extra pulls. Results keep tag
//! order, then provider ranking order within a tag.

use crate::error::{OptionExt, Result};
use crate::query::YearRange;
use crate::source::{Pull, RawPublication, ResultStream, ScholarSource};
use serde::{Serialize, Serializer};
use std::fmt;
use tracing::{debug, info};

/// Raw results pulled per tag, before filtering
pub const RESULTS_PER_TAG: usize = 5;

pub const NO_ABSTRACT: &str = "No abstract available";
pub const NO_URL: &str = "No URL available";

/// Publication year of a paper, if the provider gave a parseable one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublicationYear {
    Known(i32),
    Unknown,
}

impl PublicationYear {
    /// Unknown years are outside every bounded range
    pub fn within(&self, range: &YearRange) -> bool {
        match self {
            Self::Known(year) => range.contains(*year),
            Self::Unknown => false,
        }
    }
}

impl fmt::Display for PublicationYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(year) => write!(f, "{}", year),
            Self::Unknown => f.write_str("Unknown"),
        }
    }
}

impl Serialize for PublicationYear {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Known(year) => serializer.serialize_i32(*year),
            Self::Unknown => serializer.serialize_str("Unknown"),
        }
    }
}

/// A normalised search result
#[derive(Debug, Clone, Serialize)]
pub struct PaperRecord {
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub url: String,
    /// Tag under which the paper was found
    pub tag: String,
    pub publication_year: PublicationYear,
}

impl PaperRecord {
    /// Normalise a raw result. A missing title is an error.
    pub fn from_raw(raw: RawPublication, tag: &str) -> Result<Self> {
        let title = raw
            .bib
            .title
            .ok_or_parse("Search result is missing a title")?;

        let publication_year = raw
            .bib
            .pub_year
            .as_ref()
            .and_then(|y| y.parse())
            .map(PublicationYear::Known)
            .unwrap_or(PublicationYear::Unknown);

        Ok(Self {
            title,
            abstract_text: raw.bib.abstract_text.unwrap_or_else(|| NO_ABSTRACT.to_string()),
            url: raw.pub_url.unwrap_or_else(|| NO_URL.to_string()),
            tag: tag.to_string(),
            publication_year,
        })
    }
}

/// Everything one retrieval produced
#[derive(Debug, Clone, Default, Serialize)]
pub struct Retrieval {
    /// Papers inside the year range, in output order
    pub papers: Vec<PaperRecord>,
    /// Papers whose year could not be determined; never part of `papers`
    pub undated: Vec<PaperRecord>,
}

impl Retrieval {
    pub fn is_empty(&self) -> bool {
        self.papers.is_empty()
    }
}

/// Finds candidate papers for a topic across tags
#[derive(Debug, Clone)]
pub struct PaperFinder<S> {
    source: S,
    per_tag: usize,
}

impl<S: ScholarSource> PaperFinder<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            per_tag: RESULTS_PER_TAG,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Papers matching `topic` for each tag, within `years`.
    pub async fn find(
        &self,
        topic: &str,
        tags: &[String],
        years: YearRange,
    ) -> Result<Vec<PaperRecord>> {
        Ok(self.retrieve(topic, tags, years).await?.papers)
    }

    /// Like [`find`](Self::find), also returning papers with unknown years.
    pub async fn retrieve(
        &self,
        topic: &str,
        tags: &[String],
        years: YearRange,
    ) -> Result<Retrieval> {
        let mut retrieval = Retrieval::default();

        for tag in tags {
            let search_query = format!("{} {}", topic, tag);
            info!(
                source = self.source.name(),
                query = %search_query,
                start = years.start(),
                end = years.end(),
                "Searching papers"
            );

            let mut stream = self.source.search(&search_query);
            let mut pulled = 0;

            while pulled < self.per_tag {
                let raw = match stream.next().await? {
                    Pull::Item(raw) => raw,
                    Pull::Exhausted => {
                        debug!(tag = %tag, pulled, "Provider exhausted");
                        break;
                    }
                };
                pulled += 1;

                let paper = PaperRecord::from_raw(raw, tag)?;
                let published = paper.publication_year;
                match published {
                    _ if published.within(&years) => retrieval.papers.push(paper),
                    PublicationYear::Unknown => retrieval.undated.push(paper),
                    PublicationYear::Known(year) => {
                        debug!(title = %paper.title, year, "Outside year range");
                    }
                }
            }
        }

        info!(
            papers = retrieval.papers.len(),
            undated = retrieval.undated.len(),
            "Paper search complete"
        );
        Ok(retrieval)
    }
}


#[cfg(test)]
mod tests {
    use super::mock::{paper, year, MockSource, Scripted};
    use super::*;
    use crate::error::ResearchError;
    use crate::source::RawYear;

    fn tags(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn filters_by_year_and_keeps_provider_order() -> Result<()> {
        let source = MockSource::default().with(
            "transformers Machine Learning",
            vec![
                paper("p2019", year(2019)),
                paper("p2021", year(2021)),
                paper("p2022", RawYear::Text("2022".into())),
                paper("p2024", year(2024)),
                paper("pNA", RawYear::Text("n/a".into())),
            ],
        );
        let finder = PaperFinder::new(source);

        let retrieval = finder
            .retrieve("transformers", &tags(&["Machine Learning"]), YearRange::new(2020, 2023))
            .await?;

        let titles: Vec<&str> = retrieval.papers.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, ["p2021", "p2022"]);
        assert_eq!(retrieval.papers[0].publication_year, PublicationYear::Known(2021));
        assert_eq!(retrieval.papers[0].tag, "Machine Learning");

        assert_eq!(retrieval.undated.len(), 1);
        assert_eq!(retrieval.undated[0].title, "pNA");
        Ok(())
    }

    #[tokio::test]
    async fn one_query_per_tag_regardless_of_results() -> Result<()> {
        let source = MockSource::default().with("q Genetics", vec![paper("old", year(1990))]);
        let finder = PaperFinder::new(source.clone());

        let papers = finder
            .find("q", &tags(&["Genetics", "Neuroscience", "Immunology"]), YearRange::new(2020, 2023))
            .await?;

        assert!(papers.is_empty());
        assert_eq!(source.queries(), ["q Genetics", "q Neuroscience", "q Immunology"]);
        Ok(())
    }

    #[tokio::test]
    async fn caps_raw_pulls_per_tag_before_filtering() -> Result<()> {
        let many: Vec<Scripted> = (0..8).map(|i| paper(&format!("p{i}"), year(2021))).collect();
        let source = MockSource::default()
            .with("q Astrophysics", many.clone())
            .with("q Particle Physics", many);
        let finder = PaperFinder::new(source.clone());

        let papers = finder
            .find("q", &tags(&["Astrophysics", "Particle Physics"]), YearRange::new(2020, 2023))
            .await?;

        assert_eq!(papers.len(), 2 * RESULTS_PER_TAG);
        assert_eq!(source.pulls(), 2 * RESULTS_PER_TAG);
        assert!(papers[..RESULTS_PER_TAG].iter().all(|p| p.tag == "Astrophysics"));
        assert!(papers[RESULTS_PER_TAG..].iter().all(|p| p.tag == "Particle Physics"));
        Ok(())
    }

    #[tokio::test]
    async fn exhaustion_stops_only_that_tag() -> Result<()> {
        let source = MockSource::default()
            .with("q Biochemistry", vec![paper("only", year(2021))])
            .with(
                "q Organic Chemistry",
                (0..6).map(|i| paper(&format!("o{i}"), year(2022))).collect(),
            );
        let finder = PaperFinder::new(source.clone());

        let papers = finder
            .find("q", &tags(&["Biochemistry", "Organic Chemistry"]), YearRange::new(2020, 2023))
            .await?;

        assert_eq!(papers.len(), 1 + RESULTS_PER_TAG);
        // one item plus the exhausted pull, then the full cap
        assert_eq!(source.pulls(), 2 + RESULTS_PER_TAG);
        Ok(())
    }

    #[tokio::test]
    async fn provider_failure_propagates() {
        let source = MockSource::default()
            .with("q Genetics", vec![paper("a", year(2021)), Scripted::Fail]);
        let finder = PaperFinder::new(source.clone());

        let result = finder
            .find("q", &tags(&["Genetics", "Immunology"]), YearRange::new(2020, 2023))
            .await;

        assert!(matches!(result, Err(ResearchError::Api { code: 500, .. })));
        assert_eq!(source.queries(), ["q Genetics"]);
    }

    #[tokio::test]
    async fn missing_title_is_parse_error() {
        let untitled = Scripted::Paper(RawPublication::default());
        let source = MockSource::default().with("q Genetics", vec![untitled]);
        let finder = PaperFinder::new(source);

        let result = finder
            .find("q", &tags(&["Genetics"]), YearRange::new(2020, 2023))
            .await;
        assert!(matches!(result, Err(ResearchError::Parse(_))));
    }

    #[tokio::test]
    async fn identical_searches_requery() -> Result<()> {
        let source = MockSource::default();
        let finder = PaperFinder::new(source.clone());
        let range = YearRange::new(2020, 2023);

        finder.find("q", &tags(&["Genetics"]), range).await?;
        finder.find("q", &tags(&["Genetics"]), range).await?;
        assert_eq!(source.queries().len(), 2);
        Ok(())
    }

    #[test]
    fn test_defaults_for_missing_fields() -> Result<()> {
        let mut raw = RawPublication::default();
        raw.bib.title = Some("Bare".to_string());

        let record = PaperRecord::from_raw(raw, "Genetics")?;
        assert_eq!(record.abstract_text, NO_ABSTRACT);
        assert_eq!(record.url, NO_URL);
        assert_eq!(record.publication_year, PublicationYear::Unknown);
        Ok(())
    }

    #[test]
    fn test_unknown_year_never_in_range() {
        for (start, end) in [(1900, 2100), (i32::MIN, i32::MAX), (2020, 2020)] {
            assert!(!PublicationYear::Unknown.within(&YearRange::new(start, end)));
        }
    }
}
