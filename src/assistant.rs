//! Submission flow: connectivity check, question answering, paper search.

use crate::answerer::{AnswerBundle, QuestionAnswerer};
use crate::completion::CompletionClient;
use crate::config::Settings;
use crate::connectivity::ConnectivityProbe;
use crate::error::Result;
use crate::finder::{PaperFinder, Retrieval};
use crate::query::Query;
use crate::source::{AnySource, ScholarSource};
use serde::Serialize;
use tracing::info;

/// Result of one submission
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// The question was judged non-research; no papers were searched
    Rejected { message: String },
    /// Research answer with guidance and the paper search result
    Answered {
        bundle: AnswerBundle,
        retrieval: Retrieval,
    },
}

/// The research assistant: one answerer, one finder, one probe
#[derive(Debug, Clone)]
pub struct Assistant<S> {
    probe: ConnectivityProbe,
    answerer: QuestionAnswerer,
    finder: PaperFinder<S>,
}

impl Assistant<AnySource> {
    /// Build from settings. Fails with a config error when no API key is set.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let client = CompletionClient::new(settings)?;
        Ok(Self::new(
            ConnectivityProbe::from_settings(settings),
            QuestionAnswerer::new(client),
            PaperFinder::new(AnySource::from_settings(settings)?),
        ))
    }
}

impl<S: ScholarSource> Assistant<S> {
    pub fn new(probe: ConnectivityProbe, answerer: QuestionAnswerer, finder: PaperFinder<S>) -> Self {
        Self {
            probe,
            answerer,
            finder,
        }
    }

    pub fn source_name(&self) -> &'static str {
        self.finder.source().name()
    }

    /// Run one submission.
    ///
    /// The probe runs first; if it fails nothing else is attempted. Papers
    /// are only searched for questions classified as research.
    pub async fn submit(&self, query: &Query) -> Result<Outcome> {
        self.probe.check().await?;

        info!(tags = %query.joined_tags(), "Researching question");
        let bundle = self.answerer.answer(query.question(), query.tags()).await?;

        if !bundle.is_research() {
            return Ok(Outcome::Rejected {
                message: bundle.answer,
            });
        }

        let retrieval = self
            .finder
            .retrieve(query.question(), query.tags(), query.years())
            .await?;

        Ok(Outcome::Answered { bundle, retrieval })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiKey;
    use crate::error::ResearchError;
    use crate::finder::mock::{paper, year, MockSource};
    use crate::prompts::REJECTION_MESSAGE;
    use crate::query::YearRange;
    use crate::source::RawYear;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn completion_server(content: &str, expected_calls: u64) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": content}}]
            })))
            .expect(expected_calls)
            .mount(&server)
            .await;
        server
    }

    fn assistant(server: &MockServer, probe_addr: String, source: MockSource) -> Result<Assistant<MockSource>> {
        let settings = Settings {
            api_key: ApiKey::new("test-key"),
            base_url: server.uri(),
            ..Settings::default()
        };
        Ok(Assistant::new(
            ConnectivityProbe::new(probe_addr, Duration::from_secs(2)),
            QuestionAnswerer::new(CompletionClient::new(&settings)?),
            PaperFinder::new(source),
        ))
    }

    fn tags(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn research_question_gets_answer_guidance_and_papers() -> Result<()> {
        let server = completion_server(
            r#"{"verdict": "research", "answer": "Federated learning trains without centralising data."}"#,
            1,
        )
        .await;
        let source = MockSource::default().with(
            "What is federated learning? Machine Learning",
            vec![
                paper("p2019", year(2019)),
                paper("p2021", year(2021)),
                paper("p2022", year(2022)),
                paper("p2024", year(2024)),
                paper("pNA", RawYear::Text("n/a".into())),
            ],
        );
        let assistant = assistant(&server, server.address().to_string(), source)?;

        let query = Query::new(
            "What is federated learning?",
            &tags(&["Machine Learning"]),
            YearRange::new(2020, 2023),
        )?;

        match assistant.submit(&query).await? {
            Outcome::Answered { bundle, retrieval } => {
                assert!(bundle.answer.starts_with("Federated learning"));
                assert!(bundle.guidance.is_some());
                let years: Vec<String> = retrieval
                    .papers
                    .iter()
                    .map(|p| p.publication_year.to_string())
                    .collect();
                assert_eq!(years, ["2021", "2022"]);
            }
            other => panic!("expected answer, got: {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn rejected_question_skips_paper_search() -> Result<()> {
        let server = completion_server("That is a non-research question about weather.", 1).await;
        let source = MockSource::default();
        let assistant = assistant(&server, server.address().to_string(), source.clone())?;

        let query = Query::new(
            "What's the weather?",
            &tags(&["Astrophysics"]),
            YearRange::new(2020, 2023),
        )?;

        match assistant.submit(&query).await? {
            Outcome::Rejected { message } => assert_eq!(message, REJECTION_MESSAGE),
            other => panic!("expected rejection, got: {other:?}"),
        }
        assert!(source.queries().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn failed_probe_blocks_everything() -> Result<()> {
        let server = completion_server("unused", 0).await;
        let closed = tokio::net::TcpListener::bind("127.0.0.1:0").await?.local_addr()?;
        let source = MockSource::default();
        let assistant = assistant(&server, closed.to_string(), source.clone())?;

        let query = Query::new("What is CRISPR?", &tags(&["Genetics"]), YearRange::new(2020, 2023))?;
        assert!(matches!(
            assistant.submit(&query).await,
            Err(ResearchError::Connectivity(_))
        ));
        assert!(source.queries().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn completion_failure_propagates() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;
        let source = MockSource::default();
        let assistant = assistant(&server, server.address().to_string(), source.clone())?;

        let query = Query::new("What is CRISPR?", &tags(&["Genetics"]), YearRange::new(2020, 2023))?;
        assert!(matches!(
            assistant.submit(&query).await,
            Err(ResearchError::Api { code: 502, .. })
        ));
        assert!(source.queries().is_empty());
        Ok(())
    }

    #[test]
    fn test_missing_key_fails_construction() {
        assert!(matches!(
            Assistant::from_settings(&Settings::default()),
            Err(ResearchError::Config(_))
        ));
    }
}
