//! Question classification and study guidance.
//!
//! The model is asked for a `{"verdict", "answer"}` JSON object. Replies
//! that do not parse are treated as prose. Either way, a reply mentioning
//! the non-research marker (any letter case) is a rejection.

use crate::completion::{extract_json, CompletionClient};
use crate::error::Result;
use crate::prompts::research::{
    build_guidance, build_research_prompt, NON_RESEARCH_MARKER, REJECTION_MESSAGE,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Whether a question is research-related
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Research,
    NonResearch,
}

/// Answer text plus guidance; guidance only for research questions
#[derive(Debug, Clone, Serialize)]
pub struct AnswerBundle {
    pub classification: Classification,
    pub answer: String,
    pub guidance: Option<String>,
}

impl AnswerBundle {
    fn rejected() -> Self {
        Self {
            classification: Classification::NonResearch,
            answer: REJECTION_MESSAGE.to_string(),
            guidance: None,
        }
    }

    pub fn is_research(&self) -> bool {
        self.classification == Classification::Research
    }
}

#[derive(Debug, Deserialize)]
struct StructuredReply {
    verdict: String,
    #[serde(default)]
    answer: Option<String>,
}

/// Classify a raw completion reply. Returns the answer text for research replies.
pub fn classify_reply(reply: &str) -> (Classification, String) {
    if reply.to_lowercase().contains(NON_RESEARCH_MARKER) {
        return (Classification::NonResearch, String::new());
    }

    match serde_json::from_str::<StructuredReply>(&extract_json(reply)) {
        Ok(structured) => {
            let verdict = structured.verdict.trim().to_lowercase().replace('_', "-");
            if verdict == NON_RESEARCH_MARKER {
                return (Classification::NonResearch, String::new());
            }
            let answer = structured
                .answer
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty())
                .unwrap_or_else(|| reply.trim().to_string());
            (Classification::Research, answer)
        }
        Err(e) => {
            debug!(error = %e, "Reply is not structured, using it as prose");
            (Classification::Research, reply.trim().to_string())
        }
    }
}

/// Sends questions to the completion service and derives guidance
#[derive(Debug, Clone)]
pub struct QuestionAnswerer {
    client: CompletionClient,
}

impl QuestionAnswerer {
    pub fn new(client: CompletionClient) -> Self {
        Self { client }
    }

    /// Ask the model about `question` in the context of `tags`.
    ///
    /// Exactly one completion request is made. Its failures propagate.
    pub async fn answer(&self, question: &str, tags: &[String]) -> Result<AnswerBundle> {
        let fields = tags.join(", ");
        let prompt = build_research_prompt(question, &fields);

        info!(fields = %fields, model = %self.client.model(), "Asking researcher");
        let reply = self.client.complete(&prompt).await?;

        let (classification, answer) = classify_reply(&reply);
        info!(?classification, "Question classified");

        Ok(match classification {
            Classification::NonResearch => AnswerBundle::rejected(),
            Classification::Research => AnswerBundle {
                classification,
                answer,
                guidance: Some(build_guidance(question, &fields)),
            },
        })
    }
}


#[cfg(test)]
mod http_tests {
    use super::*;
    use crate::config::{ApiKey, Settings};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn answerer_replying(server: &MockServer, content: &str) -> Result<QuestionAnswerer> {
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": content}}]
            })))
            .expect(1)
            .mount(server)
            .await;

        let settings = Settings {
            api_key: ApiKey::new("test-key"),
            base_url: server.uri(),
            ..Settings::default()
        };
        Ok(QuestionAnswerer::new(CompletionClient::new(&settings)?))
    }

    #[tokio::test]
    async fn non_research_reply_returns_fixed_rejection() -> Result<()> {
        let server = MockServer::start().await;
        let answerer = answerer_replying(
            &server,
            r#"{"verdict": "NON-RESEARCH", "answer": "It is sunny."}"#,
        )
        .await?;

        let bundle = answerer
            .answer("What's the weather?", &["Astrophysics".to_string()])
            .await?;
        assert!(!bundle.is_research());
        assert_eq!(bundle.answer, REJECTION_MESSAGE);
        assert!(bundle.guidance.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn research_reply_gets_guidance_for_same_question() -> Result<()> {
        let server = MockServer::start().await;
        let answerer = answerer_replying(
            &server,
            r#"{"verdict": "research", "answer": "Diffusion models denoise iteratively."}"#,
        )
        .await?;

        let tags = vec!["Machine Learning".to_string(), "Computer Vision".to_string()];
        let bundle = answerer.answer("How do diffusion models work?", &tags).await?;

        assert!(bundle.is_research());
        assert_eq!(bundle.answer, "Diffusion models denoise iteratively.");
        let guidance = bundle.guidance.unwrap_or_default();
        assert!(guidance.contains("How do diffusion models work?"));
        assert!(guidance.contains("Machine Learning, Computer Vision"));
        Ok(())
    }
}
