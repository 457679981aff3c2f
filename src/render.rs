//! Plain-text rendering of submission outcomes.

use crate::assistant::Outcome;
use crate::finder::PaperRecord;

pub const NO_PAPERS_MESSAGE: &str = "No papers found, try a different query.";

/// Render an outcome for the terminal.
pub fn render_outcome(outcome: &Outcome, include_undated: bool) -> String {
    let (bundle, retrieval) = match outcome {
        Outcome::Rejected { message } => return format!("⚠️  {}\n", message),
        Outcome::Answered { bundle, retrieval } => (bundle, retrieval),
    };

    let mut out = format!("### Researcher's Answer:\n{}\n\n", bundle.answer.trim());
    if let Some(guidance) = &bundle.guidance {
        out.push_str(&format!("### Researcher's Guidance:\n{}\n\n", guidance.trim()));
    }

    out.push_str("### Suggested Research Papers:\n");
    if retrieval.is_empty() {
        out.push_str(NO_PAPERS_MESSAGE);
        out.push('\n');
    }
    out.push_str(&render_papers(&retrieval.papers));

    if include_undated && !retrieval.undated.is_empty() {
        out.push_str("\n### Papers With Unknown Publication Year:\n");
        out.push_str(&render_papers(&retrieval.undated));
    }

    out
}

fn render_papers(papers: &[PaperRecord]) -> String {
    papers
        .iter()
        .enumerate()
        .map(|(i, paper)| {
            format!(
                "\n📄 Paper {}: {} ({})\n   Publication Year: {}\n   Abstract: {}\n   Read Full Paper: {}\n",
                i + 1,
                paper.title,
                paper.tag,
                paper.publication_year,
                paper.abstract_text,
                paper.url
            )
        })
        .collect()
}
