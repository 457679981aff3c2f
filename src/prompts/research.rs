//! Research question prompts and locally templated texts.
//!
//! Only [`build_research_prompt`] is sent to the model. Guidance and the
//! rejection message are rendered locally and never generated.

/// Verdict value the model uses for non-research questions.
/// Also the marker searched for in free-text replies.
pub const NON_RESEARCH_MARKER: &str = "non-research";

/// User prompt template for research classification and explanation
/// Placeholders: {fields}, {question}
pub const RESEARCH_PROMPT_TEMPLATE: &str = r#"The user is asking a question related to the field '{fields}'.

Question: '{question}'

First decide whether this question is research-related.
- If it is, explain the topic clearly, focusing on important concepts, recent advancements, and potential research directions.
- If it is not, say that the question doesn't fit the research criteria and suggest research-related topics.

Output strict JSON only (no markdown code blocks, no extra text):
{
  "verdict": "research" | "non-research",
  "answer": "Your explanation, or the reason the question is not research-related"
}"#;

/// Guidance template shown alongside research answers
/// Placeholders: {fields}, {question}
pub const GUIDANCE_TEMPLATE: &str = "To help you explore the research question '{question}' in the field of '{fields}', I suggest starting \
with a broad literature review. Identify key papers and influential research in this area. \
Then, explore open challenges or gaps that your question might address. \
Focus on gathering sources that are peer-reviewed and relevant to your specific research interest. \
Formulate experiments or approaches to investigate the research problem.";

/// Fixed reply for questions judged not research-related
pub const REJECTION_MESSAGE: &str = "This question doesn't appear to be research-related. Please ask questions that align with research topics \
such as theories, methodologies, or advancements in the field. You could ask about current trends, \
innovations, or key challenges in research fields like AI or Data Science.";

/// Build the completion prompt for a question and its comma-joined fields
pub fn build_research_prompt(question: &str, fields: &str) -> String {
    fill_template(RESEARCH_PROMPT_TEMPLATE, question, fields)
}

/// Build study guidance for a research question
pub fn build_guidance(question: &str, fields: &str) -> String {
    fill_template(GUIDANCE_TEMPLATE, question, fields)
}

/// Substitute placeholders in one pass; inserted text is never rescanned.
fn fill_template(template: &str, question: &str, fields: &str) -> String {
    let placeholders = [("{question}", question), ("{fields}", fields)];
    let mut out = String::with_capacity(template.len() + question.len() + fields.len());
    let mut rest = template;

    while let Some(pos) = rest.find('{') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        match placeholders.iter().find(|(key, _)| rest.starts_with(key)) {
            Some((key, value)) => {
                out.push_str(value);
                rest = &rest[key.len()..];
            }
            None => {
                out.push('{');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
