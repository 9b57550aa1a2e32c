//! Prompt templates for collection and synthesis
//!
//! Templates are embedded MiniJinja strings. A fresh environment is
//! created per render to avoid lifetime entanglement with the template
//! sources.

use crate::Result;
use minijinja::Environment;
use serde_json::json;

/// System prompt for the synthesis step
pub const SYNTHESIS_SYSTEM_PROMPT: &str = "You are a market analysis specialist. \
You turn raw research material into precise, actionable business insight. \
Answer only with the JSON structure requested, inside a ```json code fence.";

const SYNTHESIS_USER_TEMPLATE: &str = r#"Analyze the collected market research below and produce a synthesis.

## Collected research

{{ context }}

## Required output

Respond with a single JSON object inside a ```json fence, with exactly these keys:

- "key_insights": array of the most important findings (strings)
- "opportunities": array of concrete market opportunities (strings)
- "refined_audience": object with "description" (string) and "segments" (array of strings)
- "recommended_strategies": array of objects with "title" and "rationale"
- "watchpoints": array of risks or trends to monitor (strings)

Base every entry on the research above. Do not add prose outside the fence."#;

const SEARCH_ENRICHMENT_TEMPLATE: &str = r#"{{ prompt }}
{% if context %}
## Additional context

{{ context }}
{% endif %}
{% for block in search_blocks %}
=== SEARCH DATA: {{ block.query }} ===
{% for result in block.results %}
- {{ result.title }} ({{ result.url }})
  {{ result.snippet }}
{% endfor %}
{% endfor %}
{% if search_blocks %}
## Analysis instructions

- Ground your answer in the search data above, not in general knowledge alone.
- Pull out concrete statistics, figures and named trends wherever the sources provide them.
- Combine findings across sources; note where they agree or contradict each other.
{% endif %}"#;

const COLLECTION_QUERY_TEMPLATES: &[&str] = &[
    "{{ subject }} market size and growth",
    "{{ subject }} industry trends {{ year }}",
    "{{ subject }} target audience and consumer behavior",
];

fn render(source: &str, ctx: &serde_json::Value) -> Result<String> {
    let mut env = Environment::new();
    env.add_template("t", source)?;
    Ok(env.get_template("t")?.render(ctx)?)
}

/// Render the synthesis user prompt around the collected context
pub fn synthesis_prompt(context: &str) -> Result<String> {
    render(SYNTHESIS_USER_TEMPLATE, &json!({ "context": context }))
}

/// A query and its search hits, ready for prompt injection
#[derive(serde::Serialize)]
pub struct SearchBlock {
    /// The query that produced the hits
    pub query: String,
    /// Hits kept for this query
    pub results: Vec<brief_search::SearchResult>,
}

/// Wrap a prompt with optional context and search data blocks
pub fn enriched_prompt(
    prompt: &str,
    context: Option<&str>,
    search_blocks: &[SearchBlock],
) -> Result<String> {
    render(
        SEARCH_ENRICHMENT_TEMPLATE,
        &json!({
            "prompt": prompt,
            "context": context.unwrap_or(""),
            "search_blocks": search_blocks,
        }),
    )
}

/// Build the collection search queries for an analysis subject
///
/// The subject is assembled from whichever of product, niche and
/// audience are present.
pub fn collection_queries(product: &str, niche: &str, audience: &str) -> Result<Vec<String>> {
    let subject = [product, niche, audience]
        .iter()
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.trim())
        .collect::<Vec<_>>()
        .join(" ");
    let year = chrono::Utc::now().format("%Y").to_string();

    COLLECTION_QUERY_TEMPLATES
        .iter()
        .map(|template| render(template, &json!({ "subject": subject, "year": year })))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use brief_search::SearchResult;

    #[test]
    fn test_synthesis_prompt_embeds_context() {
        let prompt = synthesis_prompt("coffee market grew 4% in 2025").unwrap();
        assert!(prompt.contains("coffee market grew 4% in 2025"));
        assert!(prompt.contains("\"key_insights\""));
        assert!(prompt.contains("\"refined_audience\""));
        assert!(prompt.contains("\"watchpoints\""));
    }

    #[test]
    fn test_enriched_prompt_renders_search_blocks() {
        let blocks = vec![SearchBlock {
            query: "coffee market size".to_string(),
            results: vec![SearchResult {
                title: "Coffee report".to_string(),
                url: "https://example.com/coffee".to_string(),
                snippet: "The market is growing".to_string(),
                provider: "serper".to_string(),
            }],
        }];

        let rendered = enriched_prompt("Analyze coffee", Some("focus on Europe"), &blocks).unwrap();
        assert!(rendered.starts_with("Analyze coffee"));
        assert!(rendered.contains("focus on Europe"));
        assert!(rendered.contains("=== SEARCH DATA: coffee market size ==="));
        assert!(rendered.contains("Coffee report"));
        // Search data always travels with instructions on how to use it
        assert!(rendered.contains("## Analysis instructions"));
        assert!(rendered.contains("statistics"));
    }

    #[test]
    fn test_enriched_prompt_without_search_or_context() {
        let rendered = enriched_prompt("Analyze coffee", None, &[]).unwrap();
        assert!(rendered.contains("Analyze coffee"));
        assert!(!rendered.contains("SEARCH DATA"));
        assert!(!rendered.contains("Additional context"));
        assert!(!rendered.contains("Analysis instructions"));
    }

    #[test]
    fn test_collection_queries_join_subject_parts() {
        let queries = collection_queries("espresso machines", "home baristas", "").unwrap();
        assert_eq!(queries.len(), 3);
        assert!(queries[0].contains("espresso machines home baristas"));
        assert!(queries[0].contains("market size"));
    }
}
