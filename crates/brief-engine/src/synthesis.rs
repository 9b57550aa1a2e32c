//! Synthesis parsing and the structured fallback
//!
//! Model output is expected to be a JSON object inside a ```json fence.
//! Parsing is forgiving: a bare JSON body also works, and anything that
//! cannot be parsed degrades to a structured stub instead of failing
//! the pipeline.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::warn;

/// Keys a well-formed synthesis must carry
const REQUIRED_KEYS: &[&str] = &["key_insights", "opportunities", "refined_audience"];

/// Cap on raw model output preserved inside the fallback stub
const RAW_SYNTHESIS_LIMIT: usize = 5000;

/// Outcome of parsing model output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisOutcome {
    /// The synthesis object, parsed or stubbed
    pub value: Value,

    /// True when the structured fallback was used
    pub fallback_used: bool,
}

/// Timing and sizing facts recorded alongside the synthesis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisMetrics {
    /// Wall-clock seconds spent in the synthesis step
    pub processing_time_secs: f64,

    /// Characters of collected context fed to the model
    pub context_chars: usize,

    /// Number of search queries injected into the prompt
    pub searches_used: usize,

    /// True when the fallback stub replaced model output
    pub fallback_used: bool,
}

/// Parse model output into a synthesis object
///
/// Prefers a ```json fenced block; falls back to treating the whole
/// body as JSON. Missing required keys are logged but tolerated.
/// Unparseable output yields [`fallback_synthesis`].
pub fn parse_synthesis(raw: &str) -> SynthesisOutcome {
    match try_parse(raw) {
        Some(mut value) => {
            for key in REQUIRED_KEYS {
                if value.get(key).is_none() {
                    warn!(key, "Synthesis output is missing a required key");
                }
            }
            stamp_metadata(&mut value, raw.len(), false);
            SynthesisOutcome {
                value,
                fallback_used: false,
            }
        }
        None => {
            warn!(
                chars = raw.len(),
                "Could not parse synthesis output, using structured fallback"
            );
            SynthesisOutcome {
                value: fallback_synthesis(raw),
                fallback_used: true,
            }
        }
    }
}

fn try_parse(raw: &str) -> Option<Value> {
    let candidate = extract_json_fence(raw).unwrap_or_else(|| raw.trim().to_string());
    let value: Value = serde_json::from_str(&candidate).ok()?;
    value.is_object().then_some(value)
}

/// Pull the body out of a ```json fence, first opener to last closer
fn extract_json_fence(raw: &str) -> Option<String> {
    let start = raw.find("```json")? + "```json".len();
    let rest = &raw[start..];
    let end = rest.rfind("```")?;
    let body = rest[..end].trim();
    (!body.is_empty()).then(|| body.to_string())
}

/// The documented stub returned when model output is unusable
///
/// Keeps the pipeline moving with generic entries, flags itself via
/// `fallback_mode`, and preserves the raw output (truncated) for
/// inspection.
pub fn fallback_synthesis(raw: &str) -> Value {
    let truncated: String = raw.chars().take(RAW_SYNTHESIS_LIMIT).collect();
    let mut value = json!({
        "key_insights": [
            "The collected research could not be automatically structured",
            "Review the raw synthesis text below for usable findings"
        ],
        "opportunities": [
            "Re-run the synthesis step once model access is restored"
        ],
        "refined_audience": {
            "description": "Audience refinement unavailable for this run",
            "segments": []
        },
        "recommended_strategies": [],
        "watchpoints": [],
        "raw_synthesis": truncated,
    });
    stamp_metadata(&mut value, raw.len(), true);
    value
}

fn stamp_metadata(value: &mut Value, response_chars: usize, fallback_mode: bool) {
    if let Some(obj) = value.as_object_mut() {
        obj.insert(
            "metadata".to_string(),
            json!({
                "generated_at": Utc::now().to_rfc3339(),
                "engine": "marketbrief-rs",
                "response_chars": response_chars,
                "fallback_mode": fallback_mode,
            }),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_fenced_json() {
        let raw = r#"Here is the analysis:
```json
{"key_insights": ["a"], "opportunities": ["b"], "refined_audience": {"description": "c", "segments": []}}
```
Hope this helps."#;

        let outcome = parse_synthesis(raw);
        assert!(!outcome.fallback_used);
        assert_eq!(outcome.value["key_insights"][0], "a");
        assert_eq!(outcome.value["metadata"]["fallback_mode"], false);
        assert_eq!(
            outcome.value["metadata"]["response_chars"],
            raw.len() as u64
        );
    }

    #[test]
    fn test_parses_bare_json_body() {
        let raw = r#"{"key_insights": [], "opportunities": [], "refined_audience": {}}"#;
        let outcome = parse_synthesis(raw);
        assert!(!outcome.fallback_used);
    }

    #[test]
    fn test_fence_extraction_uses_last_closer() {
        // Nested fences inside string values must not cut the body short
        let raw = "```json\n{\"key_insights\": [\"use ``` for code\"], \"opportunities\": [], \"refined_audience\": {}}\n```";
        let outcome = parse_synthesis(raw);
        assert!(!outcome.fallback_used);
    }

    #[test]
    fn test_missing_keys_tolerated() {
        let raw = r#"{"key_insights": ["only one key"]}"#;
        let outcome = parse_synthesis(raw);
        assert!(!outcome.fallback_used);
        assert_eq!(outcome.value["key_insights"][0], "only one key");
    }

    #[test]
    fn test_malformed_output_falls_back() {
        let outcome = parse_synthesis("I'm sorry, I cannot produce JSON today.");
        assert!(outcome.fallback_used);
        assert_eq!(outcome.value["metadata"]["fallback_mode"], true);
        assert!(outcome.value["key_insights"].is_array());
        assert!(outcome.value["refined_audience"]["segments"].is_array());
    }

    #[test]
    fn test_non_object_json_falls_back() {
        let outcome = parse_synthesis("[1, 2, 3]");
        assert!(outcome.fallback_used);
    }

    #[test]
    fn test_fallback_truncates_raw_text() {
        let raw = "x".repeat(20_000);
        let value = fallback_synthesis(&raw);
        let kept = value["raw_synthesis"].as_str().unwrap();
        assert_eq!(kept.len(), 5000);
        assert_eq!(value["metadata"]["response_chars"], 20_000);
    }

    #[test]
    fn test_empty_fence_falls_back() {
        let outcome = parse_synthesis("```json\n```");
        assert!(outcome.fallback_used);
    }
}
