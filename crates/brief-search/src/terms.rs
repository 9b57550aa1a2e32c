//! Search term extraction from analysis prompts
//!
//! Long prompts make poor search queries. This module pulls short
//! keyword-centered phrases out of a prompt so the search chain gets
//! queries a web search engine can actually answer.

/// Signal words that usually anchor a useful market query
const SIGNAL_WORDS: &[&str] = &[
    "market",
    "trend",
    "trends",
    "statistic",
    "statistics",
    "data",
    "industry",
    "consumer",
    "growth",
    "competitor",
    "competitors",
    "demand",
    "forecast",
];

/// Maximum number of queries extracted from one prompt
const MAX_TERMS: usize = 3;

/// Words of context captured on each side of a signal word
const WINDOW: usize = 2;

/// Extract up to three short search queries from a prompt
///
/// Each query is a window of words around a signal word (market, trend,
/// industry, ...). Falls back to the first five words of the prompt when
/// no signal word is present. Returns an empty vec for a blank prompt.
pub fn extract_search_terms(prompt: &str) -> Vec<String> {
    let words: Vec<&str> = prompt.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }

    let mut terms = Vec::new();
    for (i, word) in words.iter().enumerate() {
        let normalized: String = word
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        if !SIGNAL_WORDS.contains(&normalized.as_str()) {
            continue;
        }

        let start = i.saturating_sub(WINDOW);
        let end = (i + WINDOW + 1).min(words.len());
        let term = words[start..end].join(" ");
        if !terms.contains(&term) {
            terms.push(term);
        }
        if terms.len() == MAX_TERMS {
            return terms;
        }
    }

    if terms.is_empty() {
        let end = words.len().min(5);
        terms.push(words[..end].join(" "));
    }

    terms
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_window_around_signal_word() {
        let terms = extract_search_terms("analyze the coffee market in northern Europe");
        assert_eq!(terms, vec!["the coffee market in northern"]);
    }

    #[test]
    fn test_caps_at_three_terms() {
        let prompt = "market one two trend three four industry five six growth seven eight";
        let terms = extract_search_terms(prompt);
        assert_eq!(terms.len(), 3);
    }

    #[test]
    fn test_ignores_punctuation_and_case() {
        let terms = extract_search_terms("What are the Trends, exactly?");
        assert_eq!(terms, vec!["are the Trends, exactly?"]);
    }

    #[test]
    fn test_fallback_to_first_five_words() {
        let terms = extract_search_terms("tell me something interesting about llamas please");
        assert_eq!(terms, vec!["tell me something interesting about"]);
    }

    #[test]
    fn test_short_prompt_fallback() {
        let terms = extract_search_terms("hello world");
        assert_eq!(terms, vec!["hello world"]);
    }

    #[test]
    fn test_empty_prompt() {
        assert!(extract_search_terms("").is_empty());
        assert!(extract_search_terms("   ").is_empty());
    }

    #[test]
    fn test_deduplicates_overlapping_windows() {
        // Two adjacent signal words produce the same window
        let terms = extract_search_terms("market data");
        assert_eq!(terms, vec!["market data"]);
    }

    #[test]
    fn test_window_clamped_at_prompt_edges() {
        let terms = extract_search_terms("market size report for 2026");
        assert_eq!(terms, vec!["market size report"]);
    }
}
