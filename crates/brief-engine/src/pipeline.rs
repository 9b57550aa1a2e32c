//! The three-step analysis workflow
//!
//! Step 1 collects web research into session artifacts, step 2
//! synthesizes it into a structured JSON object, step 3 compiles the
//! final Markdown report. Each step can run on its own against an
//! existing session, and [`AnalysisPipeline::run`] chains all three.

use crate::config::EngineConfig;
use crate::manager::{AiManager, GenerationRequest};
use crate::progress::ProgressTracker;
use crate::prompts::{self, SYNTHESIS_SYSTEM_PROMPT};
use crate::session::{
    COLLECTION_DATA_FILE, COLLECTION_REPORT_FILE, FINAL_REPORT_FILE, SYNTHESIS_FILE, SessionId,
    SessionStore,
};
use crate::synthesis::{self, SynthesisMetrics};
use crate::{EngineError, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, instrument, warn};

/// What to analyze; at least one field must be non-empty
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectRequest {
    /// Product under analysis
    #[serde(default)]
    pub product: String,

    /// Market niche
    #[serde(default)]
    pub niche: String,

    /// Target audience
    #[serde(default)]
    pub audience: String,
}

impl CollectRequest {
    fn validate(&self) -> Result<()> {
        if self.product.trim().is_empty()
            && self.niche.trim().is_empty()
            && self.audience.trim().is_empty()
        {
            return Err(EngineError::InvalidRequest(
                "at least one of product, niche or audience is required".to_string(),
            ));
        }
        Ok(())
    }

    fn subject(&self) -> String {
        [&self.product, &self.niche, &self.audience]
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" / ")
    }
}

/// Result of the collection step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionSummary {
    /// Session created for this analysis
    pub session_id: SessionId,

    /// Queries that were searched
    pub queries: Vec<String>,

    /// Total hits collected across all queries
    pub result_count: usize,

    /// Path of the written collection report
    pub report_path: PathBuf,
}

/// Result of the synthesis step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisSummary {
    /// Session the synthesis belongs to
    pub session_id: SessionId,

    /// True when the structured fallback replaced model output
    pub fallback_used: bool,

    /// Model that produced the synthesis ("unavailable" on total failure)
    pub model: String,

    /// Search blocks injected into the synthesis prompt
    pub searches_used: usize,

    /// Path of the written synthesis artifact
    pub path: PathBuf,
}

/// Result of the report step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Session the report belongs to
    pub session_id: SessionId,

    /// Path of the final Markdown report
    pub report_path: PathBuf,

    /// Carried over from the synthesis step
    pub fallback_used: bool,
}

/// Result of a full three-step run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOutcome {
    /// Session created for this analysis
    pub session_id: SessionId,

    /// Path of the final Markdown report
    pub report_path: PathBuf,

    /// True when any step degraded to the structured fallback
    pub fallback_used: bool,
}

/// Drives the collect / synthesize / report workflow
pub struct AnalysisPipeline {
    manager: AiManager,
    store: SessionStore,
    progress: ProgressTracker,
    search_results_per_query: usize,
}

impl AnalysisPipeline {
    /// Create a pipeline around a manager and configuration
    pub fn new(manager: AiManager, config: &EngineConfig) -> Self {
        Self {
            manager,
            store: SessionStore::new(config.data_dir.clone()),
            progress: ProgressTracker::new(),
            search_results_per_query: config.search_results_per_query,
        }
    }

    /// The session store backing this pipeline
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Progress tracker for polling long runs
    pub fn progress(&self) -> &ProgressTracker {
        &self.progress
    }

    /// Step 1: create a session and collect web research
    #[instrument(skip(self, request))]
    pub async fn collect(&self, request: &CollectRequest) -> Result<CollectionSummary> {
        request.validate()?;

        let session = SessionId::generate();
        self.progress.start(&session, 4);
        info!(session = %session, subject = request.subject(), "Starting collection");

        let queries =
            prompts::collection_queries(&request.product, &request.niche, &request.audience)?;

        let mut blocks = Vec::new();
        let mut result_count = 0;
        for query in &queries {
            let results = self
                .manager
                .search_chain()
                .search(query, self.search_results_per_query)
                .await;
            result_count += results.len();
            blocks.push(json!({ "query": query, "results": results }));
        }

        if result_count == 0 {
            warn!(session = %session, "Collection found no search results");
        }

        let data = json!({
            "session_id": session,
            "created_at": Utc::now().to_rfc3339(),
            "request": request,
            "queries": queries,
            "results": blocks,
            "result_count": result_count,
        });
        self.store.write_json(&session, COLLECTION_DATA_FILE, &data)?;

        let report = compile_collection_report(request, &blocks);
        let report_path = self
            .store
            .write_text(&session, COLLECTION_REPORT_FILE, &report)?;

        self.progress.update(&session, 1, "collection complete");
        Ok(CollectionSummary {
            session_id: session,
            queries,
            result_count,
            report_path,
        })
    }

    /// Step 2: synthesize the collected research
    ///
    /// Total model failure degrades to the structured fallback rather
    /// than failing the step; only missing sessions and I/O problems
    /// are errors here.
    #[instrument(skip(self))]
    pub async fn synthesize(&self, session: &SessionId) -> Result<SynthesisSummary> {
        if !self.store.exists(session) {
            return Err(EngineError::SessionNotFound(session.to_string()));
        }

        let context = self.store.read_text(session, COLLECTION_REPORT_FILE)?;
        let prompt = prompts::synthesis_prompt(&context)?;
        let request = GenerationRequest::new(prompt).with_system(SYNTHESIS_SYSTEM_PROMPT);

        let started = Instant::now();
        let (outcome, model, searches_used) =
            match self.manager.generate_with_search(&request, None).await {
                Ok((output, searches_used)) => (
                    synthesis::parse_synthesis(&output.content),
                    output.model,
                    searches_used,
                ),
                Err(EngineError::AllModelsFailed(last)) => {
                    warn!(session = %session, "All models failed, writing fallback synthesis: {last}");
                    (
                        synthesis::SynthesisOutcome {
                            value: synthesis::fallback_synthesis(""),
                            fallback_used: true,
                        },
                        "unavailable".to_string(),
                        0,
                    )
                }
                Err(e) => return Err(e),
            };

        let metrics = SynthesisMetrics {
            processing_time_secs: started.elapsed().as_secs_f64(),
            context_chars: context.len(),
            searches_used,
            fallback_used: outcome.fallback_used,
        };

        let artifact = json!({
            "session_id": session,
            "model": model,
            "synthesis": outcome.value,
            "metrics": metrics,
        });
        let path = self.store.write_json(session, SYNTHESIS_FILE, &artifact)?;

        self.progress.update(session, 2, "synthesis complete");
        info!(session = %session, fallback = outcome.fallback_used, "Synthesis written");
        Ok(SynthesisSummary {
            session_id: session.clone(),
            fallback_used: outcome.fallback_used,
            model,
            searches_used,
            path,
        })
    }

    /// Step 3: compile the final Markdown report
    #[instrument(skip(self))]
    pub async fn report(&self, session: &SessionId) -> Result<ReportSummary> {
        let synthesis: Value = self.store.read_json(session, SYNTHESIS_FILE)?;
        let collection: Value = self.store.read_json(session, COLLECTION_DATA_FILE)?;

        let report = compile_final_report(session, &synthesis, &collection);
        let report_path = self.store.write_text(session, FINAL_REPORT_FILE, &report)?;

        let fallback_used = synthesis["metrics"]["fallback_used"]
            .as_bool()
            .unwrap_or(false);

        self.progress.update(session, 3, "report complete");
        self.progress.complete(session);
        info!(session = %session, "Final report written");
        Ok(ReportSummary {
            session_id: session.clone(),
            report_path,
            fallback_used,
        })
    }

    /// Run all three steps
    #[instrument(skip(self, request))]
    pub async fn run(&self, request: &CollectRequest) -> Result<AnalysisOutcome> {
        let collection = self.collect(request).await?;
        let session = collection.session_id;
        let synthesis = self.synthesize(&session).await?;
        let report = self.report(&session).await?;

        Ok(AnalysisOutcome {
            session_id: session,
            report_path: report.report_path,
            fallback_used: synthesis.fallback_used,
        })
    }
}

fn compile_collection_report(request: &CollectRequest, blocks: &[Value]) -> String {
    let mut out = String::new();
    out.push_str("# Collection Report\n\n");
    out.push_str(&format!("Subject: {}\n\n", request.subject()));

    for block in blocks {
        let query = block["query"].as_str().unwrap_or("");
        out.push_str(&format!("## {query}\n\n"));
        let results = block["results"].as_array();
        match results {
            Some(results) if !results.is_empty() => {
                for result in results {
                    let title = result["title"].as_str().unwrap_or("untitled");
                    let url = result["url"].as_str().unwrap_or("");
                    let snippet = result["snippet"].as_str().unwrap_or("");
                    out.push_str(&format!("- **{title}** ({url})\n  {snippet}\n"));
                }
                out.push('\n');
            }
            _ => out.push_str("No results found.\n\n"),
        }
    }

    out
}

fn push_string_list(out: &mut String, heading: &str, items: Option<&Vec<Value>>) {
    out.push_str(&format!("## {heading}\n\n"));
    match items {
        Some(items) if !items.is_empty() => {
            for item in items {
                if let Some(text) = item.as_str() {
                    out.push_str(&format!("- {text}\n"));
                }
            }
            out.push('\n');
        }
        _ => out.push_str("None identified.\n\n"),
    }
}

fn compile_final_report(session: &SessionId, synthesis: &Value, collection: &Value) -> String {
    let body = &synthesis["synthesis"];
    let mut out = String::new();

    out.push_str("# Market Analysis Report\n\n");
    out.push_str(&format!("- Session: {session}\n"));
    out.push_str(&format!(
        "- Generated: {}\n",
        Utc::now().format("%Y-%m-%d %H:%M UTC")
    ));
    out.push_str(&format!(
        "- Model: {}\n\n",
        synthesis["model"].as_str().unwrap_or("unknown")
    ));

    push_string_list(&mut out, "Key Insights", body["key_insights"].as_array());
    push_string_list(&mut out, "Opportunities", body["opportunities"].as_array());

    out.push_str("## Refined Audience\n\n");
    let audience = &body["refined_audience"];
    if let Some(description) = audience["description"].as_str() {
        out.push_str(&format!("{description}\n\n"));
    }
    if let Some(segments) = audience["segments"].as_array()
        && !segments.is_empty()
    {
        for segment in segments {
            if let Some(text) = segment.as_str() {
                out.push_str(&format!("- {text}\n"));
            }
        }
        out.push('\n');
    }

    out.push_str("## Recommended Strategies\n\n");
    match body["recommended_strategies"].as_array() {
        Some(strategies) if !strategies.is_empty() => {
            for strategy in strategies {
                let title = strategy["title"].as_str().unwrap_or("Strategy");
                let rationale = strategy["rationale"].as_str().unwrap_or("");
                out.push_str(&format!("- **{title}**: {rationale}\n"));
            }
            out.push('\n');
        }
        _ => out.push_str("None identified.\n\n"),
    }

    push_string_list(&mut out, "Watchpoints", body["watchpoints"].as_array());

    out.push_str("## Sources\n\n");
    let mut any_source = false;
    if let Some(blocks) = collection["results"].as_array() {
        for block in blocks {
            if let Some(results) = block["results"].as_array() {
                for result in results {
                    if let Some(url) = result["url"].as_str() {
                        out.push_str(&format!("- {url}\n"));
                        any_source = true;
                    }
                }
            }
        }
    }
    if !any_source {
        out.push_str("No sources collected.\n");
    }

    out
}
