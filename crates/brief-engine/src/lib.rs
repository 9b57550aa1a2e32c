//! Analysis engine for marketbrief-rs
//!
//! This crate holds everything between the provider crates and the CLI:
//!
//! - [`EngineConfig`] and the model fallback hierarchy
//! - [`AiManager`], the paced hierarchical dispatcher over LLM backends
//! - [`SessionStore`] and per-session artifacts on disk
//! - Synthesis parsing with a structured fallback for unusable output
//! - [`AnalysisPipeline`], the collect / synthesize / report workflow

pub mod config;
pub mod error;
pub mod manager;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod session;
pub mod synthesis;

pub use config::{EngineConfig, ModelTier, ProviderKind, default_hierarchy};
pub use error::{EngineError, Result};
pub use manager::{AiManager, GenerationOutput, GenerationRequest, ManagerStatus};
pub use pipeline::{
    AnalysisOutcome, AnalysisPipeline, CollectRequest, CollectionSummary, ReportSummary,
    SynthesisSummary,
};
pub use progress::{Progress, ProgressTracker};
pub use session::{SessionId, SessionStatus, SessionStore};
pub use synthesis::{SynthesisMetrics, SynthesisOutcome, fallback_synthesis, parse_synthesis};
