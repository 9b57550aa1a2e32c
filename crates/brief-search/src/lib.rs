//! Web search layer for marketbrief-rs
//!
//! Collection runs live off third-party search APIs. This crate provides:
//!
//! - The [`SearchProvider`] trait and [`SearchResult`] type
//! - Clients for Serper, Jina and Exa
//! - A [`SearchOrchestrator`] that tries providers in order and returns
//!   the first non-empty result set
//! - The search-term extraction heuristic used to derive queries from
//!   analysis prompts

pub mod error;
pub mod orchestrator;
pub mod provider;
pub mod providers;
pub mod terms;

pub use error::{Result, SearchError};
pub use orchestrator::SearchOrchestrator;
pub use provider::{SearchProvider, SearchResult};
pub use providers::{ExaProvider, JinaProvider, SerperProvider};
pub use terms::extract_search_terms;
