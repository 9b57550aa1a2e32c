//! Concrete search provider implementations

pub mod exa;
pub mod jina;
pub mod serper;

pub use exa::ExaProvider;
pub use jina::JinaProvider;
pub use serper::SerperProvider;
