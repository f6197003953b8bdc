//! LangGraph agent integration.
//!
//! Deployment-specific configuration lives here so the core session API can
//! stay agnostic of the concrete agent backend.
mod client;
mod config;

pub use client::LangGraphAgent;
pub use config::LangGraphConfig;
