//! Concrete agent-backend integrations.
pub mod langgraph;
