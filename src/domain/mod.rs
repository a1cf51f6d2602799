//! Tool registry and built-in tool implementations
//!
//! Provides the callable surface exposed over the MCP protocol

pub mod registry;
pub mod tools;
