//! HTTP Transport layer for the Model Context Protocol
//!
//! Provides the external API routing for the `/mcp` listener.

pub mod handlers;
