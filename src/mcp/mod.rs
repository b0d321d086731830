//! MCP server module
//!
//! Exposes the Nutriplan tools over the Model Context Protocol.

pub mod server;

pub use server::NutriplanService;
