//! Nutriplan Tools module
//!
//! MCP tool implementations for meal planning.

pub mod dishes;
pub mod ingredients;
pub mod schedules;
pub mod status;
