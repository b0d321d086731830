//! Nutriplan Library
//!
//! Ingredients, dishes and meal schedules with nutrition projected per
//! planned serving.

pub mod build_info;
pub mod config;
pub mod db;
pub mod mcp;
pub mod models;
pub mod nutrition;
pub mod tools;
