//! HealthEnforcer Library
//!
//! Nutrition accounting for a calorie-tracking chat assistant: meal
//! logging, daily limits from static or weight goals, portion corrections
//! and period reports, served as MCP tools.

pub mod build_info;
pub mod config;
pub mod db;
pub mod engine;
pub mod mcp;
pub mod models;
pub mod store;
pub mod tools;

#[cfg(test)]
mod test_support;
