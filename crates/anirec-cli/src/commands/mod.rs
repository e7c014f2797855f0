//! CLI command handlers

pub mod config;
pub mod ingest;
pub mod recommend;
pub mod search;
