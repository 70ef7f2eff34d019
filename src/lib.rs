//! Gateway between MCP clients and a remote fleet of content-scraping
//! parsers. Tool calls are bridged to an HTTP-fronted task queue: submit a
//! task, poll the result slot until it appears or the budget runs out.

pub mod api;
pub mod bridge;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod registry;
pub mod server;
pub mod tools;
