//! Terminal chat that turns natural-language questions into runnable SQL
//! (or short theory answers) by prompting a local Ollama model.

pub mod catalog;
pub mod config;
pub mod error;
pub mod generator;
pub mod schema;
pub mod session;
pub mod sqltext;
