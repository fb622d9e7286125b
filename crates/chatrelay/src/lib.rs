//! Chatrelay - forwards browser chat requests to OpenAI or Groq.
//!
//! The relay core ([`relay::Relay`]) validates keys, picks a provider, calls it
//! and normalizes the answer. Two adapters expose it over HTTP: a long-running
//! server with static files ([`server::build_app`]) and function-style routes
//! with CORS ([`server::build_functions_app`]).

pub mod config;
pub mod functions;
pub mod handlers;
pub mod llm;
pub mod relay;
pub mod server;
pub mod static_files;
