//! Ollama-backed [`Assistant`](crate::traits::Assistant) implementation.
//!
//! Talks to a local Ollama server over its HTTP API.  Nothing outside this
//! module should know about Ollama's endpoints or payloads.

pub mod assistant;
