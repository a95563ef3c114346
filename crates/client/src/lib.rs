//! Minimal HTTP client for one Ollama-compatible backend.
//!
//! Covers exactly the surface the control plane and the forwarder need:
//! `version`, `tags`, streaming `generate`, and a `raw` passthrough for
//! proxying arbitrary routes untouched.

pub mod client;
pub mod error;
pub mod schema;

pub use client::{OllamaClient, RawResponseMeta};
pub use error::UpstreamError;
pub use schema::{GenerateRequest, GenerateResponse, ListModelResponse, TagModel, VersionResponse};
