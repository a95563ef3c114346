//! HTTP handlers, one module per entity family — mirrors
//! `ollama_fleet_store`'s layout, which mirrors `ollama_fleet_core`'s.

pub mod ai_model;
pub mod api_key;
pub mod endpoint;
pub mod plan;
pub mod setting;
pub mod user;
