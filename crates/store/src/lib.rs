//! Postgres persistence for the ollama fleet proxy.
//!
//! One module per entity family, mirroring `ollama-fleet-core`'s layout.
//! All writes that must appear atomic (the probe-apply transaction, the
//! one-default-plan swap) go through a `sqlx::Transaction` inside a single
//! function rather than being composed by a caller.

pub mod ai_model;
pub mod api_key;
pub mod endpoint;
pub mod endpoint_ai_model;
pub mod error;
pub mod plan;
pub mod pool;
pub mod setting;
pub mod task;
pub mod user;

pub use error::{StoreError, StoreResult};
pub use pool::{connect, DbPool};
