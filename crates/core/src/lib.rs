//! Domain entities shared by every crate in the workspace.
//!
//! Nothing here talks to a database or the network; those concerns live in
//! `ollama_fleet_store` and `ollama_fleet_client` respectively. This crate is
//! the vocabulary both sides agree on.

pub mod ai_model;
pub mod api_key;
pub mod endpoint;
pub mod error;
pub mod pagination;
pub mod plan;
pub mod setting;
pub mod task;
pub mod tokens;
pub mod user;

pub use ai_model::{AiModel, AiModelPerformance, AiModelStatus, EndpointAiModel, ModelMeasurement};
pub use api_key::{ApiKey, ApiKeyUsageLog};
pub use endpoint::{Endpoint, EndpointMeasurement, EndpointPerformance, EndpointStatus};
pub use error::DomainError;
pub use pagination::{Page, PageParams, SortOrder};
pub use plan::Plan;
pub use setting::{SystemSetting, SystemSettingKey};
pub use task::{EndpointTestTask, TaskStatus};
pub use user::User;
