//! Core types shared across the chatops operator core.
//!
//! - **IDs**: strongly-typed identifiers (`CommandId`, `ExecutionId`, `UserId`, ...)
//! - **Errors**: application error taxonomy with an HTTP `IntoResponse` impl
//! - **Config**: process configuration, loaded once from the environment

mod config;
mod errors;
mod ids;

pub use config::{Config, KubernetesConfig, ObservabilityConfig, QuotaConfig, ServerConfig};
pub use errors::{Error, ErrorType, Result};
pub use ids::{CommandId, ExecutionId, UserId};
