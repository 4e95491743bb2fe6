pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use config::cli::LocalStorage;
pub use config::AuditConfig;
pub use crate::core::engine::AuditEngine;
pub use utils::error::{AuditError, Result};
