//! Cargoline status synchronization server
//!
//! Keeps cargo shipments, the equivalent-device inventory and repair tickets
//! consistent: device dispatch with an append-only movement ledger, the
//! cargo record-status workflow and reconciliation from linked repairs.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod notes;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
