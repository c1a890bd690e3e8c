//! ShareIt item rental server
//!
//! Users list items, others book them for a time range, owners approve or
//! reject the bookings, and past bookers leave comments. Users can also post
//! requests for items nobody lists yet.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod pagination;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub services: Arc<services::Services>,
}
