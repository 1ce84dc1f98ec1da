//! Safety Equipment Inspection Server
//!
//! A REST JSON API keeping employee and safety equipment records (fire
//! extinguishers and the like) in a document database.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;
pub mod store;

pub use crate::config::AppConfig;
pub use error::{AppError, AppResult};

use repository::Repository;
use services::Services;
use store::DocumentStore;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<Services>,
}

impl AppState {
    /// Wire repository and services over an already connected store
    pub fn new(config: AppConfig, store: Arc<dyn DocumentStore>) -> AppResult<Self> {
        let services = Services::new(Repository::new(store), &config.security)?;
        Ok(Self {
            config: Arc::new(config),
            services: Arc::new(services),
        })
    }
}
