use std::sync::Arc;

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod forms;
pub mod messages;
pub mod models;
pub mod search;
pub mod utils;

use config::Config;
use db::Database;
use search::RecipeSearch;

/// Shared by every handler through `web::Data<AppState>`.
pub struct AppState {
    pub db: Database,
    pub search: Arc<dyn RecipeSearch>,
    pub config: Config,
}
