pub mod config;
pub mod error;
pub mod files;
pub mod models;
pub mod state;
mod server;

pub use config::{Settings, SettingsError, load};
pub use error::ServiceError;
pub use server::{ServerError, SharedState, build_api_router, build_app_router, serve};
