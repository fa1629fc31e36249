pub mod analysis;
pub mod chat;
pub mod config;
pub mod error;
pub mod models;
pub mod report;
pub mod retention;
pub mod service;
pub mod uploads;

pub use config::ServiceConfig;
pub use error::{ApiError, ApiResult};
pub use models::*;
pub use service::{AppState, build_router};
