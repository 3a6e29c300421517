//! User-account service: registration, login with a signed bearer token,
//! and retrieval of the authenticated user's profile.

pub mod accounts;
pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod shutdown;
pub mod state;
pub mod telemetry;
pub mod users;

pub use app::{build_app, serve};
pub use config::AppConfig;
pub use state::AppState;
