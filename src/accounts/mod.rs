pub mod handlers;
pub mod service;

pub use handlers::user_routes;
pub use service::{AccountError, AccountService, AuthResponse, Credentials, Registration};
