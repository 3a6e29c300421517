pub mod gate;
pub mod jwt;
pub mod password;

pub use gate::{require_auth, require_role, AuthRejection, CurrentUser};
pub use jwt::{Claims, JwtKeys, TokenError};
pub use password::{PasswordError, PasswordHasher};
