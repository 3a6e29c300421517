//! Authorization stages for protected routes.
//!
//! `require_auth` resolves the bearer token to a user and stores it in the
//! request extensions as [`CurrentUser`]. `require_role` runs after it and
//! checks the attached user's role. Both short-circuit with an
//! [`AuthRejection`] instead of calling the next stage.

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use thiserror::Error;
use tracing::{error, warn};

use crate::{
    accounts::AccountError,
    auth::jwt::TokenError,
    state::AppState,
    users::{PublicUser, Role},
};

#[derive(Debug, Error)]
pub enum AuthRejection {
    #[error("Not authorized, no token")]
    MissingToken,
    #[error("Token expired, please log in again")]
    Expired,
    #[error("Not authorized, token failed")]
    InvalidToken,
    #[error("User not found")]
    UserNotFound,
    #[error("Forbidden")]
    InsufficientRole,
    #[error("authorization lookup failed")]
    Internal(#[source] AccountError),
}

impl From<TokenError> for AuthRejection {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AuthRejection::Expired,
            other => {
                warn!(error = %other, "bearer token rejected");
                AuthRejection::InvalidToken
            }
        }
    }
}

/// The authenticated user, attached by [`require_auth`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub PublicUser);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Absent only if the route was mounted without the auth stage.
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(AuthRejection::MissingToken)
    }
}

/// Pulls the token out of `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthRejection> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthRejection::MissingToken)
}

/// Verifies the bearer token and loads the user it names.
pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<PublicUser, AuthRejection> {
    let token = bearer_token(headers)?;
    let user_id = state.accounts.verify_token(token)?;
    match state.accounts.profile(user_id).await {
        Ok(user) => Ok(user),
        Err(AccountError::NotFound) => {
            warn!(user_id = %user_id, "token references a missing user");
            Err(AuthRejection::UserNotFound)
        }
        Err(e) => {
            error!(error = %e, user_id = %user_id, "user lookup during authorization failed");
            Err(AuthRejection::Internal(e))
        }
    }
}

pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthRejection> {
    let user = authenticate(&state, request.headers()).await?;
    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}

/// Mount with `from_fn_with_state(role, require_role)` inside `require_auth`.
pub async fn require_role(
    State(required): State<Role>,
    request: Request,
    next: Next,
) -> Result<Response, AuthRejection> {
    let user = request
        .extensions()
        .get::<CurrentUser>()
        .ok_or(AuthRejection::MissingToken)?;
    if !user.0.role.satisfies(required) {
        warn!(user_id = %user.0.id, role = %user.0.role, required = %required, "role check failed");
        return Err(AuthRejection::InsufficientRole);
    }
    Ok(next.run(request).await)
}
