use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::service::{AuthResponse, Credentials, Registration};
use crate::{
    auth::gate::{require_auth, CurrentUser},
    error::{route_not_found, ApiError},
    state::AppState,
    users::PublicUser,
};

/// Routes mounted under `/api/users`.
pub fn user_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/register", post(register).fallback(route_not_found))
        .route("/login", post(login).fallback(route_not_found))
        .route(
            "/profile",
            get(profile)
                .route_layer(middleware::from_fn_with_state(state, require_auth))
                .fallback(route_not_found),
        )
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<Registration>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let Json(input) = payload?;
    let res = state.accounts.register(input).await?;
    Ok((StatusCode::CREATED, Json(res)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError> {
    let Json(input) = payload?;
    Ok(Json(state.accounts.login(input).await?))
}

#[instrument(skip(state, user), fields(user_id = %user.0.id))]
pub async fn profile(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<PublicUser>, ApiError> {
    Ok(Json(state.accounts.profile(user.0.id).await?))
}
