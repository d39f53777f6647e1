use axum::{
    extract::State,
    http::{HeaderName, HeaderValue, StatusCode},
    middleware,
    response::{AppendHeaders, IntoResponse},
    routing::{delete, get, post},
    Extension, Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{LoginRequest, NewUser},
        middleware::{authenticate, CurrentUser, AUTH_HEADER},
        repo_types::PublicUser,
        services, tokens,
    },
    error::AppError,
    extractors::Payload,
    state::AppState,
};

/// `POST /users` and `POST /users/login`; these establish identity.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(register))
        .route("/users/login", post(login))
}

/// Routes that act on the caller's own account.
pub fn me_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/users/me", get(get_me).delete(delete_me))
        .route("/users/me/token", delete(logout))
        .route_layer(middleware::from_fn_with_state(state, authenticate))
}

fn token_header(token: String) -> Result<AppendHeaders<[(HeaderName, HeaderValue); 1]>, AppError> {
    let value = HeaderValue::from_str(&token)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("token is not a header value: {e}")))?;
    Ok(AppendHeaders([(HeaderName::from_static(AUTH_HEADER), value)]))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Payload(payload): Payload<NewUser>,
) -> Result<impl IntoResponse, AppError> {
    let mut user = services::create(&state, payload).await?;
    let token = tokens::issue(&state, &mut user).await?;
    Ok((token_header(token)?, Json(PublicUser::from(&user))))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Payload(payload): Payload<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut user = services::find_by_credentials(&state, &payload.email, &payload.password).await?;
    let token = tokens::issue(&state, &mut user).await?;
    info!(user_id = %user.id, "user logged in");
    Ok((token_header(token)?, Json(PublicUser::from(&user))))
}

pub async fn get_me(Extension(current): Extension<CurrentUser>) -> Json<PublicUser> {
    Json(PublicUser::from(&current.user))
}

#[instrument(skip(state, current), fields(user_id = %current.user.id))]
pub async fn logout(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> StatusCode {
    match services::delete_token(&state, &current.user, &current.token).await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            warn!(error = %e, "logout failed");
            StatusCode::BAD_REQUEST
        }
    }
}

#[instrument(skip(state, current), fields(user_id = %current.user.id))]
pub async fn delete_me(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<PublicUser>, StatusCode> {
    match services::delete_account(&state, &current.user).await {
        Ok(()) => Ok(Json(PublicUser::from(&current.user))),
        Err(e) => {
            warn!(error = %e, "account deletion failed");
            Err(StatusCode::BAD_REQUEST)
        }
    }
}
