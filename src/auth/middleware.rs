use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::{
    auth::{repo_types::User, tokens},
    error::{AppError, AuthError},
    state::AppState,
};

/// Header carrying the session token in both directions.
pub const AUTH_HEADER: &str = "x-auth";

/// Identity resolved by [`authenticate`], available to handlers through
/// `Extension<CurrentUser>`.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub token: String,
}

/// Rejects the request with an empty 401 unless `x-auth` carries a token that
/// verifies and is still registered on its user.
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(AUTH_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingToken)?
        .to_string();

    let user = tokens::verify(&state, &token).await?;
    tracing::Span::current().record("user_id", tracing::field::display(user.id));
    req.extensions_mut().insert(CurrentUser { user, token });
    Ok(next.run(req).await)
}
