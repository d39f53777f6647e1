use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};

pub use crate::auth::dto::NewUser;
use crate::{
    auth::{password, repo_types::User, tokens},
    config::UserDeletePolicy,
    error::{AppError, AuthError},
    state::AppState,
};

pub const MIN_NAME_LEN: usize = 1;
pub const MIN_EMAIL_LEN: usize = 3;
pub const MIN_PASSWORD_LEN: usize = 6;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Registers a user. The password is hashed before anything is written.
#[instrument(skip(state, input))]
pub async fn create(state: &AppState, input: NewUser) -> Result<User, AppError> {
    let name = input.name.unwrap_or_default().trim().to_string();
    let email = normalize_email(input.email.as_deref().unwrap_or_default());
    let password = input.password.unwrap_or_default();

    if name.chars().count() < MIN_NAME_LEN {
        return Err(AppError::validation("name is required"));
    }
    if email.chars().count() < MIN_EMAIL_LEN || !is_valid_email(&email) {
        return Err(AppError::validation("email is not valid"));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation("password too short"));
    }

    let mut user = User::new(name, email, password);
    user.apply_password_change()
        .await
        .map_err(AuthError::Hash)?;
    state.users.insert(&user).await?;
    info!(user_id = %user.id, "user registered");
    Ok(user)
}

/// Looks a user up by email and checks the password. Both failure modes
/// surface to the client identically.
#[instrument(skip(state, plain))]
pub async fn find_by_credentials(
    state: &AppState,
    email: &str,
    plain: &str,
) -> Result<User, AuthError> {
    let email = normalize_email(email);
    let user = state
        .users
        .find_by_email(&email)
        .await?
        .ok_or(AuthError::UnknownEmail)?;

    let ok = password::verify_password_blocking(plain.to_string(), user.password_hash.clone())
        .await
        .map_err(AuthError::Hash)?;
    if !ok {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AuthError::WrongPassword);
    }
    Ok(user)
}

/// Write path for existing users: hashes a modified password, then persists.
pub async fn save(state: &AppState, user: &mut User) -> Result<(), AuthError> {
    user.apply_password_change().await.map_err(AuthError::Hash)?;
    state.users.save(user).await?;
    Ok(())
}

pub async fn delete_token(state: &AppState, user: &User, token: &str) -> Result<(), AuthError> {
    tokens::revoke(state, user.id, token).await
}

/// Removes the account and, under [`UserDeletePolicy::Cascade`], its recipes.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn delete_account(state: &AppState, user: &User) -> Result<(), AppError> {
    if state.config.user_delete_policy == UserDeletePolicy::Cascade {
        let removed = state.recipes.delete_by_creator(user.id).await?;
        info!(removed, "recipes removed with account");
    }
    if !state.users.delete(user.id).await? {
        return Err(AppError::NotFound);
    }
    info!("user deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn new_user(name: &str, email: &str, password: &str) -> NewUser {
        NewUser {
            name: Some(name.into()),
            email: Some(email.into()),
            password: Some(password.into()),
        }
    }

    #[test]
    fn email_format() {
        assert!(is_valid_email("peter.h.farrar@gmail.com"));
        assert!(!is_valid_email("peter"));
        assert!(!is_valid_email("a b@c.d"));
        assert!(!is_valid_email("@example.com"));
    }

    #[tokio::test]
    async fn create_hashes_and_normalizes() {
        let state = AppState::in_memory(AppConfig::for_memory("svc"));
        let user = create(&state, new_user(" Peter ", " Peter@Example.COM ", "PeterFarrar1"))
            .await
            .unwrap();
        assert_eq!(user.name, "Peter");
        assert_eq!(user.email, "peter@example.com");
        assert_ne!(user.password_hash, "PeterFarrar1");
        assert!(user.tokens.is_empty());
    }

    #[tokio::test]
    async fn create_rejects_invalid_fields() {
        let state = AppState::in_memory(AppConfig::for_memory("svc"));
        for input in [
            new_user("", "a@b.co", "secret1"),
            new_user("Ann", "not-an-email", "secret1"),
            new_user("Ann", "a@b.co", "12345"),
            NewUser::default(),
        ] {
            let err = create(&state, input).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "got {err:?}");
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let state = AppState::in_memory(AppConfig::for_memory("svc"));
        create(&state, new_user("Ann", "ann@example.com", "secret1")).await.unwrap();
        let err = create(&state, new_user("Other", "ANN@example.com", "secret2"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateKey("email")));
    }

    #[tokio::test]
    async fn credentials_failures_are_distinct_internally() {
        let state = AppState::in_memory(AppConfig::for_memory("svc"));
        create(&state, new_user("Ann", "ann@example.com", "secret1")).await.unwrap();

        let ok = find_by_credentials(&state, "ann@example.com", "secret1").await;
        assert!(ok.is_ok());
        assert!(matches!(
            find_by_credentials(&state, "ann@example.com", "wrong!").await,
            Err(AuthError::WrongPassword)
        ));
        assert!(matches!(
            find_by_credentials(&state, "bob@example.com", "secret1").await,
            Err(AuthError::UnknownEmail)
        ));
    }

    #[tokio::test]
    async fn save_rehashes_only_changed_password() {
        let state = AppState::in_memory(AppConfig::for_memory("svc"));
        let mut user = create(&state, new_user("Ann", "ann@example.com", "secret1"))
            .await
            .unwrap();
        let original = user.password_hash.clone();

        user.name = "Annie".into();
        save(&state, &mut user).await.unwrap();
        assert_eq!(user.password_hash, original);

        user.set_password("secret2");
        save(&state, &mut user).await.unwrap();
        assert_ne!(user.password_hash, original);
        assert!(find_by_credentials(&state, "ann@example.com", "secret2").await.is_ok());
        assert!(find_by_credentials(&state, "ann@example.com", "secret1").await.is_err());
    }
}
