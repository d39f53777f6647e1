use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, instrument, warn};

use crate::{
    auth::repo_types::{AuthToken, User, AUTH_ACCESS},
    config::JwtConfig,
    error::AuthError,
    object_id::ObjectId,
    state::AppState,
};

/// Token payload. `jti` makes every issued token distinct.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    #[serde(rename = "_id")]
    pub sub: ObjectId,
    pub access: String,
    pub jti: String,
    pub iat: usize,
    pub iss: String,
    pub aud: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<usize>,
}

/// Signing and verification keys built once from [`JwtConfig`].
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    ttl: Option<TimeDuration>,
}

impl TokenKeys {
    pub fn from_config(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: cfg.ttl_minutes.map(TimeDuration::minutes),
        }
    }

    pub fn sign(&self, user_id: ObjectId, access: &str) -> Result<String, AuthError> {
        let now = OffsetDateTime::now_utc();
        let nonce: [u8; 8] = rand::random();
        let claims = Claims {
            sub: user_id,
            access: access.to_string(),
            jti: nonce.iter().map(|b| format!("{b:02x}")).collect(),
            iat: now.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            exp: self.ttl.map(|ttl| (now + ttl).unix_timestamp() as usize),
        };
        let token =
            encode(&Header::default(), &claims, &self.encoding).map_err(AuthError::Signing)?;
        debug!(user_id = %user_id, access, "jwt signed");
        Ok(token)
    }

    /// Signature, issuer and audience check. `exp` is enforced only when a TTL
    /// is configured.
    pub fn decode(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        if self.ttl.is_none() {
            validation.validate_exp = false;
            validation.required_spec_claims.remove("exp");
        }
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        Ok(data.claims)
    }
}

/// Signs a session token for `user` and appends it to the stored token list.
/// Only the new entry is written, so a concurrent revoke is never undone.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn issue(state: &AppState, user: &mut User) -> Result<String, AuthError> {
    let token = state.keys.sign(user.id, AUTH_ACCESS)?;
    let entry = AuthToken {
        access: AUTH_ACCESS.to_string(),
        token: token.clone(),
    };
    state.users.push_token(user.id, &entry).await?;
    user.tokens.push(entry);
    debug!(tokens = user.tokens.len(), "token issued");
    Ok(token)
}

/// Resolves a presented token to its user. The signature has to verify and
/// the token must still be on the user's list.
pub async fn verify(state: &AppState, token: &str) -> Result<User, AuthError> {
    let claims = state.keys.decode(token).map_err(|e| {
        warn!(error = %e, "token failed verification");
        e
    })?;
    if claims.access != AUTH_ACCESS {
        return Err(AuthError::UnknownToken);
    }
    state
        .users
        .find_by_token(claims.sub, AUTH_ACCESS, token)
        .await?
        .ok_or_else(|| {
            warn!(user_id = %claims.sub, "token not registered for user");
            AuthError::UnknownToken
        })
}

/// Drops `token` from the user's list. Absent tokens are not an error.
#[instrument(skip(state, token))]
pub async fn revoke(state: &AppState, user_id: ObjectId, token: &str) -> Result<(), AuthError> {
    let removed = state.users.remove_token(user_id, token).await?;
    debug!(removed, "token revoked");
    Ok(())
}
