use std::str::FromStr;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    /// `None` issues tokens without `exp`; they live until logout.
    pub ttl_minutes: Option<i64>,
}

/// What happens to a user's recipes when the account is deleted.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserDeletePolicy {
    /// Recipes stay in storage but can no longer be reached through the API.
    #[default]
    Keep,
    /// Recipes are deleted together with the account.
    Cascade,
}

impl FromStr for UserDeletePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep" => Ok(Self::Keep),
            "cascade" => Ok(Self::Cascade),
            other => anyhow::bail!("unknown USER_DELETE_POLICY {other:?}"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub host: String,
    pub port: u16,
    pub jwt: JwtConfig,
    pub user_delete_policy: UserDeletePolicy,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")
                .map_err(|_| anyhow::anyhow!("JWT_SECRET must be set"))?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "recipebox".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "recipebox-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .filter(|m| *m > 0),
        };
        anyhow::ensure!(!jwt.secret.is_empty(), "JWT_SECRET must not be empty");

        let user_delete_policy = match std::env::var("USER_DELETE_POLICY") {
            Ok(v) => v.parse()?,
            Err(_) => UserDeletePolicy::default(),
        };

        Ok(Self {
            database_url,
            max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: std::env::var("APP_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            jwt,
            user_delete_policy,
        })
    }

    /// Config for the in-memory backend, used by tests and local runs.
    pub fn for_memory(secret: &str) -> Self {
        Self {
            database_url: crate::state::MEMORY_URL.into(),
            max_connections: 1,
            host: "127.0.0.1".into(),
            port: 0,
            jwt: JwtConfig {
                secret: secret.into(),
                issuer: "recipebox".into(),
                audience: "recipebox-users".into(),
                ttl_minutes: None,
            },
            user_delete_policy: UserDeletePolicy::Keep,
        }
    }
}
