use anyhow::Context;
use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use crate::{
    auth::repo_types::{AuthToken, User},
    error::{missing_user, StoreError},
    object_id::ObjectId,
};

/// Persistence for user records and their token lists.
#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn find_by_id(&self, id: ObjectId) -> Result<Option<User>, StoreError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    /// User with `id` whose token list holds `{access, token}`.
    async fn find_by_token(
        &self,
        id: ObjectId,
        access: &str,
        token: &str,
    ) -> Result<Option<User>, StoreError>;
    async fn insert(&self, user: &User) -> Result<(), StoreError>;
    /// Overwrites the stored fields and token list of an existing user.
    /// Fails if the user is gone.
    async fn save(&self, user: &User) -> Result<(), StoreError>;
    /// Appends one token to an existing user's list without touching the
    /// rest of the record.
    async fn push_token(&self, id: ObjectId, token: &AuthToken) -> Result<(), StoreError>;
    /// Returns whether a token was removed.
    async fn remove_token(&self, id: ObjectId, token: &str) -> Result<bool, StoreError>;
    async fn delete(&self, id: ObjectId) -> Result<bool, StoreError>;
}

#[derive(FromRow)]
struct UserRow {
    id: String,
    name: String,
    email: String,
    password_hash: String,
}

#[derive(FromRow)]
struct TokenRow {
    access: String,
    token: String,
}

#[derive(Clone)]
pub struct PgUserRepo {
    db: PgPool,
}

impl PgUserRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn hydrate(&self, row: UserRow) -> Result<User, StoreError> {
        let id = ObjectId::parse_str(&row.id)
            .with_context(|| format!("corrupt user id {:?}", row.id))?;
        let tokens = sqlx::query_as::<_, TokenRow>(
            r#"
            SELECT access, token
              FROM user_tokens
             WHERE user_id = $1
             ORDER BY position ASC
            "#,
        )
        .bind(&row.id)
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(|t| AuthToken {
            access: t.access,
            token: t.token,
        })
        .collect();
        Ok(User::from_stored(
            id,
            row.name,
            row.email,
            row.password_hash,
            tokens,
        ))
    }

    async fn hydrate_opt(&self, row: Option<UserRow>) -> Result<Option<User>, StoreError> {
        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl UserRepo for PgUserRepo {
    async fn find_by_id(&self, id: ObjectId) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"SELECT id, name, email, password_hash FROM users WHERE id = $1"#,
        )
        .bind(id.to_hex())
        .fetch_optional(&self.db)
        .await?;
        self.hydrate_opt(row).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"SELECT id, name, email, password_hash FROM users WHERE email = $1"#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        self.hydrate_opt(row).await
    }

    async fn find_by_token(
        &self,
        id: ObjectId,
        access: &str,
        token: &str,
    ) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT u.id, u.name, u.email, u.password_hash
              FROM users u
              JOIN user_tokens t ON t.user_id = u.id
             WHERE u.id = $1 AND t.access = $2 AND t.token = $3
            "#,
        )
        .bind(id.to_hex())
        .bind(access)
        .bind(token)
        .fetch_optional(&self.db)
        .await?;
        self.hydrate_opt(row).await
    }

    async fn insert(&self, user: &User) -> Result<(), StoreError> {
        let mut tx = self.db.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, password_hash)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(user.id.to_hex())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .execute(&mut *tx)
        .await?;
        insert_tokens(&mut tx, user).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn save(&self, user: &User) -> Result<(), StoreError> {
        let mut tx = self.db.begin().await?;
        let updated = sqlx::query(
            r#"
            UPDATE users
               SET name = $2, email = $3, password_hash = $4
             WHERE id = $1
            "#,
        )
        .bind(user.id.to_hex())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(missing_user(user.id));
        }
        sqlx::query(r#"DELETE FROM user_tokens WHERE user_id = $1"#)
            .bind(user.id.to_hex())
            .execute(&mut *tx)
            .await?;
        insert_tokens(&mut tx, user).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn push_token(&self, id: ObjectId, token: &AuthToken) -> Result<(), StoreError> {
        let res = sqlx::query(
            r#"
            INSERT INTO user_tokens (user_id, access, token)
            SELECT id, $2, $3 FROM users WHERE id = $1
            "#,
        )
        .bind(id.to_hex())
        .bind(&token.access)
        .bind(&token.token)
        .execute(&self.db)
        .await?;
        if res.rows_affected() == 0 {
            return Err(missing_user(id));
        }
        Ok(())
    }

    async fn remove_token(&self, id: ObjectId, token: &str) -> Result<bool, StoreError> {
        let res = sqlx::query(r#"DELETE FROM user_tokens WHERE user_id = $1 AND token = $2"#)
            .bind(id.to_hex())
            .bind(token)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn delete(&self, id: ObjectId) -> Result<bool, StoreError> {
        // user_tokens rows go with the user via ON DELETE CASCADE
        let res = sqlx::query(r#"DELETE FROM users WHERE id = $1"#)
            .bind(id.to_hex())
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}

async fn insert_tokens(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user: &User,
) -> Result<(), StoreError> {
    for t in &user.tokens {
        sqlx::query(
            r#"
            INSERT INTO user_tokens (user_id, access, token)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(user.id.to_hex())
        .bind(&t.access)
        .bind(&t.token)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}
