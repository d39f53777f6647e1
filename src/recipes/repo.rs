use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    error::StoreError,
    object_id::ObjectId,
    recipes::repo_types::{Recipe, RecipeChanges, RecipeRow},
};

/// Recipe persistence. Every read and write past `insert` is keyed by the
/// creator as well as the id.
#[async_trait]
pub trait RecipeRepo: Send + Sync {
    async fn insert(&self, recipe: &Recipe) -> Result<(), StoreError>;
    async fn list_by_creator(&self, creator: ObjectId) -> Result<Vec<Recipe>, StoreError>;
    async fn find_owned(&self, id: ObjectId, creator: ObjectId)
        -> Result<Option<Recipe>, StoreError>;
    async fn update_owned(
        &self,
        id: ObjectId,
        creator: ObjectId,
        changes: &RecipeChanges,
    ) -> Result<Option<Recipe>, StoreError>;
    async fn delete_owned(
        &self,
        id: ObjectId,
        creator: ObjectId,
    ) -> Result<Option<Recipe>, StoreError>;
    async fn delete_by_creator(&self, creator: ObjectId) -> Result<u64, StoreError>;
}

const RECIPE_COLUMNS: &str =
    "id, title, recipe_name, author, date, descriptions, ingredients, steps, creator_id";

#[derive(Clone)]
pub struct PgRecipeRepo {
    db: PgPool,
}

impl PgRecipeRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn hydrate(row: Option<RecipeRow>) -> Result<Option<Recipe>, StoreError> {
    Ok(row.map(Recipe::try_from).transpose()?)
}

#[async_trait]
impl RecipeRepo for PgRecipeRepo {
    async fn insert(&self, recipe: &Recipe) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO recipes
                (id, title, recipe_name, author, date, descriptions, ingredients, steps, creator_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(recipe.id.to_hex())
        .bind(&recipe.title)
        .bind(&recipe.recipe_name)
        .bind(&recipe.author)
        .bind(&recipe.date)
        .bind(&recipe.descriptions)
        .bind(&recipe.ingredients)
        .bind(&recipe.steps)
        .bind(recipe.creator.to_hex())
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn list_by_creator(&self, creator: ObjectId) -> Result<Vec<Recipe>, StoreError> {
        let rows = sqlx::query_as::<_, RecipeRow>(&format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes WHERE creator_id = $1 ORDER BY position ASC"
        ))
        .bind(creator.to_hex())
        .fetch_all(&self.db)
        .await?;
        rows.into_iter()
            .map(|r| Recipe::try_from(r).map_err(StoreError::from))
            .collect()
    }

    async fn find_owned(
        &self,
        id: ObjectId,
        creator: ObjectId,
    ) -> Result<Option<Recipe>, StoreError> {
        let row = sqlx::query_as::<_, RecipeRow>(&format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = $1 AND creator_id = $2"
        ))
        .bind(id.to_hex())
        .bind(creator.to_hex())
        .fetch_optional(&self.db)
        .await?;
        hydrate(row)
    }

    async fn update_owned(
        &self,
        id: ObjectId,
        creator: ObjectId,
        changes: &RecipeChanges,
    ) -> Result<Option<Recipe>, StoreError> {
        let row = sqlx::query_as::<_, RecipeRow>(&format!(
            r#"
            UPDATE recipes
               SET title        = COALESCE($3, title),
                   recipe_name  = COALESCE($4, recipe_name),
                   author       = COALESCE($5, author),
                   date         = COALESCE($6, date),
                   descriptions = COALESCE($7, descriptions),
                   ingredients  = COALESCE($8, ingredients),
                   steps        = COALESCE($9, steps)
             WHERE id = $1 AND creator_id = $2
            RETURNING {RECIPE_COLUMNS}
            "#
        ))
        .bind(id.to_hex())
        .bind(creator.to_hex())
        .bind(&changes.title)
        .bind(&changes.recipe_name)
        .bind(&changes.author)
        .bind(&changes.date)
        .bind(&changes.descriptions)
        .bind(&changes.ingredients)
        .bind(&changes.steps)
        .fetch_optional(&self.db)
        .await?;
        hydrate(row)
    }

    async fn delete_owned(
        &self,
        id: ObjectId,
        creator: ObjectId,
    ) -> Result<Option<Recipe>, StoreError> {
        let row = sqlx::query_as::<_, RecipeRow>(&format!(
            "DELETE FROM recipes WHERE id = $1 AND creator_id = $2 RETURNING {RECIPE_COLUMNS}"
        ))
        .bind(id.to_hex())
        .bind(creator.to_hex())
        .fetch_optional(&self.db)
        .await?;
        hydrate(row)
    }

    async fn delete_by_creator(&self, creator: ObjectId) -> Result<u64, StoreError> {
        let res = sqlx::query("DELETE FROM recipes WHERE creator_id = $1")
            .bind(creator.to_hex())
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected())
    }
}
