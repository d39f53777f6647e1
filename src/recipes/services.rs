use tracing::{debug, info, instrument};

use crate::{
    error::AppError,
    object_id::ObjectId,
    recipes::{
        dto::{CreateRecipeRequest, UpdateRecipeRequest},
        repo_types::{Recipe, RecipeChanges},
    },
    state::AppState,
};

const MIN_TEXT_LEN: usize = 2;

fn required_text(field: &str, value: Option<String>, min: usize) -> Result<String, AppError> {
    let value = value.unwrap_or_default().trim().to_string();
    if value.chars().count() < min {
        return Err(AppError::validation(format!("{field} must be at least {min} characters")));
    }
    Ok(value)
}

fn optional_text(field: &str, value: Option<String>, min: usize) -> Result<Option<String>, AppError> {
    value.map(|v| required_text(field, Some(v), min)).transpose()
}

/// Path ids that are not 24 hex characters can never match a recipe.
pub fn parse_id(raw: &str) -> Result<ObjectId, AppError> {
    ObjectId::parse_str(raw).ok_or_else(|| {
        debug!(id = raw, "malformed recipe id");
        AppError::NotFound
    })
}

#[instrument(skip(state, input, creator), fields(creator = %creator))]
pub async fn create(
    state: &AppState,
    creator: ObjectId,
    input: CreateRecipeRequest,
) -> Result<Recipe, AppError> {
    let recipe = Recipe {
        id: ObjectId::new(),
        title: required_text("title", input.title, MIN_TEXT_LEN)?,
        recipe_name: required_text("recipeName", input.recipe_name, MIN_TEXT_LEN)?,
        author: required_text("author", input.author, MIN_TEXT_LEN)?,
        date: required_text("date", input.date, 1)?,
        descriptions: input.descriptions,
        ingredients: input.ingredients,
        steps: input.steps,
        creator,
    };
    state.recipes.insert(&recipe).await?;
    info!(recipe_id = %recipe.id, "recipe created");
    Ok(recipe)
}

pub async fn list(state: &AppState, creator: ObjectId) -> Result<Vec<Recipe>, AppError> {
    Ok(state.recipes.list_by_creator(creator).await?)
}

pub async fn get(state: &AppState, creator: ObjectId, id: ObjectId) -> Result<Recipe, AppError> {
    state
        .recipes
        .find_owned(id, creator)
        .await?
        .ok_or(AppError::NotFound)
}

#[instrument(skip(state, input, creator, id), fields(creator = %creator, recipe_id = %id))]
pub async fn update(
    state: &AppState,
    creator: ObjectId,
    id: ObjectId,
    input: UpdateRecipeRequest,
) -> Result<Recipe, AppError> {
    let changes = RecipeChanges {
        title: optional_text("title", input.title, MIN_TEXT_LEN)?,
        recipe_name: optional_text("recipeName", input.recipe_name, MIN_TEXT_LEN)?,
        author: optional_text("author", input.author, MIN_TEXT_LEN)?,
        date: optional_text("date", input.date, 1)?,
        descriptions: input.descriptions,
        ingredients: input.ingredients,
        steps: input.steps,
    };
    if changes.is_empty() {
        return get(state, creator, id).await;
    }
    let recipe = state
        .recipes
        .update_owned(id, creator, &changes)
        .await?
        .ok_or(AppError::NotFound)?;
    info!("recipe updated");
    Ok(recipe)
}

#[instrument(skip(state, creator, id), fields(creator = %creator, recipe_id = %id))]
pub async fn delete(state: &AppState, creator: ObjectId, id: ObjectId) -> Result<Recipe, AppError> {
    let recipe = state
        .recipes
        .delete_owned(id, creator)
        .await?
        .ok_or(AppError::NotFound)?;
    info!("recipe deleted");
    Ok(recipe)
}
