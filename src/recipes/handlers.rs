use axum::{
    extract::{Path, State},
    middleware,
    routing::get,
    Extension, Json, Router,
};
use tracing::instrument;

use crate::{
    auth::middleware::{authenticate, CurrentUser},
    error::AppError,
    extractors::Payload,
    recipes::{
        dto::{CreateRecipeRequest, RecipeEnvelope, RecipeList, UpdateRecipeRequest},
        repo_types::Recipe,
        services,
    },
    state::AppState,
};

/// All recipe routes sit behind [`authenticate`].
pub fn recipe_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/recipes", get(list_recipes).post(create_recipe))
        .route(
            "/recipes/:id",
            get(get_recipe).patch(update_recipe).delete(delete_recipe),
        )
        .route_layer(middleware::from_fn_with_state(state, authenticate))
}

#[instrument(skip_all, fields(user_id = %current.user.id))]
pub async fn create_recipe(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Payload(body): Payload<CreateRecipeRequest>,
) -> Result<Json<Recipe>, AppError> {
    let recipe = services::create(&state, current.user.id, body).await?;
    Ok(Json(recipe))
}

#[instrument(skip_all, fields(user_id = %current.user.id))]
pub async fn list_recipes(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<RecipeList>, AppError> {
    let recipes = services::list(&state, current.user.id).await?;
    Ok(Json(RecipeList { recipes }))
}

#[instrument(skip(state, current), fields(user_id = %current.user.id))]
pub async fn get_recipe(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<RecipeEnvelope>, AppError> {
    let id = services::parse_id(&id)?;
    let recipe = services::get(&state, current.user.id, id).await?;
    Ok(Json(RecipeEnvelope { recipe }))
}

#[instrument(skip(state, current, body), fields(user_id = %current.user.id))]
pub async fn update_recipe(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
    body: Result<Payload<UpdateRecipeRequest>, AppError>,
) -> Result<Json<RecipeEnvelope>, AppError> {
    // id first: a malformed id is a 404 whatever the body looks like
    let id = services::parse_id(&id)?;
    let Payload(body) = body?;
    let recipe = services::update(&state, current.user.id, id, body).await?;
    Ok(Json(RecipeEnvelope { recipe }))
}

#[instrument(skip(state, current), fields(user_id = %current.user.id))]
pub async fn delete_recipe(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<RecipeEnvelope>, AppError> {
    let id = services::parse_id(&id)?;
    let recipe = services::delete(&state, current.user.id, id).await?;
    Ok(Json(RecipeEnvelope { recipe }))
}
