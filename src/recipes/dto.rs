use serde::{Deserialize, Serialize};

use crate::recipes::repo_types::Recipe;

/// Body of `POST /recipes`. Fields outside this list are ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRecipeRequest {
    pub title: Option<String>,
    pub recipe_name: Option<String>,
    pub author: Option<String>,
    pub date: Option<String>,
    #[serde(default)]
    pub descriptions: Vec<String>,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub steps: Vec<String>,
}

/// Body of `PATCH /recipes/:id`. Only recipe content fields can be changed.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRecipeRequest {
    pub title: Option<String>,
    pub recipe_name: Option<String>,
    pub author: Option<String>,
    pub date: Option<String>,
    pub descriptions: Option<Vec<String>>,
    pub ingredients: Option<Vec<String>>,
    pub steps: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct RecipeEnvelope {
    pub recipe: Recipe,
}

#[derive(Debug, Serialize)]
pub struct RecipeList {
    pub recipes: Vec<Recipe>,
}
