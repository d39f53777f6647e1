use serde::Serialize;
use sqlx::FromRow;

use crate::object_id::ObjectId;

/// Recipe document. Serialized with the wire names clients use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub title: String,
    pub recipe_name: String,
    pub author: String,
    pub date: String,
    pub descriptions: Vec<String>,
    pub ingredients: Vec<String>,
    pub steps: Vec<String>,
    #[serde(rename = "_creator")]
    pub creator: ObjectId,
}

/// Validated field changes for a partial update. `None` leaves the stored
/// value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeChanges {
    pub title: Option<String>,
    pub recipe_name: Option<String>,
    pub author: Option<String>,
    pub date: Option<String>,
    pub descriptions: Option<Vec<String>>,
    pub ingredients: Option<Vec<String>>,
    pub steps: Option<Vec<String>>,
}

impl RecipeChanges {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply_to(&self, recipe: &mut Recipe) {
        if let Some(v) = &self.title {
            recipe.title = v.clone();
        }
        if let Some(v) = &self.recipe_name {
            recipe.recipe_name = v.clone();
        }
        if let Some(v) = &self.author {
            recipe.author = v.clone();
        }
        if let Some(v) = &self.date {
            recipe.date = v.clone();
        }
        if let Some(v) = &self.descriptions {
            recipe.descriptions = v.clone();
        }
        if let Some(v) = &self.ingredients {
            recipe.ingredients = v.clone();
        }
        if let Some(v) = &self.steps {
            recipe.steps = v.clone();
        }
    }
}

#[derive(Debug, FromRow)]
pub struct RecipeRow {
    pub id: String,
    pub title: String,
    pub recipe_name: String,
    pub author: String,
    pub date: String,
    pub descriptions: Vec<String>,
    pub ingredients: Vec<String>,
    pub steps: Vec<String>,
    pub creator_id: String,
}

impl TryFrom<RecipeRow> for Recipe {
    type Error = anyhow::Error;

    fn try_from(r: RecipeRow) -> Result<Self, Self::Error> {
        let id = ObjectId::parse_str(&r.id)
            .ok_or_else(|| anyhow::anyhow!("corrupt recipe id {:?}", r.id))?;
        let creator = ObjectId::parse_str(&r.creator_id)
            .ok_or_else(|| anyhow::anyhow!("corrupt creator id {:?}", r.creator_id))?;
        Ok(Self {
            id,
            title: r.title,
            recipe_name: r.recipe_name,
            author: r.author,
            date: r.date,
            descriptions: r.descriptions,
            ingredients: r.ingredients,
            steps: r.steps,
            creator,
        })
    }
}
