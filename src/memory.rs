//! In-process repositories used with `DATABASE_URL=memory://` and by tests.
//! Unique constraints mirror the PostgreSQL schema.

use std::sync::RwLock;

use async_trait::async_trait;

use crate::{
    auth::{
        repo::UserRepo,
        repo_types::{AuthToken, User},
    },
    error::{missing_user, StoreError},
    object_id::ObjectId,
    recipes::{
        repo::RecipeRepo,
        repo_types::{Recipe, RecipeChanges},
    },
};

fn poisoned() -> StoreError {
    StoreError::Backend(anyhow::anyhow!("memory store lock poisoned"))
}

#[derive(Default)]
pub struct MemoryUserRepo {
    users: RwLock<Vec<User>>,
}

impl MemoryUserRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Email and token uniqueness against everyone except `skip`.
    fn check_unique(users: &[User], candidate: &User, skip: Option<ObjectId>) -> Result<(), StoreError> {
        for other in users.iter().filter(|u| Some(u.id) != skip) {
            if other.email == candidate.email {
                return Err(StoreError::Duplicate("email"));
            }
            if candidate
                .tokens
                .iter()
                .any(|t| other.tokens.iter().any(|o| o.token == t.token))
            {
                return Err(StoreError::Duplicate("token"));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepo for MemoryUserRepo {
    async fn find_by_id(&self, id: ObjectId) -> Result<Option<User>, StoreError> {
        let users = self.users.read().map_err(|_| poisoned())?;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().map_err(|_| poisoned())?;
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_token(
        &self,
        id: ObjectId,
        access: &str,
        token: &str,
    ) -> Result<Option<User>, StoreError> {
        let users = self.users.read().map_err(|_| poisoned())?;
        Ok(users
            .iter()
            .find(|u| u.id == id && u.has_token(access, token))
            .cloned())
    }

    async fn insert(&self, user: &User) -> Result<(), StoreError> {
        let mut users = self.users.write().map_err(|_| poisoned())?;
        if users.iter().any(|u| u.id == user.id) {
            return Err(StoreError::Duplicate("id"));
        }
        Self::check_unique(&users, user, None)?;
        users.push(user.clone());
        Ok(())
    }

    async fn save(&self, user: &User) -> Result<(), StoreError> {
        let mut users = self.users.write().map_err(|_| poisoned())?;
        Self::check_unique(&users, user, Some(user.id))?;
        let Some(slot) = users.iter_mut().find(|u| u.id == user.id) else {
            return Err(missing_user(user.id));
        };
        *slot = user.clone();
        Ok(())
    }

    async fn push_token(&self, id: ObjectId, token: &AuthToken) -> Result<(), StoreError> {
        let mut users = self.users.write().map_err(|_| poisoned())?;
        if users
            .iter()
            .any(|u| u.tokens.iter().any(|t| t.token == token.token))
        {
            return Err(StoreError::Duplicate("token"));
        }
        let Some(user) = users.iter_mut().find(|u| u.id == id) else {
            return Err(missing_user(id));
        };
        user.tokens.push(token.clone());
        Ok(())
    }

    async fn remove_token(&self, id: ObjectId, token: &str) -> Result<bool, StoreError> {
        let mut users = self.users.write().map_err(|_| poisoned())?;
        let Some(user) = users.iter_mut().find(|u| u.id == id) else {
            return Ok(false);
        };
        let before = user.tokens.len();
        user.tokens.retain(|t| t.token != token);
        Ok(user.tokens.len() != before)
    }

    async fn delete(&self, id: ObjectId) -> Result<bool, StoreError> {
        let mut users = self.users.write().map_err(|_| poisoned())?;
        let before = users.len();
        users.retain(|u| u.id != id);
        Ok(users.len() != before)
    }
}

#[derive(Default)]
pub struct MemoryRecipeRepo {
    recipes: RwLock<Vec<Recipe>>,
}

impl MemoryRecipeRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored recipes regardless of owner.
    pub fn len(&self) -> usize {
        self.recipes.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RecipeRepo for MemoryRecipeRepo {
    async fn insert(&self, recipe: &Recipe) -> Result<(), StoreError> {
        let mut recipes = self.recipes.write().map_err(|_| poisoned())?;
        if recipes.iter().any(|r| r.id == recipe.id) {
            return Err(StoreError::Duplicate("id"));
        }
        if recipes.iter().any(|r| r.title == recipe.title) {
            return Err(StoreError::Duplicate("title"));
        }
        recipes.push(recipe.clone());
        Ok(())
    }

    async fn list_by_creator(&self, creator: ObjectId) -> Result<Vec<Recipe>, StoreError> {
        let recipes = self.recipes.read().map_err(|_| poisoned())?;
        Ok(recipes
            .iter()
            .filter(|r| r.creator == creator)
            .cloned()
            .collect())
    }

    async fn find_owned(
        &self,
        id: ObjectId,
        creator: ObjectId,
    ) -> Result<Option<Recipe>, StoreError> {
        let recipes = self.recipes.read().map_err(|_| poisoned())?;
        Ok(recipes
            .iter()
            .find(|r| r.id == id && r.creator == creator)
            .cloned())
    }

    async fn update_owned(
        &self,
        id: ObjectId,
        creator: ObjectId,
        changes: &RecipeChanges,
    ) -> Result<Option<Recipe>, StoreError> {
        let mut recipes = self.recipes.write().map_err(|_| poisoned())?;
        let Some(pos) = recipes
            .iter()
            .position(|r| r.id == id && r.creator == creator)
        else {
            return Ok(None);
        };
        if let Some(title) = &changes.title {
            if recipes.iter().any(|r| r.id != id && &r.title == title) {
                return Err(StoreError::Duplicate("title"));
            }
        }
        let recipe = &mut recipes[pos];
        changes.apply_to(recipe);
        Ok(Some(recipe.clone()))
    }

    async fn delete_owned(
        &self,
        id: ObjectId,
        creator: ObjectId,
    ) -> Result<Option<Recipe>, StoreError> {
        let mut recipes = self.recipes.write().map_err(|_| poisoned())?;
        let pos = recipes
            .iter()
            .position(|r| r.id == id && r.creator == creator);
        Ok(pos.map(|i| recipes.remove(i)))
    }

    async fn delete_by_creator(&self, creator: ObjectId) -> Result<u64, StoreError> {
        let mut recipes = self.recipes.write().map_err(|_| poisoned())?;
        let before = recipes.len();
        recipes.retain(|r| r.creator != creator);
        Ok((before - recipes.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo_types::AUTH_ACCESS;

    fn user(email: &str) -> User {
        User::from_stored(ObjectId::new(), "Ann".into(), email.into(), "hash".into(), Vec::new())
    }

    fn token(t: &str) -> AuthToken {
        AuthToken {
            access: AUTH_ACCESS.into(),
            token: t.into(),
        }
    }

    #[tokio::test]
    async fn tokens_are_unique_across_users() {
        let repo = MemoryUserRepo::new();
        let mut a = user("a@example.com");
        a.tokens.push(token("shared"));
        repo.insert(&a).await.unwrap();

        let mut b = user("b@example.com");
        repo.insert(&b).await.unwrap();
        b.tokens.push(token("shared"));
        assert!(matches!(repo.save(&b).await, Err(StoreError::Duplicate("token"))));
    }

    #[tokio::test]
    async fn writes_to_a_removed_user_fail() {
        let repo = MemoryUserRepo::new();
        let a = user("a@example.com");
        repo.insert(&a).await.unwrap();
        assert!(repo.delete(a.id).await.unwrap());

        assert!(matches!(repo.save(&a).await, Err(StoreError::Backend(_))));
        assert!(matches!(
            repo.push_token(a.id, &token("late")).await,
            Err(StoreError::Backend(_))
        ));
        assert!(repo.find_by_id(a.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn push_token_appends_in_order() {
        let repo = MemoryUserRepo::new();
        let a = user("a@example.com");
        repo.insert(&a).await.unwrap();
        repo.push_token(a.id, &token("t1")).await.unwrap();
        repo.push_token(a.id, &token("t2")).await.unwrap();
        assert!(matches!(
            repo.push_token(a.id, &token("t1")).await,
            Err(StoreError::Duplicate("token"))
        ));

        let stored = repo.find_by_id(a.id).await.unwrap().unwrap();
        let tokens: Vec<_> = stored.tokens.iter().map(|t| t.token.as_str()).collect();
        assert_eq!(tokens, ["t1", "t2"]);
    }

    #[tokio::test]
    async fn find_by_token_requires_matching_id_and_access() {
        let repo = MemoryUserRepo::new();
        let mut a = user("a@example.com");
        a.tokens.push(token("t1"));
        repo.insert(&a).await.unwrap();

        assert!(repo.find_by_token(a.id, AUTH_ACCESS, "t1").await.unwrap().is_some());
        assert!(repo.find_by_token(a.id, "admin", "t1").await.unwrap().is_none());
        assert!(repo.find_by_token(ObjectId::new(), AUTH_ACCESS, "t1").await.unwrap().is_none());

        assert!(repo.remove_token(a.id, "t1").await.unwrap());
        assert!(!repo.remove_token(a.id, "t1").await.unwrap());
    }

    #[tokio::test]
    async fn recipe_title_clash_only_reported_to_owner() {
        let repo = MemoryRecipeRepo::new();
        let owner = ObjectId::new();
        let mk = |title: &str| Recipe {
            id: ObjectId::new(),
            title: title.into(),
            recipe_name: title.into(),
            author: "Tim".into(),
            date: "07/11/2017".into(),
            descriptions: vec![],
            ingredients: vec![],
            steps: vec![],
            creator: owner,
        };
        let toast = mk("Toast");
        let beer = mk("Cold Beer");
        repo.insert(&toast).await.unwrap();
        repo.insert(&beer).await.unwrap();
        assert_eq!(repo.len(), 2);

        let rename = RecipeChanges {
            title: Some("Toast".into()),
            ..Default::default()
        };
        assert!(repo.update_owned(beer.id, ObjectId::new(), &rename).await.unwrap().is_none());
        assert!(matches!(
            repo.update_owned(beer.id, owner, &rename).await,
            Err(StoreError::Duplicate("title"))
        ));
        assert_eq!(repo.delete_by_creator(owner).await.unwrap(), 2);
        assert!(repo.is_empty());
    }
}
