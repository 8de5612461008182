//! Database repository for CRUD operations.
//!
//! Every recipe, tag and ingredient query is scoped to the owning user. Writes that
//! touch more than one table run in a transaction.

use std::collections::HashMap;

use chrono::Utc;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool, Transaction};

use crate::errors::AppError;
use crate::models::{Ingredient, Price, Recipe, RecipeDraft, RecipeFilter, Tag, User};

/// The two kinds of named labels a recipe links to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    Tag,
    Ingredient,
}

impl AttributeKind {
    fn table(self) -> &'static str {
        match self {
            AttributeKind::Tag => "tags",
            AttributeKind::Ingredient => "ingredients",
        }
    }

    fn link_table(self) -> &'static str {
        match self {
            AttributeKind::Tag => "recipe_tags",
            AttributeKind::Ingredient => "recipe_ingredients",
        }
    }

    fn link_column(self) -> &'static str {
        match self {
            AttributeKind::Tag => "tag_id",
            AttributeKind::Ingredient => "ingredient_id",
        }
    }

    /// Human readable name used in error messages.
    pub fn label(self) -> &'static str {
        match self {
            AttributeKind::Tag => "Tag",
            AttributeKind::Ingredient => "Ingredient",
        }
    }
}

/// Fields for a new user row. The password must already be hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub is_staff: bool,
    pub is_superuser: bool,
}

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ==================== USER OPERATIONS ====================

    /// Insert a user. The email must already be normalized.
    pub async fn create_user(&self, new_user: &NewUser) -> Result<User, AppError> {
        if new_user.email.is_empty() {
            return Err(AppError::invalid_field("email", "Users must have an email address."));
        }
        if self.get_user_by_email(&new_user.email).await?.is_some() {
            return Err(AppError::invalid_field(
                "email",
                "A user with this email already exists.",
            ));
        }

        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "INSERT INTO users (email, name, password_hash, is_active, is_staff, is_superuser, date_joined) VALUES (?, ?, ?, 1, ?, ?, ?)",
        )
        .bind(&new_user.email)
        .bind(&new_user.name)
        .bind(&new_user.password_hash)
        .bind(new_user.is_staff as i32)
        .bind(new_user.is_superuser as i32)
        .bind(&now)
        .execute(&self.pool)
        .await;

        let result = match result {
            Ok(r) => r,
            // Lost a race with a concurrent registration of the same email
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                return Err(AppError::invalid_field(
                    "email",
                    "A user with this email already exists.",
                ));
            }
            Err(e) => return Err(e.into()),
        };

        Ok(User {
            id: result.last_insert_rowid(),
            email: new_user.email.clone(),
            name: new_user.name.clone(),
            password_hash: new_user.password_hash.clone(),
            is_active: true,
            is_superuser: new_user.is_superuser,
        })
    }

    /// Get a user by ID.
    pub async fn get_user(&self, id: i64) -> Result<Option<User>, AppError> {
        let row = sqlx::query(
            "SELECT id, email, name, password_hash, is_active, is_superuser FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    /// Get a user by (normalized) email.
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query(
            "SELECT id, email, name, password_hash, is_active, is_superuser FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    /// Update a user's name and/or password hash.
    pub async fn update_user(
        &self,
        id: i64,
        name: Option<&str>,
        password_hash: Option<&str>,
    ) -> Result<User, AppError> {
        let result = sqlx::query(
            "UPDATE users SET name = COALESCE(?, name), password_hash = COALESCE(?, password_hash) WHERE id = ?",
        )
        .bind(name)
        .bind(password_hash)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User {} not found", id)));
        }

        self.get_user(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))
    }

    /// Activate or deactivate an account.
    #[cfg(test)]
    pub async fn set_user_active(&self, id: i64, active: bool) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET is_active = ? WHERE id = ?")
            .bind(active as i32)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ==================== TOKEN OPERATIONS ====================

    /// Return the user's token, storing `candidate_key` if they have none yet.
    pub async fn get_or_create_token(
        &self,
        user_id: i64,
        candidate_key: &str,
    ) -> Result<String, AppError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query("INSERT INTO tokens (key, user_id, created) VALUES (?, ?, ?) ON CONFLICT(user_id) DO NOTHING")
            .bind(candidate_key)
            .bind(user_id)
            .bind(&now)
            .execute(&self.pool)
            .await?;

        let row = sqlx::query("SELECT key FROM tokens WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("key"))
    }

    /// Resolve a token key to its user.
    pub async fn get_user_by_token(&self, key: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query(
            r#"SELECT u.id, u.email, u.name, u.password_hash, u.is_active, u.is_superuser
               FROM tokens t JOIN users u ON u.id = t.user_id
               WHERE t.key = ?"#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    // ==================== TAG / INGREDIENT OPERATIONS ====================

    /// List the user's tags, newest name first.
    pub async fn list_tags(&self, user_id: i64, assigned_only: bool) -> Result<Vec<Tag>, AppError> {
        let rows = self
            .list_attributes(AttributeKind::Tag, user_id, assigned_only)
            .await?;
        Ok(rows.into_iter().map(|(id, name)| Tag { id, name }).collect())
    }

    /// List the user's ingredients, newest name first.
    pub async fn list_ingredients(
        &self,
        user_id: i64,
        assigned_only: bool,
    ) -> Result<Vec<Ingredient>, AppError> {
        let rows = self
            .list_attributes(AttributeKind::Ingredient, user_id, assigned_only)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(id, name)| Ingredient { id, name })
            .collect())
    }

    /// Get one tag or ingredient owned by the user.
    pub async fn get_attribute(
        &self,
        kind: AttributeKind,
        user_id: i64,
        id: i64,
    ) -> Result<Option<(i64, String)>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT id, name FROM {} WHERE id = ? AND user_id = ?",
            kind.table()
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| (row.get("id"), row.get("name"))))
    }

    /// Rename a tag or ingredient owned by the user.
    ///
    /// An id the user does not own is `NotFound` even when the new name clashes.
    pub async fn rename_attribute(
        &self,
        kind: AttributeKind,
        user_id: i64,
        id: i64,
        name: &str,
    ) -> Result<(i64, String), AppError> {
        let not_found = || AppError::NotFound(format!("{} {} not found", kind.label(), id));
        let name_taken = || {
            AppError::invalid_field(
                "name",
                format!("{} with this name already exists.", kind.label()),
            )
        };

        let mut tx = self.pool.begin().await?;

        sqlx::query(&format!(
            "SELECT id FROM {} WHERE id = ? AND user_id = ?",
            kind.table()
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(not_found)?;

        let conflict = sqlx::query(&format!(
            "SELECT id FROM {} WHERE user_id = ? AND name = ? AND id != ?",
            kind.table()
        ))
        .bind(user_id)
        .bind(name)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        if conflict.is_some() {
            return Err(name_taken());
        }

        let result = sqlx::query(&format!(
            "UPDATE {} SET name = ? WHERE id = ? AND user_id = ?",
            kind.table()
        ))
        .bind(name)
        .bind(id)
        .bind(user_id)
        .execute(&mut *tx)
        .await;

        match result {
            Ok(r) if r.rows_affected() == 0 => return Err(not_found()),
            Ok(_) => {}
            // Another rename to the same name committed first
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => return Err(name_taken()),
            Err(e) => return Err(e.into()),
        }

        tx.commit().await?;
        Ok((id, name.to_string()))
    }

    /// Delete a tag or ingredient owned by the user. Recipe links cascade.
    pub async fn delete_attribute(
        &self,
        kind: AttributeKind,
        user_id: i64,
        id: i64,
    ) -> Result<(), AppError> {
        let result = sqlx::query(&format!(
            "DELETE FROM {} WHERE id = ? AND user_id = ?",
            kind.table()
        ))
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "{} {} not found",
                kind.label(),
                id
            )));
        }

        Ok(())
    }

    async fn list_attributes(
        &self,
        kind: AttributeKind,
        user_id: i64,
        assigned_only: bool,
    ) -> Result<Vec<(i64, String)>, AppError> {
        let sql = if assigned_only {
            format!(
                "SELECT a.id, a.name FROM {table} a WHERE a.user_id = ? AND EXISTS (SELECT 1 FROM {link} l WHERE l.{col} = a.id) ORDER BY a.name DESC, a.id DESC",
                table = kind.table(),
                link = kind.link_table(),
                col = kind.link_column()
            )
        } else {
            format!(
                "SELECT a.id, a.name FROM {} a WHERE a.user_id = ? ORDER BY a.name DESC, a.id DESC",
                kind.table()
            )
        };

        let rows = sqlx::query(&sql).bind(user_id).fetch_all(&self.pool).await?;
        Ok(rows
            .iter()
            .map(|row| (row.get("id"), row.get("name")))
            .collect())
    }

    // ==================== RECIPE OPERATIONS ====================

    /// List the user's recipes, newest first, optionally filtered by tag and ingredient ids.
    pub async fn list_recipes(
        &self,
        user_id: i64,
        filter: &RecipeFilter,
    ) -> Result<Vec<Recipe>, AppError> {
        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT id, user_id, title, description, time_minutes, price_cents, link, image FROM recipes WHERE user_id = ",
        );
        qb.push_bind(user_id);
        push_link_filter(&mut qb, AttributeKind::Tag, &filter.tag_ids);
        push_link_filter(&mut qb, AttributeKind::Ingredient, &filter.ingredient_ids);
        qb.push(" ORDER BY id DESC");

        let rows = qb.build().fetch_all(&self.pool).await?;
        let mut recipes: Vec<Recipe> = rows.iter().map(recipe_from_row).collect();
        self.attach_links(&mut recipes).await?;
        Ok(recipes)
    }

    /// Get one of the user's recipes.
    pub async fn get_recipe(&self, user_id: i64, id: i64) -> Result<Option<Recipe>, AppError> {
        let row = sqlx::query(
            "SELECT id, user_id, title, description, time_minutes, price_cents, link, image FROM recipes WHERE id = ? AND user_id = ?",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut recipes = vec![recipe_from_row(&row)];
        self.attach_links(&mut recipes).await?;
        Ok(recipes.pop())
    }

    /// Create a recipe, get-or-creating its tags and ingredients by name.
    pub async fn create_recipe(&self, user_id: i64, draft: &RecipeDraft) -> Result<Recipe, AppError> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO recipes (user_id, title, description, time_minutes, price_cents, link, image, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, NULL, ?, ?)",
        )
        .bind(user_id)
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(draft.time_minutes)
        .bind(draft.price.cents())
        .bind(&draft.link)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;
        let recipe_id = result.last_insert_rowid();

        if let Some(tags) = &draft.tags {
            link_attributes(&mut tx, AttributeKind::Tag, user_id, recipe_id, tags).await?;
        }
        if let Some(ingredients) = &draft.ingredients {
            link_attributes(&mut tx, AttributeKind::Ingredient, user_id, recipe_id, ingredients)
                .await?;
        }

        tx.commit().await?;

        self.get_recipe(user_id, recipe_id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Recipe {} vanished after insert", recipe_id)))
    }

    /// Overwrite a recipe's fields. Nested sets are replaced only when present in the draft.
    pub async fn update_recipe(
        &self,
        user_id: i64,
        id: i64,
        draft: &RecipeDraft,
    ) -> Result<Recipe, AppError> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE recipes SET title = ?, description = ?, time_minutes = ?, price_cents = ?, link = ?, updated_at = ? WHERE id = ? AND user_id = ?",
        )
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(draft.time_minutes)
        .bind(draft.price.cents())
        .bind(&draft.link)
        .bind(&now)
        .bind(id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Recipe {} not found", id)));
        }

        if let Some(tags) = &draft.tags {
            clear_links(&mut tx, AttributeKind::Tag, id).await?;
            link_attributes(&mut tx, AttributeKind::Tag, user_id, id, tags).await?;
        }
        if let Some(ingredients) = &draft.ingredients {
            clear_links(&mut tx, AttributeKind::Ingredient, id).await?;
            link_attributes(&mut tx, AttributeKind::Ingredient, user_id, id, ingredients).await?;
        }

        tx.commit().await?;

        self.get_recipe(user_id, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Recipe {} not found", id)))
    }

    /// Delete a recipe and return the image path it referenced, if any.
    pub async fn delete_recipe(&self, user_id: i64, id: i64) -> Result<Option<String>, AppError> {
        let row = sqlx::query("DELETE FROM recipes WHERE id = ? AND user_id = ? RETURNING image")
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(row.get("image")),
            None => Err(AppError::NotFound(format!("Recipe {} not found", id))),
        }
    }

    /// Point a recipe at a new image and return the path it replaced.
    pub async fn set_recipe_image(
        &self,
        user_id: i64,
        id: i64,
        image: &str,
    ) -> Result<Option<String>, AppError> {
        let mut tx = self.pool.begin().await?;

        let previous = sqlx::query("SELECT image FROM recipes WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Recipe {} not found", id)))?;
        let previous: Option<String> = previous.get("image");

        sqlx::query("UPDATE recipes SET image = ?, updated_at = ? WHERE id = ? AND user_id = ?")
            .bind(image)
            .bind(Utc::now().to_rfc3339())
            .bind(id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(previous)
    }

    /// Fill in tags and ingredients for a batch of recipes.
    async fn attach_links(&self, recipes: &mut [Recipe]) -> Result<(), AppError> {
        if recipes.is_empty() {
            return Ok(());
        }
        let ids: Vec<i64> = recipes.iter().map(|r| r.id).collect();

        let mut tags = self.load_links(AttributeKind::Tag, &ids).await?;
        let mut ingredients = self.load_links(AttributeKind::Ingredient, &ids).await?;

        for recipe in recipes.iter_mut() {
            recipe.tags = tags
                .remove(&recipe.id)
                .unwrap_or_default()
                .into_iter()
                .map(|(id, name)| Tag { id, name })
                .collect();
            recipe.ingredients = ingredients
                .remove(&recipe.id)
                .unwrap_or_default()
                .into_iter()
                .map(|(id, name)| Ingredient { id, name })
                .collect();
        }
        Ok(())
    }

    async fn load_links(
        &self,
        kind: AttributeKind,
        recipe_ids: &[i64],
    ) -> Result<HashMap<i64, Vec<(i64, String)>>, AppError> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT l.recipe_id, a.id, a.name FROM {link} l JOIN {table} a ON a.id = l.{col} WHERE l.recipe_id IN (",
            link = kind.link_table(),
            table = kind.table(),
            col = kind.link_column()
        ));
        let mut separated = qb.separated(", ");
        for id in recipe_ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(") ORDER BY a.id");

        let rows = qb.build().fetch_all(&self.pool).await?;

        let mut links: HashMap<i64, Vec<(i64, String)>> = HashMap::new();
        for row in rows {
            links
                .entry(row.get("recipe_id"))
                .or_default()
                .push((row.get("id"), row.get("name")));
        }
        Ok(links)
    }
}

// Helper functions for transactions and row conversion

fn push_link_filter(qb: &mut QueryBuilder<'_, Sqlite>, kind: AttributeKind, ids: &[i64]) {
    if ids.is_empty() {
        return;
    }
    qb.push(format!(
        " AND id IN (SELECT recipe_id FROM {} WHERE {} IN (",
        kind.link_table(),
        kind.link_column()
    ));
    let mut separated = qb.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated("))");
}

async fn clear_links(
    tx: &mut Transaction<'_, Sqlite>,
    kind: AttributeKind,
    recipe_id: i64,
) -> Result<(), AppError> {
    sqlx::query(&format!(
        "DELETE FROM {} WHERE recipe_id = ?",
        kind.link_table()
    ))
    .bind(recipe_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Get-or-create each named attribute for the user and link it to the recipe.
async fn link_attributes(
    tx: &mut Transaction<'_, Sqlite>,
    kind: AttributeKind,
    user_id: i64,
    recipe_id: i64,
    names: &[String],
) -> Result<(), AppError> {
    for name in names {
        sqlx::query(&format!(
            "INSERT INTO {} (user_id, name) VALUES (?, ?) ON CONFLICT(user_id, name) DO NOTHING",
            kind.table()
        ))
        .bind(user_id)
        .bind(name)
        .execute(&mut **tx)
        .await?;

        let row = sqlx::query(&format!(
            "SELECT id FROM {} WHERE user_id = ? AND name = ?",
            kind.table()
        ))
        .bind(user_id)
        .bind(name)
        .fetch_one(&mut **tx)
        .await?;
        let attribute_id: i64 = row.get("id");

        sqlx::query(&format!(
            "INSERT OR IGNORE INTO {} (recipe_id, {}) VALUES (?, ?)",
            kind.link_table(),
            kind.link_column()
        ))
        .bind(recipe_id)
        .bind(attribute_id)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

fn user_from_row(row: &sqlx::sqlite::SqliteRow) -> User {
    let is_active: i32 = row.get("is_active");
    let is_superuser: i32 = row.get("is_superuser");
    User {
        id: row.get("id"),
        email: row.get("email"),
        name: row.get("name"),
        password_hash: row.get("password_hash"),
        is_active: is_active != 0,
        is_superuser: is_superuser != 0,
    }
}

fn recipe_from_row(row: &sqlx::sqlite::SqliteRow) -> Recipe {
    let price_cents: i64 = row.get("price_cents");
    Recipe {
        id: row.get("id"),
        user_id: row.get("user_id"),
        title: row.get("title"),
        description: row.get("description"),
        time_minutes: row.get("time_minutes"),
        price: Price::from_cents(price_cents),
        link: row.get("link"),
        image: row.get("image"),
        tags: Vec::new(),
        ingredients: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_database;
    use tempfile::TempDir;

    async fn setup() -> (Repository, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_database(&temp_dir.path().join("repo.sqlite"))
            .await
            .unwrap();
        (Repository::new(pool), temp_dir)
    }

    async fn make_user(repo: &Repository, email: &str) -> User {
        repo.create_user(&NewUser {
            email: email.to_string(),
            name: "Test".to_string(),
            password_hash: "not-a-real-hash".to_string(),
            is_staff: false,
            is_superuser: false,
        })
        .await
        .unwrap()
    }

    fn draft(title: &str, tags: &[&str], ingredients: &[&str]) -> RecipeDraft {
        RecipeDraft {
            title: title.to_string(),
            time_minutes: 10,
            price: "5.00".parse().unwrap(),
            description: String::new(),
            link: String::new(),
            tags: Some(tags.iter().map(|s| s.to_string()).collect()),
            ingredients: Some(ingredients.iter().map(|s| s.to_string()).collect()),
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let (repo, _dir) = setup().await;
        make_user(&repo, "dup@example.com").await;

        let err = repo
            .create_user(&NewUser {
                email: "dup@example.com".to_string(),
                name: "Other".to_string(),
                password_hash: "x".to_string(),
                is_staff: false,
                is_superuser: false,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_user_without_email_rejected() {
        let (repo, _dir) = setup().await;

        let err = repo
            .create_user(&NewUser {
                email: String::new(),
                name: "Nameless".to_string(),
                password_hash: "x".to_string(),
                is_staff: false,
                is_superuser: false,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { field: Some("email"), .. }));
    }

    #[tokio::test]
    async fn test_token_is_stable_per_user() {
        let (repo, _dir) = setup().await;
        let user = make_user(&repo, "token@example.com").await;

        let first = repo.get_or_create_token(user.id, "aaaa").await.unwrap();
        let second = repo.get_or_create_token(user.id, "bbbb").await.unwrap();
        assert_eq!(first, "aaaa");
        assert_eq!(second, "aaaa");

        let resolved = repo.get_user_by_token("aaaa").await.unwrap().unwrap();
        assert_eq!(resolved.id, user.id);
        assert!(repo.get_user_by_token("bbbb").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_recipe_reuses_existing_tags() {
        let (repo, _dir) = setup().await;
        let user = make_user(&repo, "chef@example.com").await;

        let first = repo
            .create_recipe(user.id, &draft("Curry", &["Thai"], &["Prawns"]))
            .await
            .unwrap();
        let second = repo
            .create_recipe(user.id, &draft("Soup", &["Thai", "Dinner"], &[]))
            .await
            .unwrap();

        assert_eq!(first.tags[0].id, second.tags[0].id);
        assert_eq!(second.tags.len(), 2);
        assert_eq!(repo.list_tags(user.id, false).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_tags_are_per_user() {
        let (repo, _dir) = setup().await;
        let alice = make_user(&repo, "alice@example.com").await;
        let bob = make_user(&repo, "bob@example.com").await;

        repo.create_recipe(alice.id, &draft("A", &["Shared"], &[]))
            .await
            .unwrap();
        repo.create_recipe(bob.id, &draft("B", &["Shared"], &[]))
            .await
            .unwrap();

        let alice_tags = repo.list_tags(alice.id, false).await.unwrap();
        let bob_tags = repo.list_tags(bob.id, false).await.unwrap();
        assert_eq!(alice_tags.len(), 1);
        assert_eq!(bob_tags.len(), 1);
        assert_ne!(alice_tags[0].id, bob_tags[0].id);
    }

    #[tokio::test]
    async fn test_filter_by_tags_and_ingredients() {
        let (repo, _dir) = setup().await;
        let user = make_user(&repo, "filter@example.com").await;

        let curry = repo
            .create_recipe(user.id, &draft("Curry", &["Vegan"], &["Lentils"]))
            .await
            .unwrap();
        let salad = repo
            .create_recipe(user.id, &draft("Salad", &["Vegan"], &["Lettuce"]))
            .await
            .unwrap();
        repo.create_recipe(user.id, &draft("Steak", &[], &["Beef"]))
            .await
            .unwrap();

        let vegan = curry.tags[0].id;
        let by_tag = repo
            .list_recipes(
                user.id,
                &RecipeFilter {
                    tag_ids: vec![vegan],
                    ingredient_ids: vec![],
                },
            )
            .await
            .unwrap();
        let ids: Vec<i64> = by_tag.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![salad.id, curry.id]);

        let both = repo
            .list_recipes(
                user.id,
                &RecipeFilter {
                    tag_ids: vec![vegan],
                    ingredient_ids: vec![curry.ingredients[0].id],
                },
            )
            .await
            .unwrap();
        assert_eq!(both.len(), 1);
        assert_eq!(both[0].id, curry.id);
    }

    #[tokio::test]
    async fn test_assigned_only_excludes_orphans() {
        let (repo, _dir) = setup().await;
        let user = make_user(&repo, "assigned@example.com").await;

        let recipe = repo
            .create_recipe(user.id, &draft("Toast", &["Breakfast"], &["Bread"]))
            .await
            .unwrap();
        let mut changes = draft("Toast", &["Lunch"], &["Bread"]);
        changes.ingredients = None;
        let updated = repo.update_recipe(user.id, recipe.id, &changes).await.unwrap();
        assert_eq!(updated.tags.len(), 1);
        assert_eq!(updated.tags[0].name, "Lunch");
        assert_eq!(updated.ingredients.len(), 1);

        let assigned = repo.list_tags(user.id, true).await.unwrap();
        assert_eq!(assigned.len(), 1);
        assert_eq!(assigned[0].name, "Lunch");
        assert_eq!(repo.list_tags(user.id, false).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_delete_recipe_of_other_user_is_not_found() {
        let (repo, _dir) = setup().await;
        let owner = make_user(&repo, "owner@example.com").await;
        let other = make_user(&repo, "other@example.com").await;

        let recipe = repo
            .create_recipe(owner.id, &draft("Pie", &[], &[]))
            .await
            .unwrap();

        let err = repo.delete_recipe(other.id, recipe.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(repo.get_recipe(owner.id, recipe.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_rename_attribute_conflict() {
        let (repo, _dir) = setup().await;
        let user = make_user(&repo, "rename@example.com").await;
        let recipe = repo
            .create_recipe(user.id, &draft("Bowl", &["Lunch", "Dinner"], &[]))
            .await
            .unwrap();

        let lunch = recipe.tags.iter().find(|t| t.name == "Lunch").unwrap();
        let err = repo
            .rename_attribute(AttributeKind::Tag, user.id, lunch.id, "Dinner")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));

        let renamed = repo
            .rename_attribute(AttributeKind::Tag, user.id, lunch.id, "Brunch")
            .await
            .unwrap();
        assert_eq!(renamed.1, "Brunch");
    }

    #[tokio::test]
    async fn test_rename_foreign_attribute_is_not_found_before_conflict() {
        let (repo, _dir) = setup().await;
        let owner = make_user(&repo, "owner@example.com").await;
        let intruder = make_user(&repo, "intruder@example.com").await;

        let theirs = repo
            .create_recipe(owner.id, &draft("Theirs", &[], &["Saffron"]))
            .await
            .unwrap();
        repo.create_recipe(intruder.id, &draft("Mine", &[], &["Pepper"]))
            .await
            .unwrap();

        let err = repo
            .rename_attribute(
                AttributeKind::Ingredient,
                intruder.id,
                theirs.ingredients[0].id,
                "Pepper",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let owned = repo
            .get_attribute(AttributeKind::Ingredient, owner.id, theirs.ingredients[0].id)
            .await
            .unwrap();
        assert_eq!(owned.map(|(_, name)| name), Some("Saffron".to_string()));
    }
}
