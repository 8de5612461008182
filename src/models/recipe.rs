//! Recipe model and its request/response shapes.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Ingredient, NamedInput, Price, RawPrice, Tag};
use crate::errors::AppError;

const MAX_TITLE_LEN: usize = 255;
const MAX_LINK_LEN: usize = 255;
const MAX_NAME_LEN: usize = 255;

/// A recipe owned by one user.
#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub description: String,
    pub time_minutes: i64,
    pub price: Price,
    pub link: String,
    /// Path relative to the media root
    pub image: Option<String>,
    pub tags: Vec<Tag>,
    pub ingredients: Vec<Ingredient>,
}

impl fmt::Display for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

/// Recipe as it appears in list responses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecipeSummary {
    pub id: i64,
    pub title: String,
    pub time_minutes: i64,
    pub price: Price,
    pub link: String,
    pub tags: Vec<Tag>,
    pub ingredients: Vec<Ingredient>,
}

impl From<&Recipe> for RecipeSummary {
    fn from(recipe: &Recipe) -> Self {
        Self {
            id: recipe.id,
            title: recipe.title.clone(),
            time_minutes: recipe.time_minutes,
            price: recipe.price,
            link: recipe.link.clone(),
            tags: recipe.tags.clone(),
            ingredients: recipe.ingredients.clone(),
        }
    }
}

/// Recipe as it appears in detail responses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecipeDetail {
    #[serde(flatten)]
    pub summary: RecipeSummary,
    pub description: String,
    /// Public URL of the image, if one was uploaded
    pub image: Option<String>,
}

impl RecipeDetail {
    pub fn new(recipe: &Recipe, image_url: Option<String>) -> Self {
        Self {
            summary: RecipeSummary::from(recipe),
            description: recipe.description.clone(),
            image: image_url,
        }
    }
}

/// Response body of an image upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeImageResponse {
    pub id: i64,
    pub image: Option<String>,
}

/// Request body for creating or updating a recipe.
///
/// Every field is optional on the wire; which ones are required depends on the
/// [`WriteMode`]. Unknown fields (such as `user`) are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipeRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub time_minutes: Option<i64>,
    #[serde(default)]
    pub price: Option<RawPrice>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<NamedInput>>,
    #[serde(default)]
    pub ingredients: Option<Vec<NamedInput>>,
}

/// How a [`RecipeRequest`] is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// POST: required fields must be present
    Create,
    /// PUT: required fields must be present, optional scalars reset when absent
    Replace,
    /// PATCH: absent fields keep their current value
    Patch,
}

/// Validated recipe fields ready to be written.
///
/// `tags`/`ingredients` of `None` leave the current links untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeDraft {
    pub title: String,
    pub time_minutes: i64,
    pub price: Price,
    pub description: String,
    pub link: String,
    pub tags: Option<Vec<String>>,
    pub ingredients: Option<Vec<String>>,
}

impl RecipeRequest {
    /// Validate the request against the mode, falling back to `existing` for PATCH.
    pub fn into_draft(
        self,
        mode: WriteMode,
        existing: Option<&Recipe>,
    ) -> Result<RecipeDraft, AppError> {
        let fallback = match mode {
            WriteMode::Patch => existing,
            WriteMode::Create | WriteMode::Replace => None,
        };

        let title = match (self.title, fallback) {
            (Some(t), _) => t.trim().to_string(),
            (None, Some(r)) => r.title.clone(),
            (None, None) => return Err(AppError::invalid_field("title", "This field is required.")),
        };
        if title.is_empty() {
            return Err(AppError::invalid_field("title", "This field may not be blank."));
        }
        if title.chars().count() > MAX_TITLE_LEN {
            return Err(AppError::invalid_field(
                "title",
                format!("Ensure this field has no more than {} characters.", MAX_TITLE_LEN),
            ));
        }

        let time_minutes = match (self.time_minutes, fallback) {
            (Some(t), _) => t,
            (None, Some(r)) => r.time_minutes,
            (None, None) => {
                return Err(AppError::invalid_field(
                    "time_minutes",
                    "This field is required.",
                ))
            }
        };
        if time_minutes < 0 {
            return Err(AppError::invalid_field(
                "time_minutes",
                "Ensure this value is greater than or equal to 0.",
            ));
        }

        let price = match (self.price, fallback) {
            (Some(raw), _) => raw
                .to_price()
                .map_err(|e| AppError::invalid_field("price", e.to_string()))?,
            (None, Some(r)) => r.price,
            (None, None) => return Err(AppError::invalid_field("price", "This field is required.")),
        };

        let description = self
            .description
            .or_else(|| fallback.map(|r| r.description.clone()))
            .unwrap_or_default();

        let link = self
            .link
            .map(|l| l.trim().to_string())
            .or_else(|| fallback.map(|r| r.link.clone()))
            .unwrap_or_default();
        if link.chars().count() > MAX_LINK_LEN {
            return Err(AppError::invalid_field(
                "link",
                format!("Ensure this field has no more than {} characters.", MAX_LINK_LEN),
            ));
        }

        let tags = normalize_names("tags", self.tags)?;
        let ingredients = normalize_names("ingredients", self.ingredients)?;

        Ok(RecipeDraft {
            title,
            time_minutes,
            price,
            description,
            link,
            tags: match mode {
                WriteMode::Create => Some(tags.unwrap_or_default()),
                _ => tags,
            },
            ingredients: match mode {
                WriteMode::Create => Some(ingredients.unwrap_or_default()),
                _ => ingredients,
            },
        })
    }
}

/// Trim nested names, reject blanks and collapse duplicates (first occurrence wins).
fn normalize_names(
    field: &'static str,
    items: Option<Vec<NamedInput>>,
) -> Result<Option<Vec<String>>, AppError> {
    let Some(items) = items else {
        return Ok(None);
    };

    let mut names: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let name = validate_name(field, &item.name)?;
        if !names.contains(&name) {
            names.push(name);
        }
    }
    Ok(Some(names))
}

/// Trim a tag or ingredient name and check its length.
pub fn validate_name(field: &'static str, raw: &str) -> Result<String, AppError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(AppError::invalid_field(field, "Name may not be blank."));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::invalid_field(
            field,
            format!("Ensure names have no more than {} characters.", MAX_NAME_LEN),
        ));
    }
    Ok(name.to_string())
}

/// Query parameters for listing recipes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipeListQuery {
    /// Comma separated tag ids
    #[serde(default)]
    pub tags: Option<String>,
    /// Comma separated ingredient ids
    #[serde(default)]
    pub ingredients: Option<String>,
}

/// Parsed recipe list filters. An empty list means "no filter".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    pub tag_ids: Vec<i64>,
    pub ingredient_ids: Vec<i64>,
}

impl RecipeListQuery {
    pub fn into_filter(self) -> Result<RecipeFilter, AppError> {
        Ok(RecipeFilter {
            tag_ids: parse_ids("tags", self.tags.as_deref())?,
            ingredient_ids: parse_ids("ingredients", self.ingredients.as_deref())?,
        })
    }
}

fn parse_ids(field: &'static str, raw: Option<&str>) -> Result<Vec<i64>, AppError> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };

    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>().map_err(|_| {
                AppError::invalid_field(field, format!("'{}' is not a valid id.", s))
            })
        })
        .collect()
}
