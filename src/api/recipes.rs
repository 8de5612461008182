//! Recipe API endpoints.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Extension, Json,
};

use super::{ApiJson, ApiResult};
use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::{
    Recipe, RecipeDetail, RecipeImageResponse, RecipeListQuery, RecipeRequest, RecipeSummary,
    WriteMode,
};
use crate::AppState;

/// Multipart field carrying the image file.
const IMAGE_FIELD: &str = "image";

/// GET /api/recipe/recipes/ - List the user's recipes.
pub async fn list_recipes(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Query(query): Query<RecipeListQuery>,
) -> ApiResult<Json<Vec<RecipeSummary>>> {
    let filter = query.into_filter()?;
    let recipes = state.repo.list_recipes(user.id, &filter).await?;
    Ok(Json(recipes.iter().map(RecipeSummary::from).collect()))
}

/// POST /api/recipe/recipes/ - Create a recipe.
pub async fn create_recipe(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    ApiJson(request): ApiJson<RecipeRequest>,
) -> ApiResult<(StatusCode, Json<RecipeDetail>)> {
    let draft = request.into_draft(WriteMode::Create, None)?;
    let recipe = state.repo.create_recipe(user.id, &draft).await?;

    tracing::debug!("User {} created recipe {}", user.id, recipe.id);
    Ok((StatusCode::CREATED, Json(detail(&state, &recipe))))
}

/// GET /api/recipe/recipes/:id/ - Get a single recipe.
pub async fn get_recipe(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> ApiResult<Json<RecipeDetail>> {
    let recipe = find_recipe(&state, user.id, id).await?;
    Ok(Json(detail(&state, &recipe)))
}

/// PUT /api/recipe/recipes/:id/ - Replace a recipe.
pub async fn replace_recipe(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<i64>,
    ApiJson(request): ApiJson<RecipeRequest>,
) -> ApiResult<Json<RecipeDetail>> {
    write_recipe(&state, user.id, id, request, WriteMode::Replace).await
}

/// PATCH /api/recipe/recipes/:id/ - Partially update a recipe.
pub async fn update_recipe(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<i64>,
    ApiJson(request): ApiJson<RecipeRequest>,
) -> ApiResult<Json<RecipeDetail>> {
    write_recipe(&state, user.id, id, request, WriteMode::Patch).await
}

/// DELETE /api/recipe/recipes/:id/ - Delete a recipe and its image.
pub async fn delete_recipe(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    if let Some(image) = state.repo.delete_recipe(user.id, id).await? {
        if let Err(e) = state.media.remove(&image).await {
            tracing::warn!("Failed to remove image {} of recipe {}: {}", image, id, e);
        }
    }
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/recipe/recipes/:id/upload-image/ - Attach an image to a recipe.
pub async fn upload_recipe_image(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<i64>,
    mut multipart: Multipart,
) -> ApiResult<Json<RecipeImageResponse>> {
    // 404 takes precedence over a bad upload
    find_recipe(&state, user.id, id).await?;

    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(IMAGE_FIELD) {
            upload = Some(field.bytes().await?.to_vec());
            break;
        }
    }
    let bytes = upload
        .ok_or_else(|| AppError::invalid_field(IMAGE_FIELD, "No file was submitted."))?;

    let stored = state.media.save_recipe_image(bytes).await?;

    let previous = match state.repo.set_recipe_image(user.id, id, &stored).await {
        Ok(previous) => previous,
        Err(e) => {
            // Recipe disappeared between the check and the write
            if let Err(cleanup) = state.media.remove(&stored).await {
                tracing::warn!("Failed to remove orphaned image {}: {}", stored, cleanup);
            }
            return Err(e);
        }
    };

    if let Some(previous) = previous {
        if let Err(e) = state.media.remove(&previous).await {
            tracing::warn!("Failed to remove replaced image {}: {}", previous, e);
        }
    }

    Ok(Json(RecipeImageResponse {
        id,
        image: Some(state.media.url_for(&stored)),
    }))
}

async fn write_recipe(
    state: &AppState,
    user_id: i64,
    id: i64,
    request: RecipeRequest,
    mode: WriteMode,
) -> ApiResult<Json<RecipeDetail>> {
    let existing = find_recipe(state, user_id, id).await?;
    let draft = request.into_draft(mode, Some(&existing))?;
    let recipe = state.repo.update_recipe(user_id, id, &draft).await?;
    Ok(Json(detail(state, &recipe)))
}

async fn find_recipe(state: &AppState, user_id: i64, id: i64) -> ApiResult<Recipe> {
    state
        .repo
        .get_recipe(user_id, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Recipe {} not found", id)))
}

fn detail(state: &AppState, recipe: &Recipe) -> RecipeDetail {
    let image_url = recipe.image.as_deref().map(|p| state.media.url_for(p));
    RecipeDetail::new(recipe, image_url)
}
