//! Ingredient API endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};

use super::tags::rename;
use super::{ApiJson, ApiResult};
use crate::auth::AuthUser;
use crate::db::AttributeKind;
use crate::models::{AttributeListQuery, Ingredient, UpdateNameRequest};
use crate::AppState;

/// GET /api/recipe/ingredients/ - List the user's ingredients.
pub async fn list_ingredients(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Query(query): Query<AttributeListQuery>,
) -> ApiResult<Json<Vec<Ingredient>>> {
    let ingredients = state
        .repo
        .list_ingredients(user.id, query.assigned_only())
        .await?;
    Ok(Json(ingredients))
}

/// PUT /api/recipe/ingredients/:id/ - Rename an ingredient.
pub async fn replace_ingredient(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<i64>,
    ApiJson(request): ApiJson<UpdateNameRequest>,
) -> ApiResult<Json<Ingredient>> {
    let (id, name) = rename(&state, AttributeKind::Ingredient, user.id, id, request, true).await?;
    Ok(Json(Ingredient { id, name }))
}

/// PATCH /api/recipe/ingredients/:id/ - Partially update an ingredient.
pub async fn update_ingredient(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<i64>,
    ApiJson(request): ApiJson<UpdateNameRequest>,
) -> ApiResult<Json<Ingredient>> {
    let (id, name) = rename(&state, AttributeKind::Ingredient, user.id, id, request, false).await?;
    Ok(Json(Ingredient { id, name }))
}

/// DELETE /api/recipe/ingredients/:id/ - Delete an ingredient.
pub async fn delete_ingredient(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    state
        .repo
        .delete_attribute(AttributeKind::Ingredient, user.id, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
