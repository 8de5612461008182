//! Tag API endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};

use super::{ApiJson, ApiResult};
use crate::auth::AuthUser;
use crate::db::AttributeKind;
use crate::errors::AppError;
use crate::models::{validate_name, AttributeListQuery, Tag, UpdateNameRequest};
use crate::AppState;

/// GET /api/recipe/tags/ - List the user's tags.
pub async fn list_tags(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Query(query): Query<AttributeListQuery>,
) -> ApiResult<Json<Vec<Tag>>> {
    let tags = state.repo.list_tags(user.id, query.assigned_only()).await?;
    Ok(Json(tags))
}

/// PUT /api/recipe/tags/:id/ - Rename a tag.
pub async fn replace_tag(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<i64>,
    ApiJson(request): ApiJson<UpdateNameRequest>,
) -> ApiResult<Json<Tag>> {
    let (id, name) = rename(&state, AttributeKind::Tag, user.id, id, request, true).await?;
    Ok(Json(Tag { id, name }))
}

/// PATCH /api/recipe/tags/:id/ - Partially update a tag.
pub async fn update_tag(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<i64>,
    ApiJson(request): ApiJson<UpdateNameRequest>,
) -> ApiResult<Json<Tag>> {
    let (id, name) = rename(&state, AttributeKind::Tag, user.id, id, request, false).await?;
    Ok(Json(Tag { id, name }))
}

/// DELETE /api/recipe/tags/:id/ - Delete a tag.
pub async fn delete_tag(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    state
        .repo
        .delete_attribute(AttributeKind::Tag, user.id, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Apply a rename to a tag or ingredient. Without `require_name`, a missing name
/// leaves the entry as it is.
pub(super) async fn rename(
    state: &AppState,
    kind: AttributeKind,
    user_id: i64,
    id: i64,
    request: UpdateNameRequest,
    require_name: bool,
) -> ApiResult<(i64, String)> {
    let not_found = || AppError::NotFound(format!("{} {} not found", kind.label(), id));

    match request.name {
        Some(raw) => {
            let name = validate_name("name", &raw)?;
            state
                .repo
                .rename_attribute(kind, user_id, id, &name)
                .await
        }
        None if require_name => {
            // Unknown ids are still 404, not a validation error
            state
                .repo
                .get_attribute(kind, user_id, id)
                .await?
                .ok_or_else(not_found)?;
            Err(AppError::invalid_field("name", "This field is required."))
        }
        None => state
            .repo
            .get_attribute(kind, user_id, id)
            .await?
            .ok_or_else(not_found),
    }
}
