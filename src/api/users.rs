//! User API endpoints: registration, token issue and the authenticated profile.

use axum::{extract::State, http::StatusCode, Extension, Json};

use super::{ApiJson, ApiResult};
use crate::auth::{self, AuthUser};
use crate::db::NewUser;
use crate::errors::AppError;
use crate::models::{
    normalize_email, CreateUserRequest, TokenRequest, TokenResponse, UpdateUserRequest,
    UserResponse,
};
use crate::AppState;

/// Shortest password accepted on registration and update.
pub const MIN_PASSWORD_LEN: usize = 5;

const MAX_NAME_LEN: usize = 255;

/// POST /api/user/create/ - Register a new user.
pub async fn create_user(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    let email = validate_email(request.email.as_deref())?;
    let password = validate_password(request.password)?;
    let name = validate_user_name(request.name)?;

    let password_hash = auth::hash_password(password).await?;
    let user = state
        .repo
        .create_user(&NewUser {
            email,
            name,
            password_hash,
            is_staff: false,
            is_superuser: false,
        })
        .await?;

    tracing::info!("Registered user {}", user.id);
    Ok((StatusCode::CREATED, Json(UserResponse::from(&user))))
}

/// POST /api/user/token/ - Exchange email and password for an auth token.
pub async fn create_token(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<TokenRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let email = request
        .email
        .as_deref()
        .map(normalize_email)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| AppError::invalid_field("email", "This field may not be blank."))?;
    let password = request
        .password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::invalid_field("password", "This field may not be blank."))?;

    let rejected = || AppError::validation("Unable to authenticate with provided credentials.");

    let user = state
        .repo
        .get_user_by_email(&email)
        .await?
        .ok_or_else(rejected)?;

    if !auth::verify_password(password, user.password_hash.clone()).await? || !user.is_active {
        return Err(rejected());
    }

    let token = state
        .repo
        .get_or_create_token(user.id, &auth::generate_token_key())
        .await?;

    Ok(Json(TokenResponse { token }))
}

/// GET /api/user/me/ - Get the authenticated user.
pub async fn get_me(Extension(AuthUser(user)): Extension<AuthUser>) -> Json<UserResponse> {
    Json(UserResponse::from(&user))
}

/// PATCH /api/user/me/ - Update the authenticated user's name and/or password.
pub async fn update_me(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    ApiJson(request): ApiJson<UpdateUserRequest>,
) -> ApiResult<Json<UserResponse>> {
    apply_user_update(&state, user.id, request).await
}

/// PUT /api/user/me/ - Replace the authenticated user's name and password.
pub async fn replace_me(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    ApiJson(request): ApiJson<UpdateUserRequest>,
) -> ApiResult<Json<UserResponse>> {
    if request.name.is_none() {
        return Err(AppError::invalid_field("name", "This field is required."));
    }
    if request.password.is_none() {
        return Err(AppError::invalid_field("password", "This field is required."));
    }
    apply_user_update(&state, user.id, request).await
}

async fn apply_user_update(
    state: &AppState,
    user_id: i64,
    request: UpdateUserRequest,
) -> ApiResult<Json<UserResponse>> {
    let name = request.name.map(|n| validate_user_name(Some(n))).transpose()?;
    let password_hash = match request.password {
        Some(password) => Some(auth::hash_password(validate_password(Some(password))?).await?),
        None => None,
    };

    let user = state
        .repo
        .update_user(user_id, name.as_deref(), password_hash.as_deref())
        .await?;

    Ok(Json(UserResponse::from(&user)))
}

fn validate_email(raw: Option<&str>) -> Result<String, AppError> {
    let email = raw.map(normalize_email).unwrap_or_default();
    if email.is_empty() {
        return Err(AppError::invalid_field("email", "This field is required."));
    }

    let valid = email
        .rsplit_once('@')
        .map(|(local, domain)| !local.is_empty() && domain.contains('.') && !domain.starts_with('.'))
        .unwrap_or(false);
    if !valid || email.contains(char::is_whitespace) {
        return Err(AppError::invalid_field("email", "Enter a valid email address."));
    }
    Ok(email)
}

fn validate_password(raw: Option<String>) -> Result<String, AppError> {
    let password = raw.unwrap_or_default();
    if password.is_empty() {
        return Err(AppError::invalid_field("password", "This field is required."));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::invalid_field(
            "password",
            format!(
                "Ensure this field has at least {} characters.",
                MIN_PASSWORD_LEN
            ),
        ));
    }
    Ok(password)
}

fn validate_user_name(raw: Option<String>) -> Result<String, AppError> {
    let name = raw.map(|n| n.trim().to_string()).unwrap_or_default();
    if name.is_empty() {
        return Err(AppError::invalid_field("name", "This field may not be blank."));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::invalid_field(
            "name",
            format!("Ensure this field has no more than {} characters.", MAX_NAME_LEN),
        ));
    }
    Ok(name)
}
