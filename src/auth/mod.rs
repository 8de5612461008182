//! Token-based authentication module.
//!
//! Passwords are stored as Argon2id PHC strings. API clients exchange credentials
//! for a per-user token and send it as `Authorization: Token <key>`.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use rand::{thread_rng, Rng};

use crate::errors::AppError;
use crate::models::User;
use crate::AppState;

/// Scheme accepted in the `Authorization` header.
pub const TOKEN_SCHEME: &str = "Token";

/// Token keys are hex-encoded random bytes.
const TOKEN_BYTES: usize = 20;

/// The authenticated user, inserted into request extensions by [`token_auth_layer`].
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

/// Hash a password with Argon2id on the blocking pool.
pub async fn hash_password(password: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || -> Result<String, AppError> {
        let salt = SaltString::generate(&mut thread_rng());
        let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
        Ok(hash.to_string())
    })
    .await?
}

/// Check a password against a stored hash. A malformed hash never verifies.
pub async fn verify_password(password: String, hash: String) -> Result<bool, AppError> {
    let verified = tokio::task::spawn_blocking(move || {
        let Ok(parsed) = PasswordHash::new(&hash) else {
            tracing::warn!("Stored password hash is not a valid PHC string");
            return false;
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    })
    .await?;

    Ok(verified)
}

/// Generate a new 40 character token key.
pub fn generate_token_key() -> String {
    let bytes: [u8; TOKEN_BYTES] = thread_rng().gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Pull the token key out of an `Authorization` header value.
///
/// Accepts `Token <key>` and, for clients that only speak bearer auth, `Bearer <key>`.
fn parse_authorization(value: &str) -> Option<&str> {
    let (scheme, key) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case(TOKEN_SCHEME) && !scheme.eq_ignore_ascii_case("Bearer") {
        return None;
    }
    let key = key.trim();
    if key.is_empty() || key.contains(' ') {
        return None;
    }
    Some(key)
}

/// Token authentication layer. Rejects the request with 401 unless it carries a
/// token belonging to an active user.
pub async fn token_auth_layer(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let key = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_authorization)
        .map(|s| s.to_string());

    let Some(key) = key else {
        return AppError::Unauthorized("Authentication credentials were not provided.".to_string())
            .into_response();
    };

    match state.repo.get_user_by_token(&key).await {
        Ok(Some(user)) if user.is_active => {
            request.extensions_mut().insert(AuthUser(user));
            next.run(request).await
        }
        Ok(Some(_)) => {
            AppError::Unauthorized("User inactive or deleted.".to_string()).into_response()
        }
        Ok(None) => AppError::Unauthorized("Invalid token.".to_string()).into_response(),
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_and_verify_password() {
        let hash = hash_password("Testpass123".to_string()).await.unwrap();

        assert_ne!(hash, "Testpass123");
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("Testpass123".to_string(), hash.clone())
            .await
            .unwrap());
        assert!(!verify_password("wrong".to_string(), hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_verify_against_garbage_hash() {
        assert!(!verify_password("pw".to_string(), "plain".to_string())
            .await
            .unwrap());
    }

    #[test]
    fn test_token_key_format() {
        let key = generate_token_key();
        assert_eq!(key.len(), 40);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(key, generate_token_key());
    }

    #[test]
    fn test_parse_authorization() {
        assert_eq!(parse_authorization("Token abc123"), Some("abc123"));
        assert_eq!(parse_authorization("token abc123"), Some("abc123"));
        assert_eq!(parse_authorization("Bearer abc123"), Some("abc123"));
        assert_eq!(parse_authorization("Basic abc123"), None);
        assert_eq!(parse_authorization("Token"), None);
        assert_eq!(parse_authorization("Token a b"), None);
    }
}
