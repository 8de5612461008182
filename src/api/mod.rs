//! REST API module.
//!
//! Contains all API routes and handlers. Success bodies are the bare resource;
//! failures use the error envelope from [`crate::errors`].

mod ingredients;
mod recipes;
mod tags;
mod users;

pub use ingredients::*;
pub use recipes::*;
pub use tags::*;
pub use users::*;

use axum::extract::FromRequest;

use crate::errors::AppError;

/// Handler result type.
pub type ApiResult<T> = Result<T, AppError>;

/// JSON body extractor that reports malformed bodies through [`AppError`].
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);
