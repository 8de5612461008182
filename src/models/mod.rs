//! Data models for the recipe backend.
//!
//! Wire shapes use snake_case field names throughout.

mod price;
mod recipe;
mod tag;
mod user;

pub use price::*;
pub use recipe::*;
pub use tag::*;
pub use user::*;
