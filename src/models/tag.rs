//! Tag and ingredient models.
//!
//! Both are per-user named labels attached to recipes, and share one wire shape.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A tag for categorizing recipes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

/// An ingredient used by recipes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Ingredient {
    pub id: i64,
    pub name: String,
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl fmt::Display for Ingredient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Nested tag or ingredient in a recipe payload, matched by name.
#[derive(Debug, Clone, Deserialize)]
pub struct NamedInput {
    pub name: String,
}

/// Request body for renaming a tag or ingredient.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateNameRequest {
    #[serde(default)]
    pub name: Option<String>,
}

/// Query parameters for listing tags or ingredients.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttributeListQuery {
    /// `1` restricts the listing to entries attached to at least one recipe.
    #[serde(default)]
    pub assigned_only: Option<String>,
}

impl AttributeListQuery {
    pub fn assigned_only(&self) -> bool {
        matches!(
            self.assigned_only.as_deref().map(str::trim),
            Some("1") | Some("true") | Some("True")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_name() {
        let tag = Tag {
            id: 1,
            name: "Vegan".to_string(),
        };
        let ingredient = Ingredient {
            id: 2,
            name: "Cucumber".to_string(),
        };
        assert_eq!(tag.to_string(), "Vegan");
        assert_eq!(ingredient.to_string(), "Cucumber");
    }

    #[test]
    fn test_assigned_only_flag() {
        let on = AttributeListQuery {
            assigned_only: Some("1".to_string()),
        };
        let off = AttributeListQuery {
            assigned_only: Some("0".to_string()),
        };
        assert!(on.assigned_only());
        assert!(!off.assigned_only());
        assert!(!AttributeListQuery::default().assigned_only());
    }
}
