//! Catalog models: loanable items, their categories and locations

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Loanable piece of equipment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: i32,
    pub name: String,
    /// Free-form type label (e.g. "ski", "helmet")
    pub item_type: Option<String>,
    pub description: Option<String>,
    /// False while the item is out on an active rental
    pub available: bool,
    pub category_id: i32,
    pub location_id: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Category {
    pub id: i32,
    pub name: String,
}

/// Pickup location where items are stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Location {
    pub id: i32,
    pub name: String,
}

/// Catalog browsing filters; every field is optional and they combine with AND
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemQuery {
    pub category_id: Option<i32>,
    pub location_id: Option<i32>,
    pub available: Option<bool>,
    /// Case-insensitive match on name or description
    pub search: Option<String>,
}

impl ItemQuery {
    /// Whether `item` passes every filter set on this query
    pub fn matches(&self, item: &Item) -> bool {
        if self.category_id.is_some_and(|id| id != item.category_id) {
            return false;
        }
        if self.location_id.is_some_and(|id| id != item.location_id) {
            return false;
        }
        if self.available.is_some_and(|a| a != item.available) {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => {
                let needle = needle.to_lowercase();
                item.name.to_lowercase().contains(&needle)
                    || item
                        .description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&needle))
            }
            _ => true,
        }
    }
}

/// Create item request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateItem {
    #[validate(length(min = 1, max = 200, message = "Name must be 1 to 200 characters"))]
    pub name: String,
    pub item_type: Option<String>,
    pub description: Option<String>,
    pub category_id: i32,
    pub location_id: i32,
}

/// Update item request. Availability is not writable here.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItem {
    #[validate(length(min = 1, max = 200, message = "Name must be 1 to 200 characters"))]
    pub name: Option<String>,
    pub item_type: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<i32>,
    pub location_id: Option<i32>,
}

/// Create category or location request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateNamed {
    #[validate(length(min = 1, max = 100, message = "Name must be 1 to 100 characters"))]
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ski() -> Item {
        Item {
            id: 1,
            name: "Touring Ski".to_string(),
            item_type: Some("ski".to_string()),
            description: Some("Fischer, 170cm".to_string()),
            available: true,
            category_id: 2,
            location_id: 3,
        }
    }

    #[test]
    fn test_empty_query_matches_everything() {
        assert!(ItemQuery::default().matches(&ski()));
    }

    #[test]
    fn test_filters_combine() {
        let query = ItemQuery {
            category_id: Some(2),
            location_id: Some(3),
            available: Some(true),
            search: None,
        };
        assert!(query.matches(&ski()));

        let query = ItemQuery {
            location_id: Some(4),
            ..query
        };
        assert!(!query.matches(&ski()));
    }

    #[test]
    fn test_search_is_case_insensitive_on_name_and_description() {
        let by_name = ItemQuery {
            search: Some("touring".to_string()),
            ..Default::default()
        };
        assert!(by_name.matches(&ski()));

        let by_description = ItemQuery {
            search: Some("FISCHER".to_string()),
            ..Default::default()
        };
        assert!(by_description.matches(&ski()));

        let miss = ItemQuery {
            search: Some("snowboard".to_string()),
            ..Default::default()
        };
        assert!(!miss.matches(&ski()));
    }
}
