// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Recipe records.
//!
//! A recipe turns a list of input items into a list of output items. Item
//! references are identifiers owned by the item catalog service; this crate
//! never resolves them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Surrogate key of a recipe record.
///
/// Assigned by the store on insert, strictly increasing and never reused.
pub type RecipeId = i64;

/// One input or output line of a recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    /// Catalog identifier of the item.
    pub item_id: String,
    /// How many of the item are consumed or produced.
    pub amount: i32,
}

impl LineItem {
    /// Create a line item.
    pub fn new(item_id: impl Into<String>, amount: i32) -> Self {
        Self {
            item_id: item_id.into(),
            amount,
        }
    }
}

/// A stored recipe record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    /// Surrogate key; also the pagination cursor.
    pub id: RecipeId,
    /// Namespace the recipe belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace_id: Option<String>,
    /// Consumed items.
    #[serde(default)]
    pub inputs: Vec<LineItem>,
    /// Produced items.
    #[serde(default)]
    pub outputs: Vec<LineItem>,
    /// Required crafting level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crafting_level: Option<i32>,
    /// Crafting job able to craft the recipe.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crafting_job_id: Option<String>,
    /// Master book required to unlock the recipe.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub masterbook: Option<i32>,
    /// Required control stat.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_control: Option<i32>,
    /// Required craftsmanship stat.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_craftsmanship: Option<i32>,
    /// Difficulty stars.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stars: Option<i32>,
    /// When the record was inserted.
    pub created_at: DateTime<Utc>,
}

/// Writable fields of a recipe, used for create and full-replace update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeInput {
    /// Namespace the recipe belongs to.
    #[serde(default)]
    pub namespace_id: Option<String>,
    /// Consumed items.
    #[serde(default)]
    pub inputs: Vec<LineItem>,
    /// Produced items.
    #[serde(default)]
    pub outputs: Vec<LineItem>,
    /// Required crafting level.
    #[serde(default)]
    pub crafting_level: Option<i32>,
    /// Crafting job able to craft the recipe.
    #[serde(default)]
    pub crafting_job_id: Option<String>,
    /// Master book required to unlock the recipe.
    #[serde(default)]
    pub masterbook: Option<i32>,
    /// Required control stat.
    #[serde(default)]
    pub required_control: Option<i32>,
    /// Required craftsmanship stat.
    #[serde(default)]
    pub required_craftsmanship: Option<i32>,
    /// Difficulty stars.
    #[serde(default)]
    pub stars: Option<i32>,
}

impl RecipeInput {
    /// Check line items before they reach the store.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, lines) in [("inputs", &self.inputs), ("outputs", &self.outputs)] {
            for line in lines {
                if line.item_id.trim().is_empty() {
                    return Err(ValidationError::InvalidField {
                        field,
                        message: "item id must not be empty".to_string(),
                    });
                }
                if line.amount < 0 {
                    return Err(ValidationError::InvalidField {
                        field,
                        message: format!("amount must not be negative (got {})", line.amount),
                    });
                }
            }
        }
        Ok(())
    }

    /// Materialize the input as a stored record.
    pub fn into_recipe(self, id: RecipeId, created_at: DateTime<Utc>) -> Recipe {
        Recipe {
            id,
            namespace_id: self.namespace_id,
            inputs: self.inputs,
            outputs: self.outputs,
            crafting_level: self.crafting_level,
            crafting_job_id: self.crafting_job_id,
            masterbook: self.masterbook,
            required_control: self.required_control,
            required_craftsmanship: self.required_craftsmanship,
            stars: self.stars,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_well_formed_input() {
        let input = RecipeInput {
            inputs: vec![LineItem::new("ore", 2)],
            outputs: vec![LineItem::new("ingot", 1)],
            ..Default::default()
        };

        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_blank_item() {
        let input = RecipeInput {
            outputs: vec![LineItem::new("  ", 1)],
            ..Default::default()
        };

        let err = input.validate().unwrap_err();
        assert!(matches!(
            err,
            ValidationError::InvalidField {
                field: "outputs",
                ..
            }
        ));
    }

    #[test]
    fn test_validate_rejects_negative_amount() {
        let input = RecipeInput {
            inputs: vec![LineItem::new("ore", -3)],
            ..Default::default()
        };

        let err = input.validate().unwrap_err();
        assert!(err.to_string().contains("-3"));
    }

    #[test]
    fn test_recipe_serializes_camel_case_and_skips_empty_optionals() {
        let recipe = RecipeInput {
            inputs: vec![LineItem::new("ore", 2)],
            crafting_level: Some(15),
            ..Default::default()
        }
        .into_recipe(7, Utc::now());

        let json = serde_json::to_value(&recipe).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["craftingLevel"], 15);
        assert_eq!(json["inputs"][0]["itemId"], "ore");
        assert!(json.get("namespaceId").is_none());
        assert!(json.get("stars").is_none());
    }
}
