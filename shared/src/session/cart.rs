//! Cart line items and cart mutations

use serde::{Deserialize, Serialize};
use validator::Validate;

/// A cart line. Present entries always have `quantity > 0`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    #[validate(length(min = 1, message = "menuItemId is required"))]
    pub menu_item_id: String,
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[validate(range(min = 0.0, message = "price must not be negative"))]
    pub price: f64,
    #[validate(range(min = 0, message = "quantity must not be negative"))]
    pub quantity: i32,
    #[serde(default)]
    pub category_id: String,
}

impl CartItem {
    /// Price of the whole line
    pub fn line_total(&self) -> f64 {
        self.price * self.quantity as f64
    }
}

/// Item detail supplied with an add.
///
/// Only `menu_item_id` is needed when the item is already in the cart; the
/// first add of an item must carry name, price and category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CartItemInput {
    pub menu_item_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
}

impl CartItemInput {
    pub fn id_only(menu_item_id: impl Into<String>) -> Self {
        Self {
            menu_item_id: menu_item_id.into(),
            ..Default::default()
        }
    }

    pub fn full(
        menu_item_id: impl Into<String>,
        name: impl Into<String>,
        price: f64,
        category_id: impl Into<String>,
    ) -> Self {
        Self {
            menu_item_id: menu_item_id.into(),
            name: Some(name.into()),
            price: Some(price),
            category_id: Some(category_id.into()),
        }
    }
}

/// One cart edit, applied against the cart as currently stored
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum CartMutation {
    /// Increment an existing line or append a new one
    Add { item: CartItemInput, quantity: i32 },
    /// Decrement a line, dropping it at zero; absent items are ignored
    Subtract { menu_item_id: String, quantity: i32 },
    /// Drop one line
    Remove { menu_item_id: String },
    /// Drop every line
    Clear,
}

impl CartMutation {
    /// The menu item this mutation targets, if any
    pub fn menu_item_id(&self) -> Option<&str> {
        match self {
            CartMutation::Add { item, .. } => Some(item.menu_item_id.as_str()),
            CartMutation::Subtract { menu_item_id, .. } | CartMutation::Remove { menu_item_id } => {
                Some(menu_item_id.as_str())
            }
            CartMutation::Clear => None,
        }
    }
}
