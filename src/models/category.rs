//! This file defines the `Category` type. A category acts like a tag for a
//! transaction, however a transaction may only have one category.

use serde::{Deserialize, Serialize};

/// The ID of a category, assigned by the remote service.
pub type CategoryId = i64;

/// The kind of transactions a category may be applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryType {
    /// The category only applies to income transactions.
    Income,
    /// The category only applies to expense transactions.
    Expense,
    /// The category applies to both kinds of transaction.
    Both,
}

/// A category for expenses and income, e.g., 'Groceries', 'Eating Out',
/// 'Wages'.
///
/// Category names are unique per user. Categories are created by user action
/// or implicitly during CSV import when a row names a category that does not
/// exist yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    /// The ID of the category.
    pub id: CategoryId,
    /// The name of the category, unique per user.
    pub name: String,
    /// A display hint, e.g., "#4caf50".
    pub color: String,
    /// A display hint, e.g., an icon name.
    pub icon: String,
    /// The kind of transactions this category may be applied to.
    #[serde(rename = "type")]
    pub category_type: CategoryType,
    /// Whether this is one of the built-in categories every user starts
    /// with. Default categories cannot be deleted.
    #[serde(default)]
    pub is_default: bool,
}

/// The fields the user supplies when creating or editing a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDraft {
    /// The name of the category.
    pub name: String,
    /// A display hint, e.g., "#4caf50".
    pub color: String,
    /// A display hint, e.g., an icon name.
    pub icon: String,
    /// The kind of transactions this category may be applied to.
    #[serde(rename = "type")]
    pub category_type: CategoryType,
}
