//! Product Model

use serde::{Deserialize, Serialize};

/// Product entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    /// Category reference (String ID)
    pub category_id: String,
    pub name: String,
    pub price: f64,
    pub is_active: bool,
    /// Weekday names ("Sun".."Sat") the product is sold on. Empty means
    /// every day.
    #[serde(default)]
    pub available_days: Vec<String>,
    /// Manual availability toggle. `Some(false)` hides the product
    /// regardless of weekday; `None` means never toggled.
    pub is_available_now: Option<bool>,
}

/// Create product payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductCreate {
    pub category_id: String,
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub available_days: Vec<String>,
}

/// Update product payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub is_active: Option<bool>,
    pub available_days: Option<Vec<String>>,
    pub is_available_now: Option<bool>,
}
