//! Catalog service - menu categories and products
//!
//! The order engine consumes this read-only: `resolve_available` turns an
//! item name into a priced product, or a validation error the operator can
//! read. Management operations (add/toggle/update/delete) are plain data
//! entry on top of the same store.
//!
//! A lowercase name index is cached in memory so per-keystroke lookups from
//! the order screen never scan the product table.

use parking_lot::RwLock;
use shared::models::{Category, CategoryCreate, Product, ProductCreate, ProductUpdate};
use shared::util::{new_id, now_millis};
use std::collections::HashMap;

use crate::orders::PosStorage;
use crate::utils::validation::{MAX_NAME_LEN, validate_positive_amount, validate_required_text};
use crate::utils::{AppError, AppResult};
use crate::utils::time::today_name;

/// Availability verdict for a product
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    Available,
    /// Hidden via the manual toggle
    ManualToggle,
    /// Not sold on the given weekday
    WrongDay { allowed: Vec<String> },
}

impl Availability {
    pub fn reason(&self) -> String {
        match self {
            Availability::Available => String::new(),
            Availability::ManualToggle => "Manual Toggle".to_string(),
            Availability::WrongDay { allowed } => format!("Only on {}", allowed.join(", ")),
        }
    }
}

/// Check a product's availability for a given weekday name.
///
/// Available iff the manual toggle is not off AND (no day restriction OR
/// the day is listed).
pub fn check_availability_on(product: &Product, day: &str) -> Availability {
    if product.is_available_now == Some(false) {
        return Availability::ManualToggle;
    }
    if !product.available_days.is_empty() && !product.available_days.iter().any(|d| d == day) {
        return Availability::WrongDay {
            allowed: product.available_days.clone(),
        };
    }
    Availability::Available
}

pub struct CatalogService {
    storage: PosStorage,
    /// lowercase product name -> product id
    name_index: RwLock<HashMap<String, String>>,
}

impl CatalogService {
    /// Build the service and warm the name index from the store.
    pub fn new(storage: PosStorage) -> AppResult<Self> {
        let mut index = HashMap::new();
        for product in storage.get_all_products()? {
            index.insert(product.name.to_lowercase(), product.id.clone());
        }
        Ok(Self {
            storage,
            name_index: RwLock::new(index),
        })
    }

    // ========== Categories ==========

    /// Add a category. Names are trimmed, required, and unique
    /// (case-insensitive).
    pub fn add_category(&self, payload: CategoryCreate) -> AppResult<Category> {
        let name = payload.name.trim().to_string();
        validate_required_text(&name, "category name", MAX_NAME_LEN)?;

        let duplicate = self
            .storage
            .get_all_categories()?
            .into_iter()
            .any(|c| c.name.eq_ignore_ascii_case(&name));
        if duplicate {
            return Err(AppError::conflict(format!(
                "Category already exists: {name}"
            )));
        }

        let now = now_millis();
        let category = Category {
            id: new_id(),
            name,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        let txn = self.storage.begin_write()?;
        self.storage.put_category(&txn, &category)?;
        txn.commit().map_err(crate::orders::StorageError::from)?;
        Ok(category)
    }

    /// All categories, sorted by name
    pub fn list_categories(&self) -> AppResult<Vec<Category>> {
        let mut categories = self.storage.get_all_categories()?;
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    /// Flip the active flag (soft delete)
    pub fn toggle_category(&self, category_id: &str) -> AppResult<Category> {
        let mut category = self
            .storage
            .get_category(category_id)?
            .ok_or_else(|| AppError::not_found(format!("Category not found: {category_id}")))?;
        category.is_active = !category.is_active;
        category.updated_at = now_millis();

        let txn = self.storage.begin_write()?;
        self.storage.put_category(&txn, &category)?;
        txn.commit().map_err(crate::orders::StorageError::from)?;
        Ok(category)
    }

    // ========== Products ==========

    pub fn add_product(&self, payload: ProductCreate) -> AppResult<Product> {
        validate_required_text(&payload.name, "item name", MAX_NAME_LEN)?;
        validate_positive_amount(payload.price, "price")?;
        if self.storage.get_category(&payload.category_id)?.is_none() {
            return Err(AppError::not_found(format!(
                "Category not found: {}",
                payload.category_id
            )));
        }

        let product = Product {
            id: new_id(),
            category_id: payload.category_id,
            name: payload.name.trim().to_string(),
            price: payload.price,
            is_active: true,
            available_days: payload.available_days,
            is_available_now: None,
        };
        let txn = self.storage.begin_write()?;
        self.storage.put_product(&txn, &product)?;
        txn.commit().map_err(crate::orders::StorageError::from)?;

        self.name_index
            .write()
            .insert(product.name.to_lowercase(), product.id.clone());
        Ok(product)
    }

    /// Active products of a category
    pub fn products_by_category(&self, category_id: &str) -> AppResult<Vec<Product>> {
        Ok(self
            .storage
            .get_all_products()?
            .into_iter()
            .filter(|p| p.category_id == category_id && p.is_active)
            .collect())
    }

    pub fn list_products(&self) -> AppResult<Vec<Product>> {
        Ok(self.storage.get_all_products()?)
    }

    pub fn update_product(&self, product_id: &str, payload: ProductUpdate) -> AppResult<Product> {
        let mut product = self
            .storage
            .get_product(product_id)?
            .ok_or_else(|| AppError::not_found(format!("Product not found: {product_id}")))?;
        let old_name = product.name.clone();

        if let Some(name) = payload.name {
            validate_required_text(&name, "item name", MAX_NAME_LEN)?;
            product.name = name.trim().to_string();
        }
        if let Some(price) = payload.price {
            validate_positive_amount(price, "price")?;
            product.price = price;
        }
        if let Some(is_active) = payload.is_active {
            product.is_active = is_active;
        }
        if let Some(days) = payload.available_days {
            product.available_days = days;
        }
        if let Some(now_flag) = payload.is_available_now {
            product.is_available_now = Some(now_flag);
        }

        let txn = self.storage.begin_write()?;
        self.storage.put_product(&txn, &product)?;
        txn.commit().map_err(crate::orders::StorageError::from)?;

        if old_name != product.name {
            let mut index = self.name_index.write();
            index.remove(&old_name.to_lowercase());
            index.insert(product.name.to_lowercase(), product.id.clone());
        }
        Ok(product)
    }

    pub fn delete_product(&self, product_id: &str) -> AppResult<()> {
        let Some(product) = self.storage.get_product(product_id)? else {
            return Err(AppError::not_found(format!(
                "Product not found: {product_id}"
            )));
        };

        let txn = self.storage.begin_write()?;
        self.storage.remove_product(&txn, product_id)?;
        txn.commit().map_err(crate::orders::StorageError::from)?;

        self.name_index.write().remove(&product.name.to_lowercase());
        Ok(())
    }

    // ========== Order-engine lookups ==========

    /// Case-insensitive product lookup by name
    pub fn find_product_by_name(&self, name: &str) -> AppResult<Option<Product>> {
        let id = self.name_index.read().get(&name.to_lowercase()).cloned();
        match id {
            Some(id) => Ok(self.storage.get_product(&id)?),
            None => Ok(None),
        }
    }

    /// Resolve an item name to a product the table may order right now.
    /// This is the caller-side gate in front of `add_item`: no order state
    /// is touched when it fails.
    pub fn resolve_available(&self, name: &str) -> AppResult<Product> {
        let product = self
            .find_product_by_name(name)?
            .ok_or_else(|| AppError::validation("Item not found in menu"))?;
        match check_availability_on(&product, today_name()) {
            Availability::Available => Ok(product),
            verdict => Err(AppError::validation(format!(
                "Unavailable: {}",
                verdict.reason()
            ))),
        }
    }

    /// Display name of a product's category ("Manual" when the category is
    /// gone, matching the denormalized snapshot the line item keeps).
    pub fn category_label(&self, product: &Product) -> AppResult<String> {
        Ok(self
            .storage
            .get_category(&product.category_id)?
            .map(|c| c.name)
            .unwrap_or_else(|| "Manual".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> CatalogService {
        CatalogService::new(PosStorage::open_in_memory().unwrap()).unwrap()
    }

    fn seed_category(service: &CatalogService, name: &str) -> Category {
        service
            .add_category(CategoryCreate {
                name: name.to_string(),
            })
            .unwrap()
    }

    fn seed_product(service: &CatalogService, category_id: &str, name: &str, price: f64) -> Product {
        service
            .add_product(ProductCreate {
                category_id: category_id.to_string(),
                name: name.to_string(),
                price,
                available_days: vec![],
            })
            .unwrap()
    }

    #[test]
    fn test_category_names_are_unique_case_insensitive() {
        let service = service();
        seed_category(&service, "Drinks");
        let err = service
            .add_category(CategoryCreate {
                name: " drinks ".to_string(),
            })
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[test]
    fn test_blank_category_rejected() {
        let service = service();
        let err = service
            .add_category(CategoryCreate {
                name: "   ".to_string(),
            })
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_categories_listed_sorted() {
        let service = service();
        seed_category(&service, "Sides");
        seed_category(&service, "Drinks");
        let names: Vec<_> = service
            .list_categories()
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Drinks", "Sides"]);
    }

    #[test]
    fn test_toggle_category() {
        let service = service();
        let category = seed_category(&service, "Drinks");
        let toggled = service.toggle_category(&category.id).unwrap();
        assert!(!toggled.is_active);
        let toggled = service.toggle_category(&category.id).unwrap();
        assert!(toggled.is_active);
    }

    #[test]
    fn test_product_price_must_be_positive() {
        let service = service();
        let category = seed_category(&service, "Drinks");
        let err = service
            .add_product(ProductCreate {
                category_id: category.id.clone(),
                name: "Coke".to_string(),
                price: 0.0,
                available_days: vec![],
            })
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_products_by_category_excludes_inactive() {
        let service = service();
        let category = seed_category(&service, "Drinks");
        let coke = seed_product(&service, &category.id, "Coke", 2.5);
        seed_product(&service, &category.id, "Tea", 1.5);

        service
            .update_product(
                &coke.id,
                ProductUpdate {
                    name: None,
                    price: None,
                    is_active: Some(false),
                    available_days: None,
                    is_available_now: None,
                },
            )
            .unwrap();

        let names: Vec<_> = service
            .products_by_category(&category.id)
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Tea"]);
    }

    #[test]
    fn test_find_product_by_name_case_insensitive() {
        let service = service();
        let category = seed_category(&service, "Drinks");
        seed_product(&service, &category.id, "Coke", 2.5);

        assert!(service.find_product_by_name("COKE").unwrap().is_some());
        assert!(service.find_product_by_name("Pepsi").unwrap().is_none());
    }

    #[test]
    fn test_availability_manual_toggle_wins() {
        let mut product = Product {
            id: "p1".into(),
            category_id: "c1".into(),
            name: "Paella".into(),
            price: 12.0,
            is_active: true,
            available_days: vec![],
            is_available_now: Some(false),
        };
        assert_eq!(
            check_availability_on(&product, "Mon"),
            Availability::ManualToggle
        );

        product.is_available_now = Some(true);
        assert_eq!(
            check_availability_on(&product, "Mon"),
            Availability::Available
        );
    }

    #[test]
    fn test_availability_day_restriction() {
        let product = Product {
            id: "p1".into(),
            category_id: "c1".into(),
            name: "Sunday Roast".into(),
            price: 15.0,
            is_active: true,
            available_days: vec!["Sun".into()],
            is_available_now: None,
        };
        assert_eq!(
            check_availability_on(&product, "Sun"),
            Availability::Available
        );
        let verdict = check_availability_on(&product, "Wed");
        assert_eq!(verdict.reason(), "Only on Sun");
    }

    #[test]
    fn test_resolve_unknown_item_is_validation_error() {
        let service = service();
        let err = service.resolve_available("Ghost Burger").unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
