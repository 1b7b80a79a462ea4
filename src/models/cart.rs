use serde::Serialize;

use crate::models::product::{Product, ProductId};

/// One distinct product in the cart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartLineItem {
    pub identity: ProductId,
    pub name: String,
    pub brand: String,
    pub category: String,
    pub image_ref: String,
    pub unit_list_price: f64,
    pub unit_final_price: f64,
    pub quantity: u32,
}

impl CartLineItem {
    pub fn from_product(product: &Product) -> Self {
        Self {
            identity: product.id.clone(),
            name: product.name.clone(),
            brand: product.brand.clone(),
            category: product.category.clone(),
            image_ref: product.image_url.clone(),
            unit_list_price: product.list_price,
            unit_final_price: product.final_price,
            quantity: 1,
        }
    }

    pub fn list_total(&self) -> f64 {
        self.unit_list_price * f64::from(self.quantity)
    }

    pub fn final_total(&self) -> f64 {
        self.unit_final_price * f64::from(self.quantity)
    }

    /// Apply a signed change, never dropping below one.
    pub(crate) fn adjust_quantity(&mut self, delta: i64) -> bool {
        let next = i64::from(self.quantity)
            .saturating_add(delta)
            .clamp(1, i64::from(u32::MAX)) as u32;
        let changed = next != self.quantity;
        self.quantity = next;
        changed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct CartTotals {
    pub original_total: f64,
    pub discounted_total: f64,
    pub savings: f64,
}

impl CartTotals {
    pub fn from_items(items: &[CartLineItem]) -> Self {
        let original_total: f64 = items.iter().map(CartLineItem::list_total).sum();
        let discounted_total: f64 = items.iter().map(CartLineItem::final_total).sum();

        Self {
            original_total,
            discounted_total,
            savings: original_total - discounted_total,
        }
    }
}

/// Immutable view of the cart published to observers after each change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CartSnapshot {
    pub revision: u64,
    pub items: Vec<CartLineItem>,
}

impl CartSnapshot {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, identity: &ProductId) -> bool {
        self.items.iter().any(|item| &item.identity == identity)
    }

    /// Category of the most recently appended line, if it has one.
    pub fn last_category(&self) -> Option<&str> {
        self.items
            .last()
            .map(|item| item.category.trim())
            .filter(|category| !category.is_empty())
    }

    /// Badge count: total units across all lines.
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }
}
