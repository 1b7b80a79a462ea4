use tokio::sync::watch;
use tracing::{debug, info};

use crate::models::{
    cart::{CartLineItem, CartSnapshot, CartTotals},
    product::{Product, ProductId},
};

/// In-memory owner of the shopper's line items.
///
/// Constructed once per shopping session and handed to whoever needs it;
/// mutations are synchronous and each one that touches a line publishes a
/// fresh [`CartSnapshot`] to every subscriber.
pub struct CartStore {
    items: Vec<CartLineItem>,
    revision: u64,
    sender: watch::Sender<CartSnapshot>,
}

impl Default for CartStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CartStore {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(CartSnapshot::default());
        Self {
            items: Vec::new(),
            revision: 0,
            sender,
        }
    }

    /// Receive a snapshot after every change. The receiver starts at the
    /// current state, already marked as seen.
    pub fn subscribe(&self) -> watch::Receiver<CartSnapshot> {
        self.sender.subscribe()
    }

    /// Add one unit of `product`; a product already in the cart gets its
    /// quantity bumped instead of a second line. Returns the new quantity.
    pub fn add(&mut self, product: &Product) -> u32 {
        let quantity = match self.position(&product.id) {
            Some(index) => {
                let item = &mut self.items[index];
                item.adjust_quantity(1);
                item.quantity
            }
            None => {
                self.items.push(CartLineItem::from_product(product));
                1
            }
        };

        info!("Cart: {} x{} ({})", product.id, quantity, product.name);
        self.publish();
        quantity
    }

    /// Shift a line's quantity by `delta`, clamped at 1. Unknown identities
    /// are ignored. Reaching the floor never removes the line.
    pub fn set_quantity(&mut self, identity: &ProductId, delta: i64) -> Option<u32> {
        let index = self.position(identity)?;
        let item = &mut self.items[index];
        item.adjust_quantity(delta);
        let quantity = item.quantity;

        debug!("Cart: {} quantity now {}", identity, quantity);
        self.publish();
        Some(quantity)
    }

    pub fn remove(&mut self, identity: &ProductId) -> bool {
        let Some(index) = self.position(identity) else {
            debug!("Cart: remove ignored, {} not present", identity);
            return false;
        };

        self.items.remove(index);
        info!("Cart: removed {}", identity);
        self.publish();
        true
    }

    pub fn clear(&mut self) {
        if self.items.is_empty() {
            return;
        }
        self.items.clear();
        info!("Cart: cleared");
        self.publish();
    }

    /// Recomputed from the current lines on every call.
    pub fn totals(&self) -> CartTotals {
        CartTotals::from_items(&self.items)
    }

    pub fn items(&self) -> &[CartLineItem] {
        &self.items
    }

    pub fn get(&self, identity: &ProductId) -> Option<&CartLineItem> {
        self.items.iter().find(|item| &item.identity == identity)
    }

    pub fn contains(&self, identity: &ProductId) -> bool {
        self.position(identity).is_some()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total units, as shown on the cart badge.
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    pub fn last_added(&self) -> Option<&CartLineItem> {
        self.items.last()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn snapshot(&self) -> CartSnapshot {
        CartSnapshot {
            revision: self.revision,
            items: self.items.clone(),
        }
    }

    fn position(&self, identity: &ProductId) -> Option<usize> {
        self.items.iter().position(|item| &item.identity == identity)
    }

    fn publish(&mut self) {
        self.revision += 1;
        self.sender.send_replace(self.snapshot());
    }
}
