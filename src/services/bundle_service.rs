use std::collections::HashSet;
use tracing::{debug, info};

use crate::{
    models::product::{Product, ProductId},
    services::cart_service::CartStore,
};

/// Addons offered next to a product ("frequently bought together").
pub const BUNDLE_ADDON_LIMIT: usize = 3;

/// What `commit` does with a bundle member that is already in the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BundleCommitPolicy {
    /// Leave the existing line untouched.
    #[default]
    SkipPresent,
    /// Go through `CartStore::add`, bumping the existing quantity.
    IncrementPresent,
}

/// Where the shopper lands after a bundle commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Cart,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BundleReceipt {
    pub added: Vec<ProductId>,
    pub skipped: Vec<ProductId>,
    pub total: f64,
    pub next_view: View,
}

/// Primary product plus toggleable addons for one product view.
#[derive(Debug, Clone)]
pub struct BundleBuilder {
    primary: Product,
    addons: Vec<Product>,
    selected: HashSet<ProductId>,
    policy: BundleCommitPolicy,
}

impl BundleBuilder {
    /// Keeps at most [`BUNDLE_ADDON_LIMIT`] addons, never the primary itself.
    pub fn new(primary: Product, addons: Vec<Product>) -> Self {
        let addons = addons
            .into_iter()
            .filter(|addon| addon.id != primary.id)
            .take(BUNDLE_ADDON_LIMIT)
            .collect();

        Self {
            primary,
            addons,
            selected: HashSet::new(),
            policy: BundleCommitPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: BundleCommitPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn primary(&self) -> &Product {
        &self.primary
    }

    pub fn addons(&self) -> &[Product] {
        &self.addons
    }

    pub fn is_selected(&self, identity: &ProductId) -> bool {
        self.selected.contains(identity)
    }

    /// Flip an addon in or out. Returns the new state, or `None` when the id
    /// is not one of the offered addons.
    pub fn toggle(&mut self, identity: &ProductId) -> Option<bool> {
        if !self.addons.iter().any(|addon| &addon.id == identity) {
            debug!("Bundle: {} is not an offered addon", identity);
            return None;
        }

        let selected = if self.selected.remove(identity) {
            false
        } else {
            self.selected.insert(identity.clone());
            true
        };
        debug!("Bundle: {} selected = {}", identity, selected);
        Some(selected)
    }

    /// Selected addons in offer order.
    pub fn selected_addons(&self) -> impl Iterator<Item = &Product> {
        self.addons
            .iter()
            .filter(|addon| self.selected.contains(&addon.id))
    }

    pub fn compute_total(&self) -> f64 {
        self.primary.final_price
            + self
                .selected_addons()
                .map(|addon| addon.final_price)
                .sum::<f64>()
    }

    /// Number of products a commit would put in the cart.
    pub fn item_count(&self) -> usize {
        1 + self.selected.len()
    }

    /// Push the primary and every selected addon into `cart` as one batch.
    pub fn commit(&self, cart: &mut CartStore) -> BundleReceipt {
        let total = self.compute_total();
        let mut added = Vec::new();
        let mut skipped = Vec::new();

        for product in std::iter::once(&self.primary).chain(self.selected_addons()) {
            if self.policy == BundleCommitPolicy::SkipPresent && cart.contains(&product.id) {
                skipped.push(product.id.clone());
                continue;
            }
            cart.add(product);
            added.push(product.id.clone());
        }

        info!(
            "Bundle for {} committed: {} added, {} already in cart",
            self.primary.id,
            added.len(),
            skipped.len()
        );

        BundleReceipt {
            added,
            skipped,
            total,
            next_view: View::Cart,
        }
    }
}
