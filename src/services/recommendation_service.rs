use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{
    api::repositories::CatalogRepository,
    models::{cart::CartSnapshot, product::Product},
};

pub const DEFAULT_RECOMMENDATION_LIMIT: usize = 4;

/// "You might be interested in" list derived from the cart.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecommendationSet {
    /// Ticket of the trigger that produced `items`.
    pub ticket: u64,
    pub cart_revision: u64,
    pub items: Vec<Product>,
    pub loading: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Applied(usize),
    Cleared,
    Stale,
    Failed,
}

/// Keeps a bounded recommendation list in step with the cart.
///
/// Every trigger draws a ticket from a monotonically increasing counter. A
/// result is only written back if its ticket is still the newest one issued,
/// so a slow response for an older cart can never replace the answer for a
/// newer one. Tickets are issued in cart revision order: a snapshot older
/// than one already seen is refused before it draws a ticket.
pub struct RecommendationService {
    catalog: Arc<dyn CatalogRepository>,
    limit: usize,
    issued: AtomicU64,
    newest_revision: AtomicU64,
    state: RwLock<RecommendationSet>,
}

impl RecommendationService {
    pub fn new(catalog: Arc<dyn CatalogRepository>, limit: usize) -> Self {
        Self {
            catalog,
            limit: limit.max(1),
            issued: AtomicU64::new(0),
            newest_revision: AtomicU64::new(0),
            state: RwLock::new(RecommendationSet::default()),
        }
    }

    pub async fn current(&self) -> RecommendationSet {
        self.state.read().await.clone()
    }

    /// Recompute recommendations for `snapshot`.
    pub async fn refresh(&self, snapshot: &CartSnapshot) -> RefreshOutcome {
        // Issuing under the write lock keeps revision checks and tickets in one order.
        let mut state = self.state.write().await;
        if snapshot.revision < self.newest_revision.load(Ordering::SeqCst) {
            debug!(
                "Ignoring cart rev {} behind rev {}",
                snapshot.revision,
                self.newest_revision.load(Ordering::SeqCst)
            );
            return RefreshOutcome::Stale;
        }
        self.newest_revision.store(snapshot.revision, Ordering::SeqCst);
        let ticket = self.issued.fetch_add(1, Ordering::SeqCst) + 1;

        let Some(category) = snapshot.last_category() else {
            *state = RecommendationSet {
                ticket,
                cart_revision: snapshot.revision,
                items: Vec::new(),
                loading: false,
            };
            debug!("Recommendations cleared (ticket {})", ticket);
            return RefreshOutcome::Cleared;
        };

        state.loading = true;
        drop(state);

        debug!(
            "Fetching recommendations for '{}' (ticket {}, cart rev {})",
            category, ticket, snapshot.revision
        );
        let result = self.catalog.find_by_category(category, self.limit).await;

        let mut state = self.state.write().await;
        if !self.is_latest(ticket) {
            debug!("Discarding stale recommendations for ticket {}", ticket);
            return RefreshOutcome::Stale;
        }
        state.loading = false;

        match result {
            Ok(candidates) => {
                let items: Vec<Product> = candidates
                    .into_iter()
                    .filter(|product| !snapshot.contains(&product.id))
                    .collect();
                let count = items.len();

                *state = RecommendationSet {
                    ticket,
                    cart_revision: snapshot.revision,
                    items,
                    loading: false,
                };
                info!("Recommendations updated: {} items for '{}'", count, category);
                RefreshOutcome::Applied(count)
            }
            Err(e) => {
                warn!("Error fetching recommendations for '{}': {}", category, e);
                RefreshOutcome::Failed
            }
        }
    }

    /// Refresh on every cart snapshot until the cart is dropped. Each refresh
    /// runs as its own task so a slow request never delays a newer one; tasks
    /// that start out of order are sorted out by revision.
    pub fn spawn_listener(self: Arc<Self>, mut receiver: watch::Receiver<CartSnapshot>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while receiver.changed().await.is_ok() {
                let snapshot = receiver.borrow_and_update().clone();
                let service = Arc::clone(&self);
                tokio::spawn(async move {
                    service.refresh(&snapshot).await;
                });
            }
            debug!("Cart closed, recommendation listener stopping");
        })
    }

    fn is_latest(&self, ticket: u64) -> bool {
        self.issued.load(Ordering::SeqCst) == ticket
    }
}
