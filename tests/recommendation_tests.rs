use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use retailx_storefront::api::repositories::{CatalogRepository, CatalogRepositoryError};
use retailx_storefront::models::product::{Product, ProductDetail, ProductId};
use retailx_storefront::services::cart_service::CartStore;
use retailx_storefront::services::recommendation_service::{
    RecommendationService, RecommendationSet, RefreshOutcome,
};

/// Catalog whose answers for one category are held back until released.
struct GatedCatalog {
    products: Vec<Product>,
    gated_category: String,
    entered: Notify,
    release: Notify,
}

impl GatedCatalog {
    fn new(products: Vec<Product>, gated_category: &str) -> Self {
        Self {
            products,
            gated_category: gated_category.to_string(),
            entered: Notify::new(),
            release: Notify::new(),
        }
    }
}

#[async_trait]
impl CatalogRepository for GatedCatalog {
    async fn find_by_category(
        &self,
        category: &str,
        limit: usize,
    ) -> Result<Vec<Product>, CatalogRepositoryError> {
        if category == self.gated_category {
            self.entered.notify_one();
            self.release.notified().await;
        }
        Ok(self
            .products
            .iter()
            .filter(|p| p.category == category)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, _id: &ProductId) -> Result<Option<ProductDetail>, CatalogRepositoryError> {
        Ok(None)
    }

    async fn search(&self, _query: &str) -> Result<Vec<Product>, CatalogRepositoryError> {
        Ok(Vec::new())
    }
}

fn catalog() -> Vec<Product> {
    vec![
        Product::new("shoe-a", "Runner", "Shoes", 100.0, 80.0),
        Product::new("shoe-b", "Trail", "Shoes", 120.0, 90.0),
        Product::new("shoe-c", "Court", "Shoes", 90.0, 90.0),
        Product::new("shoe-d", "Sandal", "Shoes", 40.0, 30.0),
        Product::new("book-x", "Rust in Action", "Books", 50.0, 45.0),
        Product::new("book-y", "Zero to Prod", "Books", 60.0, 55.0),
    ]
}

fn ids(set: &RecommendationSet) -> Vec<String> {
    set.items.iter().map(|p| p.id.to_string()).collect()
}

async fn wait_for<F>(service: &RecommendationService, predicate: F) -> RecommendationSet
where
    F: Fn(&RecommendationSet) -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        let current = service.current().await;
        if predicate(&current) {
            return current;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "recommendations never settled: {:?}",
            ids(&current)
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn test_category_of_last_item_excludes_cart_members() {
    let repo = Arc::new(GatedCatalog::new(catalog(), "none"));
    let service = RecommendationService::new(repo, 4);

    let mut cart = CartStore::new();
    cart.add(&Product::new("book-x", "Rust in Action", "Books", 50.0, 45.0));
    cart.add(&Product::new("shoe-a", "Runner", "Shoes", 100.0, 80.0));

    assert_eq!(service.refresh(&cart.snapshot()).await, RefreshOutcome::Applied(3));
    assert_eq!(ids(&service.current().await), vec!["shoe-b", "shoe-c", "shoe-d"]);
}

#[tokio::test]
async fn test_slow_older_response_is_discarded() {
    let repo = Arc::new(GatedCatalog::new(catalog(), "Shoes"));
    let service = Arc::new(RecommendationService::new(repo.clone(), 4));

    let mut cart = CartStore::new();
    cart.add(&Product::new("shoe-a", "Runner", "Shoes", 100.0, 80.0));
    let first = cart.snapshot();

    let slow = {
        let service = Arc::clone(&service);
        tokio::spawn(async move { service.refresh(&first).await })
    };
    repo.entered.notified().await;

    cart.add(&Product::new("book-x", "Rust in Action", "Books", 50.0, 45.0));
    assert_eq!(service.refresh(&cart.snapshot()).await, RefreshOutcome::Applied(1));
    assert_eq!(ids(&service.current().await), vec!["book-y"]);

    repo.release.notify_one();
    assert_eq!(slow.await.unwrap(), RefreshOutcome::Stale);

    let current = service.current().await;
    assert_eq!(ids(&current), vec!["book-y"]);
    assert_eq!(current.cart_revision, cart.revision());
    assert!(!current.loading);
}

#[tokio::test]
async fn test_clear_wins_over_in_flight_request() {
    let repo = Arc::new(GatedCatalog::new(catalog(), "Shoes"));
    let service = Arc::new(RecommendationService::new(repo.clone(), 4));

    let mut cart = CartStore::new();
    cart.add(&Product::new("shoe-a", "Runner", "Shoes", 100.0, 80.0));
    let first = cart.snapshot();

    let slow = {
        let service = Arc::clone(&service);
        tokio::spawn(async move { service.refresh(&first).await })
    };
    repo.entered.notified().await;
    assert!(service.current().await.loading);

    cart.clear();
    assert_eq!(service.refresh(&cart.snapshot()).await, RefreshOutcome::Cleared);

    repo.release.notify_one();
    assert_eq!(slow.await.unwrap(), RefreshOutcome::Stale);

    let current = service.current().await;
    assert!(current.items.is_empty());
    assert!(!current.loading);
}

#[tokio::test]
async fn test_listener_follows_cart_changes() {
    let repo = Arc::new(GatedCatalog::new(catalog(), "none"));
    let service = Arc::new(RecommendationService::new(repo, 4));

    let mut cart = CartStore::new();
    let listener = Arc::clone(&service).spawn_listener(cart.subscribe());

    cart.add(&Product::new("shoe-a", "Runner", "Shoes", 100.0, 80.0));
    let current = wait_for(&service, |set| set.items.len() == 3).await;
    assert!(!ids(&current).contains(&"shoe-a".to_string()));

    cart.add(&Product::new("book-x", "Rust in Action", "Books", 50.0, 45.0));
    let current = wait_for(&service, |set| set.items.iter().any(|p| p.category == "Books")).await;
    assert_eq!(ids(&current), vec!["book-y"]);

    cart.clear();
    wait_for(&service, |set| set.items.is_empty()).await;

    drop(cart);
    tokio::time::timeout(Duration::from_secs(2), listener)
        .await
        .expect("listener should stop once the cart is gone")
        .unwrap();
}
