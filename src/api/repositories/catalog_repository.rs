use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use crate::api::connection::{ApiClient, ApiError};
use crate::models::product::{Product, ProductDetail, ProductError, ProductId, WireProduct};

#[derive(Error, Debug)]
pub enum CatalogRepositoryError {
    #[error("Catalog request failed: {0}")]
    ApiError(#[from] ApiError),
    #[error("Invalid product document: {0}")]
    ProductError(#[from] ProductError),
}

/// Read access to the product catalog
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn find_by_category(
        &self,
        category: &str,
        limit: usize,
    ) -> Result<Vec<Product>, CatalogRepositoryError>;
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<ProductDetail>, CatalogRepositoryError>;
    async fn search(&self, query: &str) -> Result<Vec<Product>, CatalogRepositoryError>;
}

/// HTTP implementation of CatalogRepository
pub struct HttpCatalogRepository {
    client: ApiClient,
}

impl HttpCatalogRepository {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CatalogRepository for HttpCatalogRepository {
    async fn find_by_category(
        &self,
        category: &str,
        limit: usize,
    ) -> Result<Vec<Product>, CatalogRepositoryError> {
        let documents: Vec<WireProduct> = self
            .client
            .get_json(
                "products",
                &[("category", category.to_string()), ("limit", limit.to_string())],
                None,
            )
            .await?;

        Ok(ingest_list(documents))
    }

    async fn find_by_id(&self, id: &ProductId) -> Result<Option<ProductDetail>, CatalogRepositoryError> {
        let path = format!("product/{}", id);
        match self.client.get_json::<WireProduct>(&path, &[], None).await {
            Ok(document) => Ok(Some(ProductDetail::try_from(document)?)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn search(&self, query: &str) -> Result<Vec<Product>, CatalogRepositoryError> {
        let documents: Vec<WireProduct> = self
            .client
            .get_json("search/", &[("q", query.to_string())], None)
            .await?;

        Ok(ingest_list(documents))
    }
}

/// Normalise a listing, skipping documents that carry no identity.
pub fn ingest_list(documents: Vec<WireProduct>) -> Vec<Product> {
    documents
        .into_iter()
        .filter_map(|document| match Product::try_from(document) {
            Ok(product) => Some(product),
            Err(e) => {
                warn!("Skipping catalog entry: {}", e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ingest_list_skips_entries_without_identity() {
        let documents: Vec<WireProduct> = serde_json::from_value(json!([
            { "id": "A", "price": 10, "finalPrice": 8, "category": "Shoes" },
            { "name": "ghost", "price": 5 },
            { "_id": "B", "price": 20 }
        ]))
        .unwrap();

        let products = ingest_list(documents);
        let ids: Vec<&str> = products.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B"]);
        assert_eq!(products[1].final_price, 20.0);
    }
}
