use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::{
    api::repositories::{CatalogRepository, CatalogRepositoryError},
    models::product::{Product, ProductDetail, ProductId},
    services::bundle_service::{BundleBuilder, BUNDLE_ADDON_LIMIT},
};

/// Products fetched from the primary's category when building a product page.
pub const PRODUCT_PAGE_CATEGORY_LIMIT: usize = 24;
pub const SIMILAR_LIMIT: usize = 12;
pub const INTEREST_LIMIT: usize = 6;

#[derive(Error, Debug)]
pub enum CatalogServiceError {
    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Product not found")]
    ProductNotFound,

    #[error("Repository error: {0}")]
    RepositoryError(#[from] CatalogRepositoryError),
}

/// Everything the product view shows around one product.
#[derive(Debug, Clone)]
pub struct ProductPage {
    pub detail: ProductDetail,
    pub similar: Vec<Product>,
    pub frequently_bought: Vec<Product>,
    pub interest: Vec<Product>,
    pub discount_percent: u32,
}

impl ProductPage {
    /// Bundle of this product and its "frequently bought together" addons.
    pub fn bundle(&self) -> BundleBuilder {
        BundleBuilder::new(self.detail.product.clone(), self.frequently_bought.clone())
    }
}

pub struct CatalogService {
    catalog_repository: Arc<dyn CatalogRepository>,
}

impl CatalogService {
    pub fn new(catalog_repository: Arc<dyn CatalogRepository>) -> Self {
        Self { catalog_repository }
    }

    pub fn repository(&self) -> Arc<dyn CatalogRepository> {
        Arc::clone(&self.catalog_repository)
    }

    pub async fn list_by_category(
        &self,
        category: &str,
        limit: usize,
    ) -> Result<Vec<Product>, CatalogServiceError> {
        let category = category.trim();
        if category.is_empty() {
            return Err(CatalogServiceError::ValidationError {
                message: "Category is required".to_string(),
            });
        }

        debug!("Listing category '{}' (limit {})", category, limit);
        let products = self
            .catalog_repository
            .find_by_category(category, limit.max(1))
            .await?;

        info!("Found {} products in '{}'", products.len(), category);
        Ok(products)
    }

    /// Blank queries return nothing without touching the network.
    pub async fn search(&self, query: &str) -> Result<Vec<Product>, CatalogServiceError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let products = self.catalog_repository.search(query).await.map_err(|e| {
            error!("Search for '{}' failed: {}", query, e);
            CatalogServiceError::RepositoryError(e)
        })?;

        info!("Search '{}' matched {} products", query, products.len());
        Ok(products)
    }

    pub async fn product(&self, id: &ProductId) -> Result<ProductDetail, CatalogServiceError> {
        if !id.is_object_id() {
            return Err(CatalogServiceError::ValidationError {
                message: format!("'{}' is not a valid product id", id),
            });
        }

        self.catalog_repository
            .find_by_id(id)
            .await?
            .ok_or(CatalogServiceError::ProductNotFound)
    }

    /// Product detail plus the lists derived from its category.
    pub async fn product_page(&self, id: &ProductId) -> Result<ProductPage, CatalogServiceError> {
        let detail = self.product(id).await?;
        let product = &detail.product;

        let related = if product.category.trim().is_empty() {
            Vec::new()
        } else {
            self.catalog_repository
                .find_by_category(&product.category, PRODUCT_PAGE_CATEGORY_LIMIT)
                .await?
        };

        let related: Vec<Product> = related
            .into_iter()
            .filter(|candidate| candidate.id != product.id)
            .collect();

        let similar: Vec<Product> = related.iter().take(SIMILAR_LIMIT).cloned().collect();
        let frequently_bought: Vec<Product> =
            related.iter().take(BUNDLE_ADDON_LIMIT).cloned().collect();
        let interest: Vec<Product> = if related.len() > SIMILAR_LIMIT {
            related
                .iter()
                .skip(SIMILAR_LIMIT)
                .take(INTEREST_LIMIT)
                .cloned()
                .collect()
        } else {
            related.iter().rev().take(INTEREST_LIMIT).cloned().collect()
        };

        debug!(
            "Product page {}: {} similar, {} bundle, {} interest",
            product.id,
            similar.len(),
            frequently_bought.len(),
            interest.len()
        );

        let discount_percent = product.discount_percent();
        Ok(ProductPage {
            detail,
            similar,
            frequently_bought,
            interest,
            discount_percent,
        })
    }
}
