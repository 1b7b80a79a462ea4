use async_trait::async_trait;
use reqwest::Method;
use thiserror::Error;

use crate::api::connection::{ApiClient, ApiError, ApiMessage};
use crate::api::repositories::catalog_repository::ingest_list;
use crate::models::product::{Product, ProductDraft, ProductId, StockUpdate, WireProduct};
use crate::models::user::{SellerProfile, SellerProfileUpdate};

#[derive(Error, Debug)]
pub enum InventoryRepositoryError {
    #[error("Not found")]
    NotFound,
    #[error("Seller session rejected")]
    Unauthorized,
    #[error("Inventory request failed: {0}")]
    ApiError(ApiError),
}

impl From<ApiError> for InventoryRepositoryError {
    fn from(error: ApiError) -> Self {
        match error {
            ApiError::Unauthorized { .. } => InventoryRepositoryError::Unauthorized,
            e if e.is_not_found() => InventoryRepositoryError::NotFound,
            other => InventoryRepositoryError::ApiError(other),
        }
    }
}

/// Seller-side listing management; every call carries the seller's token
#[async_trait]
pub trait InventoryRepository: Send + Sync {
    async fn list(&self, token: &str) -> Result<Vec<Product>, InventoryRepositoryError>;
    async fn add(&self, token: &str, draft: &ProductDraft) -> Result<Option<ProductId>, InventoryRepositoryError>;
    /// Replace every editable field of an existing listing.
    async fn update(&self, token: &str, id: &ProductId, draft: &ProductDraft) -> Result<(), InventoryRepositoryError>;
    async fn update_stock(
        &self,
        token: &str,
        id: &ProductId,
        update: &StockUpdate,
    ) -> Result<(), InventoryRepositoryError>;
    async fn delete(&self, token: &str, id: &ProductId) -> Result<bool, InventoryRepositoryError>;
    async fn profile(&self, token: &str) -> Result<SellerProfile, InventoryRepositoryError>;
    async fn update_profile(
        &self,
        token: &str,
        update: &SellerProfileUpdate,
    ) -> Result<(), InventoryRepositoryError>;
}

/// HTTP implementation of InventoryRepository
pub struct HttpInventoryRepository {
    client: ApiClient,
}

impl HttpInventoryRepository {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl InventoryRepository for HttpInventoryRepository {
    async fn list(&self, token: &str) -> Result<Vec<Product>, InventoryRepositoryError> {
        let documents: Vec<WireProduct> = self
            .client
            .get_json("seller/inventory", &[], Some(token))
            .await?;
        Ok(ingest_list(documents))
    }

    async fn add(&self, token: &str, draft: &ProductDraft) -> Result<Option<ProductId>, InventoryRepositoryError> {
        let response: ApiMessage = self
            .client
            .send_json(Method::POST, "seller/product/add", draft, Some(token))
            .await?;
        Ok(response.id.map(ProductId::new))
    }

    async fn update(&self, token: &str, id: &ProductId, draft: &ProductDraft) -> Result<(), InventoryRepositoryError> {
        let path = format!("seller/product/update/{}", id);
        let _: ApiMessage = self
            .client
            .send_json(Method::PUT, &path, draft, Some(token))
            .await?;
        Ok(())
    }

    async fn update_stock(
        &self,
        token: &str,
        id: &ProductId,
        update: &StockUpdate,
    ) -> Result<(), InventoryRepositoryError> {
        let path = format!("seller/product/update-stock/{}", id);
        let _: ApiMessage = self
            .client
            .send_json(Method::PATCH, &path, update, Some(token))
            .await?;
        Ok(())
    }

    async fn delete(&self, token: &str, id: &ProductId) -> Result<bool, InventoryRepositoryError> {
        let path = format!("seller/product/delete/{}", id);
        match self.client.delete(&path, Some(token)).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn profile(&self, token: &str) -> Result<SellerProfile, InventoryRepositoryError> {
        Ok(self.client.get_json("seller/profile", &[], Some(token)).await?)
    }

    async fn update_profile(
        &self,
        token: &str,
        update: &SellerProfileUpdate,
    ) -> Result<(), InventoryRepositoryError> {
        let _: ApiMessage = self
            .client
            .send_json(Method::PUT, "seller/profile/update", update, Some(token))
            .await?;
        Ok(())
    }
}
