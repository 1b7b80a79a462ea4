use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};
use validator::Validate;

use crate::{
    api::repositories::{InventoryRepository, InventoryRepositoryError},
    models::{
        product::{Product, ProductDraft, ProductId, StockUpdate},
        user::{Role, SellerProfile, SellerProfileUpdate},
    },
    services::auth_service::{AuthService, AuthServiceError},
};

#[derive(Error, Debug)]
pub enum SellerServiceError {
    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Product not found in your inventory")]
    ProductNotFound,

    #[error("Seller account not found")]
    ProfileNotFound,

    #[error("Auth error: {0}")]
    AuthError(#[from] AuthServiceError),

    #[error("Repository error: {0}")]
    RepositoryError(#[from] InventoryRepositoryError),
}

/// Seller-side inventory management behind a seller session.
pub struct SellerService {
    inventory_repository: Arc<dyn InventoryRepository>,
    auth_service: Arc<AuthService>,
}

impl SellerService {
    pub fn new(inventory_repository: Arc<dyn InventoryRepository>, auth_service: Arc<AuthService>) -> Self {
        Self {
            inventory_repository,
            auth_service,
        }
    }

    pub async fn inventory(&self) -> Result<Vec<Product>, SellerServiceError> {
        let token = self.token().await?;
        let products = self.inventory_repository.list(&token).await.map_err(|e| self.on_repository_error(e))?;
        info!("Loaded {} inventory items", products.len());
        Ok(products)
    }

    /// Returns the new listing's id when the API reports one.
    pub async fn add_product(&self, draft: ProductDraft) -> Result<Option<ProductId>, SellerServiceError> {
        draft
            .validate()
            .map_err(|e| SellerServiceError::ValidationError {
                message: format!("Product validation failed: {}", e),
            })?;

        let token = self.token().await?;
        info!(
            "Listing '{}' at {:.2} (final {:.2})",
            draft.name,
            draft.price,
            draft.final_price()
        );

        let id = self
            .inventory_repository
            .add(&token, &draft)
            .await
            .map_err(|e| self.on_repository_error(e))?;

        match &id {
            Some(id) => info!("Product added with ID: {}", id),
            None => warn!("Product added but the API returned no id"),
        }
        Ok(id)
    }

    /// Overwrite an existing listing; the catalog recomputes its final price.
    pub async fn update_product(&self, id: &ProductId, draft: ProductDraft) -> Result<(), SellerServiceError> {
        draft
            .validate()
            .map_err(|e| SellerServiceError::ValidationError {
                message: format!("Product validation failed: {}", e),
            })?;

        let token = self.token().await?;
        match self.inventory_repository.update(&token, id, &draft).await {
            Ok(()) => {
                info!("Product {} updated (final {:.2})", id, draft.final_price());
                Ok(())
            }
            Err(InventoryRepositoryError::NotFound) => Err(SellerServiceError::ProductNotFound),
            Err(e) => Err(self.on_repository_error(e)),
        }
    }

    pub async fn update_stock(&self, id: &ProductId, stock: i64) -> Result<(), SellerServiceError> {
        let update = StockUpdate { stock };
        update
            .validate()
            .map_err(|e| SellerServiceError::ValidationError {
                message: format!("Stock validation failed: {}", e),
            })?;

        let token = self.token().await?;
        match self.inventory_repository.update_stock(&token, id, &update).await {
            Ok(()) => {
                info!("Stock for {} set to {}", id, stock);
                Ok(())
            }
            Err(InventoryRepositoryError::NotFound) => Err(SellerServiceError::ProductNotFound),
            Err(e) => Err(self.on_repository_error(e)),
        }
    }

    pub async fn delete_product(&self, id: &ProductId) -> Result<(), SellerServiceError> {
        let token = self.token().await?;
        let deleted = self
            .inventory_repository
            .delete(&token, id)
            .await
            .map_err(|e| self.on_repository_error(e))?;

        if !deleted {
            return Err(SellerServiceError::ProductNotFound);
        }
        info!("Product {} deleted", id);
        Ok(())
    }

    pub async fn profile(&self) -> Result<SellerProfile, SellerServiceError> {
        let token = self.token().await?;
        match self.inventory_repository.profile(&token).await {
            Ok(profile) => Ok(profile),
            Err(InventoryRepositoryError::NotFound) => Err(SellerServiceError::ProfileNotFound),
            Err(e) => Err(self.on_repository_error(e)),
        }
    }

    /// Send only the fields that were filled in and return the profile as it
    /// now reads on the server.
    pub async fn update_profile(&self, update: SellerProfileUpdate) -> Result<SellerProfile, SellerServiceError> {
        let update = update.normalized();
        update
            .validate()
            .map_err(|e| SellerServiceError::ValidationError {
                message: format!("Profile validation failed: {}", e),
            })?;

        let token = self.token().await?;
        match self.inventory_repository.update_profile(&token, &update).await {
            Ok(()) => info!("Seller profile updated"),
            Err(InventoryRepositoryError::NotFound) => return Err(SellerServiceError::ProfileNotFound),
            Err(e) => return Err(self.on_repository_error(e)),
        }
        self.profile().await
    }

    async fn token(&self) -> Result<String, SellerServiceError> {
        let session = self.auth_service.require_session(Role::Seller).await?;
        Ok(session.token)
    }

    fn on_repository_error(&self, e: InventoryRepositoryError) -> SellerServiceError {
        if matches!(e, InventoryRepositoryError::Unauthorized) {
            warn!("Seller token rejected by the API; log in again");
        } else {
            error!("Inventory request failed: {}", e);
        }
        SellerServiceError::RepositoryError(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::repositories::{AccountRepository, AccountRepositoryError};
    use crate::models::user::{AuthResponse, LoginRequest, PreferencesRequest, RegisterRequest};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct MockAccountRepository;

    #[async_trait]
    impl AccountRepository for MockAccountRepository {
        async fn login(&self, _role: Role, _request: &LoginRequest) -> Result<AuthResponse, AccountRepositoryError> {
            Ok(AuthResponse {
                message: None,
                token: "seller-token".to_string(),
            })
        }

        async fn register(&self, _request: &RegisterRequest) -> Result<AuthResponse, AccountRepositoryError> {
            Err(AccountRepositoryError::AlreadyExists)
        }

        async fn save_preferences(
            &self,
            _token: &str,
            _request: &PreferencesRequest,
        ) -> Result<(), AccountRepositoryError> {
            Ok(())
        }
    }

    struct MockInventoryRepository {
        products: Mutex<Vec<Product>>,
        tokens: Mutex<Vec<String>>,
        profile: Mutex<SellerProfile>,
        profile_updates: Mutex<Vec<SellerProfileUpdate>>,
    }

    impl MockInventoryRepository {
        fn new() -> Self {
            Self {
                products: Mutex::new(Vec::new()),
                tokens: Mutex::new(Vec::new()),
                profile: Mutex::new(SellerProfile {
                    email: "s@b.com".to_string(),
                    store_name: "Shoe Hub".to_string(),
                    registration_id: "REG-1".to_string(),
                    business_type: "Individual".to_string(),
                    ..Default::default()
                }),
                profile_updates: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl InventoryRepository for MockInventoryRepository {
        async fn list(&self, token: &str) -> Result<Vec<Product>, InventoryRepositoryError> {
            self.tokens.lock().unwrap().push(token.to_string());
            Ok(self.products.lock().unwrap().clone())
        }

        async fn add(&self, token: &str, draft: &ProductDraft) -> Result<Option<ProductId>, InventoryRepositoryError> {
            self.tokens.lock().unwrap().push(token.to_string());
            let mut products = self.products.lock().unwrap();
            let id = format!("{:024x}", products.len() + 1);
            products.push(Product::new(
                id.as_str(),
                draft.name.clone(),
                draft.category.clone(),
                draft.price,
                draft.final_price(),
            ));
            Ok(Some(ProductId::new(id)))
        }

        async fn update(&self, _token: &str, id: &ProductId, draft: &ProductDraft) -> Result<(), InventoryRepositoryError> {
            let mut products = self.products.lock().unwrap();
            let product = products
                .iter_mut()
                .find(|p| &p.id == id)
                .ok_or(InventoryRepositoryError::NotFound)?;
            product.name = draft.name.clone();
            product.list_price = draft.price;
            product.final_price = draft.final_price();
            product.stock = draft.stock;
            Ok(())
        }

        async fn update_stock(
            &self,
            _token: &str,
            id: &ProductId,
            update: &StockUpdate,
        ) -> Result<(), InventoryRepositoryError> {
            let mut products = self.products.lock().unwrap();
            let product = products
                .iter_mut()
                .find(|p| &p.id == id)
                .ok_or(InventoryRepositoryError::NotFound)?;
            product.stock = update.stock;
            Ok(())
        }

        async fn delete(&self, _token: &str, id: &ProductId) -> Result<bool, InventoryRepositoryError> {
            let mut products = self.products.lock().unwrap();
            let before = products.len();
            products.retain(|p| &p.id != id);
            Ok(products.len() != before)
        }

        async fn profile(&self, token: &str) -> Result<SellerProfile, InventoryRepositoryError> {
            self.tokens.lock().unwrap().push(token.to_string());
            Ok(self.profile.lock().unwrap().clone())
        }

        async fn update_profile(
            &self,
            _token: &str,
            update: &SellerProfileUpdate,
        ) -> Result<(), InventoryRepositoryError> {
            self.profile_updates.lock().unwrap().push(update.clone());
            update.apply_to(&mut self.profile.lock().unwrap());
            Ok(())
        }
    }

    async fn setup(temp_dir: &TempDir, logged_in: bool) -> (SellerService, Arc<MockInventoryRepository>) {
        let auth = Arc::new(AuthService::new(Arc::new(MockAccountRepository), temp_dir.path().to_path_buf()).unwrap());
        if logged_in {
            auth.login(Role::Seller, "s@b.com", "pw").await.unwrap();
        }
        let inventory = Arc::new(MockInventoryRepository::new());
        (SellerService::new(inventory.clone(), auth), inventory)
    }

    #[tokio::test]
    async fn test_requires_seller_session() {
        let temp_dir = TempDir::new().unwrap();
        let (service, inventory) = setup(&temp_dir, false).await;

        assert!(matches!(
            service.inventory().await,
            Err(SellerServiceError::AuthError(AuthServiceError::SessionNotFound(Role::Seller)))
        ));
        assert!(inventory.tokens.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_update_delete_flow() {
        let temp_dir = TempDir::new().unwrap();
        let (service, inventory) = setup(&temp_dir, true).await;

        let mut draft = ProductDraft::new("Trail Runner", 200.0).with_tags("running, trail ,,");
        draft.discount = 25.0;
        draft.category = "Shoes".to_string();
        assert_eq!(draft.tags, vec!["running", "trail"]);

        let id = service.add_product(draft).await.unwrap().unwrap();
        let listed = service.inventory().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].final_price, 150.0);
        assert!(inventory.tokens.lock().unwrap().iter().all(|t| t == "seller-token"));

        tokio_test::assert_ok!(service.update_stock(&id, 12).await);
        assert_eq!(inventory.products.lock().unwrap()[0].stock, 12);

        tokio_test::assert_ok!(service.delete_product(&id).await);
        assert!(matches!(
            service.delete_product(&id).await,
            Err(SellerServiceError::ProductNotFound)
        ));
        assert!(matches!(
            service.update_stock(&id, 1).await,
            Err(SellerServiceError::ProductNotFound)
        ));
    }

    #[tokio::test]
    async fn test_invalid_draft_and_stock_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let (service, inventory) = setup(&temp_dir, true).await;

        assert!(matches!(
            service.add_product(ProductDraft::new("  ", 10.0)).await,
            Err(SellerServiceError::ValidationError { .. })
        ));
        assert!(matches!(
            service.add_product(ProductDraft::new("Sock", 0.0)).await,
            Err(SellerServiceError::ValidationError { .. })
        ));
        assert!(matches!(
            service.update_stock(&ProductId::from("x"), -1).await,
            Err(SellerServiceError::ValidationError { .. })
        ));
        assert!(inventory.tokens.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_product_rewrites_listing() {
        let temp_dir = TempDir::new().unwrap();
        let (service, inventory) = setup(&temp_dir, true).await;

        let id = service
            .add_product(ProductDraft::new("Trail Runner", 200.0))
            .await
            .unwrap()
            .unwrap();

        let mut edit = ProductDraft::new("Trail Runner v2", 300.0);
        edit.discount = 25.0;
        edit.stock = 5;
        tokio_test::assert_ok!(service.update_product(&id, edit).await);
        {
            let products = inventory.products.lock().unwrap();
            assert_eq!(products[0].name, "Trail Runner v2");
            assert_eq!(products[0].final_price, 225.0);
            assert_eq!(products[0].stock, 5);
        }

        assert!(matches!(
            service
                .update_product(&ProductId::from("missing"), ProductDraft::new("X", 1.0))
                .await,
            Err(SellerServiceError::ProductNotFound)
        ));
        assert!(matches!(
            service.update_product(&id, ProductDraft::new(" ", 1.0)).await,
            Err(SellerServiceError::ValidationError { .. })
        ));
    }

    #[tokio::test]
    async fn test_profile_update_sends_only_filled_fields() {
        let temp_dir = TempDir::new().unwrap();
        let (service, inventory) = setup(&temp_dir, true).await;

        let profile = service.profile().await.unwrap();
        assert_eq!(profile.store_name, "Shoe Hub");

        let update = SellerProfileUpdate {
            contact_number: Some(" 98765 43210 ".to_string()),
            gstin: Some(String::new()),
            ..Default::default()
        };
        let updated = service.update_profile(update).await.unwrap();
        assert_eq!(updated.contact_number, "98765 43210");
        assert_eq!(updated.store_name, "Shoe Hub");
        assert_eq!(updated.registration_id, "REG-1");

        let sent = inventory.profile_updates.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].gstin.is_none());
    }

    #[tokio::test]
    async fn test_empty_profile_update_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let (service, inventory) = setup(&temp_dir, true).await;

        let blank = SellerProfileUpdate {
            store_name: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            service.update_profile(blank).await,
            Err(SellerServiceError::ValidationError { .. })
        ));
        assert!(inventory.profile_updates.lock().unwrap().is_empty());
    }
}
