use async_trait::async_trait;
use reqwest::Method;
use thiserror::Error;

use crate::api::connection::{ApiClient, ApiError, ApiMessage};
use crate::models::user::{AuthResponse, LoginRequest, PreferencesRequest, RegisterRequest, Role};

#[derive(Error, Debug)]
pub enum AccountRepositoryError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Account already exists")]
    AlreadyExists,
    #[error("Rejected: {0}")]
    Rejected(String),
    #[error("Account request failed: {0}")]
    ApiError(#[from] ApiError),
}

impl AccountRepositoryError {
    fn from_api(error: ApiError) -> Self {
        match error {
            ApiError::Unauthorized { .. } => AccountRepositoryError::InvalidCredentials,
            ApiError::Status { status: 409, .. } => AccountRepositoryError::AlreadyExists,
            ApiError::Status { status: 400..=403, message } => AccountRepositoryError::Rejected(message),
            other => AccountRepositoryError::ApiError(other),
        }
    }
}

/// Account operations against the remote API
#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn login(&self, role: Role, request: &LoginRequest) -> Result<AuthResponse, AccountRepositoryError>;
    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, AccountRepositoryError>;
    async fn save_preferences(
        &self,
        token: &str,
        request: &PreferencesRequest,
    ) -> Result<(), AccountRepositoryError>;
}

/// HTTP implementation of AccountRepository
pub struct HttpAccountRepository {
    client: ApiClient,
}

impl HttpAccountRepository {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AccountRepository for HttpAccountRepository {
    async fn login(&self, role: Role, request: &LoginRequest) -> Result<AuthResponse, AccountRepositoryError> {
        let path = format!("{}/login", role.auth_segment());
        self.client
            .send_json(Method::POST, &path, request, None)
            .await
            .map_err(AccountRepositoryError::from_api)
    }

    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, AccountRepositoryError> {
        let path = format!("{}/register", request.role.auth_segment());
        self.client
            .send_json(Method::POST, &path, request, None)
            .await
            .map_err(AccountRepositoryError::from_api)
    }

    async fn save_preferences(
        &self,
        token: &str,
        request: &PreferencesRequest,
    ) -> Result<(), AccountRepositoryError> {
        let _: ApiMessage = self
            .client
            .send_json(Method::POST, "preferences", request, Some(token))
            .await
            .map_err(AccountRepositoryError::from_api)?;
        Ok(())
    }
}
