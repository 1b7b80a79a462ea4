use anyhow::Context;
use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::{
    api::repositories::{AccountRepository, AccountRepositoryError},
    models::user::{Claims, LoginRequest, PreferencesRequest, RegisterRequest, Role, Session},
};

#[derive(Error, Debug)]
pub enum AuthServiceError {
    #[error("Authentication failed: invalid credentials")]
    AuthenticationFailed,

    #[error("An account with this email already exists")]
    AlreadyExists,

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Not logged in as {0}")]
    SessionNotFound(Role),

    #[error("Session for {0} expired, please log in again")]
    SessionExpired(Role),

    #[error("Repository error: {0}")]
    RepositoryError(AccountRepositoryError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<AccountRepositoryError> for AuthServiceError {
    fn from(error: AccountRepositoryError) -> Self {
        match error {
            AccountRepositoryError::InvalidCredentials => AuthServiceError::AuthenticationFailed,
            AccountRepositoryError::AlreadyExists => AuthServiceError::AlreadyExists,
            AccountRepositoryError::Rejected(message) => AuthServiceError::Rejected(message),
            other => AuthServiceError::RepositoryError(other),
        }
    }
}

/// Logs accounts in against the API and keeps one session file per role.
pub struct AuthService {
    account_repository: Arc<dyn AccountRepository>,
    session_dir: PathBuf,
}

impl AuthService {
    pub fn new(
        account_repository: Arc<dyn AccountRepository>,
        session_dir: PathBuf,
    ) -> Result<Self, AuthServiceError> {
        if !session_dir.exists() {
            fs::create_dir_all(&session_dir).with_context(|| {
                format!("Failed to create session directory {}", session_dir.display())
            })?;
        }

        Ok(Self {
            account_repository,
            session_dir,
        })
    }

    pub fn session_dir(&self) -> &Path {
        &self.session_dir
    }

    pub async fn login(
        &self,
        role: Role,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthServiceError> {
        info!("Login attempt for {} account: {}", role, email);

        let request = LoginRequest::new(email.to_string(), password.to_string()).map_err(|e| {
            AuthServiceError::ValidationError {
                message: format!("Login validation failed: {}", e),
            }
        })?;

        let response = self.account_repository.login(role, &request).await.map_err(|e| {
            warn!("Login for {} failed: {}", request.email, e);
            AuthServiceError::from(e)
        })?;

        let session = self.start_session(role, &request.email, response.token)?;
        info!("{} {} logged in", role, session.email);
        Ok(session)
    }

    /// Register and log straight in with the token the API hands back.
    pub async fn register(&self, request: RegisterRequest) -> Result<Session, AuthServiceError> {
        info!("Registering {} account: {}", request.role, request.email);

        let response = self.account_repository.register(&request).await.map_err(|e| {
            error!("Registration for {} failed: {}", request.email, e);
            AuthServiceError::from(e)
        })?;

        if let Some(message) = response.message.as_deref() {
            debug!("Register response: {}", message);
        }

        self.start_session(request.role, &request.email, response.token)
    }

    /// Returns whether a session file was removed.
    pub async fn logout(&self, role: Role) -> Result<bool, AuthServiceError> {
        let path = self.session_path(role);
        if !path.exists() {
            debug!("No {} session to clear", role);
            return Ok(false);
        }

        fs::remove_file(&path).context("Failed to remove session file")?;
        info!("{} session cleared", role);
        Ok(true)
    }

    /// Live session for `role`, if any. Expired sessions are removed.
    pub async fn current_session(&self, role: Role) -> Result<Option<Session>, AuthServiceError> {
        match self.require_session(role).await {
            Ok(session) => Ok(Some(session)),
            Err(AuthServiceError::SessionNotFound(_)) | Err(AuthServiceError::SessionExpired(_)) => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn require_session(&self, role: Role) -> Result<Session, AuthServiceError> {
        let mut session = match self.load_session(role) {
            Ok(session) => session,
            Err(AuthServiceError::JsonError(e)) => {
                warn!("Unreadable {} session, clearing it: {}", role, e);
                self.logout(role).await?;
                return Err(AuthServiceError::SessionNotFound(role));
            }
            Err(e) => return Err(e),
        };

        let now = Utc::now();
        if session.is_expired(now) {
            debug!("{} session expired, clearing it", role);
            self.logout(role).await?;
            return Err(AuthServiceError::SessionExpired(role));
        }

        session.last_accessed = now;
        self.save_session(&session)?;
        Ok(session)
    }

    /// Store the shopper's favourite categories (customer accounts only).
    pub async fn save_preferences(&self, categories: Vec<String>) -> Result<Vec<String>, AuthServiceError> {
        let request = PreferencesRequest::new(categories).map_err(|e| AuthServiceError::ValidationError {
            message: format!("Preferences validation failed: {}", e),
        })?;

        let session = self.require_session(Role::Customer).await?;

        match self
            .account_repository
            .save_preferences(&session.token, &request)
            .await
        {
            Ok(()) => {
                info!("Saved {} preferred categories", request.categories.len());
                Ok(request.categories)
            }
            Err(AccountRepositoryError::InvalidCredentials) => {
                warn!("Preferences rejected the stored token, clearing session");
                self.logout(Role::Customer).await?;
                Err(AuthServiceError::SessionExpired(Role::Customer))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn start_session(&self, role: Role, email: &str, token: String) -> Result<Session, AuthServiceError> {
        let now = Utc::now();
        let expires_at = token_expiry(&token);
        if expires_at.is_none() {
            debug!("Token for {} carries no readable expiry", email);
        }

        let session = Session {
            role,
            email: email.to_string(),
            token,
            created_at: now,
            expires_at,
            last_accessed: now,
        };
        self.save_session(&session)?;
        Ok(session)
    }

    fn session_path(&self, role: Role) -> PathBuf {
        self.session_dir.join(format!("session-{}.json", role))
    }

    /// Write with owner-only permissions.
    fn save_session(&self, session: &Session) -> Result<(), AuthServiceError> {
        let path = self.session_path(session.role);
        let json_data = serde_json::to_string_pretty(session)?;

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(&path)?;
        // mode() only applies on create; tighten files left by older builds
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(fs::Permissions::from_mode(0o600))?;
        }
        file.write_all(json_data.as_bytes())?;
        file.flush()?;

        debug!("Session saved to {}", path.display());
        Ok(())
    }

    fn load_session(&self, role: Role) -> Result<Session, AuthServiceError> {
        let path = self.session_path(role);
        if !path.exists() {
            return Err(AuthServiceError::SessionNotFound(role));
        }

        let json_data = fs::read_to_string(&path)?;
        let session: Session = serde_json::from_str(&json_data)?;
        Ok(session)
    }
}

/// Expiry claim of a bearer token. The signing secret lives on the server, so
/// the signature is not checked here; the API still verifies every request.
pub fn token_expiry(token: &str) -> Option<DateTime<Utc>> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let claims = match decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation) {
        Ok(data) => data.claims,
        Err(e) => {
            debug!("Token claims unreadable: {}", e);
            return None;
        }
    };

    claims
        .exp
        .and_then(|exp| Utc.timestamp_opt(exp, 0).single())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::AuthResponse;
    use async_trait::async_trait;
    use chrono::Duration;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Accounts keyed by (role, email); tokens are real JWTs signed with a
    /// secret this side never sees.
    struct MockAccountRepository {
        accounts: Mutex<HashMap<(Role, String), String>>,
        token_lifetime: Duration,
        calls: Mutex<usize>,
        preferences: Mutex<Vec<Vec<String>>>,
    }

    impl MockAccountRepository {
        fn new(token_lifetime: Duration) -> Self {
            Self {
                accounts: Mutex::new(HashMap::new()),
                token_lifetime,
                calls: Mutex::new(0),
                preferences: Mutex::new(Vec::new()),
            }
        }

        fn with_account(self, role: Role, email: &str, password: &str) -> Self {
            self.accounts
                .lock()
                .unwrap()
                .insert((role, email.to_string()), password.to_string());
            self
        }

        fn token(&self, email: &str) -> String {
            let exp = (Utc::now() + self.token_lifetime).timestamp();
            encode(
                &Header::default(),
                &json!({ "sub": { "email": email }, "exp": exp }),
                &EncodingKey::from_secret(b"server-side-secret"),
            )
            .unwrap()
        }
    }

    #[async_trait]
    impl AccountRepository for MockAccountRepository {
        async fn login(&self, role: Role, request: &LoginRequest) -> Result<AuthResponse, AccountRepositoryError> {
            *self.calls.lock().unwrap() += 1;
            let accounts = self.accounts.lock().unwrap();
            match accounts.get(&(role, request.email.clone())) {
                Some(password) if password == &request.password => Ok(AuthResponse {
                    message: Some("Login successful".to_string()),
                    token: self.token(&request.email),
                }),
                _ => Err(AccountRepositoryError::InvalidCredentials),
            }
        }

        async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, AccountRepositoryError> {
            *self.calls.lock().unwrap() += 1;
            let mut accounts = self.accounts.lock().unwrap();
            let key = (request.role, request.email.clone());
            if accounts.contains_key(&key) {
                return Err(AccountRepositoryError::AlreadyExists);
            }
            accounts.insert(key, request.password.clone());
            Ok(AuthResponse {
                message: Some("Registered".to_string()),
                token: self.token(&request.email),
            })
        }

        async fn save_preferences(
            &self,
            _token: &str,
            request: &PreferencesRequest,
        ) -> Result<(), AccountRepositoryError> {
            *self.calls.lock().unwrap() += 1;
            self.preferences.lock().unwrap().push(request.categories.clone());
            Ok(())
        }
    }

    fn service(repo: Arc<MockAccountRepository>, dir: &TempDir) -> AuthService {
        AuthService::new(repo, dir.path().to_path_buf()).unwrap()
    }

    #[tokio::test]
    async fn test_login_success_persists_session() {
        let temp_dir = TempDir::new().unwrap();
        let repo = Arc::new(
            MockAccountRepository::new(Duration::days(7)).with_account(Role::Customer, "a@b.com", "Secret#pw"),
        );
        let auth = service(repo.clone(), &temp_dir);

        let session = auth.login(Role::Customer, "a@b.com", "Secret#pw").await.unwrap();
        assert_eq!(session.email, "a@b.com");
        assert!(session.expires_at.is_some());

        let path = temp_dir.path().join("session-customer.json");
        assert!(path.exists());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }

        // Simulates a restart.
        let reopened = service(repo, &temp_dir);
        let current = reopened.current_session(Role::Customer).await.unwrap();
        assert_eq!(current.map(|s| s.token), Some(session.token));
        assert!(reopened.current_session(Role::Seller).await.unwrap().is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_session_file_never_world_readable() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("session-customer.json");
        fs::write(&path, "{}").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        let repo = Arc::new(
            MockAccountRepository::new(Duration::days(7)).with_account(Role::Customer, "a@b.com", "Secret#pw"),
        );
        let auth = service(repo, &temp_dir);
        auth.login(Role::Customer, "a@b.com", "Secret#pw").await.unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        let saved: Session = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved.email, "a@b.com");
    }

    #[tokio::test]
    async fn test_login_failure() {
        let temp_dir = TempDir::new().unwrap();
        let repo = Arc::new(MockAccountRepository::new(Duration::days(7)));
        let auth = service(repo, &temp_dir);

        let result = auth.login(Role::Customer, "nobody@b.com", "Secret#pw").await;
        assert!(matches!(result, Err(AuthServiceError::AuthenticationFailed)));
    }

    #[tokio::test]
    async fn test_invalid_email_rejected_before_request() {
        let temp_dir = TempDir::new().unwrap();
        let repo = Arc::new(MockAccountRepository::new(Duration::days(7)));
        let auth = service(repo.clone(), &temp_dir);

        let result = auth.login(Role::Admin, "not-an-email", "pw").await;
        assert!(matches!(result, Err(AuthServiceError::ValidationError { .. })));
        assert_eq!(*repo.calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_register_then_duplicate() {
        let temp_dir = TempDir::new().unwrap();
        let repo = Arc::new(MockAccountRepository::new(Duration::days(7)));
        let auth = service(repo, &temp_dir);

        let request = RegisterRequest::customer("new@b.com".to_string(), "Secret#pw".to_string()).unwrap();
        let session = auth.register(request.clone()).await.unwrap();
        assert_eq!(session.role, Role::Customer);

        let again = auth.register(request).await;
        assert!(matches!(again, Err(AuthServiceError::AlreadyExists)));
    }

    #[tokio::test]
    async fn test_expired_session_is_cleared() {
        let temp_dir = TempDir::new().unwrap();
        let repo = Arc::new(
            MockAccountRepository::new(Duration::hours(-1)).with_account(Role::Seller, "s@b.com", "pw"),
        );
        let auth = service(repo, &temp_dir);

        auth.login(Role::Seller, "s@b.com", "pw").await.unwrap();
        assert!(matches!(
            auth.require_session(Role::Seller).await,
            Err(AuthServiceError::SessionExpired(Role::Seller))
        ));
        assert!(!temp_dir.path().join("session-seller.json").exists());
        assert!(auth.current_session(Role::Seller).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_logout_removes_only_that_role() {
        let temp_dir = TempDir::new().unwrap();
        let repo = Arc::new(
            MockAccountRepository::new(Duration::days(1))
                .with_account(Role::Customer, "a@b.com", "Secret#pw")
                .with_account(Role::Seller, "a@b.com", "pw"),
        );
        let auth = service(repo, &temp_dir);

        auth.login(Role::Customer, "a@b.com", "Secret#pw").await.unwrap();
        auth.login(Role::Seller, "a@b.com", "pw").await.unwrap();

        assert!(auth.logout(Role::Customer).await.unwrap());
        assert!(!auth.logout(Role::Customer).await.unwrap());
        assert!(auth.current_session(Role::Seller).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_save_preferences_requires_customer_session() {
        let temp_dir = TempDir::new().unwrap();
        let repo = Arc::new(
            MockAccountRepository::new(Duration::days(1)).with_account(Role::Customer, "a@b.com", "Secret#pw"),
        );
        let auth = service(repo.clone(), &temp_dir);
        let categories = vec!["Shoes".to_string(), "Books".to_string(), "Audio".to_string()];

        assert!(matches!(
            auth.save_preferences(categories.clone()).await,
            Err(AuthServiceError::SessionNotFound(Role::Customer))
        ));

        auth.login(Role::Customer, "a@b.com", "Secret#pw").await.unwrap();
        let saved = auth.save_preferences(categories.clone()).await.unwrap();
        assert_eq!(saved, categories);
        assert_eq!(repo.preferences.lock().unwrap().len(), 1);

        assert!(matches!(
            auth.save_preferences(vec!["Shoes".to_string()]).await,
            Err(AuthServiceError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_token_expiry_reads_unverified_claims() {
        let exp = Utc::now().timestamp() + 3600;
        let token = encode(
            &Header::default(),
            &json!({ "sub": "64b7f0c2a1b2c3d4e5f60718", "exp": exp }),
            &EncodingKey::from_secret(b"someone-elses-secret"),
        )
        .unwrap();

        assert_eq!(token_expiry(&token).map(|t| t.timestamp()), Some(exp));
        assert!(token_expiry("garbage").is_none());
    }
}
