use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// AuthProviderError
///
/// Failures talking to the external identity provider (Supabase GoTrue).
#[derive(Error, Debug)]
pub enum AuthProviderError {
    /// The provider understood the request and refused it (bad credentials, duplicate e-mail, ...).
    #[error("{0}")]
    Rejected(String),

    #[error("auth provider unavailable: {0}")]
    Unavailable(String),

    /// An admin operation was requested without the service-role key configured.
    #[error("SUPABASE_SERVICE_ROLE_KEY is not configured")]
    NotConfigured,
}

/// AuthSession
///
/// The result of a successful password sign-in.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_in: i64,
    pub user: ProviderUser,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

/// AuthProvider
///
/// The identity operations this service delegates. `SupabaseAuthClient` talks
/// to GoTrue over HTTP; `MockAuthProvider` keeps everything in memory for tests.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str, full_name: &str)
    -> Result<Uuid, AuthProviderError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthProviderError>;

    /// Sends a password-recovery e-mail whose link lands on `redirect_to`.
    async fn send_password_reset(&self, email: &str, redirect_to: &str)
    -> Result<(), AuthProviderError>;

    /// Changes the password of the user owning `access_token`.
    async fn update_password(&self, access_token: &str, new_password: &str)
    -> Result<(), AuthProviderError>;

    /// Admin: invites a user by e-mail and returns the new user id.
    async fn invite_user(&self, email: &str, full_name: &str, role: &str)
    -> Result<Uuid, AuthProviderError>;

    /// Admin: removes the user from the identity provider.
    async fn delete_user(&self, user_id: Uuid) -> Result<(), AuthProviderError>;
}

pub type AuthProviderState = Arc<dyn AuthProvider>;

// --- Supabase GoTrue ---

/// GoTrue answers sign-up with either a session (auto-confirm) or the bare user.
#[derive(Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session { user: ProviderUser },
    User(ProviderUser),
}

#[derive(Deserialize)]
struct GoTrueError {
    #[serde(alias = "error_description", alias = "message", alias = "msg")]
    message: Option<String>,
}

#[derive(Clone)]
pub struct SupabaseAuthClient {
    http: Client,
    base_url: String,
    anon_key: String,
    service_role_key: Option<String>,
}

impl SupabaseAuthClient {
    pub fn new(supabase_url: &str, anon_key: &str, service_role_key: Option<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: format!("{}/auth/v1", supabase_url.trim_end_matches('/')),
            anon_key: anon_key.to_string(),
            service_role_key,
        }
    }

    fn public(&self, request: RequestBuilder) -> RequestBuilder {
        request.header("apikey", &self.anon_key)
    }

    fn admin(&self, request: RequestBuilder) -> Result<RequestBuilder, AuthProviderError> {
        let key = self
            .service_role_key
            .as_deref()
            .ok_or(AuthProviderError::NotConfigured)?;
        Ok(request.header("apikey", key).bearer_auth(key))
    }

    /// Sends the request and turns non-2xx answers into `Rejected` with GoTrue's own message.
    async fn send(request: RequestBuilder) -> Result<Response, AuthProviderError> {
        let response = request
            .send()
            .await
            .map_err(|e| AuthProviderError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status.is_server_error() {
            return Err(AuthProviderError::Unavailable(format!("GoTrue answered {}", status)));
        }

        let message = response
            .json::<GoTrueError>()
            .await
            .ok()
            .and_then(|e| e.message)
            .unwrap_or_else(|| format!("request rejected ({})", status));
        Err(AuthProviderError::Rejected(message))
    }

    async fn parse<T: for<'de> Deserialize<'de>>(response: Response) -> Result<T, AuthProviderError> {
        response
            .json::<T>()
            .await
            .map_err(|e| AuthProviderError::Unavailable(format!("unexpected GoTrue payload: {}", e)))
    }
}

#[async_trait]
impl AuthProvider for SupabaseAuthClient {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<Uuid, AuthProviderError> {
        let request = self.public(self.http.post(format!("{}/signup", self.base_url))).json(&json!({
            "email": email,
            "password": password,
            "data": { "full_name": full_name },
        }));

        let user = match Self::parse::<SignUpResponse>(Self::send(request).await?).await? {
            SignUpResponse::Session { user } | SignUpResponse::User(user) => user,
        };
        Ok(user.id)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthProviderError> {
        let request = self
            .public(self.http.post(format!("{}/token", self.base_url)))
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }));

        Self::parse(Self::send(request).await?).await
    }

    async fn send_password_reset(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> Result<(), AuthProviderError> {
        let request = self
            .public(self.http.post(format!("{}/recover", self.base_url)))
            .query(&[("redirect_to", redirect_to)])
            .json(&json!({ "email": email }));

        Self::send(request).await.map(|_| ())
    }

    async fn update_password(
        &self,
        access_token: &str,
        new_password: &str,
    ) -> Result<(), AuthProviderError> {
        let request = self
            .public(self.http.put(format!("{}/user", self.base_url)))
            .bearer_auth(access_token)
            .json(&json!({ "password": new_password }));

        Self::send(request).await.map(|_| ())
    }

    async fn invite_user(
        &self,
        email: &str,
        full_name: &str,
        role: &str,
    ) -> Result<Uuid, AuthProviderError> {
        let request = self
            .admin(self.http.post(format!("{}/invite", self.base_url)))?
            .json(&json!({
                "email": email,
                "data": { "full_name": full_name, "role": role },
            }));

        let user: ProviderUser = Self::parse(Self::send(request).await?).await?;
        Ok(user.id)
    }

    async fn delete_user(&self, user_id: Uuid) -> Result<(), AuthProviderError> {
        let request = self.admin(
            self.http
                .delete(format!("{}/admin/users/{}", self.base_url, user_id)),
        )?;

        Self::send(request).await.map(|_| ())
    }
}

// --- Mock ---

#[derive(Clone)]
struct MockAccount {
    id: Uuid,
    password: String,
}

/// MockAuthProvider
///
/// In-memory identity provider for tests. Tokens it hands out are opaque
/// strings of the form `mock-token-<uuid>`.
#[derive(Default)]
pub struct MockAuthProvider {
    accounts: Mutex<HashMap<String, MockAccount>>,
    /// When true, every call fails as if the provider were down.
    pub should_fail: bool,
    /// When false, admin operations fail with `NotConfigured`.
    pub admin_enabled: bool,
}

impl MockAuthProvider {
    pub fn new() -> Self {
        Self {
            admin_enabled: true,
            ..Self::default()
        }
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::new()
        }
    }

    pub fn without_admin_key() -> Self {
        Self::default()
    }

    /// Registers an account with a fixed id, for tests that seed profiles first.
    pub fn with_account(self, id: Uuid, email: &str, password: &str) -> Self {
        self.lock().insert(
            email.to_lowercase(),
            MockAccount {
                id,
                password: password.to_string(),
            },
        );
        self
    }

    pub fn token_for(id: Uuid) -> String {
        format!("mock-token-{}", id)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, MockAccount>> {
        self.accounts.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_available(&self) -> Result<(), AuthProviderError> {
        if self.should_fail {
            Err(AuthProviderError::Unavailable("mock provider offline".to_string()))
        } else {
            Ok(())
        }
    }

    fn check_admin(&self) -> Result<(), AuthProviderError> {
        self.check_available()?;
        if self.admin_enabled {
            Ok(())
        } else {
            Err(AuthProviderError::NotConfigured)
        }
    }
}

#[async_trait]
impl AuthProvider for MockAuthProvider {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        _full_name: &str,
    ) -> Result<Uuid, AuthProviderError> {
        self.check_available()?;
        let mut accounts = self.lock();
        let key = email.to_lowercase();
        if accounts.contains_key(&key) {
            return Err(AuthProviderError::Rejected("User already registered".to_string()));
        }
        let id = Uuid::new_v4();
        accounts.insert(
            key,
            MockAccount {
                id,
                password: password.to_string(),
            },
        );
        Ok(id)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthProviderError> {
        self.check_available()?;
        let accounts = self.lock();
        match accounts.get(&email.to_lowercase()) {
            Some(account) if account.password == password => Ok(AuthSession {
                access_token: Self::token_for(account.id),
                refresh_token: None,
                expires_in: 3600,
                user: ProviderUser {
                    id: account.id,
                    email: Some(email.to_string()),
                },
            }),
            _ => Err(AuthProviderError::Rejected("Invalid login credentials".to_string())),
        }
    }

    async fn send_password_reset(
        &self,
        _email: &str,
        _redirect_to: &str,
    ) -> Result<(), AuthProviderError> {
        self.check_available()
    }

    async fn update_password(
        &self,
        access_token: &str,
        new_password: &str,
    ) -> Result<(), AuthProviderError> {
        self.check_available()?;
        let mut accounts = self.lock();
        let account = accounts
            .values_mut()
            .find(|a| Self::token_for(a.id) == access_token)
            .ok_or_else(|| AuthProviderError::Rejected("Invalid session".to_string()))?;
        account.password = new_password.to_string();
        Ok(())
    }

    async fn invite_user(
        &self,
        email: &str,
        _full_name: &str,
        _role: &str,
    ) -> Result<Uuid, AuthProviderError> {
        self.check_admin()?;
        let id = Uuid::new_v4();
        self.lock().insert(
            email.to_lowercase(),
            MockAccount {
                id,
                password: String::new(),
            },
        );
        Ok(id)
    }

    async fn delete_user(&self, user_id: Uuid) -> Result<(), AuthProviderError> {
        self.check_admin()?;
        let mut accounts = self.lock();
        let before = accounts.len();
        accounts.retain(|_, a| a.id != user_id);
        if accounts.len() == before {
            return Err(AuthProviderError::Rejected("User not found".to_string()));
        }
        Ok(())
    }
}
