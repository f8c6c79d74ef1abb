use std::sync::RwLock;
use async_trait::async_trait;
use chrono::Utc;
use http::StatusCode;
use rand::Rng;
use serde::Deserialize;
use tracing::{debug, error, info};
use crate::clients::HttpClient;
use crate::config::FirebaseConfig;
use crate::error::{Error, Result};
use crate::models::{Credential, SignInRequest, SignInResponse};

#[async_trait]
pub trait AuthService: Send + Sync {
    async fn sign_in_anonymous(&self) -> Result<Credential>;

    async fn sign_in_with_token(&self, token: &str) -> Result<Credential>;

    /// The credential from the last successful sign-in.
    fn current_user(&self) -> Option<Credential>;
}

/// Signs in with `token` when one is given, anonymously otherwise.
pub async fn bootstrap(auth: &dyn AuthService, token: Option<&str>) -> Result<Credential> {
    let result = match token {
        Some(token) => auth.sign_in_with_token(token).await,
        None => auth.sign_in_anonymous().await,
    };

    match &result {
        Ok(credential) => info!(
            uid = %credential.uid,
            anonymous = credential.anonymous,
            "Authentication bootstrap finished"
        ),
        Err(e) => error!(
            error = %e,
            with_token = token.is_some(),
            "Authentication bootstrap failed"
        ),
    }

    result
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Identity Toolkit REST client (the API behind Firebase Auth).
pub struct IdentityToolkitAuth {
    http: HttpClient,
    base_url: String,
    api_key: String,
    current: RwLock<Option<Credential>>,
}

impl IdentityToolkitAuth {
    pub fn new(http: HttpClient, config: &FirebaseConfig) -> Self {
        Self {
            http,
            base_url: config.auth_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            current: RwLock::new(None),
        }
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/v1/accounts:{}?key={}", self.base_url, method, self.api_key)
    }

    async fn sign_in(&self, method: &str, token: Option<&str>) -> Result<Credential> {
        let url = self.endpoint(method);
        let body = SignInRequest { token, return_secure_token: true };
        let request = self.http.post_json(&url, &body)?;

        let response = match self.http.send(request).await {
            Ok(response) => response,
            Err(Error::Forbidden) => return Err(Error::Auth(format!("{} was refused", method))),
            Err(e) => return Err(e),
        };
        let status = response.status();
        let payload = response.bytes().await?;

        debug!(status = status.as_u16(), method = method, "Sign-in response received");

        if status != StatusCode::OK {
            let message = serde_json::from_slice::<ErrorEnvelope>(&payload)
                .map(|envelope| envelope.error.message)
                .unwrap_or_else(|_| format!("status {}", status.as_u16()));
            return Err(Error::Auth(message));
        }

        let signed_in: SignInResponse = serde_json::from_slice(&payload)?;
        let credential = to_credential(signed_in, token.is_none());
        self.remember(credential.clone());
        Ok(credential)
    }

    fn remember(&self, credential: Credential) {
        match self.current.write() {
            Ok(mut current) => *current = Some(credential),
            Err(poisoned) => *poisoned.into_inner() = Some(credential),
        }
    }
}

fn to_credential(response: SignInResponse, anonymous: bool) -> Credential {
    let expires_at = response
        .expires_in
        .as_deref()
        .and_then(|secs| secs.parse::<i64>().ok())
        .map(|secs| Utc::now() + chrono::Duration::seconds(secs));

    Credential {
        uid: response.local_id,
        id_token: response.id_token,
        refresh_token: response.refresh_token,
        expires_at,
        anonymous,
    }
}

#[async_trait]
impl AuthService for IdentityToolkitAuth {
    async fn sign_in_anonymous(&self) -> Result<Credential> {
        self.sign_in("signUp", None).await
    }

    async fn sign_in_with_token(&self, token: &str) -> Result<Credential> {
        self.sign_in("signInWithCustomToken", Some(token)).await
    }

    fn current_user(&self) -> Option<Credential> {
        self.current
            .read()
            .map(|current| current.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

/// Auth for the offline roster: every sign-in succeeds locally.
#[derive(Default)]
pub struct LocalAuth {
    current: RwLock<Option<Credential>>,
}

impl LocalAuth {
    pub fn new() -> Self {
        Self::default()
    }

    fn issue(&self, uid: String, anonymous: bool) -> Credential {
        let credential = Credential {
            uid,
            id_token: String::new(),
            refresh_token: None,
            expires_at: None,
            anonymous,
        };
        match self.current.write() {
            Ok(mut current) => *current = Some(credential.clone()),
            Err(poisoned) => *poisoned.into_inner() = Some(credential.clone()),
        }
        credential
    }
}

#[async_trait]
impl AuthService for LocalAuth {
    async fn sign_in_anonymous(&self) -> Result<Credential> {
        let suffix: u32 = rand::rng().random();
        Ok(self.issue(format!("local-{:08x}", suffix), true))
    }

    async fn sign_in_with_token(&self, token: &str) -> Result<Credential> {
        if token.trim().is_empty() {
            return Err(Error::Auth("empty custom token".to_string()));
        }
        Ok(self.issue(format!("local-{}", token.trim()), false))
    }

    fn current_user(&self) -> Option<Credential> {
        self.current
            .read()
            .map(|current| current.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}
