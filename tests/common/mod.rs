#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::{watch, Notify, Semaphore};

use dibantuin::error::{Error, ResolveError, Result};
use dibantuin::models::{Credential, Document};
use dibantuin::services::{AuthService, RosterState};
use dibantuin::storage::BlobStore;

pub const PLACEHOLDER: &str = "https://placeholder.test/vendor.png";

/// Blob store with scripted answers, optional per-reference delays, and an
/// optional gate that holds every resolution until released.
#[derive(Default)]
pub struct FakeBlobs {
    answers: HashMap<String, std::result::Result<String, ResolveError>>,
    delays: HashMap<String, Duration>,
    gate: Option<Arc<Semaphore>>,
    pub started: Notify,
    pub calls: AtomicUsize,
}

impl FakeBlobs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, reference: &str, answer: std::result::Result<&str, ResolveError>) -> Self {
        self.answers.insert(reference.to_string(), answer.map(str::to_string));
        self
    }

    pub fn with_delay(mut self, reference: &str, delay: Duration) -> Self {
        self.delays.insert(reference.to_string(), delay);
        self
    }

    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }
}

#[async_trait]
impl BlobStore for FakeBlobs {
    async fn resolve(&self, reference: &str) -> std::result::Result<String, ResolveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.started.notify_one();

        if let Some(gate) = &self.gate {
            let _permit = gate.acquire().await.map_err(|e| ResolveError::Backend(e.to_string()))?;
        }
        if let Some(delay) = self.delays.get(reference) {
            tokio::time::sleep(*delay).await;
        }

        self.answers
            .get(reference)
            .cloned()
            .unwrap_or_else(|| Err(ResolveError::NotFound(reference.to_string())))
    }
}

/// Auth that succeeds or fails on demand, optionally after a gate opens.
pub struct FakeAuth {
    fail: bool,
    gate: Option<Arc<Semaphore>>,
    pub calls: AtomicUsize,
    pub last_token: std::sync::Mutex<Option<String>>,
}

impl FakeAuth {
    pub fn ok() -> Self {
        Self { fail: false, gate: None, calls: AtomicUsize::new(0), last_token: Default::default() }
    }

    pub fn failing() -> Self {
        Self { fail: true, ..Self::ok() }
    }

    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    async fn sign_in(&self, token: Option<&str>) -> Result<Credential> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_token.lock().unwrap() = token.map(str::to_string);

        if let Some(gate) = &self.gate {
            let _permit = gate.acquire().await.map_err(|e| Error::Auth(e.to_string()))?;
        }
        if self.fail {
            return Err(Error::Auth("sign-in disabled".to_string()));
        }
        Ok(Credential {
            uid: "user-1".to_string(),
            id_token: "token".to_string(),
            refresh_token: None,
            expires_at: None,
            anonymous: token.is_none(),
        })
    }
}

#[async_trait]
impl AuthService for FakeAuth {
    async fn sign_in_anonymous(&self) -> Result<Credential> {
        self.sign_in(None).await
    }

    async fn sign_in_with_token(&self, token: &str) -> Result<Credential> {
        self.sign_in(Some(token)).await
    }

    fn current_user(&self) -> Option<Credential> {
        None
    }
}

pub fn vendor(id: &str, name: &str, image: Option<&str>) -> Document {
    let mut fields = json!({
        "name": name,
        "service": "Tukang Kebun",
        "rating": 4.8,
        "reviewCount": 120,
    });
    if let Some(image) = image {
        fields["imageUrl"] = json!(image);
    }
    Document::new(id, fields)
}

/// Waits until the published state satisfies `predicate`.
pub async fn wait_for<F>(receiver: &mut watch::Receiver<RosterState>, predicate: F) -> RosterState
where
    F: Fn(&RosterState) -> bool,
{
    let waiting = async {
        loop {
            {
                let state = receiver.borrow_and_update();
                if predicate(&state) {
                    return state.clone();
                }
            }
            if receiver.changed().await.is_err() {
                return receiver.borrow().clone();
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(2), waiting)
        .await
        .expect("roster state did not settle in time")
}

/// Lets spawned tasks run for a while on the current-thread runtime.
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
    tokio::time::sleep(Duration::from_millis(20)).await;
}
