use std::sync::Arc;
use std::time::Duration;
use chrono::Utc;
use http::StatusCode;
use tracing::{debug, error, info};
use crate::clients::HttpClient;
use crate::config::FirebaseConfig;
use crate::error::{Error, Result};
use crate::models::{fields_to_json, CollectionPath, Document, ListDocumentsResponse, Snapshot};
use crate::services::auth::AuthService;
use crate::storage::documents::{DocumentStore, SnapshotSender, Subscription};
use crate::utils::retry_with_backoff;

const MAX_RETRIES: u32 = 3;
const BASE_DELAY_MS: u64 = 1000;
const PAGE_SIZE: u32 = 300;

/// Firestore over its REST API. A subscription is a poll loop that emits a
/// snapshot on the first read and whenever the document set changes.
#[derive(Clone)]
pub struct FirestoreStore {
    http: HttpClient,
    base_url: String,
    project_id: String,
    api_key: String,
    poll_interval: Duration,
    auth: Option<Arc<dyn AuthService>>,
}

impl FirestoreStore {
    pub fn new(http: HttpClient, config: &FirebaseConfig) -> Self {
        Self {
            http,
            base_url: config.firestore_url.trim_end_matches('/').to_string(),
            project_id: config.project_id.clone(),
            api_key: config.api_key.clone(),
            poll_interval: Duration::from_millis(config.poll_interval_ms.max(100)),
            auth: None,
        }
    }

    /// Requests carry the signed-in user's id token once there is one.
    pub fn with_auth(mut self, auth: Arc<dyn AuthService>) -> Self {
        self.auth = Some(auth);
        self
    }

    fn collection_url(&self, path: &CollectionPath) -> String {
        format!(
            "{}/v1/projects/{}/databases/(default)/documents/{}",
            self.base_url, self.project_id, path
        )
    }

    /// Reads every document of the collection, following page tokens.
    pub async fn fetch_collection(&self, path: &CollectionPath) -> Result<Vec<Document>> {
        let url = self.collection_url(path);
        let id_token = self
            .auth
            .as_ref()
            .and_then(|auth| auth.current_user())
            .filter(|credential| !credential.is_expired(Utc::now()))
            .map(|credential| credential.id_token);

        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![
                ("key", self.api_key.clone()),
                ("pageSize", PAGE_SIZE.to_string()),
            ];
            if let Some(token) = &page_token {
                query.push(("pageToken", token.clone()));
            }

            let request = HttpClient::with_bearer(self.http.get(&url).query(&query), id_token.as_deref());
            let response = self.http.send(request).await?;

            debug!(
                status = response.status().as_u16(),
                collection = %path,
                "Collection page received"
            );

            if response.status() != StatusCode::OK {
                response.error_for_status()?;
                return Err(Error::Storage(format!("unexpected response listing {}", path)));
            }

            let body = response.bytes().await?;
            let page: ListDocumentsResponse = serde_json::from_slice(&body).map_err(|e| {
                error!(
                    error = %e,
                    body = %String::from_utf8_lossy(&body),
                    "Failed to parse collection page"
                );
                Error::from(e)
            })?;

            documents.extend(
                page.documents
                    .iter()
                    .map(|doc| Document::new(doc.id(), fields_to_json(&doc.fields))),
            );

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(documents)
    }

    async fn poll(self, path: CollectionPath, sender: SnapshotSender) {
        info!(collection = %path, interval_ms = self.poll_interval.as_millis() as u64, "Starting collection poll");
        let mut last: Option<Vec<Document>> = None;

        loop {
            let store = &self;
            let target = &path;
            let fetched = tokio::select! {
                _ = sender.closed() => break,
                result = retry_with_backoff(MAX_RETRIES, BASE_DELAY_MS, move || store.fetch_collection(target)) => result,
            };

            match fetched {
                Ok(documents) => {
                    if let Some(snapshot) = changed_snapshot(&mut last, documents) {
                        debug!(collection = %path, documents = snapshot.len(), "Collection changed");
                        if !sender.send(Ok(snapshot)) {
                            break;
                        }
                    }
                }
                Err(e) => {
                    error!(error = %e, collection = %path, "Collection poll failed");
                    sender.send(Err(Error::Subscription(e.to_string())));
                    break;
                }
            }

            tokio::select! {
                _ = sender.closed() => break,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }

        debug!(collection = %path, "Collection poll stopped");
    }
}

/// Remembers `documents` and returns them as a snapshot, unless they are the
/// same as the previous read.
fn changed_snapshot(last: &mut Option<Vec<Document>>, documents: Vec<Document>) -> Option<Snapshot> {
    if last.as_ref() == Some(&documents) {
        return None;
    }
    *last = Some(documents.clone());
    Some(Snapshot::new(documents))
}

impl DocumentStore for FirestoreStore {
    fn subscribe(&self, path: &CollectionPath) -> Subscription {
        let (sender, subscription) = Subscription::channel();
        tokio::spawn(self.clone().poll(path.clone(), sender));
        subscription
    }
}
