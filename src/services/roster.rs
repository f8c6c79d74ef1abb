//! The live vendor roster.
//!
//! A [`RosterView`] signs in, subscribes to the vendor collection of its
//! application partition, and turns every snapshot into a list of
//! [`DisplayVendor`]s with a fetchable profile picture. The latest result is
//! published on a `watch` channel, so readers only ever see whole states.
//!
//! State flow: `Idle -> Loading -> Populated | Empty`, re-entered on every
//! snapshot. A failed subscription lands in `Empty`. `Cancelled` is terminal
//! and wins over anything still in flight.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use futures_util::StreamExt;
use futures_util::future::join_all;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use crate::config::{Settings, DEFAULT_AUTH_TIMEOUT_MS, DEFAULT_PLACEHOLDER_URL};
use crate::error::{Error, Result};
use crate::models::{CollectionPath, DisplayVendor, Snapshot, VendorRecord};
use crate::services::auth::{bootstrap, AuthService};
use crate::storage::{BlobStore, DocumentStore};
use crate::utils::CancelFlag;

#[derive(Debug, Clone, PartialEq)]
pub enum RosterState {
    /// Not activated yet.
    Idle,
    /// Activated, no snapshot delivered yet.
    Loading,
    Populated(Arc<Vec<DisplayVendor>>),
    /// Zero vendors, or the subscription failed.
    Empty,
    Cancelled,
}

impl RosterState {
    pub fn is_loading(&self) -> bool {
        matches!(self, RosterState::Loading)
    }

    pub fn vendors(&self) -> &[DisplayVendor] {
        match self {
            RosterState::Populated(vendors) => vendors.as_slice(),
            _ => &[],
        }
    }
}

/// The backends a roster view talks to.
#[derive(Clone)]
pub struct RosterDeps {
    pub auth: Arc<dyn AuthService>,
    pub store: Arc<dyn DocumentStore>,
    pub blobs: Arc<dyn BlobStore>,
}

#[derive(Debug, Clone)]
pub struct RosterOptions {
    pub app_id: String,
    /// Custom sign-in token; anonymous sign-in when absent.
    pub auth_token: Option<String>,
    pub placeholder_url: String,
    /// Upper bound on sign-in before the view subscribes regardless.
    pub auth_timeout: Duration,
}

impl RosterOptions {
    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            auth_token: None,
            placeholder_url: DEFAULT_PLACEHOLDER_URL.to_string(),
            auth_timeout: Duration::from_millis(DEFAULT_AUTH_TIMEOUT_MS),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            app_id: settings.app_id.clone(),
            auth_token: settings.initial_auth_token.clone().filter(|t| !t.is_empty()),
            placeholder_url: settings.roster.placeholder_url.clone(),
            auth_timeout: Duration::from_millis(settings.roster.auth_timeout_ms),
        }
        .normalized()
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn with_auth_timeout(mut self, timeout: Duration) -> Self {
        self.auth_timeout = timeout;
        self
    }

    pub fn with_placeholder(mut self, url: impl Into<String>) -> Self {
        self.placeholder_url = url.into();
        self.normalized()
    }

    /// A blank placeholder would leave vendors without a picture.
    fn normalized(mut self) -> Self {
        if self.placeholder_url.trim().is_empty() {
            self.placeholder_url = DEFAULT_PLACEHOLDER_URL.to_string();
        }
        self
    }
}

pub struct RosterView {
    deps: RosterDeps,
    options: RosterOptions,
    state: Arc<watch::Sender<RosterState>>,
    activated: AtomicBool,
}

impl RosterView {
    pub fn new(deps: RosterDeps, options: RosterOptions) -> Self {
        let (state, _) = watch::channel(RosterState::Idle);
        Self {
            deps,
            options: options.normalized(),
            state: Arc::new(state),
            activated: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> watch::Receiver<RosterState> {
        self.state.subscribe()
    }

    pub fn current(&self) -> RosterState {
        self.state.borrow().clone()
    }

    pub fn options(&self) -> &RosterOptions {
        &self.options
    }

    /// Starts synchronizing on the current tokio runtime. A view can only be
    /// activated once; after deactivation it stays `Cancelled`.
    pub fn activate(&self) -> Result<RosterHandle> {
        if self.activated.swap(true, Ordering::SeqCst) {
            return Err(Error::AlreadyActive);
        }

        publish(&self.state, RosterState::Loading);

        let cancel = CancelFlag::new();
        let task = tokio::spawn(synchronize(
            self.deps.clone(),
            self.options.clone(),
            Arc::clone(&self.state),
            cancel.clone(),
        ));

        info!(app_id = %self.options.app_id, "Roster view activated");

        Ok(RosterHandle {
            cancel,
            state: Arc::clone(&self.state),
            task: Some(task),
        })
    }
}

/// Keeps a roster view mounted. Dropping it deactivates the view.
pub struct RosterHandle {
    cancel: CancelFlag,
    state: Arc<watch::Sender<RosterState>>,
    task: Option<JoinHandle<()>>,
}

impl RosterHandle {
    /// Stops the subscription and discards in-flight work. Idempotent.
    pub fn deactivate(&self) {
        if !self.cancel.cancel() {
            return;
        }
        if let Some(task) = &self.task {
            task.abort();
        }
        self.state.send_if_modified(|state| {
            if *state == RosterState::Cancelled {
                return false;
            }
            *state = RosterState::Cancelled;
            true
        });
        info!("Roster view deactivated");
    }

    pub fn is_active(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// Waits for the synchronization task to stop on its own (the store closed
    /// the subscription) and then deactivates.
    pub async fn finished(mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    error!(error = %e, "Roster task panicked");
                }
            }
        }
        self.deactivate();
    }
}

impl Drop for RosterHandle {
    fn drop(&mut self) {
        self.deactivate();
    }
}

/// Replaces the published state unless the view was cancelled meanwhile.
fn publish(state: &watch::Sender<RosterState>, next: RosterState) -> bool {
    state.send_if_modified(|current| {
        if *current == RosterState::Cancelled {
            return false;
        }
        *current = next;
        true
    })
}

async fn synchronize(
    deps: RosterDeps,
    options: RosterOptions,
    state: Arc<watch::Sender<RosterState>>,
    cancel: CancelFlag,
) {
    // Auth only gates the subscription; a failure or a stalled sign-in still
    // lets the store decide.
    let signed_in = tokio::time::timeout(
        options.auth_timeout,
        bootstrap(deps.auth.as_ref(), options.auth_token.as_deref()),
    );
    tokio::select! {
        biased;
        _ = cancel.cancelled() => return,
        result = signed_in => {
            let result = result.unwrap_or_else(|_| {
                Err(Error::Auth(format!(
                    "sign-in did not finish within {}ms",
                    options.auth_timeout.as_millis()
                )))
            });
            if let Err(e) = result {
                warn!(error = %e, "Continuing without a credential");
            }
        }
    }

    let path = CollectionPath::vendors(&options.app_id);
    let mut subscription = deps.store.subscribe(&path);
    debug!(collection = %path, "Subscribed to vendor collection");

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = subscription.next() => next,
        };

        match next {
            Some(Ok(snapshot)) => {
                let vendors = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    vendors = enrich_snapshot(deps.blobs.as_ref(), &snapshot, &options.placeholder_url) => vendors,
                };

                info!(collection = %path, vendors = snapshot.len(), "Roster snapshot applied");
                let next_state = if snapshot.is_empty() {
                    RosterState::Empty
                } else {
                    RosterState::Populated(Arc::new(vendors))
                };
                publish(&state, next_state);
            }
            Some(Err(e)) => {
                error!(error = %e, collection = %path, "Vendor subscription failed");
                publish(&state, RosterState::Empty);
                break;
            }
            None => {
                debug!(collection = %path, "Vendor subscription closed");
                state.send_if_modified(|current| {
                    if current.is_loading() {
                        *current = RosterState::Empty;
                        return true;
                    }
                    false
                });
                break;
            }
        }
    }

    subscription.cancel();
}

/// Builds the display list for one snapshot.
///
/// Every image is resolved concurrently; the result keeps snapshot order.
/// A record whose image is missing or fails to resolve gets `placeholder`.
pub async fn enrich_snapshot(
    blobs: &dyn BlobStore,
    snapshot: &Snapshot,
    placeholder: &str,
) -> Vec<DisplayVendor> {
    let pending = snapshot
        .documents
        .iter()
        .map(|document| enrich_record(blobs, VendorRecord::from_document(document), placeholder));
    join_all(pending).await
}

async fn enrich_record(blobs: &dyn BlobStore, record: VendorRecord, placeholder: &str) -> DisplayVendor {
    let profile_pic = match record.image_reference() {
        None => placeholder.to_string(),
        Some(reference) => match blobs.resolve(reference).await {
            Ok(url) if !url.trim().is_empty() => url,
            Ok(_) => {
                warn!(vendor_id = %record.id, reference = reference, "Blob store returned an empty URL");
                placeholder.to_string()
            }
            Err(e) => {
                let e = Error::from(e);
                warn!(
                    error = %e,
                    vendor_id = %record.id,
                    reference = reference,
                    "Using placeholder image"
                );
                placeholder.to_string()
            }
        },
    };

    DisplayVendor::new(record, profile_pic)
}
