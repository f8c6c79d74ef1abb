use std::sync::Arc;
use std::time::Duration;
use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use dibantuin::clients::http::{emulation_for, HttpClient};
use dibantuin::config::{Backend, Settings};
use dibantuin::models::CollectionPath;
use dibantuin::render::{render_home, AppInfo};
use dibantuin::services::{AuthService, IdentityToolkitAuth, LocalAuth, RosterDeps, RosterOptions, RosterState, RosterView};
use dibantuin::storage::{FirestoreStore, MemoryStore, PassthroughBlobStore, S3BlobStore};

async fn build_deps(settings: &Settings) -> Result<RosterDeps> {
    match settings.backend {
        Backend::Static => {
            let path = CollectionPath::vendors(&settings.app_id);
            Ok(RosterDeps {
                auth: Arc::new(LocalAuth::new()),
                store: Arc::new(MemoryStore::seeded(&path)),
                blobs: Arc::new(PassthroughBlobStore),
            })
        }
        Backend::Firestore => {
            let http = HttpClient::new(
                emulation_for(&settings.firebase.emulation),
                Duration::from_secs(settings.firebase.request_timeout_secs.max(1)),
            )?;
            let auth: Arc<dyn AuthService> = Arc::new(IdentityToolkitAuth::new(http.clone(), &settings.firebase));
            let store = FirestoreStore::new(http, &settings.firebase).with_auth(Arc::clone(&auth));

            let blobs = S3BlobStore::new(&settings.storage).await?;
            if let Err(e) = blobs.verify_bucket().await {
                warn!(error = %e, "Images will fall back to the placeholder");
            }

            Ok(RosterDeps {
                auth,
                store: Arc::new(store),
                blobs: Arc::new(blobs),
            })
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::new()?;
    info!(app_id = %settings.app_id, backend = ?settings.backend, "Starting Dibantuin");

    let deps = build_deps(&settings).await?;
    let auth = Arc::clone(&deps.auth);
    let view = RosterView::new(deps, RosterOptions::from_settings(&settings));
    let mut states = view.state();
    let handle = view.activate()?;

    loop {
        let state = states.borrow_and_update().clone();
        let user = auth.current_user();
        let info = AppInfo {
            app_id: &settings.app_id,
            user_id: user.as_ref().map(|c| c.uid.as_str()),
        };
        println!("{}", render_home(&state, &info));

        if state == RosterState::Cancelled {
            break;
        }

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    handle.deactivate();
    Ok(())
}
