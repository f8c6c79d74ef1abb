use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use serde_json::json;
use tracing::debug;
use crate::error::Error;
use crate::models::{CollectionPath, Document, Snapshot};
use crate::storage::documents::{DocumentStore, SnapshotSender, Subscription};

/// An in-process document store.
///
/// Subscribers get the current contents of a collection straight away (if it
/// has been set) and again after every `replace`.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    collections: HashMap<CollectionPath, Vec<Document>>,
    subscribers: Vec<(CollectionPath, SnapshotSender)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding the built-in vendor roster under `path`.
    pub fn seeded(path: &CollectionPath) -> Self {
        let store = Self::new();
        store.replace(path, seed_vendors());
        store
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Sets the contents of `path` and notifies its subscribers.
    pub fn replace(&self, path: &CollectionPath, documents: Vec<Document>) {
        let mut inner = self.lock();
        inner.collections.insert(path.clone(), documents.clone());
        inner.subscribers.retain(|(subscribed, sender)| {
            if subscribed != path {
                return !sender.is_closed();
            }
            sender.send(Ok(Snapshot::new(documents.clone())))
        });
        debug!(collection = %path, documents = documents.len(), "Collection replaced");
    }

    /// Fails every subscription on `path`; the failed subscribers are dropped.
    pub fn fail(&self, path: &CollectionPath, reason: &str) {
        let mut inner = self.lock();
        inner.subscribers.retain(|(subscribed, sender)| {
            if subscribed != path {
                return !sender.is_closed();
            }
            sender.send(Err(Error::Subscription(reason.to_string())));
            false
        });
    }

    /// Live subscribers on `path`.
    pub fn subscriber_count(&self, path: &CollectionPath) -> usize {
        self.lock()
            .subscribers
            .iter()
            .filter(|(subscribed, sender)| subscribed == path && !sender.is_closed())
            .count()
    }
}

impl DocumentStore for MemoryStore {
    fn subscribe(&self, path: &CollectionPath) -> Subscription {
        let (sender, subscription) = Subscription::channel();
        let mut inner = self.lock();
        if let Some(documents) = inner.collections.get(path) {
            sender.send(Ok(Snapshot::new(documents.clone())));
        }
        inner.subscribers.push((path.clone(), sender));
        subscription
    }
}

/// The featured vendors shown before live data was wired in.
pub fn seed_vendors() -> Vec<Document> {
    vec![
        Document::new("1", json!({
            "name": "Budi",
            "service": "Tukang Kebun",
            "rating": 4.8,
            "reviewCount": 120,
            "price": "Rp 60.000/jam",
            "imageUrl": "https://placehold.co/100x100/A0A0A0/FFFFFF?text=BUDI",
        })),
        Document::new("2", json!({
            "name": "Santi",
            "service": "House Cleaning",
            "rating": 4.9,
            "reviewCount": 250,
            "price": "Rp 75.000/jam",
            "imageUrl": "https://placehold.co/100x100/A0A0A0/FFFFFF?text=SANTI",
        })),
        Document::new("3", json!({
            "name": "Joko",
            "service": "Tukang Listrik",
            "rating": 4.5,
            "reviewCount": 85,
            "price": "Rp 80.000/jam",
            "imageUrl": "https://placehold.co/100x100/A0A0A0/FFFFFF?text=JOKO",
        })),
    ]
}
