pub mod blob;
pub mod documents;
pub mod firestore;
pub mod memory;
pub mod s3;

pub use blob::{BlobStore, PassthroughBlobStore};
pub use documents::{DocumentStore, SnapshotSender, Subscription};
pub use firestore::FirestoreStore;
pub use memory::MemoryStore;
pub use s3::S3BlobStore;
