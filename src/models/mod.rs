mod vendor;
mod snapshot;
mod credential;
mod response;

pub use vendor::{VendorRecord, DisplayVendor};
pub use snapshot::{CollectionPath, Document, Snapshot};
pub use credential::Credential;
pub use response::{
    fields_to_json, FirestoreDocument, FirestoreValue, ListDocumentsResponse, SignInRequest,
    SignInResponse,
};
