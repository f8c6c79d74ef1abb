use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;
use super::snapshot::Document;

/// A vendor as stored in the document store. The view never writes these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct VendorRecord {
    #[serde(skip)]
    pub id: String,
    pub name: String,
    pub service: String,
    pub rating: f64,
    pub review_count: u64,
    pub image_url: Option<String>,
    pub price: Option<String>,
}

impl VendorRecord {
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Decodes a stored document field by field. A missing, null or
    /// ill-typed field falls back to its default; a document whose fields are
    /// not an object at all keeps only its id.
    pub fn from_document(document: &Document) -> Self {
        let Some(fields) = document.fields.as_object() else {
            warn!(document_id = %document.id, "Malformed vendor document, keeping id only");
            return Self::with_id(document.id.clone());
        };

        let id = document.id.as_str();
        Self {
            id: id.to_string(),
            name: lenient_field(fields, "name", id).unwrap_or_default(),
            service: lenient_field(fields, "service", id).unwrap_or_default(),
            rating: lenient_field(fields, "rating", id).unwrap_or_default(),
            review_count: lenient_field(fields, "reviewCount", id).unwrap_or_default(),
            image_url: lenient_field(fields, "imageUrl", id),
            price: lenient_field(fields, "price", id),
        }
    }

    /// Blank image references count as absent.
    pub fn image_reference(&self) -> Option<&str> {
        self.image_url
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
    }
}

fn lenient_field<T: DeserializeOwned>(fields: &Map<String, Value>, key: &str, document_id: &str) -> Option<T> {
    let value = fields.get(key).filter(|v| !v.is_null())?;
    match T::deserialize(value) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            warn!(error = %e, document_id = document_id, field = key, "Ignoring malformed vendor field");
            None
        }
    }
}

/// A vendor ready for display: the stored record plus a fetchable picture URL.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayVendor {
    pub id: String,
    #[serde(flatten)]
    pub record: VendorRecord,
    pub profile_pic: String,
}

impl DisplayVendor {
    pub fn new(record: VendorRecord, profile_pic: String) -> Self {
        Self {
            id: record.id.clone(),
            record,
            profile_pic,
        }
    }

    pub fn name(&self) -> &str {
        &self.record.name
    }

    pub fn service(&self) -> &str {
        &self.record.service
    }
}
