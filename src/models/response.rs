use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// A typed Firestore REST value, e.g. `{"integerValue": "120"}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FirestoreValue {
    NullValue,
    BooleanValue(bool),
    IntegerValue(String),
    DoubleValue(f64),
    TimestampValue(String),
    StringValue(String),
    BytesValue(String),
    ReferenceValue(String),
    GeoPointValue(GeoPoint),
    ArrayValue(ArrayValue),
    MapValue(MapValue),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GeoPoint {
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ArrayValue {
    #[serde(default)]
    pub values: Vec<FirestoreValue>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MapValue {
    #[serde(default)]
    pub fields: BTreeMap<String, FirestoreValue>,
}

impl FirestoreValue {
    /// Plain JSON for the typed value. Integers arrive as strings on the wire
    /// and are turned back into numbers when they parse.
    pub fn to_json(&self) -> Value {
        match self {
            FirestoreValue::NullValue => Value::Null,
            FirestoreValue::BooleanValue(b) => Value::Bool(*b),
            FirestoreValue::IntegerValue(raw) => raw
                .parse::<i64>()
                .map(|n| Value::Number(n.into()))
                .unwrap_or_else(|_| Value::String(raw.clone())),
            FirestoreValue::DoubleValue(d) => {
                Number::from_f64(*d).map(Value::Number).unwrap_or(Value::Null)
            }
            FirestoreValue::TimestampValue(s)
            | FirestoreValue::StringValue(s)
            | FirestoreValue::BytesValue(s)
            | FirestoreValue::ReferenceValue(s) => Value::String(s.clone()),
            FirestoreValue::GeoPointValue(point) => serde_json::json!({
                "latitude": point.latitude,
                "longitude": point.longitude,
            }),
            FirestoreValue::ArrayValue(array) => {
                Value::Array(array.values.iter().map(FirestoreValue::to_json).collect())
            }
            FirestoreValue::MapValue(map) => fields_to_json(&map.fields),
        }
    }
}

pub fn fields_to_json(fields: &BTreeMap<String, FirestoreValue>) -> Value {
    let map: Map<String, Value> = fields
        .iter()
        .map(|(key, value)| (key.clone(), value.to_json()))
        .collect();
    Value::Object(map)
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FirestoreDocument {
    pub name: String,
    #[serde(default)]
    pub fields: BTreeMap<String, FirestoreValue>,
}

impl FirestoreDocument {
    /// The last segment of the resource name.
    pub fn id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDocumentsResponse {
    #[serde(default)]
    pub documents: Vec<FirestoreDocument>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<&'a str>,
    pub return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInResponse {
    pub local_id: String,
    pub id_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Seconds, as a decimal string.
    #[serde(default)]
    pub expires_in: Option<String>,
}
