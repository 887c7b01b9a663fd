//! Normalization of controller response bodies

use serde_json::Value;

/// Envelope key wrapping paginated collections.
pub const ENVELOPE_KEY: &str = "items";

/// Tagged shape of a fetched body, produced once per fetch and consumed
/// uniformly by the walk engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// No body: the resource exists but returned nothing.
    Empty,
    /// Bare JSON array of records.
    Collection(Vec<Value>),
    /// Pagination envelope, unwrapped. A non-array `items` value is coerced
    /// to an empty sequence rather than rejected.
    Envelope(Vec<Value>),
    /// Single resource with no collection wrapper.
    Singleton(Value),
}

impl Payload {
    pub fn normalize(body: Option<Value>) -> Self {
        match body {
            None | Some(Value::Null) => Payload::Empty,
            Some(Value::Array(items)) => Payload::Collection(items),
            Some(Value::Object(mut map)) if map.contains_key(ENVELOPE_KEY) => {
                match map.remove(ENVELOPE_KEY) {
                    Some(Value::Array(items)) => Payload::Envelope(items),
                    _ => Payload::Envelope(Vec::new()),
                }
            }
            Some(other) => Payload::Singleton(other),
        }
    }
}
