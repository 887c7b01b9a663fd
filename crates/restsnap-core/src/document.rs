//! Fetched records and the assembled snapshot document

use indexmap::map::Entry;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

/// One resource instance returned by the controller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchedRecord {
    /// Opaque payload as returned by the controller.
    pub data: Value,
    /// Exact URI addressing this record.
    pub endpoint: String,
    /// Child-endpoint results, attached once the subtree completes in the
    /// order the children were declared. Absent when the node has no walked
    /// children.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<IndexMap<String, EndpointResult>>,
}

impl FetchedRecord {
    pub fn new(data: Value, endpoint: String) -> Self {
        Self {
            data,
            endpoint,
            children: None,
        }
    }

    /// Attach a child result under `name`, creating the children map on
    /// first use. Each child name has exactly one writer per record.
    pub fn attach_child(&mut self, name: String, result: EndpointResult) {
        self.children.get_or_insert_with(IndexMap::new).insert(name, result);
    }
}

/// Result of walking one endpoint node.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EndpointResult {
    /// Collection endpoints: ordered records, discovery order preserved.
    Collection(Vec<FetchedRecord>),
    /// Singleton endpoints: one record, no `items` wrapper.
    Singleton(Box<FetchedRecord>),
    /// The fetch for this node failed; siblings are unaffected.
    Failed { error: Value, endpoint: String },
}

/// Snapshot document keyed by endpoint name, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResultDocument {
    entries: IndexMap<String, EndpointResult>,
}

impl ResultDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a result under `name`. Collections accumulated for the same
    /// name (domain expansion can legitimately repeat one) are extended
    /// rather than replaced.
    pub fn insert(&mut self, name: &str, result: EndpointResult) {
        match self.entries.entry(name.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(result);
            }
            Entry::Occupied(mut slot) => match (slot.get_mut(), result) {
                (EndpointResult::Collection(existing), EndpointResult::Collection(mut more)) => {
                    existing.append(&mut more);
                }
                (current, result) => *current = result,
            },
        }
    }

    pub fn get(&self, name: &str) -> Option<&EndpointResult> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &EndpointResult)> {
        self.entries.iter()
    }
}
