//! Recursive fetch engine: walks a compiled endpoint tree against a live
//! controller and assembles the snapshot document.

use futures::future::BoxFuture;
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use serde_json::json;

use crate::client::Fetch;
use crate::document::{EndpointResult, FetchedRecord, ResultDocument};
use crate::resolve::IdResolver;
use crate::response::Payload;
use crate::tree::EndpointNode;

/// What to do with a parent record whose child fetch produced zero records.
///
/// The upstream controllers disagree on this, so the choice is explicit
/// instead of silently normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyChildren {
    /// Keep an explicit empty collection under the child name.
    #[default]
    Keep,
    /// Drop the child key from the record entirely.
    Omit,
}

/// Traversal options.
#[derive(Debug, Clone)]
pub struct WalkOptions {
    pub empty_children: EmptyChildren,
    /// Concurrent per-identifier child walks. 1 reproduces the sequential
    /// depth-first baseline exactly; higher values overlap network latency
    /// while preserving discovery order.
    pub concurrency: usize,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            empty_children: EmptyChildren::Keep,
            concurrency: 1,
        }
    }
}

/// Walks compiled endpoint trees using an external [`Fetch`] collaborator.
pub struct Collector<F> {
    fetch: F,
    resolver: IdResolver,
    options: WalkOptions,
}

impl<F: Fetch> Collector<F> {
    pub fn new(fetch: F) -> Self {
        Self {
            fetch,
            resolver: IdResolver::default(),
            options: WalkOptions::default(),
        }
    }

    pub fn with_resolver(mut self, resolver: IdResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_options(mut self, options: WalkOptions) -> Self {
        self.options = options;
        self
    }

    /// The fetch collaborator driving this collector.
    pub fn fetcher(&self) -> &F {
        &self.fetch
    }

    /// Walk every top-level node and assemble the final document.
    pub async fn collect(&self, nodes: &[EndpointNode]) -> ResultDocument {
        let mut document = ResultDocument::new();
        for node in nodes {
            self.collect_into(node, &mut document).await;
        }
        document
    }

    /// Walk one top-level node into an existing document. Exposed so a
    /// caller can interleave progress reporting between endpoints.
    pub async fn collect_into(&self, node: &EndpointNode, document: &mut ResultDocument) {
        let result = self.walk(node, "").await;
        for name in node.result_names() {
            document.insert(&name, result.clone());
        }
    }

    /// Walk `node` with `parent_uri` as the caller's base (already carrying
    /// the parent identifier; empty for top-level nodes).
    ///
    /// A transport failure becomes a `Failed` entry for this node alone;
    /// siblings and ancestors are untouched and the node can be re-walked
    /// later without revisiting completed subtrees.
    pub fn walk<'a>(
        &'a self,
        node: &'a EndpointNode,
        parent_uri: &'a str,
    ) -> BoxFuture<'a, EndpointResult> {
        async move {
            let collection_uri = format!("{}{}", parent_uri, node.segment);
            tracing::debug!(uri = %collection_uri, "walking endpoint");

            let payload = match self.fetch.fetch(&collection_uri).await {
                Ok(body) => Payload::normalize(body),
                Err(err) => {
                    tracing::error!(uri = %collection_uri, error = %err, "fetch failed");
                    return EndpointResult::Failed {
                        error: json!({
                            "status_code": err.status(),
                            "message": err.to_string(),
                        }),
                        endpoint: collection_uri,
                    };
                }
            };

            let resolved: Vec<(FetchedRecord, Option<String>)> = match payload {
                Payload::Singleton(data) => {
                    if !node.children.is_empty() {
                        tracing::info!(
                            uri = %collection_uri,
                            "singleton resource, skipping declared children"
                        );
                    }
                    return EndpointResult::Singleton(Box::new(FetchedRecord::new(
                        data,
                        collection_uri,
                    )));
                }
                Payload::Empty => vec![(
                    FetchedRecord::new(json!({}), collection_uri.clone()),
                    None,
                )],
                Payload::Collection(items) | Payload::Envelope(items) => items
                    .into_iter()
                    .map(|item| {
                        let id = self.resolver.resolve(&item, node.id_name());
                        let endpoint = match &id {
                            Some(id) => format!("{}/{}", collection_uri, id),
                            None => collection_uri.clone(),
                        };
                        (FetchedRecord::new(item, endpoint), id)
                    })
                    .collect(),
            };

            let (mut records, ids): (Vec<FetchedRecord>, Vec<Option<String>>) =
                resolved.into_iter().unzip();

            // Children in declared order; within one child, parent
            // identifiers in discovery order. Records stay addressable by
            // index, so attachment never re-scans for identifier equality.
            for child in &node.children {
                let child_base = if node.is_root() {
                    node.segment.as_str()
                } else {
                    collection_uri.as_str()
                };

                // Futures are materialized before streaming; a lazy iterator
                // here trips the closure lifetime inference inside the boxed
                // recursion.
                let walks: Vec<_> = ids
                    .iter()
                    .enumerate()
                    .filter_map(|(index, id)| {
                        let id = id.as_ref()?;
                        let base = format!("{}/{}", child_base, id);
                        Some(async move { (index, self.walk(child, &base).await) })
                    })
                    .collect();
                let results = stream::iter(walks)
                    .buffered(self.options.concurrency.max(1))
                    .collect::<Vec<_>>()
                    .await;

                for (index, result) in results {
                    if self.options.empty_children == EmptyChildren::Omit {
                        if let EndpointResult::Collection(items) = &result {
                            if items.is_empty() {
                                continue;
                            }
                        }
                    }
                    for name in child.result_names() {
                        records[index].attach_child(name, result.clone());
                    }
                }
            }

            EndpointResult::Collection(records)
        }
        .boxed()
    }
}
