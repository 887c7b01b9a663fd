//! restsnap core
//!
//! Collects the full configuration state of a network controller's REST API:
//! a flat list of endpoint declarations is expanded per tenant domain,
//! compiled into a tree grouped by shared URI prefixes, then walked against
//! the live controller, substituting discovered identifiers into child URIs
//! and assembling one nested snapshot document that mirrors the controller's
//! resource hierarchy.
//!
//! # Example
//!
//! ```no_run
//! use restsnap_core::{compile, Collector, EndpointDeclaration, HttpClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), restsnap_core::Error> {
//!     let declarations = EndpointDeclaration::load("endpoints.yaml")?;
//!     let nodes = compile(&declarations);
//!
//!     let client = HttpClient::with_api_key("https://controller.example.com", "key")?;
//!     let collector = Collector::new(client);
//!     let document = collector.collect(&nodes).await;
//!
//!     println!("{}", serde_json::to_string_pretty(&document)?);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod declaration;
pub mod document;
pub mod error;
pub mod resolve;
pub mod response;
pub mod tree;
pub mod walk;

pub use client::{Fetch, HttpClient, HttpClientConfig};
pub use declaration::{expand_domains, EndpointDeclaration, DOMAIN_TOKEN};
pub use document::{EndpointResult, FetchedRecord, ResultDocument};
pub use error::{Error, Result};
pub use resolve::{IdResolver, DEFAULT_ID_KEY};
pub use response::Payload;
pub use tree::{compile, EndpointNode, NodeEntry};
pub use walk::{Collector, EmptyChildren, WalkOptions};
