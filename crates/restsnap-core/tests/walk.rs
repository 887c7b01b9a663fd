//! Integration tests for the recursive fetch engine, driven by an
//! in-memory fetch double.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use restsnap_core::{
    compile, expand_domains, Collector, EmptyChildren, EndpointDeclaration, EndpointResult, Error,
    Fetch, IdResolver, WalkOptions,
};

/// Canned controller: URI -> body, with optional per-URI failures and a
/// call log for asserting traversal order and scope.
#[derive(Default)]
struct StubFetch {
    responses: HashMap<String, Value>,
    failures: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl StubFetch {
    fn with(responses: &[(&str, Value)]) -> Self {
        Self {
            responses: responses
                .iter()
                .map(|(uri, body)| (uri.to_string(), body.clone()))
                .collect(),
            ..Default::default()
        }
    }

    fn failing(mut self, uri: &str) -> Self {
        self.failures.insert(uri.to_string());
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetch for StubFetch {
    async fn fetch(&self, uri: &str) -> restsnap_core::Result<Option<Value>> {
        self.calls.lock().unwrap().push(uri.to_string());
        if self.failures.contains(uri) {
            return Err(Error::Api {
                message: "boom".to_string(),
                status: 500,
            });
        }
        match self.responses.get(uri) {
            Some(Value::Null) | None => Ok(None),
            Some(body) => Ok(Some(body.clone())),
        }
    }
}

fn declaration(name: &str, endpoint: &str) -> EndpointDeclaration {
    EndpointDeclaration {
        name: name.to_string(),
        endpoint: endpoint.to_string(),
        id_name: None,
        root: false,
        children: Vec::new(),
    }
}

#[tokio::test]
async fn end_to_end_nested_collection() {
    let mut orgs = declaration("orgs", "/organizations");
    orgs.children.push(declaration("nets", "/networks"));
    let nodes = compile(&[orgs]);

    let fetch = StubFetch::with(&[
        ("/organizations", json!([{"id": "o1"}])),
        ("/organizations/o1/networks", json!([{"id": "n1"}])),
    ]);
    let document = Collector::new(fetch).collect(&nodes).await;

    assert_eq!(
        serde_json::to_value(&document).unwrap(),
        json!({
            "orgs": [{
                "data": {"id": "o1"},
                "endpoint": "/organizations/o1",
                "children": {
                    "nets": [{
                        "data": {"id": "n1"},
                        "endpoint": "/organizations/o1/networks/n1"
                    }]
                }
            }]
        })
    );
}

#[tokio::test]
async fn null_identifier_skips_recursion_but_keeps_record() {
    let mut parent = declaration("parents", "/parents");
    parent.children.push(declaration("kids", "/kids"));
    let nodes = compile(&[parent]);

    let fetch = StubFetch::with(&[
        ("/parents", json!([{"id": "p1"}, {"label": "no id"}])),
        ("/parents/p1/kids", json!([{"id": "k1"}])),
    ]);
    let collector = Collector::new(fetch);
    let document = collector.collect(&nodes).await;

    let child_calls: Vec<_> = collector
        .fetcher()
        .calls()
        .into_iter()
        .filter(|uri| uri.ends_with("/kids"))
        .collect();
    assert_eq!(child_calls, vec!["/parents/p1/kids".to_string()]);

    match document.get("parents").unwrap() {
        EndpointResult::Collection(records) => {
            assert_eq!(records.len(), 2);
            assert!(records[0].children.is_some());
            assert!(records[1].children.is_none());
        }
        other => panic!("expected collection, got {other:?}"),
    }
}

#[tokio::test]
async fn root_redirection_uses_own_segment_for_children() {
    let mut networks = declaration("networks", "/networks");
    networks.root = true;
    networks.children.push(declaration("clients", "/clients"));
    let mut orgs = declaration("orgs", "/orgs");
    orgs.children.push(networks);
    let nodes = compile(&[orgs]);

    let fetch = StubFetch::with(&[
        ("/orgs", json!([{"id": "o1"}])),
        ("/orgs/o1/networks", json!([{"id": "n1"}])),
        ("/networks/n1/clients", json!([{"id": "c1"}])),
    ]);
    let collector = Collector::new(fetch);
    let document = collector.collect(&nodes).await;

    let calls = collector.fetcher().calls();
    assert!(calls.contains(&"/networks/n1/clients".to_string()));
    assert!(!calls.iter().any(|uri| uri.contains("/orgs/o1/networks/n1/clients")));

    // The network record itself stays addressed via its listing path.
    match document.get("orgs").unwrap() {
        EndpointResult::Collection(records) => {
            let children = records[0].children.as_ref().unwrap();
            match children.get("networks").unwrap() {
                EndpointResult::Collection(nets) => {
                    assert_eq!(nets[0].endpoint, "/orgs/o1/networks/n1");
                    assert!(nets[0].children.as_ref().unwrap().contains_key("clients"));
                }
                other => panic!("expected collection, got {other:?}"),
            }
        }
        other => panic!("expected collection, got {other:?}"),
    }
}

#[tokio::test]
async fn empty_response_becomes_placeholder_record() {
    let nodes = compile(&[declaration("settings", "/settings")]);
    let fetch = StubFetch::with(&[("/settings", Value::Null)]);
    let document = Collector::new(fetch).collect(&nodes).await;

    assert_eq!(
        serde_json::to_value(&document).unwrap(),
        json!({"settings": [{"data": {}, "endpoint": "/settings"}]})
    );
}

#[tokio::test]
async fn envelope_is_unwrapped_with_ids() {
    let nodes = compile(&[declaration("devices", "/devices")]);
    let fetch = StubFetch::with(&[(
        "/devices",
        json!({"items": [{"id": "d1"}, {"id": "d2"}], "total": 2}),
    )]);
    let document = Collector::new(fetch).collect(&nodes).await;

    match document.get("devices").unwrap() {
        EndpointResult::Collection(records) => {
            assert_eq!(records.len(), 2);
            assert_eq!(records[0].endpoint, "/devices/d1");
            assert_eq!(records[1].endpoint, "/devices/d2");
        }
        other => panic!("expected collection, got {other:?}"),
    }
}

#[tokio::test]
async fn singleton_skips_declared_children() {
    let mut settings = declaration("settings", "/settings");
    settings.children.push(declaration("extras", "/extras"));
    let nodes = compile(&[settings]);

    let fetch = StubFetch::with(&[("/settings", json!({"mode": "strict"}))]);
    let collector = Collector::new(fetch);
    let document = collector.collect(&nodes).await;

    assert_eq!(collector.fetcher().calls(), vec!["/settings".to_string()]);
    assert_eq!(
        serde_json::to_value(&document).unwrap(),
        json!({"settings": {"data": {"mode": "strict"}, "endpoint": "/settings"}})
    );
}

#[tokio::test]
async fn failed_branch_does_not_abort_siblings() {
    let mut parent = declaration("parents", "/parents");
    parent.children.push(declaration("kids", "/kids"));
    let nodes = compile(&[parent]);

    let fetch = StubFetch::with(&[
        ("/parents", json!([{"id": "p1"}, {"id": "p2"}])),
        ("/parents/p2/kids", json!([{"id": "k2"}])),
    ])
    .failing("/parents/p1/kids");
    let document = Collector::new(fetch).collect(&nodes).await;

    match document.get("parents").unwrap() {
        EndpointResult::Collection(records) => {
            let failed = records[0].children.as_ref().unwrap().get("kids").unwrap();
            match failed {
                EndpointResult::Failed { error, endpoint } => {
                    assert_eq!(endpoint, "/parents/p1/kids");
                    assert_eq!(error["status_code"], json!(500));
                }
                other => panic!("expected failure, got {other:?}"),
            }
            let healthy = records[1].children.as_ref().unwrap().get("kids").unwrap();
            assert!(matches!(healthy, EndpointResult::Collection(kids) if kids.len() == 1));
        }
        other => panic!("expected collection, got {other:?}"),
    }
}

#[tokio::test]
async fn empty_child_collections_keep_or_omit() {
    let mut parent = declaration("parents", "/parents");
    parent.children.push(declaration("kids", "/kids"));
    let nodes = compile(&[parent]);
    let responses = [
        ("/parents", json!([{"id": "p1"}])),
        ("/parents/p1/kids", json!([])),
    ];

    let document = Collector::new(StubFetch::with(&responses)).collect(&nodes).await;
    assert_eq!(
        serde_json::to_value(&document).unwrap(),
        json!({"parents": [{"data": {"id": "p1"}, "endpoint": "/parents/p1", "children": {"kids": []}}]})
    );

    let document = Collector::new(StubFetch::with(&responses))
        .with_options(WalkOptions {
            empty_children: EmptyChildren::Omit,
            ..Default::default()
        })
        .collect(&nodes)
        .await;
    assert_eq!(
        serde_json::to_value(&document).unwrap(),
        json!({"parents": [{"data": {"id": "p1"}, "endpoint": "/parents/p1"}]})
    );
}

#[tokio::test]
async fn fallback_resolver_drives_recursion() {
    let mut parent = declaration("parents", "/parents");
    parent.children.push(declaration("kids", "/kids"));
    let nodes = compile(&[parent]);

    let fetch = StubFetch::with(&[
        ("/parents", json!([{"uuid": "u1"}])),
        ("/parents/u1/kids", json!([{"uuid": "k1"}])),
    ]);
    let collector = Collector::new(fetch).with_resolver(IdResolver::with_fallback(["id", "uuid", "name"]));
    let document = collector.collect(&nodes).await;

    match document.get("parents").unwrap() {
        EndpointResult::Collection(records) => {
            assert_eq!(records[0].endpoint, "/parents/u1");
            assert!(records[0].children.is_some());
        }
        other => panic!("expected collection, got {other:?}"),
    }
}

#[tokio::test]
async fn expanded_domains_merge_under_one_name() {
    let scoped = declaration("things", "/api/{DOMAIN_UUID}/things");
    let domains = vec!["d1".to_string(), "d2".to_string()];
    let nodes = compile(&expand_domains(&[scoped], &domains));

    let fetch = StubFetch::with(&[
        ("/api/d1/things", json!([{"id": "a"}])),
        ("/api/d2/things", json!([{"id": "b"}])),
    ]);
    let document = Collector::new(fetch).collect(&nodes).await;

    match document.get("things").unwrap() {
        EndpointResult::Collection(records) => {
            assert_eq!(records.len(), 2);
            assert_eq!(records[0].endpoint, "/api/d1/things/a");
            assert_eq!(records[1].endpoint, "/api/d2/things/b");
        }
        other => panic!("expected collection, got {other:?}"),
    }
}

#[tokio::test]
async fn concurrent_walks_preserve_discovery_order() {
    let mut parent = declaration("parents", "/parents");
    parent.children.push(declaration("kids", "/kids"));
    let nodes = compile(&[parent]);

    let fetch = StubFetch::with(&[
        ("/parents", json!([{"id": "p1"}, {"id": "p2"}, {"id": "p3"}])),
        ("/parents/p1/kids", json!([{"id": "k1"}])),
        ("/parents/p2/kids", json!([{"id": "k2"}])),
        ("/parents/p3/kids", json!([{"id": "k3"}])),
    ]);
    let document = Collector::new(fetch)
        .with_options(WalkOptions {
            concurrency: 3,
            ..Default::default()
        })
        .collect(&nodes)
        .await;

    match document.get("parents").unwrap() {
        EndpointResult::Collection(records) => {
            for (record, expected) in records.iter().zip(["k1", "k2", "k3"]) {
                match record.children.as_ref().unwrap().get("kids").unwrap() {
                    EndpointResult::Collection(kids) => {
                        assert_eq!(kids[0].data["id"], json!(expected));
                    }
                    other => panic!("expected collection, got {other:?}"),
                }
            }
        }
        other => panic!("expected collection, got {other:?}"),
    }
}
