//! Endpoint-tree compiler: groups flat URI templates into a segment trie

use crate::declaration::EndpointDeclaration;

/// Positional parent-identifier placeholders accepted in URI templates.
const PLACEHOLDERS: [&str; 2] = ["%v", "%s"];

/// A compiled endpoint node: the literal URI segment this node contributes
/// plus the declaration entries resolved onto it.
///
/// Compilation is a pure structural transform; nothing is fetched. The same
/// input order always yields the same tree, so snapshots stay diffable.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointNode {
    /// Literal URI segment, leading slash retained (e.g. `/organizations`).
    pub segment: String,
    /// Declarations attached at this path. Usually one; co-resident when
    /// two declarations share a segment path.
    pub entries: Vec<NodeEntry>,
    pub children: Vec<EndpointNode>,
}

/// Name, identifier key and root flag contributed by one declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeEntry {
    pub name: String,
    pub id_name: Option<String>,
    pub root: bool,
}

impl EndpointNode {
    fn new(segment: String) -> Self {
        Self {
            segment,
            entries: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Names this node's results are keyed under. An unnamed prefix node
    /// falls back to its literal segment so descendants stay reachable.
    pub fn result_names(&self) -> Vec<String> {
        if self.entries.is_empty() {
            vec![self.segment.trim_start_matches('/').to_string()]
        } else {
            self.entries.iter().map(|entry| entry.name.clone()).collect()
        }
    }

    /// Identifier key for this node's records: first entry that names one.
    pub fn id_name(&self) -> Option<&str> {
        self.entries.iter().find_map(|entry| entry.id_name.as_deref())
    }

    /// Whether children are addressed from this node's own segment rather
    /// than the listing parent's path.
    pub fn is_root(&self) -> bool {
        self.entries.iter().any(|entry| entry.root)
    }
}

/// Compile a flat declaration list into a forest grouped by shared URI
/// prefixes up to placeholder boundaries.
///
/// Sibling templates like `/a/%v/b` and `/a/%v/c` end up as two children of
/// one `/a` node. Explicit `children` declarations compile into the subtree
/// rooted at their parent's deepest segment.
pub fn compile(declarations: &[EndpointDeclaration]) -> Vec<EndpointNode> {
    let mut roots = Vec::new();
    for declaration in declarations {
        insert(&mut roots, declaration);
    }
    roots
}

fn insert(level: &mut Vec<EndpointNode>, declaration: &EndpointDeclaration) {
    let segments = split_segments(&declaration.endpoint);
    if segments.is_empty() {
        tracing::warn!(name = %declaration.name, "declaration has no literal URI segment, skipped");
        return;
    }
    insert_at(level, &segments, declaration);
}

fn insert_at(
    mut level: &mut Vec<EndpointNode>,
    segments: &[String],
    declaration: &EndpointDeclaration,
) {
    for (depth, segment) in segments.iter().enumerate() {
        let position = match level.iter().position(|node| &node.segment == segment) {
            Some(position) => position,
            None => {
                level.push(EndpointNode::new(segment.clone()));
                level.len() - 1
            }
        };
        if depth + 1 == segments.len() {
            let node = &mut level[position];
            // Co-resident names merge; an exact duplicate attaches once.
            if !node.entries.iter().any(|entry| entry.name == declaration.name) {
                node.entries.push(NodeEntry {
                    name: declaration.name.clone(),
                    id_name: declaration.id_name.clone(),
                    root: declaration.root,
                });
            }
            for child in &declaration.children {
                insert(&mut node.children, child);
            }
            return;
        }
        level = &mut level[position].children;
    }
}

/// Split a URI template into its literal segments at placeholder boundaries.
///
/// `/a/%v/b` becomes `["/a", "/b"]`. A trailing placeholder contributes no
/// segment of its own, so `/a/%v` is the single leaf `/a`: that leaf's
/// identifiers substitute into children, not into the leaf itself.
fn split_segments(template: &str) -> Vec<String> {
    let mut pieces = vec![template.to_string()];
    for placeholder in PLACEHOLDERS {
        pieces = pieces
            .iter()
            .flat_map(|piece| piece.split(placeholder).map(str::to_string))
            .collect();
    }
    pieces
        .into_iter()
        .map(|piece| piece.trim_end_matches('/').to_string())
        .filter(|piece| !piece.is_empty())
        .collect()
}
