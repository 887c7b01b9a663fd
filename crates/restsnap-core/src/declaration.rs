//! Endpoint declarations and tenant-domain expansion

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Tenant placeholder multiplied across declarations before compilation.
pub const DOMAIN_TOKEN: &str = "{DOMAIN_UUID}";

/// One controller resource collection and its position in the hierarchy.
///
/// `endpoint` is a URI template: `%v` (or `%s`) marks the point where a
/// discovered parent identifier is substituted, [`DOMAIN_TOKEN`] marks a
/// tenant scope. Nested `children` templates are relative to the parent's
/// path plus the parent record's identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointDeclaration {
    pub name: String,
    pub endpoint: String,
    /// Key holding the identifier used to address this resource's children.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_name: Option<String>,
    /// Children are addressed from this resource's own path instead of the
    /// listing parent's path.
    #[serde(default, skip_serializing_if = "is_false")]
    pub root: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<EndpointDeclaration>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl EndpointDeclaration {
    /// Parse a YAML declaration list.
    pub fn from_yaml(text: &str) -> Result<Vec<Self>> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Load a YAML declaration list from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Vec<Self>> {
        let text = fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }
}

/// Multiply [`DOMAIN_TOKEN`] declarations into one copy per domain.
///
/// Declarations without the token pass through as a single copy. Children
/// travel with each copy, so expanded subtrees never share state. Must run
/// before tree compilation: the substitution changes the literal segments
/// the compiler groups on.
pub fn expand_domains(
    declarations: &[EndpointDeclaration],
    domains: &[String],
) -> Vec<EndpointDeclaration> {
    let mut expanded = Vec::with_capacity(declarations.len());
    for declaration in declarations {
        if !declaration.endpoint.contains(DOMAIN_TOKEN) {
            expanded.push(declaration.clone());
            continue;
        }
        for domain in domains {
            let mut copy = declaration.clone();
            copy.endpoint = declaration.endpoint.replace(DOMAIN_TOKEN, domain);
            expanded.push(copy);
        }
    }
    expanded
}
