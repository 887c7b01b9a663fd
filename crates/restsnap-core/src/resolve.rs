//! Identifier resolution for fetched records

use serde_json::Value;

/// Default identifier key when a declaration names none.
pub const DEFAULT_ID_KEY: &str = "id";

/// Resolves the value used to address a record's children.
///
/// A declaration-level key wins; otherwise the configured fallback chain is
/// tried in order. Some controller dialects need `["id", "uuid", "name"]`.
/// Only string and integer values count as identifiers.
#[derive(Debug, Clone)]
pub struct IdResolver {
    fallback: Vec<String>,
}

impl Default for IdResolver {
    fn default() -> Self {
        Self {
            fallback: vec![DEFAULT_ID_KEY.to_string()],
        }
    }
}

impl IdResolver {
    /// Resolver with an ordered fallback chain.
    pub fn with_fallback<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fallback: keys.into_iter().map(Into::into).collect(),
        }
    }

    /// Resolve the identifier of `record`, preferring the declaration key.
    ///
    /// The result is stable: the same record resolves identically before and
    /// after any intervening fetches.
    pub fn resolve(&self, record: &Value, id_name: Option<&str>) -> Option<String> {
        match id_name {
            Some(key) => scalar_id(record.get(key)?),
            None => self.fallback.iter().find_map(|key| scalar_id(record.get(key)?)),
        }
    }
}

/// Strings and integers are identifiers; everything else is not.
fn scalar_id(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) if number.is_i64() || number.is_u64() => Some(number.to_string()),
        _ => None,
    }
}
