//! Variable bindings shared by name expansion and body templating.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::error::{StencilError, StencilResult};

/// Name to value mapping consulted by templates.
///
/// Keys are unique and the last write wins. A single `Vars` lives in the
/// [`OutputContext`](crate::context::OutputContext) for the whole run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Vars(IndexMap<String, Value>);

impl Vars {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds bindings from an alternating `name, value, name, value` list.
    ///
    /// # Errors
    /// * `StencilError::MisuseError` if the list has an odd length or a name
    ///   is not a string
    pub fn from_pairs(pairs: &[Value]) -> StencilResult<Self> {
        if pairs.len() % 2 != 0 {
            return Err(StencilError::MisuseError(format!(
                "name/value pairs must come in pairs, got {} items",
                pairs.len()
            )));
        }

        let mut vars = Self::new();
        for pair in pairs.chunks(2) {
            let name = pair[0].as_str().ok_or_else(|| {
                StencilError::MisuseError(format!("binding name must be a string, got {}", pair[0]))
            })?;
            vars.insert(name, pair[1].clone());
        }
        Ok(vars)
    }

    pub fn insert<K: Into<String>, V: Into<Value>>(&mut self, name: K, value: V) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Copies every binding of `other` into `self`, replacing existing names.
    pub fn merge(&mut self, other: &Vars) {
        for (name, value) in &other.0 {
            self.0.insert(name.clone(), value.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl From<IndexMap<String, Value>> for Vars {
    fn from(map: IndexMap<String, Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Vars {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
