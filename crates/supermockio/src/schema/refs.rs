//! `$ref` resolution against a single OpenAPI document.

use crate::error::SchemaError;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Resolves local `$ref` pointers within one document.
///
/// A resolver is created per ingestion run and owns its cache, so two
/// documents that reuse the same pointer strings never see each other's
/// nodes.
pub struct RefResolver<'a> {
    root: &'a Value,
    cache: Mutex<HashMap<String, &'a Value>>,
}

impl<'a> RefResolver<'a> {
    pub fn new(root: &'a Value) -> Self {
        Self {
            root,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// The document this resolver walks.
    pub fn root(&self) -> &'a Value {
        self.root
    }

    /// Number of pointers resolved so far.
    pub fn cached_len(&self) -> usize {
        self.cache.lock().len()
    }

    /// Resolve a pointer such as `#/components/schemas/User`.
    ///
    /// Repeated calls with the same pointer return the same node.
    pub fn resolve_ref(&self, reference: &str) -> Result<&'a Value, SchemaError> {
        if let Some(node) = self.cache.lock().get(reference) {
            return Ok(*node);
        }

        let pointer = reference
            .strip_prefix('#')
            .ok_or_else(|| SchemaError::Reference(reference.to_string()))?;

        let mut current = self.root;
        for segment in pointer.split('/').filter(|s| !s.is_empty()) {
            let key = unescape_segment(segment);
            current = match current {
                Value::Object(map) => map.get(key.as_str()),
                Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            }
            .ok_or_else(|| SchemaError::Reference(reference.to_string()))?;
        }

        self.cache.lock().insert(reference.to_string(), current);
        Ok(current)
    }

    /// Deep-resolve every `$ref` in `node`.
    ///
    /// `{"$ref": X, ...siblings}` becomes the target merged with the
    /// siblings; siblings win on conflicting keys. A reference that is
    /// already being expanded further up the same branch is kept as-is.
    pub fn resolve_refs(&self, node: &Value) -> Result<Value, SchemaError> {
        let mut in_progress = Vec::new();
        self.expand(node, &mut in_progress)
    }

    fn expand(&self, node: &Value, in_progress: &mut Vec<String>) -> Result<Value, SchemaError> {
        match node {
            Value::Array(items) => items
                .iter()
                .map(|item| self.expand(item, in_progress))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Value::Object(map) => {
                let mut resolved = Map::new();

                if let Some(Value::String(reference)) = map.get("$ref") {
                    if in_progress.contains(reference) {
                        return Ok(node.clone());
                    }
                    let target = self.resolve_ref(reference)?;
                    in_progress.push(reference.clone());
                    let expanded = self.expand(target, in_progress);
                    in_progress.pop();

                    match expanded? {
                        Value::Object(fields) => resolved = fields,
                        other if map.len() == 1 => return Ok(other),
                        _ => {}
                    }
                }

                for (key, value) in map {
                    if key == "$ref" {
                        continue;
                    }
                    resolved.insert(key.clone(), self.expand(value, in_progress)?);
                }
                Ok(Value::Object(resolved))
            }
            other => Ok(other.clone()),
        }
    }
}

fn unescape_segment(segment: &str) -> String {
    let decoded = urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string());
    decoded.replace("~1", "/").replace("~0", "~")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document() -> Value {
        json!({
            "components": {
                "schemas": {
                    "Pet": {
                        "type": "object",
                        "properties": {
                            "name": {"type": "string"},
                            "owner": {"$ref": "#/components/schemas/Owner"}
                        }
                    },
                    "Owner": {"type": "object", "properties": {"id": {"type": "integer"}}},
                    "Node": {
                        "type": "object",
                        "properties": {"next": {"$ref": "#/components/schemas/Node"}}
                    },
                    "a/b": {"type": "boolean"}
                },
                "parameters": [{"name": "first"}]
            }
        })
    }

    #[test]
    fn test_resolve_ref_returns_cached_node() {
        let doc = document();
        let resolver = RefResolver::new(&doc);

        let first = resolver.resolve_ref("#/components/schemas/Pet").unwrap();
        let second = resolver.resolve_ref("#/components/schemas/Pet").unwrap();

        assert!(std::ptr::eq(first, second));
        assert_eq!(first["type"], "object");
        assert_eq!(resolver.cached_len(), 1);
    }

    #[test]
    fn test_resolve_ref_missing_segment() {
        let doc = document();
        let resolver = RefResolver::new(&doc);

        let err = resolver
            .resolve_ref("#/components/schemas/Missing")
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::Reference("#/components/schemas/Missing".to_string())
        );
        // Failing again gives the same answer
        assert!(resolver.resolve_ref("#/components/schemas/Missing").is_err());
        assert_eq!(resolver.cached_len(), 0);
    }

    #[test]
    fn test_resolve_ref_escaped_and_indexed_segments() {
        let doc = document();
        let resolver = RefResolver::new(&doc);

        assert_eq!(
            resolver.resolve_ref("#/components/schemas/a~1b").unwrap()["type"],
            "boolean"
        );
        assert_eq!(
            resolver.resolve_ref("#/components/parameters/0").unwrap()["name"],
            "first"
        );
    }

    #[test]
    fn test_external_ref_rejected() {
        let doc = document();
        let resolver = RefResolver::new(&doc);
        assert!(resolver.resolve_ref("other.yaml#/Pet").is_err());
    }

    #[test]
    fn test_resolve_refs_deep() {
        let doc = document();
        let resolver = RefResolver::new(&doc);

        let resolved = resolver
            .resolve_refs(&json!({"$ref": "#/components/schemas/Pet"}))
            .unwrap();
        assert_eq!(
            resolved["properties"]["owner"]["properties"]["id"]["type"],
            "integer"
        );
    }

    #[test]
    fn test_resolve_refs_siblings_win() {
        let doc = document();
        let resolver = RefResolver::new(&doc);

        let resolved = resolver
            .resolve_refs(&json!({
                "$ref": "#/components/schemas/Owner",
                "type": "string",
                "description": "overridden"
            }))
            .unwrap();

        assert_eq!(resolved["type"], "string");
        assert_eq!(resolved["description"], "overridden");
        assert_eq!(resolved["properties"]["id"]["type"], "integer");
    }

    #[test]
    fn test_resolve_refs_cycle_kept_literal() {
        let doc = document();
        let resolver = RefResolver::new(&doc);

        let resolved = resolver
            .resolve_refs(&json!({"$ref": "#/components/schemas/Node"}))
            .unwrap();
        assert_eq!(
            resolved["properties"]["next"],
            json!({"$ref": "#/components/schemas/Node"})
        );
    }

    #[test]
    fn test_separate_resolvers_do_not_share_cache() {
        let doc_a = json!({"components": {"schemas": {"X": {"type": "string"}}}});
        let doc_b = json!({"components": {"schemas": {"X": {"type": "integer"}}}});
        let a = RefResolver::new(&doc_a);
        let b = RefResolver::new(&doc_b);

        assert_eq!(a.resolve_ref("#/components/schemas/X").unwrap()["type"], "string");
        assert_eq!(b.resolve_ref("#/components/schemas/X").unwrap()["type"], "integer");
    }
}
