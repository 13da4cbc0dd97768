//! Parameter resolution
//!
//! Rewrites a payload by substituting each embedded [`Reference`] with the
//! output it points at. Multi outputs become arrays in write order, single
//! outputs their value. Nothing is returned unless every reference resolves.

use crate::cache::OutputCache;
use crate::error::ResolveError;
use netdrill_core::Reference;
use serde_json::{Map, Value};

/// Resolve `payload` for the command at `step`
pub fn resolve(cache: &OutputCache, step: usize, payload: &Value) -> Result<Value, ResolveError> {
    let parsed = Reference::parse(payload).map_err(|source| ResolveError::Malformed { step, source })?;
    if let Some(reference) = parsed {
        return lookup(cache, step, reference);
    }
    match payload {
        Value::Array(items) => items
            .iter()
            .map(|item| resolve(cache, step, item))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => map
            .iter()
            .map(|(key, item)| Ok((key.clone(), resolve(cache, step, item)?)))
            .collect::<Result<Map<_, _>, _>>()
            .map(Value::Object),
        literal => Ok(literal.clone()),
    }
}

fn lookup(cache: &OutputCache, step: usize, reference: Reference) -> Result<Value, ResolveError> {
    let offset = reference.step_offset;
    if offset >= 0 {
        return Err(ResolveError::ForwardReference { step, offset });
    }
    let target = step
        .checked_sub(offset.unsigned_abs() as usize)
        .ok_or(ResolveError::BeforeStart { step, offset })?;

    match cache.get(target, &reference.name) {
        Some(entry) if entry.multi => Ok(Value::Array(entry.values)),
        Some(entry) => Ok(entry.values.into_iter().next().unwrap_or(Value::Null)),
        None => reference
            .on_empty
            .ok_or_else(|| ResolveError::UnresolvedReference {
                step,
                target,
                name: reference.name,
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::StepOutput;
    use crate::sink::NullSink;
    use serde_json::json;
    use std::sync::Arc;

    fn cache_with(outputs: &[(usize, &str, Value, bool)]) -> Arc<OutputCache> {
        let cache = Arc::new(OutputCache::new());
        for (step, name, value, multi) in outputs {
            StepOutput::new(*step, cache.clone(), Arc::new(NullSink))
                .emit(name, value, *multi, false)
                .unwrap();
        }
        cache
    }

    #[test]
    fn test_literal_payload_unchanged() {
        let cache = OutputCache::new();
        let payload = json!({"dir": "/keys", "ratios": [0.5, 0.25], "nested": {"type": "other"}});
        assert_eq!(resolve(&cache, 7, &payload).unwrap(), payload);
    }

    #[test]
    fn test_multi_and_single_substitution() {
        let cache = cache_with(&[
            (0, "participant", json!("n1"), true),
            (0, "participant", json!("n2"), true),
            (1, "limit", json!(4), false),
        ]);
        let payload = json!({
            "nodes": Reference::output(-2, "participant").to_value(),
            "limit": Reference::output(-1, "limit").to_value(),
        });
        let resolved = resolve(&cache, 2, &payload).unwrap();
        assert_eq!(resolved, json!({"nodes": ["n1", "n2"], "limit": 4}));
    }

    #[test]
    fn test_on_empty_default() {
        let cache = OutputCache::new();
        let payload = json!({"group": Reference::output(-1, "group").or_else(json!([])).to_value()});
        assert_eq!(resolve(&cache, 1, &payload).unwrap(), json!({"group": []}));
    }

    #[test]
    fn test_missing_output_fails_whole_payload() {
        let cache = cache_with(&[(0, "key", json!("k"), true)]);
        let payload = json!({
            "feePayers": Reference::output(-2, "key").to_value(),
            "nodes": Reference::output(-1, "participant").to_value(),
        });
        let err = resolve(&cache, 2, &payload).unwrap_err();
        assert!(matches!(
            err,
            ResolveError::UnresolvedReference { step: 2, target: 1, .. }
        ));
    }

    #[test]
    fn test_malformed_reference_is_fatal() {
        let cache = cache_with(&[(0, "group1", json!("n1"), true)]);
        let payload = json!({"nodes": {"type": "output", "name": "group1"}, "clean": true});
        let err = resolve(&cache, 1, &payload).unwrap_err();
        assert!(matches!(err, ResolveError::Malformed { step: 1, .. }));
    }

    #[test]
    fn test_never_looks_forward_or_before_start() {
        let cache = cache_with(&[(3, "group", json!("x"), true)]);
        let forward = Reference::output(1, "group").to_value();
        assert!(matches!(
            resolve(&cache, 2, &forward),
            Err(ResolveError::ForwardReference { .. })
        ));
        let current = Reference::output(0, "group").to_value();
        assert!(resolve(&cache, 3, &current).is_err());
        let early = Reference::output(-3, "group").to_value();
        assert!(matches!(
            resolve(&cache, 1, &early),
            Err(ResolveError::BeforeStart { .. })
        ));
    }
}
