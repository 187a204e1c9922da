use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tokio::time::{Duration, Instant};
use crate::models::CallDescriptor;

// Cache entry with timestamp
#[derive(Clone, Debug)]
pub struct CacheEntry {
    pub value: Value,
    pub stored_at: Instant,
}

impl CacheEntry {
    fn is_fresh(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.stored_at) < ttl
    }
}

/// Short-lived dedup cache for successful call results.
///
/// Entries are never evicted for size, only for age, and age is checked
/// lazily: a stale entry is dropped the first time someone reads it.
#[derive(Default)]
pub struct CacheStore {
    entries: HashMap<String, CacheEntry>,
}

impl CacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, key: &str, ttl: Duration, now: Instant) -> Option<Value> {
        let fresh = self.entries.get(key)?.is_fresh(ttl, now);
        if fresh {
            return self.entries.get(key).map(|entry| entry.value.clone());
        }
        self.entries.remove(key);
        None
    }

    pub fn put(&mut self, key: String, value: Value, now: Instant) {
        self.entries.insert(key, CacheEntry { value, stored_at: now });
    }

    // Drop everything older than ttl, returns how many went
    pub fn purge_expired(&mut self, ttl: Duration, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_fresh(ttl, now));
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// Create a cache key (hash of method + url + params + body)
//
// Every part goes through one JSON array so strings are quoted and escaped
// and no two descriptors share an encoding.
pub fn make_cache_key(descriptor: &CallDescriptor) -> String {
    let params: Map<String, Value> = descriptor
        .params
        .iter()
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();
    let encoded = Value::Array(vec![
        Value::String(descriptor.method.as_str().to_string()),
        Value::String(descriptor.url.clone()),
        Value::Object(params),
        Value::Array(descriptor.body.iter().cloned().collect()),
    ]);

    let mut hasher = Sha256::new();
    hasher.update(canonical_json(&encoded));
    format!("{:x}", hasher.finalize())
}

/// JSON text with object keys sorted at every level.
///
/// `serde_json` only sorts keys when its `preserve_order` feature is off, and
/// any crate in the graph can switch that on, so the ordering is done here.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut fields: Vec<_> = map.iter().collect();
            fields.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (name, field)) in fields.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(name.clone()).to_string());
                out.push(':');
                write_canonical(field, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}
