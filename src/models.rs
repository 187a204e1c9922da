use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

// HTTP verbs the dashboard backend understands
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything needed to perform one remote call.
///
/// Descriptors are compared by content: two descriptors carrying the same
/// method, url, params and body are the same call no matter how their JSON
/// objects were assembled.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct CallDescriptor {
    pub method: Method,
    pub url: String,
    #[serde(default)]
    pub params: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl CallDescriptor {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            params: BTreeMap::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Post, url).with_body(body)
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    // Throttling bucket: payload is ignored
    pub fn endpoint_key(&self) -> String {
        format!("{} {}", self.method, self.url)
    }
}

// Read-only snapshot of the scheduler
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    pub active_count: usize,
    pub queued_count: usize,
    pub cached_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn endpoint_key_ignores_payload() {
        let a = CallDescriptor::get("/routes").with_param("page", 1);
        let b = CallDescriptor::get("/routes").with_param("page", 2);
        assert_eq!(a.endpoint_key(), "GET /routes");
        assert_eq!(a.endpoint_key(), b.endpoint_key());

        let c = CallDescriptor::post("/routes", json!({"name": "north"}));
        assert_eq!(c.endpoint_key(), "POST /routes");
    }

    #[test]
    fn descriptor_deserializes_with_defaults() {
        let d: CallDescriptor =
            serde_json::from_value(json!({"method": "DELETE", "url": "/drivers/7"})).unwrap();
        assert_eq!(d.method, Method::Delete);
        assert!(d.params.is_empty());
        assert!(d.body.is_none());
    }
}
