use reqwest::{StatusCode, Url};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};
use crate::error::TransportError;
use crate::models::{CallDescriptor, Method};
use crate::session::{Navigator, SessionStore};

/// Performs the actual remote call for an admitted unit.
///
/// The scheduler treats implementations as opaque: whatever session or
/// authorization handling a transport needs happens behind `invoke`.
pub trait Transport: Send + Sync + 'static {
    fn invoke(
        &self,
        descriptor: &CallDescriptor,
    ) -> impl Future<Output = Result<Value, TransportError>> + Send;
}

// Session handling knobs for HttpTransport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportSettings {
    pub tenant_header: String,
    pub login_route: String,
    pub login_path: String,
    pub stale_session_marker: String,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            tenant_header: "X-Tenant-Id".to_string(),
            login_route: "/login".to_string(),
            login_path: "/auth/login".to_string(),
            stale_session_marker: "workspace not found".to_string(),
        }
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Transport for the dashboard backend over HTTP.
///
/// Attaches the session's bearer token and workspace header to each call.
/// A 401, or a "workspace not found" 404 outside the login call, clears the
/// session and sends the dashboard back to its login route.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    settings: TransportSettings,
    session: Arc<SessionStore>,
    navigator: Arc<dyn Navigator>,
}

impl HttpTransport {
    pub fn new(
        base_url: &str,
        settings: TransportSettings,
        session: Arc<SessionStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, settings, session, navigator)
    }

    pub fn with_client(
        client: reqwest::Client,
        base_url: &str,
        settings: TransportSettings,
        session: Arc<SessionStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            client,
            base_url: normalize_base_url(base_url),
            settings,
            session,
            navigator,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // Full url of a call, query included
    pub fn resolve(&self, descriptor: &CallDescriptor) -> Result<Url, TransportError> {
        let raw = if descriptor.url.starts_with("http://") || descriptor.url.starts_with("https://") {
            descriptor.url.clone()
        } else {
            format!(
                "{}/{}",
                self.base_url.trim_end_matches('/'),
                descriptor.url.trim_start_matches('/')
            )
        };
        let mut url = Url::parse(&raw).map_err(|_| TransportError::InvalidUrl(raw.clone()))?;
        if !descriptor.params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in &descriptor.params {
                pairs.append_pair(name, &query_value(value));
            }
        }
        Ok(url)
    }

    fn is_login_call(&self, descriptor: &CallDescriptor) -> bool {
        let path = descriptor.url.split('?').next().unwrap_or_default();
        path.trim_end_matches('/').ends_with(self.settings.login_path.trim_end_matches('/'))
    }

    fn is_stale_session(&self, body: &str) -> bool {
        body.to_lowercase()
            .contains(&self.settings.stale_session_marker.to_lowercase())
    }

    fn end_session(&self, reason: &str) {
        warn!(reason, "Session invalidated, clearing credentials");
        self.session.clear();
        self.navigator.redirect_to_login(&self.settings.login_route);
    }
}

impl Transport for HttpTransport {
    async fn invoke(&self, descriptor: &CallDescriptor) -> Result<Value, TransportError> {
        let url = self.resolve(descriptor)?;
        debug!(method = %descriptor.method, %url, "Calling backend");

        let mut request = self.client.request(descriptor.method.into(), url);
        if let Some(token) = self.session.token() {
            request = request.bearer_auth(token);
        }
        if let Some(tenant) = self.session.tenant() {
            request = request.header(self.settings.tenant_header.as_str(), tenant);
        }
        if let Some(body) = &descriptor.body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        if status == StatusCode::UNAUTHORIZED {
            self.end_session("unauthorized");
            return Err(TransportError::Unauthorized);
        }
        if status == StatusCode::NOT_FOUND
            && !self.is_login_call(descriptor)
            && self.is_stale_session(&body)
        {
            self.end_session("workspace not found");
            return Err(TransportError::SessionExpired);
        }
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| TransportError::Decode(e.to_string()))
    }
}

// add http:// if not present
pub fn normalize_base_url(url: &str) -> String {
    let url = url.trim();
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("http://{}", url)
    }
}

fn query_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::LoginRedirect;
    use serde_json::json;

    fn transport(base: &str) -> HttpTransport {
        HttpTransport::new(
            base,
            TransportSettings::default(),
            Arc::new(SessionStore::new()),
            Arc::new(LoginRedirect::new()),
        )
    }

    #[test]
    fn base_url_gets_a_scheme() {
        assert_eq!(normalize_base_url("localhost:3000"), "http://localhost:3000");
        assert_eq!(normalize_base_url(" https://api.example.com "), "https://api.example.com");
        assert_eq!(normalize_base_url("httpbin.org"), "http://httpbin.org");
        assert_eq!(normalize_base_url("https-proxy:8080/api"), "http://https-proxy:8080/api");
    }

    #[test]
    fn resolve_joins_path_and_query() {
        let t = transport("localhost:3000/api/");
        let d = CallDescriptor::get("/routes")
            .with_param("page", 2)
            .with_param("status", "open")
            .with_param("ids", json!([1, 2]));

        let url = t.resolve(&d).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:3000/api/routes?ids=%5B1%2C2%5D&page=2&status=open"
        );
    }

    #[test]
    fn resolve_keeps_absolute_urls() {
        let t = transport("localhost:3000");
        let url = t.resolve(&CallDescriptor::get("https://maps.example.com/tiles")).unwrap();
        assert_eq!(url.as_str(), "https://maps.example.com/tiles");
    }

    #[test]
    fn login_call_detection() {
        let t = transport("localhost:3000");
        assert!(t.is_login_call(&CallDescriptor::post("/auth/login", json!({}))));
        assert!(t.is_login_call(&CallDescriptor::post("/api/auth/login/", json!({}))));
        assert!(!t.is_login_call(&CallDescriptor::get("/customers")));
    }
}
