//! Box Client
//!
//! Main client for interacting with the Box API, combining credentials
//! and HTTP functionality.

use super::auth::Credentials;
use super::error::{Error, Result};
use super::http::BoxHttpClient;
use serde_json::Value;

/// Default API root
pub const DEFAULT_BASE_URL: &str = "https://api.box.com/2.0";

/// Main Box client
#[derive(Clone, Debug)]
pub struct BoxClient {
    pub credentials: Credentials,
    pub http: BoxHttpClient,
    base_url: String,
}

impl BoxClient {
    /// Create a client against the public API root
    pub fn new(credentials: Credentials) -> Result<Self> {
        Self::with_base_url(credentials, DEFAULT_BASE_URL)
    }

    /// Create a client against a custom API root (proxies, mock servers)
    pub fn with_base_url(credentials: Credentials, base_url: &str) -> Result<Self> {
        let base_url = normalize_base_url(base_url)?;
        let http = BoxHttpClient::new()?;

        Ok(Self {
            credentials,
            http,
            base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Make a GET request to the API
    pub async fn get(&self, url: &str) -> Result<Value> {
        self.http.get(url, self.credentials.token()).await
    }

    /// Make a POST request to the API
    pub async fn post(&self, url: &str, body: Option<&Value>) -> Result<Value> {
        self.http.post(url, self.credentials.token(), body).await
    }

    /// Make a PUT request to the API
    pub async fn put(&self, url: &str, body: &Value) -> Result<Value> {
        self.http.put(url, self.credentials.token(), body).await
    }

    /// Make a DELETE request to the API
    pub async fn delete(&self, url: &str) -> Result<Value> {
        self.http.delete(url, self.credentials.token()).await
    }

    /// Build an API URL from raw path segments, percent-encoding each one
    pub fn url(&self, segments: &[&str]) -> String {
        let mut url = self.base_url.clone();
        for segment in segments {
            url.push('/');
            url.push_str(&urlencoding::encode(segment));
        }
        url
    }

    // =========================================================================
    // Metadata template API helpers
    // =========================================================================

    /// `/metadata_templates/schema`
    pub fn template_create_url(&self) -> String {
        self.url(&["metadata_templates", "schema"])
    }

    /// `/metadata_templates/{scope}/{template_key}/schema`
    pub fn template_schema_url(&self, scope: &str, template_key: &str) -> String {
        self.url(&["metadata_templates", scope, template_key, "schema"])
    }

    /// `/metadata_templates/{id}`
    pub fn template_id_url(&self, id: &str) -> String {
        self.url(&["metadata_templates", id])
    }

    /// `/metadata_templates/{scope}`
    pub fn template_list_url(&self, scope: &str) -> String {
        self.url(&["metadata_templates", scope])
    }

    // =========================================================================
    // Metadata query API helpers
    // =========================================================================

    /// `/metadata_queries/execute_read`
    pub fn query_url(&self) -> String {
        self.url(&["metadata_queries", "execute_read"])
    }

    // =========================================================================
    // Item metadata API helpers
    // =========================================================================

    /// `/{files|folders}/{id}/metadata`
    pub fn item_metadata_url(&self, collection: &str, item_id: &str) -> String {
        self.url(&[collection, item_id, "metadata"])
    }

    /// `/{files|folders}/{id}/metadata/{scope}/{template}`
    pub fn item_instance_url(
        &self,
        collection: &str,
        item_id: &str,
        scope: &str,
        template: &str,
    ) -> String {
        self.url(&[collection, item_id, "metadata", scope, template])
    }
}

/// Append query parameters to a URL, skipping empty values
pub fn with_query(url: &str, params: &[(&str, String)]) -> String {
    let query_parts: Vec<String> = params
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
        .collect();

    if query_parts.is_empty() {
        url.to_string()
    } else if url.contains('?') {
        format!("{}&{}", url, query_parts.join("&"))
    } else {
        format!("{}?{}", url, query_parts.join("&"))
    }
}

/// Validate the API root and strip any trailing slash
fn normalize_base_url(base_url: &str) -> Result<String> {
    let parsed = url::Url::parse(base_url)
        .map_err(|e| Error::Config(format!("Invalid base URL '{}': {}", base_url, e)))?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(Error::Config(format!(
            "Unsupported URL scheme '{}'",
            parsed.scheme()
        )));
    }

    Ok(base_url.trim_end_matches('/').to_string())
}
