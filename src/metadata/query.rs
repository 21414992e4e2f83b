//! Metadata queries
//!
//! Builds the `execute_read` request body and pages through the typed
//! results. `from`, `query`, `query_params`, `ancestor_folder_id` and `limit`
//! are always sent (`query_params` as `{}` when nothing is bound).
//! `index_name`, `order_by`, `marker` and `fields` are absent from the body
//! unless set; the server matches bodies strictly.

use crate::api::client::BoxClient;
use crate::api::error::{Error, Result};
use crate::resource::item::Item;
use crate::resource::pager::{Page, PageSource, Pager};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Page size used when the caller does not set one
pub const DEFAULT_QUERY_LIMIT: u32 = 100;

/// Largest page size the server accepts
pub const MAX_QUERY_LIMIT: u32 = 100;

/// Sort direction for `order_by`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Asc,
    Desc,
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(Direction::Asc),
            "desc" => Ok(Direction::Desc),
            other => Err(format!("Unknown sort direction: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderBy {
    pub field_key: String,
    pub direction: Direction,
}

/// A metadata query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetadataQuery {
    from: String,
    query: String,
    query_params: Map<String, Value>,
    ancestor_folder_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    index_name: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    order_by: Vec<OrderBy>,
    limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    marker: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fields: Vec<String>,
}

impl MetadataQuery {
    /// Query instances of template `from` (`scope.templateKey`) under a folder
    ///
    /// `:name` placeholders in `query` are bound with [`Self::query_param`].
    pub fn new(from: &str, query: &str, ancestor_folder_id: &str) -> Self {
        Self {
            from: from.to_string(),
            query: query.to_string(),
            query_params: Map::new(),
            ancestor_folder_id: ancestor_folder_id.to_string(),
            index_name: None,
            order_by: Vec::new(),
            limit: DEFAULT_QUERY_LIMIT,
            marker: None,
            fields: Vec::new(),
        }
    }

    /// Bind a placeholder by name
    pub fn query_param(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.query_params.insert(name.to_string(), value.into());
        self
    }

    pub fn index_name(mut self, index_name: &str) -> Self {
        self.index_name = Some(index_name.to_string());
        self
    }

    pub fn order_by(mut self, field_key: &str, direction: Direction) -> Self {
        self.order_by.push(OrderBy {
            field_key: field_key.to_string(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Start from a marker returned by an earlier query
    pub fn marker(mut self, marker: &str) -> Self {
        self.marker = Some(marker.to_string());
        self
    }

    /// Project extra fields onto each result
    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.fields
            .extend(fields.into_iter().map(|f| f.as_ref().to_string()));
        self
    }

    pub fn get_limit(&self) -> u32 {
        self.limit
    }

    pub fn get_marker(&self) -> Option<&str> {
        self.marker.as_deref()
    }

    /// Check the query before it is sent
    pub fn validate(&self) -> Result<()> {
        if self.from.trim().is_empty() {
            return Err(Error::InvalidInput("'from' must not be empty".to_string()));
        }
        if self.query.trim().is_empty() {
            return Err(Error::InvalidInput("'query' must not be empty".to_string()));
        }
        if self.ancestor_folder_id.trim().is_empty() {
            return Err(Error::InvalidInput(
                "'ancestor_folder_id' must not be empty".to_string(),
            ));
        }
        if self.limit == 0 || self.limit > MAX_QUERY_LIMIT {
            return Err(Error::InvalidInput(format!(
                "limit must be between 1 and {}, got {}",
                MAX_QUERY_LIMIT, self.limit
            )));
        }

        for name in placeholders(&self.query) {
            if !self.query_params.contains_key(name) {
                return Err(Error::InvalidInput(format!(
                    "Placeholder ':{}' has no bound query parameter",
                    name
                )));
            }
        }

        Ok(())
    }

    /// Request body for the query as it stands
    pub fn to_body(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Same query positioned at another page
    fn at_marker(&self, marker: Option<&str>) -> Self {
        let mut query = self.clone();
        query.marker = marker.map(|m| m.to_string());
        query
    }
}

/// Names referenced as `:name` in a query expression
///
/// Text inside `'...'` or `"..."` literals is skipped, so a quoted timestamp
/// such as `'2020-01-01T10:30:00Z'` binds nothing.
fn placeholders(query: &str) -> HashSet<&str> {
    let mut names = HashSet::new();
    let bytes = query.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'\'' || bytes[i] == b'"' {
            let quote = bytes[i];
            i += 1;
            while i < bytes.len() && bytes[i] != quote {
                i += 1;
            }
            i += 1;
        } else if bytes[i] == b':' {
            let start = i + 1;
            let mut end = start;
            while end < bytes.len() && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_') {
                end += 1;
            }
            if end > start {
                names.insert(&query[start..end]);
            }
            i = end.max(start);
        } else {
            i += 1;
        }
    }

    names
}

/// Reissues a query with the marker of the page to fetch
#[derive(Clone, Debug)]
pub struct QuerySource {
    client: BoxClient,
    query: MetadataQuery,
}

impl QuerySource {
    pub fn new(client: &BoxClient, query: MetadataQuery) -> Self {
        Self {
            client: client.clone(),
            query,
        }
    }
}

impl PageSource for QuerySource {
    async fn fetch_page(&self, marker: Option<&str>) -> Result<Page> {
        let body = self.query.at_marker(marker).to_body()?;
        let response = self.client.post(&self.client.query_url(), Some(&body)).await?;
        Page::from_response(response)
    }
}

/// Run a query and return its results as a lazy sequence of files and folders
///
/// The first page is fetched before returning, starting at the query's own
/// marker if one was set.
pub async fn execute_query(
    client: &BoxClient,
    query: MetadataQuery,
) -> Result<Pager<Item, QuerySource>> {
    query.validate()?;

    tracing::info!(
        "execute_query: from={}, limit={}, fields={}",
        query.from,
        query.limit,
        query.fields.len()
    );

    let marker = query.marker.clone();
    let source = QuerySource::new(client, query);
    Pager::start(source, marker.as_deref()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn relay_query() -> MetadataQuery {
        MetadataQuery::new(
            "enterprise_67890.relayWorkflowInformation",
            "templateName >= :arg",
            "0",
        )
        .query_param("arg", "Templ Name")
            .limit(2)
    }

    #[test]
    fn test_body_contains_only_supplied_members() {
        assert_eq!(
            relay_query().to_body().unwrap(),
            json!({
                "from": "enterprise_67890.relayWorkflowInformation",
                "query": "templateName >= :arg",
                "query_params": {"arg": "Templ Name"},
                "ancestor_folder_id": "0",
                "limit": 2
            })
        );
    }

    #[test]
    fn test_body_with_optional_members() {
        let body = relay_query()
            .index_name("relayIndex")
            .order_by("templateName", Direction::Desc)
            .marker("AAAA")
            .fields(["sha1", "name"])
            .to_body()
            .unwrap();

        assert_eq!(body["index_name"], "relayIndex");
        assert_eq!(
            body["order_by"],
            json!([{"field_key": "templateName", "direction": "desc"}])
        );
        assert_eq!(body["marker"], "AAAA");
        assert_eq!(body["fields"], json!(["sha1", "name"]));
    }

    #[test]
    fn test_body_always_carries_query_params() {
        let body = MetadataQuery::new("enterprise.catalogImages", "photographer = 'Bob'", "0")
            .to_body()
            .unwrap();
        assert_eq!(
            body,
            json!({
                "from": "enterprise.catalogImages",
                "query": "photographer = 'Bob'",
                "query_params": {},
                "ancestor_folder_id": "0",
                "limit": 100
            })
        );
    }

    #[test]
    fn test_at_marker_replaces_only_the_marker() {
        let query = relay_query();
        let next = query.at_marker(Some("m2"));
        assert_eq!(next.get_marker(), Some("m2"));
        assert_eq!(next.at_marker(None), query);
    }

    #[test]
    fn test_placeholders() {
        let names = placeholders("a = :first AND b >= :second_2 OR c = ':'");
        assert!(names.contains("first"));
        assert!(names.contains("second_2"));
        assert_eq!(names.len(), 2);
    }

    #[test]
    fn test_placeholders_skip_quoted_literals() {
        let names = placeholders(
            "shotAt >= '2020-01-01T10:30:00Z' AND label = \"a:b\" AND photographer = :arg",
        );
        assert_eq!(names, HashSet::from(["arg"]));

        let query = MetadataQuery::new(
            "enterprise_67890.catalogImages",
            "shotAt >= '2020-01-01T10:30:00Z' AND photographer = :arg",
            "0",
        )
        .query_param("arg", "Bob Dylan");
        assert!(query.validate().is_ok());
    }

    #[test]
    fn test_validate() {
        assert!(relay_query().validate().is_ok());
        assert!(relay_query().limit(0).validate().is_err());
        assert!(relay_query().limit(101).validate().is_err());
        assert!(MetadataQuery::new("", "a = 1", "0").validate().is_err());
        assert!(MetadataQuery::new("enterprise.t", "", "0").validate().is_err());
        assert!(MetadataQuery::new("enterprise.t", "a = 1", " ").validate().is_err());

        let unbound = MetadataQuery::new("enterprise.t", "amount > :value", "0");
        assert!(matches!(unbound.validate(), Err(Error::InvalidInput(ref m)) if m.contains(":value")));
    }

    #[test]
    fn test_direction_parsing() {
        assert_eq!("ASC".parse::<Direction>(), Ok(Direction::Asc));
        assert_eq!("desc".parse::<Direction>(), Ok(Direction::Desc));
        assert!("up".parse::<Direction>().is_err());
    }
}
