//! Metadata instances on files and folders
//!
//! An instance is one template's values applied to one item. Values are
//! addressed with path syntax (`/firstName`); members starting with `$` are
//! maintained by the server.

use crate::api::client::BoxClient;
use crate::api::error::{Error, Result};
use crate::resource::item::ItemKind;
use crate::resource::pager::{ListSource, PageEntry, Pager};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Template used for free-form key/value metadata
pub const PROPERTIES_TEMPLATE: &str = "properties";

/// Scope of [`PROPERTIES_TEMPLATE`]
pub const GLOBAL_SCOPE: &str = "global";

/// One metadata instance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata {
    values: Map<String, Value>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Metadata::set`]
    pub fn add(mut self, path: &str, value: impl Into<Value>) -> Self {
        self.set(path, value);
        self
    }

    pub fn set(&mut self, path: &str, value: impl Into<Value>) {
        self.values.insert(path_key(path).to_string(), value.into());
    }

    pub fn remove(&mut self, path: &str) -> Option<Value> {
        self.values.remove(path_key(path))
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        self.values.get(path_key(path))
    }

    pub fn get_string(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(|v| v.as_str())
    }

    pub fn get_float(&self, path: &str) -> Option<f64> {
        self.get(path).and_then(|v| v.as_f64())
    }

    /// Values of a multiSelect field
    pub fn get_multi_select(&self, path: &str) -> Option<Vec<&str>> {
        self.get(path)
            .and_then(|v| v.as_array())
            .map(|arr| arr.iter().filter_map(|v| v.as_str()).collect())
    }

    pub fn template_name(&self) -> Option<&str> {
        self.system_str("$template")
    }

    pub fn scope(&self) -> Option<&str> {
        self.system_str("$scope")
    }

    pub fn id(&self) -> Option<&str> {
        self.system_str("$id")
    }

    /// Owning item, e.g. `file_123450`
    pub fn parent(&self) -> Option<&str> {
        self.system_str("$parent")
    }

    pub fn version(&self) -> Option<i64> {
        self.values.get("$version").and_then(|v| v.as_i64())
    }

    /// User fields only, without the `$` members
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values
            .iter()
            .filter(|(k, _)| !k.starts_with('$'))
            .map(|(k, v)| (k.as_str(), v))
    }

    pub fn as_json(&self) -> &Map<String, Value> {
        &self.values
    }

    /// Body for a create request: user fields only
    pub fn to_create_body(&self) -> Value {
        Value::Object(
            self.fields()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    pub(crate) fn fill_identity(&mut self, template: &str, scope: &str) {
        self.values
            .entry("$template")
            .or_insert_with(|| Value::String(template.to_string()));
        self.values
            .entry("$scope")
            .or_insert_with(|| Value::String(scope.to_string()));
    }

    fn system_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(|v| v.as_str())
    }
}

impl PageEntry for Metadata {
    fn from_entry(entry: Value) -> Result<Self> {
        if !entry.is_object() {
            return Err(Error::Decode("Metadata instance is not an object".to_string()));
        }
        Ok(serde_json::from_value(entry)?)
    }
}

fn path_key(path: &str) -> &str {
    path.strip_prefix('/').unwrap_or(path)
}

fn decode_instance(response: Value) -> Result<Metadata> {
    Metadata::from_entry(response)
}

/// Apply a template instance to an item
pub async fn create_metadata(
    client: &BoxClient,
    kind: ItemKind,
    item_id: &str,
    template: &str,
    scope: &str,
    metadata: &Metadata,
) -> Result<Metadata> {
    tracing::info!(
        "create_metadata: {}={}, template={}, scope={}",
        kind,
        item_id,
        template,
        scope
    );

    let url = client.item_instance_url(kind.collection(), item_id, scope, template);
    let response = client.post(&url, Some(&metadata.to_create_body())).await?;
    decode_instance(response)
}

/// Apply free-form `properties` metadata to an item
pub async fn create_properties(
    client: &BoxClient,
    kind: ItemKind,
    item_id: &str,
    metadata: &Metadata,
) -> Result<Metadata> {
    create_metadata(client, kind, item_id, PROPERTIES_TEMPLATE, GLOBAL_SCOPE, metadata).await
}

/// Fetch one template instance from an item
pub async fn get_metadata(
    client: &BoxClient,
    kind: ItemKind,
    item_id: &str,
    template: &str,
    scope: &str,
) -> Result<Metadata> {
    let url = client.item_instance_url(kind.collection(), item_id, scope, template);
    let response = client.get(&url).await?;
    decode_instance(response)
}

/// Every instance attached to an item
///
/// `fields`, when non-empty, limits which values the server returns.
pub async fn get_all_metadata(
    client: &BoxClient,
    kind: ItemKind,
    item_id: &str,
    fields: &[&str],
) -> Result<Pager<Metadata, ListSource>> {
    let mut source = ListSource::new(
        client,
        client.item_metadata_url(kind.collection(), item_id),
        None,
    );
    if !fields.is_empty() {
        source = source.with_param("fields", &fields.join(","));
    }

    Pager::start(source, None).await
}

/// Remove a template instance from an item
pub async fn delete_metadata(
    client: &BoxClient,
    kind: ItemKind,
    item_id: &str,
    template: &str,
    scope: &str,
) -> Result<()> {
    tracing::info!(
        "delete_metadata: {}={}, template={}, scope={}",
        kind,
        item_id,
        template,
        scope
    );

    let url = client.item_instance_url(kind.collection(), item_id, scope, template);
    client.delete(&url).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_add_and_get_by_path() {
        let md = Metadata::new()
            .add("/firstName", "John")
            .add("/lastName", "Smith")
            .add("/age", 42.5)
            .add("/tags", json!(["a", "b"]));

        assert_eq!(md.get_string("/firstName"), Some("John"));
        assert_eq!(md.get_string("lastName"), Some("Smith"));
        assert_eq!(md.get_float("/age"), Some(42.5));
        assert_eq!(md.get_multi_select("/tags"), Some(vec!["a", "b"]));
        assert_eq!(md.get_string("/missing"), None);
    }

    #[test]
    fn test_system_members() {
        let md: Metadata = serde_json::from_value(json!({
            "$id": "c79896a0-a33f-11e3-a5e2-0800200c9a66",
            "$parent": "file_5010739061",
            "$template": "documentFlow03",
            "$scope": "enterprise",
            "$version": 2,
            "customerTeam": "MyTeam"
        }))
        .unwrap();

        assert_eq!(md.template_name(), Some("documentFlow03"));
        assert_eq!(md.scope(), Some("enterprise"));
        assert_eq!(md.parent(), Some("file_5010739061"));
        assert_eq!(md.version(), Some(2));
        assert_eq!(md.id(), Some("c79896a0-a33f-11e3-a5e2-0800200c9a66"));
        assert_eq!(md.fields().count(), 1);
    }

    #[test]
    fn test_create_body_omits_system_members() {
        let mut md = Metadata::new().add("/customerTeam", "MyTeam");
        md.fill_identity("documentFlow03", "enterprise");
        assert_eq!(md.to_create_body(), json!({"customerTeam": "MyTeam"}));
    }

    #[test]
    fn test_fill_identity_keeps_existing_values() {
        let mut md: Metadata = serde_json::from_value(json!({"$template": "a", "$scope": "s"})).unwrap();
        md.fill_identity("b", "t");
        assert_eq!(md.template_name(), Some("a"));
        assert_eq!(md.scope(), Some("s"));
    }

    #[test]
    fn test_remove() {
        let mut md = Metadata::new().add("/department", "Beauty");
        assert_eq!(md.remove("/department"), Some(json!("Beauty")));
        assert!(md.get("/department").is_none());
    }

    #[test]
    fn test_non_object_entry_is_rejected() {
        assert!(matches!(
            Metadata::from_entry(json!("nope")),
            Err(Error::Decode(_))
        ));
    }
}
