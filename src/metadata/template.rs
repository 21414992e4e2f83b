//! Metadata templates
//!
//! Create, fetch, update, delete and list template schemas. Identity is
//! `scope` + `templateKey`; every call returns the server's view of the
//! template, and field keys are only meaningful within that one response
//! since `editField` can rename them.

use super::field::{validate_fields, Field, FieldOperation};
use crate::api::client::BoxClient;
use crate::api::error::{Error, Result};
use crate::resource::pager::{ListSource, PageEntry, Pager};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Scope used when none is given
pub const ENTERPRISE_SCOPE: &str = "enterprise";

/// Page size for template listings (server maximum)
pub const DEFAULT_LIST_LIMIT: u32 = 100;

/// A metadata template schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataTemplate {
    #[serde(default)]
    pub id: String,
    pub template_key: String,
    pub scope: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub copy_instance_on_item_copy: bool,
    #[serde(default)]
    pub fields: Vec<Field>,
}

impl MetadataTemplate {
    /// Field with the given key in this response
    pub fn field(&self, key: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.key == key)
    }

    pub fn field_keys(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.key.as_str()).collect()
    }
}

impl PageEntry for MetadataTemplate {
    fn from_entry(entry: Value) -> Result<Self> {
        decode_template(entry)
    }
}

fn decode_template(response: Value) -> Result<MetadataTemplate> {
    serde_json::from_value(response)
        .map_err(|e| Error::Decode(format!("Invalid metadata template: {}", e)))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateTemplateBody<'a> {
    scope: &'a str,
    display_name: &'a str,
    hidden: bool,
    template_key: &'a str,
    #[serde(skip_serializing_if = "<[Field]>::is_empty")]
    fields: &'a [Field],
}

/// Create a template
///
/// An empty `fields` slice leaves `fields` out of the request. If the key is
/// already taken in `scope` the server answers 409, surfaced as
/// [`Error::Conflict`].
pub async fn create_metadata_template(
    client: &BoxClient,
    scope: &str,
    template_key: &str,
    display_name: &str,
    hidden: bool,
    fields: &[Field],
) -> Result<MetadataTemplate> {
    require("scope", scope)?;
    require("templateKey", template_key)?;
    require("displayName", display_name)?;
    validate_fields(fields)?;

    tracing::info!(
        "create_metadata_template: scope={}, key={}, fields={}",
        scope,
        template_key,
        fields.len()
    );

    let body = serde_json::to_value(CreateTemplateBody {
        scope,
        display_name,
        hidden,
        template_key,
        fields,
    })?;

    let response = client.post(&client.template_create_url(), Some(&body)).await?;
    decode_template(response)
}

/// Fetch a template by key, in `scope` or the enterprise scope
pub async fn get_metadata_template(
    client: &BoxClient,
    template_key: &str,
    scope: Option<&str>,
) -> Result<MetadataTemplate> {
    require("templateKey", template_key)?;
    let scope = scope.unwrap_or(ENTERPRISE_SCOPE);

    let response = client
        .get(&client.template_schema_url(scope, template_key))
        .await?;
    decode_template(response)
}

/// Fetch a template by its id
pub async fn get_metadata_template_by_id(client: &BoxClient, id: &str) -> Result<MetadataTemplate> {
    require("id", id)?;

    let response = client.get(&client.template_id_url(id)).await?;
    decode_template(response)
}

/// Apply an ordered batch of field operations
///
/// The operations are sent verbatim and applied by the server in order. The
/// returned template is the post-update state.
pub async fn update_metadata_template(
    client: &BoxClient,
    scope: &str,
    template_key: &str,
    operations: &[FieldOperation],
) -> Result<MetadataTemplate> {
    require("scope", scope)?;
    require("templateKey", template_key)?;
    for operation in operations {
        operation.validate()?;
    }

    tracing::info!(
        "update_metadata_template: scope={}, key={}, ops=[{}]",
        scope,
        template_key,
        operations
            .iter()
            .map(|op| op.op())
            .collect::<Vec<_>>()
            .join(",")
    );

    let body = serde_json::to_value(operations)?;
    let response = client
        .put(&client.template_schema_url(scope, template_key), &body)
        .await?;
    decode_template(response)
}

/// Delete a template
///
/// Deleting a template that is already gone succeeds; a later
/// [`get_metadata_template`] fails with `NotFound`.
pub async fn delete_metadata_template(
    client: &BoxClient,
    scope: &str,
    template_key: &str,
) -> Result<()> {
    require("scope", scope)?;
    require("templateKey", template_key)?;

    tracing::info!(
        "delete_metadata_template: scope={}, key={}",
        scope,
        template_key
    );

    match client
        .delete(&client.template_schema_url(scope, template_key))
        .await
    {
        Ok(_) => Ok(()),
        Err(e) if e.is_not_found() => {
            tracing::debug!("Template {}/{} already absent", scope, template_key);
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Every template in the enterprise scope, 100 per page
pub async fn list_enterprise_templates(
    client: &BoxClient,
) -> Result<Pager<MetadataTemplate, ListSource>> {
    list_templates(client, ENTERPRISE_SCOPE, DEFAULT_LIST_LIMIT).await
}

/// Every template in `scope`; `limit` is clamped to 1..=100
pub async fn list_templates(
    client: &BoxClient,
    scope: &str,
    limit: u32,
) -> Result<Pager<MetadataTemplate, ListSource>> {
    require("scope", scope)?;

    let limit = limit.clamp(1, DEFAULT_LIST_LIMIT);
    let source = ListSource::new(client, client.template_list_url(scope), Some(limit));
    Pager::start(source, None).await
}

fn require(what: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidInput(format!("{} must not be empty", what)));
    }
    Ok(())
}
