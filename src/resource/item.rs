//! Typed files and folders
//!
//! Query results mix files and folders. Each raw entry is decoded by looking
//! at its `type` discriminator; anything other than `file` or `folder` is a
//! decode error rather than being coerced into one of the two.

use super::pager::PageEntry;
use crate::api::error::{Error, Result};
use crate::metadata::instance::Metadata;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Kind of item metadata can be attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    File,
    Folder,
}

impl ItemKind {
    /// Value of the `type` discriminator
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::File => "file",
            ItemKind::Folder => "folder",
        }
    }

    /// API collection path segment
    pub fn collection(&self) -> &'static str {
        match self {
            ItemKind::File => "files",
            ItemKind::Folder => "folders",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "file" | "files" => Ok(ItemKind::File),
            "folder" | "folders" => Ok(ItemKind::Folder),
            other => Err(format!("Unknown item type: {}", other)),
        }
    }
}

/// Metadata instances on an item, keyed by scope then template key
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ItemMetadata {
    instances: BTreeMap<String, BTreeMap<String, Metadata>>,
}

impl ItemMetadata {
    /// Instance for `(template, scope)`
    pub fn get(&self, template: &str, scope: &str) -> Option<&Metadata> {
        self.instances.get(scope).and_then(|t| t.get(template))
    }

    /// Every instance as `(scope, template, instance)`
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &Metadata)> {
        self.instances.iter().flat_map(|(scope, templates)| {
            templates
                .iter()
                .map(move |(template, md)| (scope.as_str(), template.as_str(), md))
        })
    }

    pub fn len(&self) -> usize {
        self.instances.values().map(|t| t.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<'de> Deserialize<'de> for ItemMetadata {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // `"metadata": null` means no instances
        let mut instances =
            Option::<BTreeMap<String, BTreeMap<String, Metadata>>>::deserialize(deserializer)?
                .unwrap_or_default();

        // Projected query results may omit the system members; the map keys
        // are authoritative for the instance's identity.
        for (scope, templates) in instances.iter_mut() {
            for (template, metadata) in templates.iter_mut() {
                metadata.fill_identity(template, scope);
            }
        }

        Ok(Self { instances })
    }
}

/// A file returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing_if = "ItemMetadata::is_empty")]
    pub metadata: ItemMetadata,
}

/// A folder returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderInfo {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing_if = "ItemMetadata::is_empty")]
    pub metadata: ItemMetadata,
}

/// A file or folder
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Item {
    File(FileInfo),
    Folder(FolderInfo),
}

impl Item {
    /// Decode a raw entry, dispatching on its `type`
    pub fn from_value(value: Value) -> Result<Self> {
        let kind = value
            .get("type")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::Decode("Entry has no 'type' discriminator".to_string()))?;

        match kind {
            "file" => Ok(Item::File(serde_json::from_value(value)?)),
            "folder" => Ok(Item::Folder(serde_json::from_value(value)?)),
            other => Err(Error::Decode(format!("Unknown item type '{}'", other))),
        }
    }

    pub fn kind(&self) -> ItemKind {
        match self {
            Item::File(_) => ItemKind::File,
            Item::Folder(_) => ItemKind::Folder,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Item::File(f) => &f.id,
            Item::Folder(f) => &f.id,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Item::File(f) => f.name.as_deref(),
            Item::Folder(f) => f.name.as_deref(),
        }
    }

    pub fn all_metadata(&self) -> &ItemMetadata {
        match self {
            Item::File(f) => &f.metadata,
            Item::Folder(f) => &f.metadata,
        }
    }

    /// Metadata instance for `(template, scope)`
    pub fn metadata(&self, template: &str, scope: &str) -> Option<&Metadata> {
        self.all_metadata().get(template, scope)
    }

    pub fn as_file(&self) -> Option<&FileInfo> {
        match self {
            Item::File(f) => Some(f),
            Item::Folder(_) => None,
        }
    }

    pub fn as_folder(&self) -> Option<&FolderInfo> {
        match self {
            Item::Folder(f) => Some(f),
            Item::File(_) => None,
        }
    }
}

impl PageEntry for Item {
    fn from_entry(entry: Value) -> Result<Self> {
        Item::from_value(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn file_entry() -> Value {
        json!({
            "type": "file",
            "id": "123450",
            "etag": "1",
            "sha1": "4f6f5ff3b4e3a1b2d1b6f8e6d9c0a7b8e9f0a1b2",
            "name": "1.jpg",
            "modified_at": "2020-08-11T13:53:39-07:00",
            "metadata": {
                "enterprise_67890": {
                    "relayWorkflowInformation": {
                        "$parent": "file_123450",
                        "$template": "relayWorkflowInformation",
                        "$scope": "enterprise_67890",
                        "$version": 0,
                        "workflowName": "Werk Flow 0"
                    }
                }
            }
        })
    }

    #[test]
    fn test_null_metadata_is_empty() {
        let item = Item::from_value(json!({"type": "file", "id": "1", "metadata": null})).unwrap();
        assert_eq!(item.id(), "1");
        assert!(item.metadata("relayWorkflowInformation", "enterprise_67890").is_none());

        let item = Item::from_value(json!({"type": "folder", "id": "2", "metadata": null})).unwrap();
        assert_eq!(item.kind(), ItemKind::Folder);
    }

    #[test]
    fn test_file_entry_decodes_to_file() {
        let item = Item::from_value(file_entry()).unwrap();
        assert_eq!(item.kind(), ItemKind::File);
        assert_eq!(item.id(), "123450");
        assert_eq!(item.name(), Some("1.jpg"));
        assert!(item.as_file().unwrap().modified_at.is_some());

        let md = item
            .metadata("relayWorkflowInformation", "enterprise_67890")
            .unwrap();
        assert_eq!(md.template_name(), Some("relayWorkflowInformation"));
        assert_eq!(md.scope(), Some("enterprise_67890"));
        assert_eq!(md.get_string("/workflowName"), Some("Werk Flow 0"));
        assert!(item.metadata("relayWorkflowInformation", "enterprise_1").is_none());
    }

    #[test]
    fn test_folder_entry_decodes_to_folder() {
        let item = Item::from_value(json!({
            "type": "folder",
            "id": "124242482",
            "name": "Also Important.docx",
            "metadata": {
                "enterprise_67890": {
                    "catalogImages": {"photographer": "Bob Dylan"}
                }
            }
        }))
        .unwrap();

        assert_eq!(item.kind(), ItemKind::Folder);
        assert!(item.as_folder().is_some());
        assert!(item.as_file().is_none());

        // Identity is filled in from the map keys when the server omits it
        let md = item.metadata("catalogImages", "enterprise_67890").unwrap();
        assert_eq!(md.template_name(), Some("catalogImages"));
        assert_eq!(md.scope(), Some("enterprise_67890"));
        assert_eq!(md.get_string("/photographer"), Some("Bob Dylan"));
    }

    #[test]
    fn test_unknown_type_is_decode_error() {
        let err = Item::from_value(json!({"type": "web_link", "id": "1"})).unwrap_err();
        assert!(matches!(err, Error::Decode(ref msg) if msg.contains("web_link")));

        let err = Item::from_value(json!({"id": "1"})).unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn test_multiple_instances_on_one_item() {
        let item = Item::from_value(json!({
            "type": "file",
            "id": "123451",
            "name": "2.jpg",
            "metadata": {
                "enterprise_67890": {
                    "relayWorkflowInformation": {"$template": "relayWorkflowInformation", "$scope": "enterprise_67890"},
                    "randomTemplate": {"$template": "randomTemplate", "$scope": "enterprise_67890"}
                },
                "enterprise_123456": {
                    "someTemplate": {"$template": "someTemplate", "$scope": "enterprise_123456"}
                }
            }
        }))
        .unwrap();

        assert_eq!(item.all_metadata().len(), 3);
        assert!(item.metadata("randomTemplate", "enterprise_67890").is_some());
        assert!(item.metadata("someTemplate", "enterprise_123456").is_some());
    }

    #[test]
    fn test_item_serializes_with_type_tag() {
        let item = Item::from_value(file_entry()).unwrap();
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["type"], "file");
        assert_eq!(value["id"], "123450");
        assert_eq!(
            value["metadata"]["enterprise_67890"]["relayWorkflowInformation"]["workflowName"],
            "Werk Flow 0"
        );
    }

    #[test]
    fn test_item_kind_parsing() {
        assert_eq!("file".parse::<ItemKind>(), Ok(ItemKind::File));
        assert_eq!("folders".parse::<ItemKind>(), Ok(ItemKind::Folder));
        assert!("web_link".parse::<ItemKind>().is_err());
        assert_eq!(ItemKind::Folder.collection(), "folders");
    }
}
