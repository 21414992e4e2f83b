//! Template field model
//!
//! Typed representation of metadata template fields and of the operations
//! that mutate a template's schema. Wire names are camelCase and optional
//! members are left out of request bodies entirely when unset.

use crate::api::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Type of a template field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldType {
    String,
    Enum,
    Date,
    Float,
    MultiSelect,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Enum => "enum",
            FieldType::Date => "date",
            FieldType::Float => "float",
            FieldType::MultiSelect => "multiSelect",
        }
    }

    /// Whether fields of this type carry an option list
    pub fn has_options(&self) -> bool {
        matches!(self, FieldType::Enum | FieldType::MultiSelect)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "string" => Ok(FieldType::String),
            "enum" => Ok(FieldType::Enum),
            "date" => Ok(FieldType::Date),
            "float" => Ok(FieldType::Float),
            "multiSelect" => Ok(FieldType::MultiSelect),
            other => Err(format!("Unknown field type: {}", other)),
        }
    }
}

/// One option of an enum or multiSelect field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOption {
    pub key: String,
    /// Assigned by the server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl FieldOption {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            id: None,
        }
    }
}

/// A metadata template field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub key: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<FieldOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copy_instance_on_item_copy: Option<bool>,
}

impl Field {
    pub fn new(field_type: FieldType, key: &str, display_name: &str) -> Self {
        Self {
            field_type,
            key: key.to_string(),
            display_name: display_name.to_string(),
            description: None,
            hidden: None,
            id: None,
            options: Vec::new(),
            copy_instance_on_item_copy: None,
        }
    }

    /// Set the option list from plain keys
    pub fn with_options<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.options = keys
            .into_iter()
            .map(|k| FieldOption::new(k.as_ref()))
            .collect();
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn with_hidden(mut self, hidden: bool) -> Self {
        self.hidden = Some(hidden);
        self
    }

    /// Option keys in order
    pub fn option_keys(&self) -> Vec<&str> {
        self.options.iter().map(|o| o.key.as_str()).collect()
    }

    pub fn has_option(&self, key: &str) -> bool {
        self.options.iter().any(|o| o.key == key)
    }

    /// Check the field before it is sent as a new field
    pub fn validate(&self) -> Result<()> {
        require_key("field key", &self.key)?;
        if self.display_name.trim().is_empty() {
            return Err(Error::InvalidInput(format!(
                "Field '{}' has an empty display name",
                self.key
            )));
        }

        if !self.field_type.has_options() && !self.options.is_empty() {
            return Err(Error::InvalidInput(format!(
                "Field '{}' of type {} cannot have options",
                self.key, self.field_type
            )));
        }

        let mut seen = HashSet::new();
        for option in &self.options {
            require_key("option key", &option.key)?;
            if !seen.insert(option.key.as_str()) {
                return Err(Error::InvalidInput(format!(
                    "Field '{}' has duplicate option '{}'",
                    self.key, option.key
                )));
            }
        }

        Ok(())
    }
}

/// Validate a field list for template creation
pub fn validate_fields(fields: &[Field]) -> Result<()> {
    let mut keys = HashSet::new();
    for field in fields {
        field.validate()?;
        if !keys.insert(field.key.as_str()) {
            return Err(Error::InvalidInput(format!(
                "Duplicate field key '{}'",
                field.key
            )));
        }
    }
    Ok(())
}

/// Partial field used by `editField`
///
/// `key` here is the *new* key; the field being edited is selected by the
/// operation's `fieldKey`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
}

impl FieldChanges {
    fn is_empty(&self) -> bool {
        self.key.is_none()
            && self.display_name.is_none()
            && self.description.is_none()
            && self.hidden.is_none()
    }
}

/// Replacement or new option key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionKey {
    pub key: String,
}

/// Template level changes used by `editTemplate`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copy_instance_on_item_copy: Option<bool>,
}

/// One atomic template mutation. A template update is an ordered list of
/// these, applied by the server in order.
///
/// Serialized as `{op, fieldKey?, enumOptionKey?, data?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum FieldOperation {
    AddField {
        data: Field,
    },
    EditField {
        field_key: String,
        data: FieldChanges,
    },
    AddEnumOption {
        field_key: String,
        data: OptionKey,
    },
    EditEnumOption {
        field_key: String,
        enum_option_key: String,
        data: OptionKey,
    },
    RemoveField {
        field_key: String,
    },
    RemoveEnumOption {
        field_key: String,
        enum_option_key: String,
    },
    EditTemplate {
        data: TemplateChanges,
    },
}

impl FieldOperation {
    pub fn add_field(field: Field) -> Self {
        FieldOperation::AddField { data: field }
    }

    pub fn edit_field(field_key: &str, changes: FieldChanges) -> Self {
        FieldOperation::EditField {
            field_key: field_key.to_string(),
            data: changes,
        }
    }

    /// Rename a field's key, optionally changing its display name too
    pub fn rename_field(field_key: &str, new_key: &str, display_name: Option<&str>) -> Self {
        Self::edit_field(
            field_key,
            FieldChanges {
                key: Some(new_key.to_string()),
                display_name: display_name.map(|s| s.to_string()),
                ..Default::default()
            },
        )
    }

    pub fn add_enum_option(field_key: &str, option_key: &str) -> Self {
        FieldOperation::AddEnumOption {
            field_key: field_key.to_string(),
            data: OptionKey {
                key: option_key.to_string(),
            },
        }
    }

    pub fn edit_enum_option(field_key: &str, option_key: &str, new_key: &str) -> Self {
        FieldOperation::EditEnumOption {
            field_key: field_key.to_string(),
            enum_option_key: option_key.to_string(),
            data: OptionKey {
                key: new_key.to_string(),
            },
        }
    }

    pub fn remove_field(field_key: &str) -> Self {
        FieldOperation::RemoveField {
            field_key: field_key.to_string(),
        }
    }

    pub fn remove_enum_option(field_key: &str, option_key: &str) -> Self {
        FieldOperation::RemoveEnumOption {
            field_key: field_key.to_string(),
            enum_option_key: option_key.to_string(),
        }
    }

    pub fn edit_template(changes: TemplateChanges) -> Self {
        FieldOperation::EditTemplate { data: changes }
    }

    /// Wire name of the operation
    pub fn op(&self) -> &'static str {
        match self {
            FieldOperation::AddField { .. } => "addField",
            FieldOperation::EditField { .. } => "editField",
            FieldOperation::AddEnumOption { .. } => "addEnumOption",
            FieldOperation::EditEnumOption { .. } => "editEnumOption",
            FieldOperation::RemoveField { .. } => "removeField",
            FieldOperation::RemoveEnumOption { .. } => "removeEnumOption",
            FieldOperation::EditTemplate { .. } => "editTemplate",
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            FieldOperation::AddField { data } => data.validate(),
            FieldOperation::EditField { field_key, data } => {
                require_key("fieldKey", field_key)?;
                if let Some(new_key) = &data.key {
                    require_key("new field key", new_key)?;
                }
                if data.is_empty() {
                    return Err(Error::InvalidInput(format!(
                        "editField on '{}' changes nothing",
                        field_key
                    )));
                }
                Ok(())
            }
            FieldOperation::AddEnumOption { field_key, data } => {
                require_key("fieldKey", field_key)?;
                require_key("option key", &data.key)
            }
            FieldOperation::EditEnumOption {
                field_key,
                enum_option_key,
                data,
            } => {
                require_key("fieldKey", field_key)?;
                require_key("enumOptionKey", enum_option_key)?;
                require_key("option key", &data.key)
            }
            FieldOperation::RemoveField { field_key } => require_key("fieldKey", field_key),
            FieldOperation::RemoveEnumOption {
                field_key,
                enum_option_key,
            } => {
                require_key("fieldKey", field_key)?;
                require_key("enumOptionKey", enum_option_key)
            }
            FieldOperation::EditTemplate { .. } => Ok(()),
        }
    }
}

fn require_key(what: &str, key: &str) -> Result<()> {
    if key.trim().is_empty() {
        return Err(Error::InvalidInput(format!("{} must not be empty", what)));
    }
    Ok(())
}
