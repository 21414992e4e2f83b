//! Client for the Box metadata API
//!
//! Metadata templates (schemas attachable to files and folders), the
//! metadata instances applied with them, and metadata queries with
//! transparent marker-based pagination.
//!
//! ```ignore
//! use boxmeta::{BoxClient, Credentials, Field, FieldType};
//! use boxmeta::metadata::template::create_metadata_template;
//!
//! async fn example() -> boxmeta::Result<()> {
//!     let client = BoxClient::new(Credentials::new("my-token")?)?;
//!     let fields = vec![Field::new(FieldType::Enum, "fy", "FY").with_options(["FY16", "FY17"])];
//!     let template = create_metadata_template(
//!         &client, "enterprise", "documentFlow03", "Document Flow 03", false, &fields,
//!     )
//!     .await?;
//!     println!("{}", template.id);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod metadata;
pub mod resource;

pub use api::auth::Credentials;
pub use api::client::BoxClient;
pub use api::error::{Error, Result};
pub use metadata::field::{
    Field, FieldChanges, FieldOperation, FieldOption, FieldType, OptionKey, TemplateChanges,
};
pub use metadata::instance::Metadata;
pub use metadata::query::{Direction, MetadataQuery};
pub use metadata::template::MetadataTemplate;
pub use resource::{Item, ItemKind, Pager};
