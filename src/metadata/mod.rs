//! Metadata templates, instances and queries
//!
//! # Module Structure
//!
//! - [`field`] - Field model and template field operations
//! - [`template`] - Template create/get/update/delete/list
//! - [`instance`] - Metadata instances attached to files and folders
//! - [`query`] - Metadata query builder and execution
//!
//! # Example
//!
//! ```ignore
//! use boxmeta::metadata::query::{execute_query, MetadataQuery};
//!
//! async fn example(client: &boxmeta::BoxClient) -> boxmeta::Result<()> {
//!     let query = MetadataQuery::new("enterprise_67890.catalogImages", "photographer = :arg", "0")
//!         .query_param("arg", "Bob Dylan");
//!
//!     let mut results = execute_query(client, query).await?;
//!     while let Some(item) = results.next().await {
//!         println!("{}", item?.id());
//!     }
//!     Ok(())
//! }
//! ```

pub mod field;
pub mod instance;
pub mod query;
pub mod template;
