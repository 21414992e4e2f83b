//! Box API interaction module
//!
//! This module provides the core functionality for talking to the Box REST
//! API: credentials, the HTTP client, and the error taxonomy.
//!
//! # Module Structure
//!
//! - [`auth`] - Access token resolution
//! - [`client`] - Main Box client and URL builders
//! - [`error`] - Typed errors carrying status code and raw body
//! - [`http`] - HTTP utilities for REST API calls
//!
//! # Example
//!
//! ```ignore
//! use boxmeta::api::{auth::Credentials, client::BoxClient};
//!
//! async fn example() -> boxmeta::Result<()> {
//!     let client = BoxClient::new(Credentials::new("my-token")?)?;
//!     let template = client.get(&client.template_id_url("f7a9891f")).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod error;
pub mod http;
