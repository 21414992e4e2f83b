//! Resource abstraction layer
//!
//! Typed API resources and the pagination machinery shared by every listing.
//!
//! # Architecture
//!
//! - [`item`] - Files and folders, decoded by their `type` discriminator
//! - [`pager`] - Marker-driven page iteration over any [`pager::PageSource`]

pub mod item;
pub mod pager;

pub use item::{FileInfo, FolderInfo, Item, ItemKind, ItemMetadata};
pub use pager::{ListSource, Page, PageEntry, PageSource, Pager};
