//! Monetix Core Library
//!
//! Core types and logic for managing Roblox gamepasses and developer
//! products through the Open Cloud API. Nothing in here depends on the
//! relay server or on any particular front-end.
//!
//! # Modules
//!
//! - [`catalog`] - Catalog item model, upstream records and form encoding
//! - [`client`] - Resource client: paginated listing, icon enrichment, create/update
//! - [`pipeline`] - Paced cursor pagination and batched lookups
//! - [`bulk`] - Sequential bulk create runner
//! - [`events`] - Progress sink trait for decoupling bulk runs from their UI
//! - [`session`] - Recently used API key / universe cache
//! - [`config`] - Configuration types and defaults
//! - [`error`] - Error types

pub mod bulk;
pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod pipeline;
pub mod session;

// Re-export commonly used types
pub use bulk::{BulkReport, BulkResult, BulkRow, BulkRunner, ItemCreator, RunState, UniverseCreator};
pub use catalog::{CatalogItem, CreatedItem, ImageFile, ItemDraft, ItemPatch, ResourceKind};
pub use client::ResourceClient;
pub use config::{AppConfig, ClientConfig};
pub use error::{MonetixError, Result};
pub use events::{BulkProgress, NoOpProgressSink, ProgressSink, TracingProgressSink};
pub use pipeline::{collect_pages, lookup_in_batches, Page};
pub use session::{
    MemorySessionStore, Session, SessionCache, SessionDraft, SessionStore, SledSessionStore,
};
