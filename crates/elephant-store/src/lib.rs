//! # elephant-store
//!
//! Flat-file storage layer for elephant.
//!
//! This crate provides:
//! - An atomic JSON document store rooted at the data directory
//! - The durable sequential id allocator
//! - The media catalog and payload placement
//! - The relationship graph store and its derived projection
//! - The local user directory
//!
//! ## Example
//!
//! ```rust,ignore
//! use elephant_store::{Store, StoreConfig, RelationshipRepository, NewRelationship};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Store::open(StoreConfig::new("./data")).await?;
//!
//!     let rel = store.relationships.create(NewRelationship {
//!         item_a: 1,
//!         item_b: 2,
//!         relationship_type: "same trip".to_string(),
//!         description: None,
//!         strength: Some(0.8),
//!         created_by: "friend1".to_string(),
//!         tags: vec![],
//!     }).await?;
//!
//!     println!("Linked {} and {}", rel.item_a, rel.item_b);
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod counter;
pub mod json_store;
pub mod locks;
pub mod media;
pub mod paths;
pub mod relationships;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::FixedOffset;
use tracing::info;

pub use auth::FsUserDirectory;
pub use counter::FsIdAllocator;
pub use json_store::JsonStore;
pub use locks::KeyedLocks;
pub use media::FsMediaCatalog;
pub use relationships::FsRelationshipStore;

// Re-export core types
pub use elephant_core::*;

/// Settings needed to open a [`Store`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub data_dir: PathBuf,
    /// Offset used for temporal context and timeline dates
    pub utc_offset: FixedOffset,
    pub token_secret: String,
    pub token_ttl_hours: i64,
}

impl StoreConfig {
    /// Defaults for everything but the data directory.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            utc_offset: utc_offset(),
            token_secret: defaults::TOKEN_SECRET.to_string(),
            token_ttl_hours: defaults::TOKEN_TTL_HOURS,
        }
    }
}

/// All repositories over one data root, built once at startup.
pub struct Store {
    /// Underlying document store.
    pub json: JsonStore,
    /// Sequential id allocator.
    pub ids: Arc<FsIdAllocator>,
    /// Media catalog.
    pub media: FsMediaCatalog,
    /// Relationship graph store.
    pub relationships: FsRelationshipStore,
    /// Local user accounts.
    pub users: FsUserDirectory,
}

impl Store {
    /// Open the data root, creating its layout and seed documents as needed.
    pub async fn open(config: StoreConfig) -> Result<Self> {
        let json = JsonStore::new(&config.data_dir);
        for dir in [
            paths::ITEMS_DIR,
            paths::MEDIA_DIR,
            paths::TEMP_DIR,
            paths::LINKS_DIR,
        ] {
            json.ensure_dir(dir).await?;
        }

        let ids = Arc::new(FsIdAllocator::open(json.clone()).await?);
        let media = FsMediaCatalog::new(json.clone(), ids.clone(), config.utc_offset);
        let relationships = FsRelationshipStore::new(json.clone());
        let users =
            FsUserDirectory::open(&json, &config.token_secret, config.token_ttl_hours).await?;

        info!(
            data_dir = %config.data_dir.display(),
            last_id = ids.current().await,
            "Opened store"
        );

        Ok(Self {
            json,
            ids,
            media,
            relationships,
            users,
        })
    }
}
