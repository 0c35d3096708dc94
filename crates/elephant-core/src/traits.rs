//! Core traits for elephant abstractions.
//!
//! These traits define the interfaces the filesystem store implements and the
//! HTTP layer consumes, so handlers never touch paths directly.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// ID ALLOCATION
// =============================================================================

/// Issues unique, strictly increasing media item ids.
#[async_trait]
pub trait IdAllocator: Send + Sync {
    /// Reserve the next id. The new value is durable before it is returned.
    async fn next(&self) -> Result<ItemId>;

    /// Last issued id, 0 if none.
    async fn current(&self) -> ItemId;

    /// Reset the counter to 0. Administrative use only.
    async fn reset(&self) -> Result<()>;
}

// =============================================================================
// MEDIA CATALOG
// =============================================================================

/// Catalog of uploaded media items.
#[async_trait]
pub trait MediaRepository: Send + Sync {
    /// Allocate an id, derive the temporal context and persist a new item.
    async fn create(&self, upload: MediaUpload, metadata: MediaMetadata) -> Result<MediaItem>;

    /// Fetch an item. Returns `None` when absent.
    async fn get(&self, id: ItemId) -> Result<Option<MediaItem>>;

    /// All items, newest upload first.
    async fn list_all(&self) -> Result<Vec<MediaItem>>;

    /// Merge a patch into an existing item. Returns `None` when absent.
    async fn update(&self, id: ItemId, patch: MediaPatch) -> Result<Option<MediaItem>>;

    /// Filtered, paginated, date-grouped view of the catalog.
    async fn timeline(&self, query: TimelineQuery) -> Result<TimelinePage>;
}

// =============================================================================
// RELATIONSHIP GRAPH
// =============================================================================

/// Store of undirected relationships keyed by item pair.
#[async_trait]
pub trait RelationshipRepository: Send + Sync {
    /// Create a relationship. Fails with `RelationshipExists` when the pair is taken.
    async fn create(&self, input: NewRelationship) -> Result<Relationship>;

    /// Fetch the relationship for a pair, in either order.
    async fn get(&self, a: ItemId, b: ItemId) -> Result<Option<Relationship>>;

    /// Merge a patch. Returns `None` when the pair has no relationship.
    async fn update(
        &self,
        a: ItemId,
        b: ItemId,
        patch: RelationshipPatch,
    ) -> Result<Option<Relationship>>;

    /// Delete a relationship. Returns whether one existed.
    async fn delete(&self, a: ItemId, b: ItemId) -> Result<bool>;

    /// Every stored relationship, ordered by pair key.
    async fn list_all(&self) -> Result<Vec<Relationship>>;

    /// Relationships with `id` as either endpoint.
    async fn list_for_item(&self, id: ItemId) -> Result<Vec<Relationship>>;

    /// Relationships matching a filter.
    async fn list(&self, filter: RelationshipFilter) -> Result<Vec<Relationship>>;

    /// Current graph projection.
    async fn projection(&self) -> Result<GraphProjection>;
}

// =============================================================================
// USERS
// =============================================================================

/// Local user accounts and bearer tokens.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Check credentials and issue a token.
    async fn login(&self, user_id: &str, password: &str) -> Result<LoginResult>;

    /// Verify a bearer token. Returns `None` for bad, expired or unknown tokens.
    async fn verify_token(&self, token: &str) -> Option<Identity>;

    /// Known users without credentials.
    async fn users(&self) -> Result<Vec<PublicUser>>;
}
