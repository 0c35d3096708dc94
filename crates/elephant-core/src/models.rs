//! Data models for elephant.
//!
//! All persisted documents use camelCase field names, both on disk and on the
//! wire, so a document read from `items/` or `relationships/links/` can be
//! returned to clients unchanged.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use crate::defaults::{
    DEFAULT_STRENGTH, FALLBACK_EXTENSION, MAX_STRENGTH, MIN_STRENGTH, TIMELINE_LIMIT,
    TIMELINE_PAGE,
};
use crate::error::{Error, Result};
use crate::temporal::TemporalContext;

/// Identifier of a catalogued media item, issued by the ID allocator.
pub type ItemId = u64;

// =============================================================================
// MEDIA TYPES
// =============================================================================

/// One catalogued uploaded asset and its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    pub id: ItemId,
    /// Storage-relative payload name, `{id}.{ext}`
    pub filename: String,
    pub original_name: String,
    pub mime_type: String,
    pub file_size: u64,
    pub uploaded_by: String,
    pub uploaded_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_thoughts: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub temporal_context: TemporalContext,
}

/// Facts about an uploaded file captured from the upload itself.
#[derive(Debug, Clone)]
pub struct MediaUpload {
    pub original_name: String,
    pub mime_type: String,
    pub file_size: u64,
    pub uploaded_by: String,
}

/// Optional user-supplied metadata attached at upload time.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub upload_thoughts: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Partial update of a media item's mutable metadata.
#[derive(Debug, Clone, Default)]
pub struct MediaPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub upload_thoughts: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl MediaPatch {
    /// Merge the provided fields into `item`. Identity fields are never touched.
    pub fn apply(self, item: &mut MediaItem) {
        if let Some(title) = self.title {
            item.title = Some(title);
        }
        if let Some(description) = self.description {
            item.description = Some(description);
        }
        if let Some(thoughts) = self.upload_thoughts {
            item.upload_thoughts = Some(thoughts);
        }
        if let Some(tags) = self.tags {
            item.tags = normalize_tags(tags);
        }
    }
}

/// Extension of `original_name` used for the stored payload.
///
/// Takes the final dot-segment when it is non-empty ASCII alphanumeric,
/// otherwise [`FALLBACK_EXTENSION`].
pub fn file_extension(original_name: &str) -> &str {
    match original_name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()) => {
            ext
        }
        _ => FALLBACK_EXTENSION,
    }
}

/// Payload file name for item `id`.
pub fn media_filename(id: ItemId, original_name: &str) -> String {
    format!("{}.{}", id, file_extension(original_name))
}

/// Trim tags and drop the ones left empty, preserving order.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tags.into_iter()
        .map(|t| t.as_ref().trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Split a comma-separated tag string.
pub fn split_tags(raw: &str) -> Vec<String> {
    normalize_tags(raw.split(','))
}

// =============================================================================
// TIMELINE TYPES
// =============================================================================

/// Filters and paging for the media timeline.
#[derive(Debug, Clone)]
pub struct TimelineQuery {
    /// 1-based page number
    pub page: usize,
    pub limit: usize,
    /// Prefix match on `mimeType`, e.g. "image/"
    pub mime_type: Option<String>,
    pub uploaded_by: Option<String>,
}

impl Default for TimelineQuery {
    fn default() -> Self {
        Self {
            page: TIMELINE_PAGE,
            limit: TIMELINE_LIMIT,
            mime_type: None,
            uploaded_by: None,
        }
    }
}

/// Paging metadata for a timeline page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: usize,
    pub limit: usize,
    pub total: usize,
    pub total_pages: usize,
    pub has_next: bool,
    pub has_prev: bool,
}

/// One page of the media timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelinePage {
    pub items: Vec<MediaItem>,
    /// Page items keyed by upload date (`YYYY-MM-DD` in the configured offset)
    pub grouped_by_date: BTreeMap<String, Vec<MediaItem>>,
    pub pagination: Pagination,
}

impl TimelinePage {
    /// Filter, paginate and group `items`, which must already be sorted newest first.
    pub fn build(items: Vec<MediaItem>, query: &TimelineQuery, offset: FixedOffset) -> Self {
        let page = query.page.max(1);
        let limit = query.limit.max(1);

        let filtered: Vec<MediaItem> = items
            .into_iter()
            .filter(|item| {
                query
                    .mime_type
                    .as_deref()
                    .map_or(true, |prefix| item.mime_type.starts_with(prefix))
            })
            .filter(|item| {
                query
                    .uploaded_by
                    .as_deref()
                    .map_or(true, |user| item.uploaded_by == user)
            })
            .collect();

        let total = filtered.len();
        let start = (page - 1).saturating_mul(limit);
        let end = start.saturating_add(limit);
        let page_items: Vec<MediaItem> = filtered.into_iter().skip(start).take(limit).collect();

        let mut grouped_by_date: BTreeMap<String, Vec<MediaItem>> = BTreeMap::new();
        for item in &page_items {
            let day = item
                .uploaded_at
                .with_timezone(&offset)
                .format("%Y-%m-%d")
                .to_string();
            grouped_by_date.entry(day).or_default().push(item.clone());
        }

        Self {
            items: page_items,
            grouped_by_date,
            pagination: Pagination {
                page,
                limit,
                total,
                total_pages: total.div_ceil(limit),
                has_next: end < total,
                has_prev: page > 1,
            },
        }
    }
}

// =============================================================================
// RELATIONSHIP TYPES
// =============================================================================

/// Canonical address of an unordered item pair: the two ids sorted ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey {
    low: ItemId,
    high: ItemId,
}

impl PairKey {
    /// Canonicalize a pair. Fails when both ids are equal.
    pub fn new(a: ItemId, b: ItemId) -> Result<Self> {
        if a == b {
            return Err(Error::InvalidInput(
                "Cannot create relationship between the same item".to_string(),
            ));
        }
        Ok(Self {
            low: a.min(b),
            high: a.max(b),
        })
    }

    pub fn low(&self) -> ItemId {
        self.low
    }

    pub fn high(&self) -> ItemId {
        self.high
    }

    /// Whether `id` is one of the two endpoints.
    pub fn contains(&self, id: ItemId) -> bool {
        self.low == id || self.high == id
    }

    /// Document file name, `{low}-{high}.json`.
    pub fn file_name(&self) -> String {
        format!("{}.json", self)
    }

    /// Parse a document file name. Anything other than `{low}-{high}.json`
    /// with decimal ids and `low < high` yields `None`.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let stem = name.strip_suffix(".json")?;
        let (a, b) = stem.split_once('-')?;
        let low = parse_decimal(a)?;
        let high = parse_decimal(b)?;
        if low >= high {
            return None;
        }
        Some(Self { low, high })
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.low, self.high)
    }
}

fn parse_decimal(s: &str) -> Option<ItemId> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Clamp a requested strength into [0, 1]; missing or non-finite values
/// become [`DEFAULT_STRENGTH`].
pub fn clamp_strength(value: Option<f64>) -> f64 {
    match value {
        Some(v) if v.is_finite() => {
            if v <= MIN_STRENGTH {
                MIN_STRENGTH
            } else if v >= MAX_STRENGTH {
                MAX_STRENGTH
            } else {
                v
            }
        }
        _ => DEFAULT_STRENGTH,
    }
}

/// Undirected, typed, weighted link between two media items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub item_a: ItemId,
    pub item_b: ItemId,
    pub relationship_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// 0.0 to 1.0
    pub strength: f64,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub bidirectional: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Reserved for automated clustering
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_cluster: Option<String>,
}

impl Relationship {
    /// Canonical key of this relationship's pair.
    pub fn key(&self) -> Result<PairKey> {
        PairKey::new(self.item_a, self.item_b)
    }

    /// Whether `id` is one of the two endpoints.
    pub fn involves(&self, id: ItemId) -> bool {
        self.item_a == id || self.item_b == id
    }
}

/// Input for creating a relationship.
#[derive(Debug, Clone)]
pub struct NewRelationship {
    pub item_a: ItemId,
    pub item_b: ItemId,
    pub relationship_type: String,
    pub description: Option<String>,
    pub strength: Option<f64>,
    pub created_by: String,
    pub tags: Vec<String>,
}

impl NewRelationship {
    /// Validate and normalize into a stored document created at `created_at`.
    pub fn into_relationship(self, created_at: DateTime<Utc>) -> Result<(PairKey, Relationship)> {
        let key = PairKey::new(self.item_a, self.item_b)?;

        let relationship_type = self.relationship_type.trim().to_string();
        if relationship_type.is_empty() {
            return Err(Error::InvalidInput(
                "relationshipType must not be empty".to_string(),
            ));
        }

        let relationship = Relationship {
            item_a: self.item_a,
            item_b: self.item_b,
            relationship_type,
            description: trim_optional(self.description),
            strength: clamp_strength(self.strength),
            created_by: self.created_by,
            created_at,
            bidirectional: true,
            tags: normalize_tags(self.tags),
            ai_cluster: None,
        };
        Ok((key, relationship))
    }
}

/// Partial update of a relationship. Only provided fields are merged.
#[derive(Debug, Clone, Default)]
pub struct RelationshipPatch {
    pub relationship_type: Option<String>,
    pub description: Option<String>,
    pub strength: Option<f64>,
    pub tags: Option<Vec<String>>,
}

impl RelationshipPatch {
    /// Merge into `rel`. Endpoints, creator and creation time stay fixed.
    pub fn apply(self, rel: &mut Relationship) {
        if let Some(kind) = self.relationship_type {
            let kind = kind.trim();
            if !kind.is_empty() {
                rel.relationship_type = kind.to_string();
            }
        }
        if let Some(description) = self.description {
            rel.description = trim_optional(Some(description));
        }
        if let Some(strength) = self.strength {
            rel.strength = clamp_strength(Some(strength));
        }
        if let Some(tags) = self.tags {
            rel.tags = normalize_tags(tags);
        }
    }
}

fn trim_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Filters for listing relationships.
#[derive(Debug, Clone, Default)]
pub struct RelationshipFilter {
    pub item_id: Option<ItemId>,
    /// Exact match on `createdBy`
    pub created_by: Option<String>,
    /// Case-insensitive substring match on `relationshipType`
    pub relationship_type: Option<String>,
}

impl RelationshipFilter {
    pub fn matches(&self, rel: &Relationship) -> bool {
        if let Some(id) = self.item_id {
            if !rel.involves(id) {
                return false;
            }
        }
        if let Some(creator) = &self.created_by {
            if &rel.created_by != creator {
                return false;
            }
        }
        if let Some(kind) = &self.relationship_type {
            if !rel
                .relationship_type
                .to_lowercase()
                .contains(&kind.to_lowercase())
            {
                return false;
            }
        }
        true
    }
}

// =============================================================================
// GRAPH PROJECTION
// =============================================================================

/// Node of the relationship graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: ItemId,
}

/// Edge of the relationship graph, one per relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    pub source: ItemId,
    pub target: ItemId,
    pub relationship_type: String,
    pub strength: f64,
    pub bidirectional: bool,
}

/// Derived node/edge view of all relationships.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphProjection {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl GraphProjection {
    /// Derive the projection from the complete relationship set.
    ///
    /// Nodes appear in order of first reference.
    pub fn from_relationships(relationships: &[Relationship]) -> Self {
        let mut seen = std::collections::HashSet::new();
        let mut nodes = Vec::new();
        let mut edges = Vec::with_capacity(relationships.len());

        for rel in relationships {
            for id in [rel.item_a, rel.item_b] {
                if seen.insert(id) {
                    nodes.push(GraphNode { id });
                }
            }
            edges.push(GraphEdge {
                source: rel.item_a,
                target: rel.item_b,
                relationship_type: rel.relationship_type.clone(),
                strength: rel.strength,
                bidirectional: rel.bidirectional,
            });
        }

        Self { nodes, edges }
    }
}

// =============================================================================
// USER TYPES
// =============================================================================

/// Account stored in `auth.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    /// Argon2id PHC string
    pub password_hash: String,
}

/// User without credentials, safe to return to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: String,
    pub name: String,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
        }
    }
}

/// Identity recovered from a verified bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub user_id: String,
    pub name: String,
}

/// Successful login.
#[derive(Debug, Clone, Serialize)]
pub struct LoginResult {
    pub token: String,
    pub user: PublicUser,
}
