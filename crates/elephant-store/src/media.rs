//! Media catalog: one metadata document per item under `items/`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{FixedOffset, Utc};
use elephant_core::{
    media_filename, normalize_tags, Error, IdAllocator, ItemId, MediaItem, MediaMetadata,
    MediaPatch, MediaRepository, MediaUpload, Result, TemporalContext, TimelinePage,
    TimelineQuery,
};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::json_store::JsonStore;
use crate::locks::KeyedLocks;
use crate::paths::{item_path, media_path, MEDIA_DIR, TEMP_DIR};

/// File-system media catalog.
pub struct FsMediaCatalog {
    store: JsonStore,
    ids: Arc<dyn IdAllocator>,
    offset: FixedOffset,
    item_locks: KeyedLocks<ItemId>,
}

impl FsMediaCatalog {
    /// `offset` is the UTC offset temporal context and timeline dates are computed in.
    pub fn new(store: JsonStore, ids: Arc<dyn IdAllocator>, offset: FixedOffset) -> Self {
        Self {
            store,
            ids,
            offset,
            item_locks: KeyedLocks::new(),
        }
    }

    /// Directory holding media payloads.
    pub fn media_dir(&self) -> PathBuf {
        self.store.resolve(MEDIA_DIR)
    }

    /// Staging directory for uploads in flight.
    pub fn temp_dir(&self) -> PathBuf {
        self.store.resolve(TEMP_DIR)
    }

    /// Move a staged upload to `media/{filename}`.
    ///
    /// Falls back to copy and remove when a rename is not possible, e.g.
    /// when the staging file lives on another filesystem.
    pub async fn place_payload(&self, staged: &Path, filename: &str) -> Result<PathBuf> {
        self.store.ensure_dir(MEDIA_DIR).await?;
        let target = self.store.resolve(media_path(filename));

        if let Err(rename_err) = fs::rename(staged, &target).await {
            debug!(
                from = %staged.display(),
                to = %target.display(),
                error = %rename_err,
                "Rename failed, copying payload"
            );
            fs::copy(staged, &target).await.map_err(|e| {
                warn!(from = %staged.display(), to = %target.display(), error = %e, "Payload copy failed");
                Error::storage("copy", &target, e)
            })?;
            if let Err(e) = fs::remove_file(staged).await {
                warn!(path = %staged.display(), error = %e, "Failed to remove staged upload");
            }
        }

        Ok(target)
    }

    /// Catalog a staged upload: allocate an id, move the payload into
    /// `media/`, then write the metadata document.
    ///
    /// Nothing is left behind on failure. A document is only written once
    /// its payload is in place, and the payload is removed again when the
    /// document write fails.
    pub async fn ingest(
        &self,
        staged: &Path,
        upload: MediaUpload,
        metadata: MediaMetadata,
    ) -> Result<MediaItem> {
        let item = self.new_item(upload, metadata).await?;
        let target = self.place_payload(staged, &item.filename).await?;

        if let Err(e) = self.store.write(item_path(item.id), &item).await {
            if let Err(rm) = fs::remove_file(&target).await {
                warn!(path = %target.display(), error = %rm, "Failed to remove orphaned payload");
            }
            return Err(e);
        }
        info!(item_id = item.id, filename = %item.filename, "Ingested media item");
        Ok(item)
    }

    async fn new_item(&self, upload: MediaUpload, metadata: MediaMetadata) -> Result<MediaItem> {
        let id = self.ids.next().await?;
        let uploaded_at = Utc::now();

        Ok(MediaItem {
            id,
            filename: media_filename(id, &upload.original_name),
            original_name: upload.original_name,
            mime_type: upload.mime_type,
            file_size: upload.file_size,
            uploaded_by: upload.uploaded_by,
            uploaded_at,
            title: metadata.title,
            description: metadata.description,
            upload_thoughts: metadata.upload_thoughts,
            tags: normalize_tags(metadata.tags),
            temporal_context: TemporalContext::at(uploaded_at, self.offset),
        })
    }
}

#[async_trait]
impl MediaRepository for FsMediaCatalog {
    async fn create(&self, upload: MediaUpload, metadata: MediaMetadata) -> Result<MediaItem> {
        let item = self.new_item(upload, metadata).await?;
        self.store.write(item_path(item.id), &item).await?;
        info!(item_id = item.id, filename = %item.filename, "Created media item");
        Ok(item)
    }

    async fn get(&self, id: ItemId) -> Result<Option<MediaItem>> {
        Ok(self.store.read(item_path(id)).await)
    }

    async fn list_all(&self) -> Result<Vec<MediaItem>> {
        let last = self.ids.current().await;
        let mut items = Vec::new();
        for id in 1..=last {
            if let Some(item) = self.store.read::<MediaItem>(item_path(id)).await {
                items.push(item);
            }
        }
        items.sort_by(|a, b| {
            b.uploaded_at
                .cmp(&a.uploaded_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        debug!(count = items.len(), "Listed media items");
        Ok(items)
    }

    async fn update(&self, id: ItemId, patch: MediaPatch) -> Result<Option<MediaItem>> {
        let _guard = self.item_locks.lock(&id).await;

        let Some(mut item) = self.store.read::<MediaItem>(item_path(id)).await else {
            debug!(item_id = id, "Update of missing media item");
            return Ok(None);
        };
        patch.apply(&mut item);
        self.store.write(item_path(id), &item).await?;
        info!(item_id = id, "Updated media item");
        Ok(Some(item))
    }

    async fn timeline(&self, query: TimelineQuery) -> Result<TimelinePage> {
        let items = self.list_all().await?;
        Ok(TimelinePage::build(items, &query, self.offset))
    }
}
