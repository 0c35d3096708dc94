//! Relationship graph store.
//!
//! Each unordered item pair owns at most one document, addressed by its
//! canonical key at `relationships/links/{low}-{high}.json`. After every
//! mutation the node/edge projection in `relationships/graph.json` is
//! rebuilt from a full scan of the link documents.

use async_trait::async_trait;
use chrono::Utc;
use elephant_core::{
    Error, GraphProjection, ItemId, NewRelationship, PairKey, Relationship, RelationshipFilter,
    RelationshipPatch, RelationshipRepository, Result,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::json_store::JsonStore;
use crate::locks::KeyedLocks;
use crate::paths::{link_path, GRAPH_FILE, LINKS_DIR};

/// File-system relationship store.
pub struct FsRelationshipStore {
    store: JsonStore,
    pair_locks: KeyedLocks<PairKey>,
    /// Serializes projection rebuilds
    graph_lock: Mutex<()>,
}

impl FsRelationshipStore {
    pub fn new(store: JsonStore) -> Self {
        Self {
            store,
            pair_locks: KeyedLocks::new(),
            graph_lock: Mutex::new(()),
        }
    }

    /// Recompute the projection from storage and persist it.
    pub async fn rebuild_projection(&self) -> Result<GraphProjection> {
        let _guard = self.graph_lock.lock().await;
        let relationships = self.list_all().await?;
        let graph = GraphProjection::from_relationships(&relationships);
        self.store.write(GRAPH_FILE, &graph).await?;
        debug!(
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            "Rebuilt relationship graph"
        );
        Ok(graph)
    }

    async fn read_pair(&self, key: &PairKey) -> Option<Relationship> {
        self.store.read(link_path(key)).await
    }
}

#[async_trait]
impl RelationshipRepository for FsRelationshipStore {
    async fn create(&self, input: NewRelationship) -> Result<Relationship> {
        let (key, relationship) = input.into_relationship(Utc::now())?;

        {
            let _guard = self.pair_locks.lock(&key).await;
            if let Some(existing) = self.read_pair(&key).await {
                debug!(pair_key = %key, "Relationship already exists");
                return Err(Error::RelationshipExists(Box::new(existing)));
            }
            self.store.write(link_path(&key), &relationship).await?;
        }

        info!(
            pair_key = %key,
            relationship_type = %relationship.relationship_type,
            strength = relationship.strength,
            "Created relationship"
        );
        self.rebuild_projection().await?;
        Ok(relationship)
    }

    async fn get(&self, a: ItemId, b: ItemId) -> Result<Option<Relationship>> {
        let key = PairKey::new(a, b)?;
        Ok(self.read_pair(&key).await)
    }

    async fn update(
        &self,
        a: ItemId,
        b: ItemId,
        patch: RelationshipPatch,
    ) -> Result<Option<Relationship>> {
        let key = PairKey::new(a, b)?;

        let updated = {
            let _guard = self.pair_locks.lock(&key).await;
            let Some(mut relationship) = self.read_pair(&key).await else {
                debug!(pair_key = %key, "Update of missing relationship");
                return Ok(None);
            };
            patch.apply(&mut relationship);
            self.store.write(link_path(&key), &relationship).await?;
            relationship
        };

        info!(pair_key = %key, "Updated relationship");
        self.rebuild_projection().await?;
        Ok(Some(updated))
    }

    async fn delete(&self, a: ItemId, b: ItemId) -> Result<bool> {
        let key = PairKey::new(a, b)?;

        let removed = {
            let _guard = self.pair_locks.lock(&key).await;
            self.store.remove(link_path(&key)).await?
        };
        if !removed {
            debug!(pair_key = %key, "Delete of missing relationship");
            return Ok(false);
        }

        info!(pair_key = %key, "Deleted relationship");
        self.rebuild_projection().await?;
        Ok(true)
    }

    async fn list_all(&self) -> Result<Vec<Relationship>> {
        let mut keys: Vec<PairKey> = self
            .store
            .list_dir(LINKS_DIR)
            .await?
            .iter()
            .filter_map(|name| PairKey::from_file_name(name))
            .collect();
        keys.sort();

        let mut relationships = Vec::with_capacity(keys.len());
        for key in keys {
            let Some(relationship) = self.read_pair(&key).await else {
                continue;
            };
            match relationship.key() {
                Ok(doc_key) if doc_key == key => relationships.push(relationship),
                _ => {
                    warn!(pair_key = %key, "Relationship document does not match its file name");
                }
            }
        }
        Ok(relationships)
    }

    async fn list_for_item(&self, id: ItemId) -> Result<Vec<Relationship>> {
        Ok(self
            .list_all()
            .await?
            .into_iter()
            .filter(|r| r.involves(id))
            .collect())
    }

    async fn list(&self, filter: RelationshipFilter) -> Result<Vec<Relationship>> {
        Ok(self
            .list_all()
            .await?
            .into_iter()
            .filter(|r| filter.matches(r))
            .collect())
    }

    async fn projection(&self) -> Result<GraphProjection> {
        Ok(self
            .store
            .read::<GraphProjection>(GRAPH_FILE)
            .await
            .unwrap_or_default())
    }
}
