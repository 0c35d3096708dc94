//! File-backed sequential id allocator.

use async_trait::async_trait;
use elephant_core::{Error, IdAllocator, ItemId, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::json_store::JsonStore;
use crate::paths::COUNTER_FILE;

#[derive(Debug, Serialize, Deserialize)]
struct CounterDoc {
    current: ItemId,
}

/// Id allocator persisted to `counter.json`.
///
/// The mutex guards the in-memory value and is held across the write, so
/// the value only advances once the new counter is on disk.
pub struct FsIdAllocator {
    store: JsonStore,
    current: Mutex<ItemId>,
}

impl FsIdAllocator {
    /// Load the counter, initializing it to 0 when absent.
    ///
    /// A counter file that exists but cannot be parsed is an error: starting
    /// over from 0 would hand out ids that are already in use.
    pub async fn open(store: JsonStore) -> Result<Self> {
        let current = match store.try_read::<CounterDoc>(COUNTER_FILE).await {
            Ok(Some(doc)) => doc.current,
            Ok(None) => {
                store
                    .write(COUNTER_FILE, &CounterDoc { current: 0 })
                    .await?;
                info!("Initialized id counter");
                0
            }
            Err(e) => {
                warn!(error = %e, "Counter file is unreadable");
                return Err(Error::Internal(format!(
                    "Refusing to start with unreadable {}: {}",
                    COUNTER_FILE, e
                )));
            }
        };
        debug!(current, "Loaded id counter");
        Ok(Self {
            store,
            current: Mutex::new(current),
        })
    }
}

#[async_trait]
impl IdAllocator for FsIdAllocator {
    async fn next(&self) -> Result<ItemId> {
        let mut current = self.current.lock().await;
        let next = current
            .checked_add(1)
            .ok_or_else(|| Error::Internal("Id counter exhausted".to_string()))?;
        self.store
            .write(COUNTER_FILE, &CounterDoc { current: next })
            .await?;
        *current = next;
        debug!(id = next, "Allocated id");
        Ok(next)
    }

    async fn current(&self) -> ItemId {
        *self.current.lock().await
    }

    async fn reset(&self) -> Result<()> {
        let mut current = self.current.lock().await;
        self.store
            .write(COUNTER_FILE, &CounterDoc { current: 0 })
            .await?;
        *current = 0;
        info!("Reset id counter");
        Ok(())
    }
}
