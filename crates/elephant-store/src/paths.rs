//! On-disk layout of the data root.

use std::path::PathBuf;

use elephant_core::{ItemId, PairKey};

pub const AUTH_FILE: &str = "auth.json";
pub const COUNTER_FILE: &str = "counter.json";
pub const ITEMS_DIR: &str = "items";
pub const MEDIA_DIR: &str = "media";
pub const TEMP_DIR: &str = "temp";
pub const RELATIONSHIPS_DIR: &str = "relationships";
pub const LINKS_DIR: &str = "relationships/links";
pub const GRAPH_FILE: &str = "relationships/graph.json";

/// `items/{id}.json`
pub fn item_path(id: ItemId) -> PathBuf {
    PathBuf::from(ITEMS_DIR).join(format!("{}.json", id))
}

/// `relationships/links/{low}-{high}.json`
pub fn link_path(key: &PairKey) -> PathBuf {
    PathBuf::from(LINKS_DIR).join(key.file_name())
}

/// `media/{filename}`
pub fn media_path(filename: &str) -> PathBuf {
    PathBuf::from(MEDIA_DIR).join(filename)
}
