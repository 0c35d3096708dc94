//! # elephant-core
//!
//! Core types, traits, and abstractions for the elephant media and
//! relationship service.
//!
//! This crate provides the data model (media items, relationships, the
//! derived graph projection, users) and the repository traits that the
//! storage and API crates implement and consume.

pub mod defaults;
pub mod error;
pub mod models;
pub mod temporal;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use models::*;
pub use temporal::{parse_utc_offset, utc_offset, Season, TemporalContext, TimeOfDay};
pub use traits::*;
