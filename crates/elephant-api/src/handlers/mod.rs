//! Route handlers, grouped by resource.

pub mod auth;
pub mod media;
pub mod relationships;
pub mod system;
