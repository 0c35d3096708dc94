//! Default values shared across elephant crates.

/// Strength assigned to a relationship when none (or a non-numeric value) is given.
pub const DEFAULT_STRENGTH: f64 = 0.5;

/// Lower bound for relationship strength.
pub const MIN_STRENGTH: f64 = 0.0;

/// Upper bound for relationship strength.
pub const MAX_STRENGTH: f64 = 1.0;

/// Extension used for stored payloads whose original name has no usable extension.
pub const FALLBACK_EXTENSION: &str = "bin";

/// First page of the media timeline.
pub const TIMELINE_PAGE: usize = 1;

/// Items per timeline page.
pub const TIMELINE_LIMIT: usize = 20;

/// Lifetime of issued bearer tokens.
pub const TOKEN_TTL_HOURS: i64 = 24;

/// Secret used to sign bearer tokens when none is configured.
pub const TOKEN_SECRET: &str = "elephant-local-secret-key";

/// Acting user for unauthenticated requests when authentication is optional.
pub const DEFAULT_USER: &str = "friend1";

/// Largest accepted upload payload in bytes (100 MB).
pub const MAX_FILE_SIZE: usize = 100_000_000;

/// Most files accepted in one upload request.
pub const MAX_FILES_PER_UPLOAD: usize = 10;

/// Accounts seeded into a fresh `auth.json`: (id, display name, password).
pub const SEED_USERS: &[(&str, &str, &str)] = &[
    ("friend1", "Friend 1", "friend1password"),
    ("friend2", "Friend 2", "friend2password"),
];
