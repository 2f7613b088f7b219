//! System-wide constants for Quarry.

// =============================================================================
// Statistics Collection
// =============================================================================

/// Maximum number of rows kept in the ANALYZE sample reservoir.
pub const MAX_SAMPLE_COUNT: usize = 10_000;

/// Default number of histogram buckets built per column.
pub const DEFAULT_BUCKET_COUNT: usize = 256;

// =============================================================================
// System Schema
// =============================================================================

/// Name of the system database holding account tables.
pub const SYSTEM_DB: &str = "mysql";

// =============================================================================
// Session Variables
// =============================================================================

/// Session variable holding the character set of the current database.
pub const CHARACTER_SET_DATABASE: &str = "character_set_database";

/// Session variable holding the collation of the current database.
pub const COLLATION_DATABASE: &str = "collation_database";

/// Character set assigned to databases created without one.
pub const DEFAULT_CHARSET: &str = "utf8";

/// Collation assigned to databases created without one.
pub const DEFAULT_COLLATION: &str = "utf8_bin";

// =============================================================================
// Server Status Flags
// =============================================================================

/// Status flag set while an explicit transaction is open.
pub const SERVER_STATUS_IN_TRANS: u16 = 0x0001;

/// Status flag set while autocommit is enabled.
pub const SERVER_STATUS_AUTOCOMMIT: u16 = 0x0002;
