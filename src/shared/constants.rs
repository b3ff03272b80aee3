/// Default page size for pagination
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Maximum page size allowed
pub const MAX_PAGE_SIZE: i64 = 100;

// =============================================================================
// ROLE CONSTANTS
// =============================================================================

/// Default role name granting access to the admin endpoints
pub const ROLE_ADMIN: &str = "admin";

// =============================================================================
// FILE CONSTANTS
// =============================================================================

/// Longest display name accepted for a file
pub const MAX_FILE_NAME_LENGTH: usize = 255;

/// Extension used for storage keys when the original name has none
pub const FALLBACK_EXTENSION: &str = "bin";

/// MIME type reported by clients that could not classify the file
pub const GENERIC_MIME_TYPE: &str = "application/octet-stream";
