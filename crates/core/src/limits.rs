//! Size limits for inbound event payloads.
//!
//! The `#[validate]` derive macro requires literal values in attributes,
//! so string-length limits are duplicated there. Keep both in sync when
//! modifying.

/// Maximum serialized `event_data` size in bytes (16KB).
///
/// Most real-world behavioral events carry well under 1KB of attributes.
pub const MAX_EVENT_DATA_BYTES: usize = 16 * 1024;

/// Maximum single serialized event size in bytes (32KB).
pub const MAX_EVENT_SIZE_BYTES: usize = 32 * 1024;

/// User and session id max length (chars).
pub const MAX_ID_CHARS: usize = 128;

/// Acquisition source tag max length (chars).
pub const MAX_SOURCE_CHARS: usize = 64;
