//! Store snapshot files.
//!
//! Layout:
//! - 4 bytes: magic (`SSA\x01`)
//! - 4 bytes: schema version (u32 little-endian)
//! - 32 bytes: SHA-256 of the payload
//! - N bytes: JSON payload ([`crate::StoreSnapshot`])

mod load;
mod save;

pub use load::{load_snapshot, load_store};
pub use save::{save_snapshot, save_store};

pub const MAGIC_BYTES: [u8; 4] = *b"SSA\x01";
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

const HEADER_LEN: usize = 4 + 4 + 32;
