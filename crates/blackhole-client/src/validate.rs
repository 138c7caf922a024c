//! Pre-upload checks on block DTOs. A block that fails is skipped, never sent.

use crate::error::{ClientError, Result};
use crate::protocol::BlockDto;

/// Shortest accepted hex hash
pub const MIN_HASH_HEX: usize = 16;
/// Longest accepted hex hash
pub const MAX_HASH_HEX: usize = 128;

/// Check every constraint and report all violations in one message.
pub fn validate_block(block: &BlockDto) -> Result<()> {
    let mut violations = Vec::new();

    let len = block.hash.len();
    if block.hash.trim().is_empty() {
        violations.push("hash: must not be blank".to_string());
    } else if !(MIN_HASH_HEX..=MAX_HASH_HEX).contains(&len)
        || !block.hash.bytes().all(|b| b.is_ascii_hexdigit())
    {
        violations.push(format!(
            "hash: must be hex ({}-{} chars), got {:?}",
            MIN_HASH_HEX, MAX_HASH_HEX, block.hash
        ));
    }
    if block.data.is_empty() {
        violations.push("data: must not be empty".to_string());
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ClientError::Validation(violations.join("; ")))
    }
}
