use tracing::info;

use crate::auth::Role;
use crate::context::Transaction;
use crate::errors::{BrokerError, Result};
use crate::events::KeyHashChanged;
use crate::types::KeyHash;

/// Replace the oracle routing key. Applies from the next issued request.
pub fn handler(tx: &mut Transaction<'_, '_>, new_key_hash: KeyHash) -> Result<()> {
    tx.require(Role::Administrator)?;

    if new_key_hash.is_zero() {
        return Err(BrokerError::ZeroKeyHashNotAllowed);
    }

    let old_key_hash = std::mem::replace(&mut tx.state.config.key_hash, new_key_hash);

    tx.emit(KeyHashChanged {
        old_key_hash,
        new_key_hash,
    });

    info!(old = %old_key_hash, new = %new_key_hash, "Key hash rotated");
    Ok(())
}
