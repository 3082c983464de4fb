use tracing::{info, warn};

use crate::context::Transaction;
use crate::errors::{BrokerError, Result};
use crate::events::RandomnessRequested;
use crate::state::FulfillmentRecord;
use crate::types::InternalRequestId;

/// Issue a new randomness request under the current config.
///
/// Open to any caller. Returns the minted id and the lock point captured
/// at issue time.
pub fn handler(tx: &mut Transaction<'_, '_>) -> Result<(InternalRequestId, u64)> {
    issue(tx)
}

/// Shared issuance path for the public and administrator entry points.
///
/// 1. Captures the lock point and snapshots the config.
/// 2. Asks the oracle for a handle (the subscription pays the fee).
/// 3. Mints the next internal id and binds the handle to it.
/// 4. Makes the handle the in-flight request, orphaning any previous one.
/// 5. Emits [`RandomnessRequested`].
pub(crate) fn issue(tx: &mut Transaction<'_, '_>) -> Result<(InternalRequestId, u64)> {
    let lock_point = tx.env.lock_point();
    let config = tx.state.config.clone();
    let oracle_request = config.oracle_request()?;

    let consumer = tx.state.address;
    let oracle_handle = tx
        .env
        .oracle()
        .request_random_words(consumer, &oracle_request)?;

    let request_id = tx
        .state
        .last_request_id
        .next()
        .ok_or(BrokerError::CounterOverflow)?;
    tx.state.last_request_id = request_id;

    if let Some(previous) = tx.state.in_flight.replace(oracle_handle) {
        let orphaned = tx.state.correlations.get(&previous).copied();
        warn!(
            previous_handle = %previous,
            orphaned_request_id = ?orphaned,
            "In-flight request orphaned by new issuance"
        );
    }
    tx.state.correlations.insert(oracle_handle, request_id);
    tx.state.fulfillments.insert(
        request_id,
        FulfillmentRecord {
            request_id,
            requester: tx.caller,
            oracle_handle,
            lock_point,
            config,
            value: None,
            fulfilled_at: None,
        },
    );

    tx.emit(RandomnessRequested {
        request_id,
        requester: tx.caller,
        lock_point,
    });

    info!(
        request_id = %request_id,
        oracle_handle = %oracle_handle,
        requester = %tx.caller,
        lock_point,
        "Randomness requested"
    );
    Ok((request_id, lock_point))
}
