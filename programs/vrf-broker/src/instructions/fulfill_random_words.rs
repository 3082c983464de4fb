use tracing::{debug, info, warn};

use crate::auth::Role;
use crate::context::Transaction;
use crate::errors::{BrokerError, Result};
use crate::events::RandomnessFulfilled;
use crate::types::{InternalRequestId, OracleHandle, RandomValue};

/// Oracle callback delivering the random words for `oracle_handle`.
///
/// Accepted only from the oracle and only for the in-flight handle. The
/// first word is recorded against the correlated internal id, the in-flight
/// slot is cleared, then the correlation entry is pruned. A second callback
/// for the same handle is therefore rejected as stale. A handle that was
/// never issued is rejected as unknown.
pub fn handler(
    tx: &mut Transaction<'_, '_>,
    oracle_handle: OracleHandle,
    random_words: &[RandomValue],
) -> Result<InternalRequestId> {
    tx.require(Role::Oracle)?;

    if tx.state.in_flight != Some(oracle_handle) {
        let orphaned = tx.state.correlations.get(&oracle_handle).copied();
        let answered = tx
            .state
            .fulfillments
            .values()
            .any(|record| record.oracle_handle == oracle_handle);
        if orphaned.is_none() && !answered {
            return Err(BrokerError::UnknownHandle {
                handle: oracle_handle,
            });
        }
        warn!(
            oracle_handle = %oracle_handle,
            orphaned_request_id = ?orphaned,
            "Rejecting callback for stale handle"
        );
        return Err(BrokerError::StaleHandle {
            handle: oracle_handle,
        });
    }

    let request_id = tx
        .state
        .correlations
        .get(&oracle_handle)
        .copied()
        .ok_or(BrokerError::UnknownHandle {
            handle: oracle_handle,
        })?;
    let value = *random_words.first().ok_or(BrokerError::EmptyRandomWords)?;
    let fulfilled_at = tx.env.lock_point();

    let record = tx
        .state
        .fulfillments
        .get_mut(&request_id)
        .ok_or(BrokerError::UnknownHandle {
            handle: oracle_handle,
        })?;
    if record.value.is_some() {
        return Err(BrokerError::AlreadyFulfilled);
    }
    record.value = Some(value);
    record.fulfilled_at = Some(fulfilled_at);

    tx.state.in_flight = None;
    tx.state.correlations.remove(&oracle_handle);
    debug!(oracle_handle = %oracle_handle, "Correlation pruned");

    tx.emit(RandomnessFulfilled { request_id, value });

    info!(
        request_id = %request_id,
        value = %value,
        words = random_words.len(),
        "Randomness fulfilled"
    );
    Ok(request_id)
}
