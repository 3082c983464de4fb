use crate::auth::Role;
use crate::context::Transaction;
use crate::errors::Result;
use crate::types::InternalRequestId;

use super::request_random_number::issue;

/// Administrator-initiated issuance under the current config.
///
/// Used to replace a request the oracle never answered; the replaced request
/// stays `Requested` and its late callback is rejected as stale.
pub fn handler(tx: &mut Transaction<'_, '_>) -> Result<(InternalRequestId, u64)> {
    tx.require(Role::Administrator)?;
    issue(tx)
}
