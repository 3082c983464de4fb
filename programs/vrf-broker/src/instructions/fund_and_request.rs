use crate::auth::Role;
use crate::context::Transaction;
use crate::errors::Result;
use crate::types::{Amount, InternalRequestId};

use super::request_random_number::issue;
use super::top_up_subscription;

/// Top up the subscription by `amount`, then issue a request, as one
/// operation: if the request fails the top-up is rolled back with it.
pub fn handler(tx: &mut Transaction<'_, '_>, amount: Amount) -> Result<(InternalRequestId, u64)> {
    tx.require(Role::Administrator)?;
    top_up_subscription::handler(tx, amount)?;
    issue(tx)
}
