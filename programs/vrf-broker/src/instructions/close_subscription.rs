use tracing::info;

use crate::auth::Role;
use crate::context::Transaction;
use crate::errors::{BrokerError, Result};
use crate::events::SubscriptionChanged;
use crate::types::Address;

/// Cancel the open subscription, sending its residual balance to `beneficiary`.
///
/// Requests already issued are unaffected; new requests fail until a
/// subscription is opened again.
pub fn handler(tx: &mut Transaction<'_, '_>, beneficiary: Address) -> Result<()> {
    tx.require(Role::Administrator)?;

    if beneficiary.is_zero() {
        return Err(BrokerError::ZeroAddressNotAllowed);
    }
    let subscription_id = tx
        .state
        .config
        .subscription_id
        .ok_or(BrokerError::NoSubscription)?;

    let broker = tx.state.address;
    tx.env
        .oracle()
        .cancel_subscription(broker, subscription_id, beneficiary)?;
    tx.state.config.subscription_id = None;

    tx.emit(SubscriptionChanged {
        old_subscription_id: Some(subscription_id),
        new_subscription_id: None,
    });

    info!(subscription_id = %subscription_id, beneficiary = %beneficiary, "Subscription cancelled");
    Ok(())
}
