use tracing::{info, warn};

use crate::auth::Role;
use crate::context::Transaction;
use crate::errors::Result;
use crate::events::SubscriptionChanged;
use crate::types::SubscriptionId;

/// Create a subscription owned by the broker and register the broker as its
/// only consumer.
///
/// A previously open subscription is left as-is on the coordinator; its
/// funds are not migrated.
pub fn handler(tx: &mut Transaction<'_, '_>) -> Result<SubscriptionId> {
    tx.require(Role::Administrator)?;

    let broker = tx.state.address;
    let oracle = tx.env.oracle();
    let subscription_id = oracle.create_subscription(broker)?;
    oracle.add_consumer(broker, subscription_id, broker)?;

    let old_subscription_id = tx.state.config.subscription_id.replace(subscription_id);
    if let Some(old) = old_subscription_id {
        warn!(old = %old, new = %subscription_id, "Replacing open subscription");
    }

    tx.emit(SubscriptionChanged {
        old_subscription_id,
        new_subscription_id: Some(subscription_id),
    });

    info!(subscription_id = %subscription_id, "Subscription opened");
    Ok(subscription_id)
}
