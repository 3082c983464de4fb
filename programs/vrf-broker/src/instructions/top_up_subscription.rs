use tracing::{debug, info};

use crate::context::Transaction;
use crate::errors::{BrokerError, Result};
use crate::events::SubscriptionToppedUp;
use crate::types::Amount;

/// Forward `amount` of the funding asset into the open subscription.
///
/// Open to any caller. If the broker's custody balance is below `amount`, the
/// shortfall is first pulled from the caller; the full `amount` is then sent
/// to the coordinator with the subscription id attached.
pub fn handler(tx: &mut Transaction<'_, '_>, amount: Amount) -> Result<()> {
    if amount == 0 {
        return Err(BrokerError::AmountMustBePositive);
    }
    let subscription_id = tx
        .state
        .config
        .subscription_id
        .ok_or(BrokerError::NoSubscription)?;

    let custody = tx.state.address;
    let sender = tx.caller;
    let coordinator = tx.env.oracle().address();
    let token = tx.env.token();

    let held = token.balance_of(&custody);
    let shortfall = amount.saturating_sub(held);
    if shortfall > 0 {
        let available = token.balance_of(&sender);
        if available < shortfall {
            return Err(BrokerError::InsufficientFunds {
                needed: shortfall,
                available,
            });
        }
        token.transfer(sender, custody, shortfall)?;
        debug!(shortfall, held, sender = %sender, "Pulled top-up shortfall into custody");
    }

    token.transfer_and_call(custody, coordinator, amount, &subscription_id.to_call_data())?;

    tx.emit(SubscriptionToppedUp { amount, sender });

    info!(subscription_id = %subscription_id, amount, sender = %sender, "Subscription topped up");
    Ok(())
}
