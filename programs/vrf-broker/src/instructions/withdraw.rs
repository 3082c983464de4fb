use tracing::info;

use crate::auth::Role;
use crate::context::Transaction;
use crate::errors::{BrokerError, Result};
use crate::events::FundsWithdrawn;
use crate::types::{Address, Amount};

/// Move `amount` out of the broker's custody account (not the subscription).
pub fn handler(tx: &mut Transaction<'_, '_>, amount: Amount, recipient: Address) -> Result<()> {
    tx.require(Role::Administrator)?;

    if recipient.is_zero() {
        return Err(BrokerError::ZeroAddressNotAllowed);
    }
    if amount == 0 {
        return Err(BrokerError::AmountMustBePositive);
    }

    let custody = tx.state.address;
    let token = tx.env.token();
    let available = token.balance_of(&custody);
    if available < amount {
        return Err(BrokerError::InsufficientCustodyBalance {
            needed: amount,
            available,
        });
    }
    token.transfer(custody, recipient, amount)?;

    tx.emit(FundsWithdrawn { amount, recipient });

    info!(amount, recipient = %recipient, "Funds withdrawn");
    Ok(())
}
