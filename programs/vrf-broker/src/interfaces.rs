//! Collaborators the broker drives but does not own: the oracle coordinator,
//! the funding token, and the host environment bundling them.

use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::types::{Address, Amount, KeyHash, OracleHandle, SubscriptionId};

/// Parameters of one oracle request, taken from the effective
/// [`crate::state::RequestConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleRequest {
    pub key_hash: KeyHash,
    pub subscription_id: SubscriptionId,
    pub request_confirmations: u16,
    pub callback_compute_limit: u32,
    pub num_words: u32,
}

/// The oracle coordinator: owns subscriptions and assigns request handles.
///
/// Randomness arrives later through [`crate::VrfBroker::fulfill_random_words`].
pub trait RandomnessOracle {
    /// Address allowed to receive subscription funding.
    fn address(&self) -> Address;

    fn create_subscription(&mut self, owner: Address) -> Result<SubscriptionId>;

    fn add_consumer(
        &mut self,
        owner: Address,
        subscription_id: SubscriptionId,
        consumer: Address,
    ) -> Result<()>;

    /// Cancel `subscription_id`, sending its residual balance to `beneficiary`.
    fn cancel_subscription(
        &mut self,
        owner: Address,
        subscription_id: SubscriptionId,
        beneficiary: Address,
    ) -> Result<()>;

    fn request_random_words(
        &mut self,
        consumer: Address,
        request: &OracleRequest,
    ) -> Result<OracleHandle>;
}

/// A fungible funding asset.
pub trait FundingToken {
    fn address(&self) -> Address;

    fn balance_of(&self, owner: &Address) -> Amount;

    fn transfer(&mut self, from: Address, to: Address, amount: Amount) -> Result<()>;

    /// Transfer and notify `to` with `data`. Funding a subscription passes
    /// the subscription id as `data`.
    fn transfer_and_call(
        &mut self,
        from: Address,
        to: Address,
        amount: Amount,
        data: &[u8],
    ) -> Result<()>;
}

/// The hosting ledger as seen by one broker operation.
///
/// Operations run between [`Environment::checkpoint`] and either
/// [`Environment::commit`] or [`Environment::revert`]; an implementation that
/// cannot roll back external effects must keep the defaults and accept that a
/// failed operation may leave collaborator-side transfers applied.
pub trait Environment {
    fn oracle(&mut self) -> &mut dyn RandomnessOracle;

    fn token(&mut self) -> &mut dyn FundingToken;

    /// Current monotonic lock point (block height).
    fn lock_point(&self) -> u64;

    fn checkpoint(&mut self) {}

    fn commit(&mut self) {}

    fn revert(&mut self) {}
}
