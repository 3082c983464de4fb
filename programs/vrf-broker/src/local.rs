//! In-memory hosting ledger: a funding token, an oracle coordinator holding
//! subscriptions, and a block-height clock.
//!
//! Used by the backend as its ledger and by tests as a collaborator double.
//! Checkpoints snapshot the whole chain so a failed broker operation leaves no
//! transfers behind.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::errors::{BrokerError, Result};
use crate::interfaces::{Environment, FundingToken, OracleRequest, RandomnessOracle};
use crate::types::{Address, Amount, KeyHash, OracleHandle, SubscriptionId};

/// A subscription held by the local coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalSubscription {
    pub owner: Address,
    /// Funding-token balance available for request fees.
    pub balance: Amount,
    /// Number of requests charged to this subscription.
    pub req_count: u64,
    pub consumers: BTreeSet<Address>,
}

/// An oracle request awaiting an answer from the off-ledger oracle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleJob {
    pub handle: OracleHandle,
    pub consumer: Address,
    pub subscription_id: SubscriptionId,
    pub key_hash: KeyHash,
    /// Height at which the request was accepted.
    pub request_height: u64,
    pub request_confirmations: u16,
    pub callback_compute_limit: u32,
    pub num_words: u32,
    /// Failed answer attempts so far.
    #[serde(default)]
    pub attempts: u32,
}

impl OracleJob {
    /// First height at which the oracle may answer.
    pub fn ready_at(&self) -> u64 {
        self.request_height
            .saturating_add(u64::from(self.request_confirmations))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalChain {
    token_address: Address,
    coordinator_address: Address,
    /// Oracle fee charged per requested word.
    fee_per_word: Amount,
    height: u64,
    balances: BTreeMap<Address, Amount>,
    subscriptions: BTreeMap<SubscriptionId, LocalSubscription>,
    subscription_counter: u64,
    request_nonce: u64,
    jobs: Vec<OracleJob>,
    #[serde(skip)]
    checkpoints: Vec<LocalChain>,
}

impl LocalChain {
    pub fn new(token_address: Address, coordinator_address: Address, fee_per_word: Amount) -> Self {
        Self {
            token_address,
            coordinator_address,
            fee_per_word,
            height: 0,
            balances: BTreeMap::new(),
            subscriptions: BTreeMap::new(),
            subscription_counter: 0,
            request_nonce: 0,
            jobs: Vec::new(),
            checkpoints: Vec::new(),
        }
    }

    /// Credit `amount` of the funding token to `owner` out of thin air.
    pub fn mint(&mut self, owner: Address, amount: Amount) -> Result<()> {
        let balance = self.balances.entry(owner).or_default();
        *balance = balance
            .checked_add(amount)
            .ok_or(BrokerError::CounterOverflow)?;
        Ok(())
    }

    pub fn balance(&self, owner: &Address) -> Amount {
        self.balances.get(owner).copied().unwrap_or(0)
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    /// Advance the block height by `blocks`.
    pub fn advance(&mut self, blocks: u64) -> u64 {
        self.height = self.height.saturating_add(blocks);
        self.height
    }

    pub fn fee_per_word(&self) -> Amount {
        self.fee_per_word
    }

    pub fn subscription(&self, id: SubscriptionId) -> Option<&LocalSubscription> {
        self.subscriptions.get(&id)
    }

    /// Outstanding jobs, oldest first.
    pub fn jobs(&self) -> &[OracleJob] {
        &self.jobs
    }

    /// Remove and return the jobs whose confirmation depth has been reached.
    pub fn take_ready_jobs(&mut self) -> Vec<OracleJob> {
        let height = self.height;
        let (ready, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.jobs)
            .into_iter()
            .partition(|job| job.ready_at() <= height);
        self.jobs = waiting;
        ready
    }

    /// Put a job back for the oracle to answer again.
    pub fn requeue(&mut self, job: OracleJob) {
        debug!(handle = %job.handle, attempts = job.attempts, "Oracle job requeued");
        self.jobs.push(job);
    }

    fn debit(&mut self, owner: Address, amount: Amount) -> Result<()> {
        let available = self.balance(&owner);
        if available < amount {
            return Err(BrokerError::InsufficientFunds {
                needed: amount,
                available,
            });
        }
        self.balances.insert(owner, available - amount);
        Ok(())
    }

    fn owned_subscription(
        &mut self,
        owner: Address,
        subscription_id: SubscriptionId,
    ) -> Result<&mut LocalSubscription> {
        let subscription = self
            .subscriptions
            .get_mut(&subscription_id)
            .ok_or(BrokerError::UnknownSubscription)?;
        if subscription.owner != owner {
            return Err(BrokerError::NotSubscriptionOwner);
        }
        Ok(subscription)
    }

    /// `sha256(key_hash || subscription_id_le || nonce_le)`.
    fn derive_handle(
        key_hash: &KeyHash,
        subscription_id: SubscriptionId,
        nonce: u64,
    ) -> OracleHandle {
        let mut hasher = Sha256::new();
        hasher.update(key_hash.0);
        hasher.update(subscription_id.0.to_le_bytes());
        hasher.update(nonce.to_le_bytes());
        OracleHandle(hasher.finalize().into())
    }
}

impl RandomnessOracle for LocalChain {
    fn address(&self) -> Address {
        self.coordinator_address
    }

    fn create_subscription(&mut self, owner: Address) -> Result<SubscriptionId> {
        self.subscription_counter = self
            .subscription_counter
            .checked_add(1)
            .ok_or(BrokerError::CounterOverflow)?;
        let id = SubscriptionId(self.subscription_counter);
        self.subscriptions.insert(
            id,
            LocalSubscription {
                owner,
                balance: 0,
                req_count: 0,
                consumers: BTreeSet::new(),
            },
        );
        debug!(subscription_id = %id, owner = %owner, "Subscription created");
        Ok(id)
    }

    fn add_consumer(
        &mut self,
        owner: Address,
        subscription_id: SubscriptionId,
        consumer: Address,
    ) -> Result<()> {
        if consumer.is_zero() {
            return Err(BrokerError::ZeroAddressNotAllowed);
        }
        self.owned_subscription(owner, subscription_id)?
            .consumers
            .insert(consumer);
        Ok(())
    }

    fn cancel_subscription(
        &mut self,
        owner: Address,
        subscription_id: SubscriptionId,
        beneficiary: Address,
    ) -> Result<()> {
        let refunded = self.owned_subscription(owner, subscription_id)?.balance;
        self.debit(self.coordinator_address, refunded)?;
        self.mint(beneficiary, refunded)?;
        self.subscriptions.remove(&subscription_id);
        debug!(subscription_id = %subscription_id, refunded, "Subscription cancelled");
        Ok(())
    }

    fn request_random_words(
        &mut self,
        consumer: Address,
        request: &OracleRequest,
    ) -> Result<OracleHandle> {
        let fee = self
            .fee_per_word
            .checked_mul(u64::from(request.num_words))
            .ok_or(BrokerError::CounterOverflow)?;

        let subscription = self
            .subscriptions
            .get_mut(&request.subscription_id)
            .ok_or(BrokerError::UnknownSubscription)?;
        if !subscription.consumers.contains(&consumer) {
            return Err(BrokerError::ConsumerNotRegistered);
        }
        if subscription.balance < fee {
            return Err(BrokerError::InsufficientSubscriptionBalance {
                needed: fee,
                available: subscription.balance,
            });
        }
        subscription.balance -= fee;
        subscription.req_count = subscription.req_count.saturating_add(1);

        self.request_nonce = self
            .request_nonce
            .checked_add(1)
            .ok_or(BrokerError::CounterOverflow)?;
        let handle =
            Self::derive_handle(&request.key_hash, request.subscription_id, self.request_nonce);

        self.jobs.push(OracleJob {
            handle,
            consumer,
            subscription_id: request.subscription_id,
            key_hash: request.key_hash,
            request_height: self.height,
            request_confirmations: request.request_confirmations,
            callback_compute_limit: request.callback_compute_limit,
            num_words: request.num_words,
            attempts: 0,
        });
        Ok(handle)
    }
}

impl FundingToken for LocalChain {
    fn address(&self) -> Address {
        self.token_address
    }

    fn balance_of(&self, owner: &Address) -> Amount {
        self.balance(owner)
    }

    fn transfer(&mut self, from: Address, to: Address, amount: Amount) -> Result<()> {
        self.debit(from, amount)?;
        self.mint(to, amount)
    }

    fn transfer_and_call(
        &mut self,
        from: Address,
        to: Address,
        amount: Amount,
        data: &[u8],
    ) -> Result<()> {
        if to != self.coordinator_address {
            return self.transfer(from, to, amount);
        }

        let subscription_id =
            SubscriptionId::from_call_data(data).ok_or(BrokerError::UnknownSubscription)?;
        if !self.subscriptions.contains_key(&subscription_id) {
            return Err(BrokerError::UnknownSubscription);
        }
        self.transfer(from, to, amount)?;

        let subscription = self
            .subscriptions
            .get_mut(&subscription_id)
            .ok_or(BrokerError::UnknownSubscription)?;
        subscription.balance = subscription
            .balance
            .checked_add(amount)
            .ok_or(BrokerError::CounterOverflow)?;
        Ok(())
    }
}

impl Environment for LocalChain {
    fn oracle(&mut self) -> &mut dyn RandomnessOracle {
        self
    }

    fn token(&mut self) -> &mut dyn FundingToken {
        self
    }

    fn lock_point(&self) -> u64 {
        self.height
    }

    fn checkpoint(&mut self) {
        let mut snapshot = self.clone();
        snapshot.checkpoints.clear();
        self.checkpoints.push(snapshot);
    }

    fn commit(&mut self) {
        self.checkpoints.pop();
    }

    fn revert(&mut self) {
        if let Some(snapshot) = self.checkpoints.pop() {
            let outer = std::mem::take(&mut self.checkpoints);
            *self = snapshot;
            self.checkpoints = outer;
        }
    }
}
