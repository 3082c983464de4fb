pub mod auth;
pub mod context;
pub mod errors;
pub mod events;
pub mod instructions;
pub mod interfaces;
pub mod local;
pub mod state;
pub mod types;

pub use auth::{AllowAll, Authorizer, DenyAll, Role, StaticRoles};
pub use context::{Context, Transaction};
pub use errors::{BrokerError, ErrorKind};
pub use events::BrokerEvent;
pub use interfaces::{Environment, FundingToken, OracleRequest, RandomnessOracle};
pub use state::{BrokerState, FulfillmentRecord, RequestConfig, RequestStatus};
pub use types::{
    Address, Amount, InternalRequestId, KeyHash, OracleHandle, RandomValue, SubscriptionId,
};

use errors::Result;

/// Verifiable-randomness request broker.
///
/// Accepts requests for random numbers, forwards them to an external oracle
/// coordinator, and records the oracle's answer exactly once against a
/// broker-assigned [`InternalRequestId`].
///
/// ## Request lifecycle
///
/// 1. **Request**: any caller calls [`VrfBroker::request_random_number`]; the
///    oracle returns a handle, the broker mints the next internal id and makes
///    the handle the single in-flight request. Status is `Requested`.
/// 2. **Fulfill**: the oracle calls [`VrfBroker::fulfill_random_words`] with
///    its handle. Only the in-flight handle is accepted; the first word is
///    recorded and the status becomes `Fulfilled`.
/// 3. **Query**: [`VrfBroker::is_request_complete`] and
///    [`VrfBroker::random_number`] read the record by internal id.
///
/// Issuing a new request before the previous one is fulfilled orphans the
/// previous one: its callback will be rejected as stale.
///
/// Every mutating entry point is atomic: the staged state, buffered events
/// and the environment checkpoint are committed together or discarded
/// together.
///
/// ## Instruction model
///
/// Entry points take a [`Context`] (caller plus host [`Environment`]) and
/// each instruction handler runs against a [`Transaction`] offering
/// `require` for role checks and `emit` for events, the shape of an Anchor
/// instruction context. It is plain Rust rather than `anchor-lang`: roles are
/// decided by an injected [`Authorizer`], and the token and coordinator are
/// trait objects that [`local::LocalChain`] implements in memory.
pub struct VrfBroker<A: Authorizer = StaticRoles> {
    state: BrokerState,
    auth: A,
    events: Vec<BrokerEvent>,
}

impl<A: Authorizer> VrfBroker<A> {
    /// Create a broker whose own account is `address`.
    pub fn new(address: Address, funding_asset: Address, config: RequestConfig, auth: A) -> Self {
        Self::from_state(BrokerState::new(address, funding_asset, config), auth)
    }

    /// Resume a broker from previously committed state.
    pub fn from_state(state: BrokerState, auth: A) -> Self {
        Self {
            state,
            auth,
            events: Vec::new(),
        }
    }

    /// Roll back to `state`, dropping events that have not been drained.
    pub fn restore(&mut self, state: BrokerState) {
        self.state = state;
        self.events.clear();
    }

    fn transact<T>(
        &mut self,
        ctx: Context<'_>,
        op: impl FnOnce(&mut Transaction<'_, '_>) -> Result<T>,
    ) -> Result<T> {
        let Context { caller, env } = ctx;
        let mut staged = self.state.clone();

        env.checkpoint();
        let mut tx = Transaction::new(caller, &mut staged, &mut *env, &self.auth);
        let outcome = op(&mut tx);
        let events = tx.into_events();

        match outcome {
            Ok(value) => {
                env.commit();
                self.state = staged;
                self.events.extend(events);
                Ok(value)
            }
            Err(err) => {
                env.revert();
                Err(err)
            }
        }
    }

    // Subscription management

    /// Open a new funding subscription (administrator only).
    pub fn open_subscription(&mut self, ctx: Context<'_>) -> Result<SubscriptionId> {
        self.transact(ctx, instructions::open_subscription::handler)
    }

    /// Cancel the subscription, refunding `beneficiary` (administrator only).
    pub fn close_subscription(&mut self, ctx: Context<'_>, beneficiary: Address) -> Result<()> {
        self.transact(ctx, |tx| {
            instructions::close_subscription::handler(tx, beneficiary)
        })
    }

    /// Fund the subscription with `amount`. Open to any caller.
    pub fn top_up_subscription(&mut self, ctx: Context<'_>, amount: Amount) -> Result<()> {
        self.transact(ctx, |tx| instructions::top_up_subscription::handler(tx, amount))
    }

    /// Move custody funds to `recipient` (administrator only).
    pub fn withdraw(&mut self, ctx: Context<'_>, amount: Amount, recipient: Address) -> Result<()> {
        self.transact(ctx, |tx| instructions::withdraw::handler(tx, amount, recipient))
    }

    // Request lifecycle

    /// Issue a request. Returns the new id and its lock point.
    pub fn request_random_number(&mut self, ctx: Context<'_>) -> Result<(InternalRequestId, u64)> {
        self.transact(ctx, instructions::request_random_number::handler)
    }

    /// Issue a request on the administrator's behalf.
    pub fn reissue_request(&mut self, ctx: Context<'_>) -> Result<(InternalRequestId, u64)> {
        self.transact(ctx, instructions::reissue_request::handler)
    }

    /// Top up by `amount` and issue a request in one operation (administrator only).
    pub fn fund_and_request(
        &mut self,
        ctx: Context<'_>,
        amount: Amount,
    ) -> Result<(InternalRequestId, u64)> {
        self.transact(ctx, |tx| instructions::fund_and_request::handler(tx, amount))
    }

    /// Oracle callback. Only the oracle may call this.
    pub fn fulfill_random_words(
        &mut self,
        ctx: Context<'_>,
        oracle_handle: OracleHandle,
        random_words: &[RandomValue],
    ) -> Result<InternalRequestId> {
        self.transact(ctx, |tx| {
            instructions::fulfill_random_words::handler(tx, oracle_handle, random_words)
        })
    }

    /// Replace the routing key for subsequent requests (administrator only).
    pub fn rotate_key_hash(&mut self, ctx: Context<'_>, new_key_hash: KeyHash) -> Result<()> {
        self.transact(ctx, |tx| instructions::rotate_key_hash::handler(tx, new_key_hash))
    }

    // Queries

    pub fn is_request_complete(&self, request_id: InternalRequestId) -> bool {
        self.state
            .fulfillments
            .get(&request_id)
            .is_some_and(FulfillmentRecord::is_complete)
    }

    /// Recorded value, or [`RandomValue::ZERO`] if not fulfilled.
    pub fn random_number(&self, request_id: InternalRequestId) -> RandomValue {
        self.state
            .fulfillments
            .get(&request_id)
            .and_then(|record| record.value)
            .unwrap_or(RandomValue::ZERO)
    }

    pub fn request_status(&self, request_id: InternalRequestId) -> Option<RequestStatus> {
        self.state
            .fulfillments
            .get(&request_id)
            .map(FulfillmentRecord::status)
    }

    pub fn fulfillment(&self, request_id: InternalRequestId) -> Option<&FulfillmentRecord> {
        self.state.fulfillments.get(&request_id)
    }

    pub fn last_request_id(&self) -> InternalRequestId {
        self.state.last_request_id
    }

    pub fn subscription_id(&self) -> Option<SubscriptionId> {
        self.state.config.subscription_id
    }

    pub fn funding_asset_address(&self) -> Address {
        self.state.funding_asset
    }

    pub fn address(&self) -> Address {
        self.state.address
    }

    pub fn request_config(&self) -> &RequestConfig {
        &self.state.config
    }

    pub fn in_flight_handle(&self) -> Option<OracleHandle> {
        self.state.in_flight
    }

    /// Number of issued requests without a recorded value, orphans included.
    pub fn pending_requests(&self) -> usize {
        self.state
            .fulfillments
            .values()
            .filter(|record| !record.is_complete())
            .count()
    }

    pub fn state(&self) -> &BrokerState {
        &self.state
    }

    /// Events from committed operations since the last drain, in order.
    pub fn drain_events(&mut self) -> Vec<BrokerEvent> {
        std::mem::take(&mut self.events)
    }
}
