use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::{BrokerError, Result};
use crate::interfaces::OracleRequest;
use crate::types::{Address, InternalRequestId, KeyHash, OracleHandle, RandomValue, SubscriptionId};

/// Oracle request parameters applied to every issued request.
///
/// Changed only by key rotation (`key_hash`) and by the subscription
/// lifecycle (`subscription_id`). Each request keeps a copy of the config
/// that was effective when it was issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestConfig {
    /// Funding subscription paying for requests; `None` until opened.
    pub subscription_id: Option<SubscriptionId>,
    /// Routing key selecting the oracle's proving key.
    pub key_hash: KeyHash,
    /// Compute budget granted to the fulfillment callback.
    pub callback_compute_limit: u32,
    /// Confirmations the oracle waits before answering.
    pub request_confirmations: u16,
    /// Random words requested per call. Only the first is recorded.
    pub num_words: u32,
}

impl RequestConfig {
    pub const MIN_REQUEST_CONFIRMATIONS: u16 = 1;
    pub const MAX_REQUEST_CONFIRMATIONS: u16 = 200;
    pub const MIN_CALLBACK_COMPUTE_LIMIT: u32 = 10_000;
    pub const MAX_CALLBACK_COMPUTE_LIMIT: u32 = 2_500_000;
    pub const MAX_NUM_WORDS: u32 = 100;

    /// Build a config with no subscription attached.
    pub fn new(
        key_hash: KeyHash,
        callback_compute_limit: u32,
        request_confirmations: u16,
        num_words: u32,
    ) -> Result<Self> {
        let config = Self {
            subscription_id: None,
            key_hash,
            callback_compute_limit,
            request_confirmations,
            num_words,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.key_hash.is_zero() {
            return Err(BrokerError::ZeroKeyHashNotAllowed);
        }
        if !(Self::MIN_REQUEST_CONFIRMATIONS..=Self::MAX_REQUEST_CONFIRMATIONS)
            .contains(&self.request_confirmations)
        {
            return Err(BrokerError::InvalidConfig("request_confirmations out of range"));
        }
        if !(Self::MIN_CALLBACK_COMPUTE_LIMIT..=Self::MAX_CALLBACK_COMPUTE_LIMIT)
            .contains(&self.callback_compute_limit)
        {
            return Err(BrokerError::InvalidConfig("callback_compute_limit out of range"));
        }
        if self.num_words == 0 || self.num_words > Self::MAX_NUM_WORDS {
            return Err(BrokerError::InvalidConfig("num_words out of range"));
        }
        Ok(())
    }

    /// Oracle call parameters for this config. Fails without a subscription.
    pub fn oracle_request(&self) -> Result<OracleRequest> {
        let subscription_id = self.subscription_id.ok_or(BrokerError::NoSubscription)?;
        Ok(OracleRequest {
            key_hash: self.key_hash,
            subscription_id,
            request_confirmations: self.request_confirmations,
            callback_compute_limit: self.callback_compute_limit,
            num_words: self.num_words,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// Oracle handle assigned, no value yet.
    Requested,
    /// Value recorded. Terminal.
    Fulfilled,
}

/// Per-request record, keyed by [`InternalRequestId`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulfillmentRecord {
    pub request_id: InternalRequestId,
    /// Account that issued the request.
    pub requester: Address,
    /// Handle the oracle returned for this request.
    pub oracle_handle: OracleHandle,
    /// Lock point captured at issue time.
    pub lock_point: u64,
    /// Config snapshot the request was issued under.
    pub config: RequestConfig,
    /// First random word delivered by the oracle. Written once.
    pub value: Option<RandomValue>,
    /// Lock point at which the value was recorded.
    pub fulfilled_at: Option<u64>,
}

impl FulfillmentRecord {
    pub fn status(&self) -> RequestStatus {
        if self.value.is_some() {
            RequestStatus::Fulfilled
        } else {
            RequestStatus::Requested
        }
    }

    pub fn is_complete(&self) -> bool {
        self.value.is_some()
    }
}

/// All persistent broker state.
///
/// Serializable so a host can snapshot it; the broker mutates it only
/// through committed operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerState {
    /// The broker's own account: subscription owner, registered consumer,
    /// and custody account for funding-token balances.
    pub address: Address,
    /// The funding asset accepted by the oracle coordinator.
    pub funding_asset: Address,
    pub config: RequestConfig,
    /// Most recently minted id; [`InternalRequestId::NONE`] before the first.
    pub last_request_id: InternalRequestId,
    /// The single outstanding oracle request, if any.
    pub in_flight: Option<OracleHandle>,
    /// Oracle handle -> internal id. Entries are removed once fulfilled.
    pub correlations: BTreeMap<OracleHandle, InternalRequestId>,
    pub fulfillments: BTreeMap<InternalRequestId, FulfillmentRecord>,
}

impl BrokerState {
    pub fn new(address: Address, funding_asset: Address, config: RequestConfig) -> Self {
        Self {
            address,
            funding_asset,
            config,
            last_request_id: InternalRequestId::NONE,
            in_flight: None,
            correlations: BTreeMap::new(),
            fulfillments: BTreeMap::new(),
        }
    }
}
