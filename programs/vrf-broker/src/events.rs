use serde::{Deserialize, Serialize};

use crate::types::{Address, Amount, InternalRequestId, KeyHash, RandomValue, SubscriptionId};

/// Emitted when the administrator rotates the oracle routing key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyHashChanged {
    pub old_key_hash: KeyHash,
    pub new_key_hash: KeyHash,
}

/// Emitted when a subscription is opened (`Some`) or closed (`None`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionChanged {
    pub old_subscription_id: Option<SubscriptionId>,
    pub new_subscription_id: Option<SubscriptionId>,
}

/// Emitted when funds leave the broker's custody.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundsWithdrawn {
    pub amount: Amount,
    pub recipient: Address,
}

/// Emitted when funds are forwarded into the subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionToppedUp {
    pub amount: Amount,
    pub sender: Address,
}

/// Emitted when a new internal request is minted.
///
/// Off-ledger consumers poll [`crate::VrfBroker::is_request_complete`] with
/// this id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomnessRequested {
    pub request_id: InternalRequestId,
    pub requester: Address,
    pub lock_point: u64,
}

/// Emitted when the oracle callback records a value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomnessFulfilled {
    pub request_id: InternalRequestId,
    pub value: RandomValue,
}

/// Every observable event, in emission order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BrokerEvent {
    KeyHashChanged(KeyHashChanged),
    SubscriptionChanged(SubscriptionChanged),
    FundsWithdrawn(FundsWithdrawn),
    SubscriptionToppedUp(SubscriptionToppedUp),
    RandomnessRequested(RandomnessRequested),
    RandomnessFulfilled(RandomnessFulfilled),
}

macro_rules! impl_from_event {
    ($($name:ident),* $(,)?) => {
        $(
            impl From<$name> for BrokerEvent {
                fn from(event: $name) -> Self {
                    BrokerEvent::$name(event)
                }
            }
        )*
    };
}

impl_from_event!(
    KeyHashChanged,
    SubscriptionChanged,
    FundsWithdrawn,
    SubscriptionToppedUp,
    RandomnessRequested,
    RandomnessFulfilled,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_tagged_by_snake_case_name() {
        let event = BrokerEvent::from(RandomnessRequested {
            request_id: InternalRequestId(3),
            requester: Address([3; 32]),
            lock_point: 12,
        });
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["event"], "randomness_requested");
        assert_eq!(json["request_id"], 3);
        assert_eq!(json["lock_point"], 12);
        assert_eq!(json["requester"], Address([3; 32]).to_string());

        let decoded: BrokerEvent = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn closed_subscription_serializes_as_null() {
        let event = BrokerEvent::from(SubscriptionChanged {
            old_subscription_id: Some(SubscriptionId(4)),
            new_subscription_id: None,
        });
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["event"], "subscription_changed");
        assert_eq!(json["old_subscription_id"], 4);
        assert!(json["new_subscription_id"].is_null());
    }
}
