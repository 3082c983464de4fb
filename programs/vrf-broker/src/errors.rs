use crate::types::{Amount, OracleHandle};

/// Class of a rejected operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller lacks the role the operation requires.
    Authorization,
    /// An argument or callback failed a precondition.
    Validation,
    /// A balance could not cover the requested movement.
    Resource,
}

/// Error codes for the broker.
///
/// Every error aborts the whole operation; no state from a failed operation
/// is visible afterwards.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BrokerError {
    /// Caller is not the administrator.
    #[error("Caller is not the administrator")]
    NotAdministrator,
    /// Fulfillment callback did not come from the oracle infrastructure.
    #[error("Caller is not the oracle")]
    NotOracle,
    /// Subscription management attempted by an account that does not own it.
    #[error("Caller does not own the subscription")]
    NotSubscriptionOwner,
    /// A zero or negative amount was supplied.
    #[error("Amount must be greater than zero")]
    AmountMustBePositive,
    /// A recipient or beneficiary was the null address.
    #[error("Zero address not allowed")]
    ZeroAddressNotAllowed,
    /// A routing key was the all-zero key hash.
    #[error("Zero key hash not allowed")]
    ZeroKeyHashNotAllowed,
    /// Callback handle does not match the in-flight request.
    #[error("Oracle handle {handle} is not the in-flight request")]
    StaleHandle { handle: OracleHandle },
    /// Callback handle was never issued by this broker.
    #[error("Unknown oracle handle {handle}")]
    UnknownHandle { handle: OracleHandle },
    /// The request already has a recorded value.
    #[error("Request already fulfilled")]
    AlreadyFulfilled,
    /// The callback carried no random words.
    #[error("Fulfillment carried no random words")]
    EmptyRandomWords,
    /// No funding subscription is open.
    #[error("No subscription is open")]
    NoSubscription,
    /// The subscription id is not known to the oracle coordinator.
    #[error("Unknown subscription")]
    UnknownSubscription,
    /// The requesting account is not a registered consumer of the subscription.
    #[error("Consumer is not registered on the subscription")]
    ConsumerNotRegistered,
    /// A RequestConfig field is outside its permitted range.
    #[error("Invalid request config: {0}")]
    InvalidConfig(&'static str),
    /// The caller's funding-token balance cannot cover a top-up shortfall.
    #[error("Insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: Amount, available: Amount },
    /// The broker's custody balance cannot cover a withdrawal.
    #[error("Insufficient custody balance: need {needed}, have {available}")]
    InsufficientCustodyBalance { needed: Amount, available: Amount },
    /// The subscription cannot pay the oracle fee for a request.
    #[error("Insufficient subscription balance: need {needed}, have {available}")]
    InsufficientSubscriptionBalance { needed: Amount, available: Amount },
    /// A counter would overflow u64 (practically unreachable).
    #[error("Counter overflow")]
    CounterOverflow,
}

impl BrokerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotAdministrator | Self::NotOracle | Self::NotSubscriptionOwner => {
                ErrorKind::Authorization
            }
            Self::InsufficientFunds { .. }
            | Self::InsufficientCustodyBalance { .. }
            | Self::InsufficientSubscriptionBalance { .. } => ErrorKind::Resource,
            _ => ErrorKind::Validation,
        }
    }
}

pub type Result<T, E = BrokerError> = std::result::Result<T, E>;
