//! Authorization predicates consulted by the broker.
//!
//! The broker never decides who an administrator or the oracle is; it asks an
//! [`Authorizer`] supplied by the host.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::BrokerError;
use crate::types::Address;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// May manage the subscription, custody funds and configuration.
    Administrator,
    /// May deliver fulfillment callbacks.
    Oracle,
}

impl Role {
    /// Error returned when a caller lacks this role.
    pub fn denied(self) -> BrokerError {
        match self {
            Role::Administrator => BrokerError::NotAdministrator,
            Role::Oracle => BrokerError::NotOracle,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Administrator => f.write_str("administrator"),
            Role::Oracle => f.write_str("oracle"),
        }
    }
}

pub trait Authorizer {
    fn is_authorized(&self, caller: &Address, role: Role) -> bool;
}

/// Grants every role to every caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl Authorizer for AllowAll {
    fn is_authorized(&self, _caller: &Address, _role: Role) -> bool {
        true
    }
}

/// Grants nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAll;

impl Authorizer for DenyAll {
    fn is_authorized(&self, _caller: &Address, _role: Role) -> bool {
        false
    }
}

/// One fixed administrator and one fixed oracle address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticRoles {
    pub administrator: Address,
    pub oracle: Address,
}

impl Authorizer for StaticRoles {
    fn is_authorized(&self, caller: &Address, role: Role) -> bool {
        let holder = match role {
            Role::Administrator => &self.administrator,
            Role::Oracle => &self.oracle,
        };
        !caller.is_zero() && caller == holder
    }
}
