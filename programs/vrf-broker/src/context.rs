use crate::auth::{Authorizer, Role};
use crate::errors::Result;
use crate::events::BrokerEvent;
use crate::interfaces::Environment;
use crate::state::BrokerState;
use crate::types::Address;

/// Caller identity plus the host environment for one broker operation.
pub struct Context<'e> {
    pub caller: Address,
    pub env: &'e mut dyn Environment,
}

impl<'e> Context<'e> {
    pub fn new(caller: Address, env: &'e mut dyn Environment) -> Self {
        Self { caller, env }
    }
}

/// A broker operation in progress.
///
/// `state` is a staged copy; it replaces the committed state only if the
/// instruction handler returns `Ok`. Events are buffered the same way.
pub struct Transaction<'a, 'e> {
    pub caller: Address,
    pub state: &'a mut BrokerState,
    pub env: &'a mut (dyn Environment + 'e),
    auth: &'a dyn Authorizer,
    events: Vec<BrokerEvent>,
}

impl<'a, 'e> Transaction<'a, 'e> {
    pub(crate) fn new(
        caller: Address,
        state: &'a mut BrokerState,
        env: &'a mut (dyn Environment + 'e),
        auth: &'a dyn Authorizer,
    ) -> Self {
        Self {
            caller,
            state,
            env,
            auth,
            events: Vec::new(),
        }
    }

    /// Fail unless the caller holds `role`.
    pub fn require(&self, role: Role) -> Result<()> {
        if self.auth.is_authorized(&self.caller, role) {
            Ok(())
        } else {
            Err(role.denied())
        }
    }

    pub fn emit(&mut self, event: impl Into<BrokerEvent>) {
        self.events.push(event.into());
    }

    pub(crate) fn into_events(self) -> Vec<BrokerEvent> {
        self.events
    }
}
