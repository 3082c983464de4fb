//! The hosted broker instance and its local ledger.
//!
//! Every broker operation runs under one lock, so operations are applied in
//! a strict total order. After each accepted mutation the committed events
//! are logged and the snapshot is persisted.

use anyhow::{Context as _, Result};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};
use vrf_broker::local::LocalChain;
use vrf_broker::{BrokerEvent, StaticRoles, VrfBroker};

use crate::config::AppConfig;
use crate::store::{Snapshot, Store};

/// Number of recent events kept for `/events`.
const RECENT_EVENTS: usize = 256;

pub type SharedNode = Arc<Mutex<Node>>;

pub struct Node {
    pub broker: VrfBroker<StaticRoles>,
    pub chain: LocalChain,
    recent_events: VecDeque<BrokerEvent>,
    store: Option<Store>,
}

impl Node {
    /// Resume from the configured snapshot, or start a fresh ledger.
    pub fn open(config: &AppConfig) -> Result<Self> {
        let roles = StaticRoles {
            administrator: config.admin,
            oracle: config.oracle,
        };
        let store = config.state_path.as_ref().map(Store::new);

        if let Some(store) = &store {
            if let Some(snapshot) = store.load()? {
                info!(
                    path = %store.path().display(),
                    last_request_id = %snapshot.broker.last_request_id,
                    height = snapshot.chain.height(),
                    "Resuming from snapshot"
                );
                return Ok(Self {
                    broker: VrfBroker::from_state(snapshot.broker, roles),
                    chain: snapshot.chain,
                    recent_events: VecDeque::new(),
                    store: Some(store.clone()),
                });
            }
        }

        let mut chain = LocalChain::new(config.token, config.coordinator, config.fee_per_word);
        for (owner, amount) in &config.initial_balances {
            chain
                .mint(*owner, *amount)
                .with_context(|| format!("failed to grant initial balance to {owner}"))?;
        }
        let broker = VrfBroker::new(config.broker, config.token, config.request_config()?, roles);
        info!(broker = %config.broker, grants = config.initial_balances.len(), "Starting fresh ledger");

        Ok(Self {
            broker,
            chain,
            recent_events: VecDeque::new(),
            store,
        })
    }

    /// Copy of the current broker state and ledger.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            broker: self.broker.state().clone(),
            chain: self.chain.clone(),
        }
    }

    /// Persist the current state, then log and publish the new events.
    ///
    /// If persisting fails the node is rolled back to `before`, so memory
    /// never runs ahead of the snapshot on disk.
    pub fn commit(&mut self, before: Snapshot) -> Result<()> {
        if let Err(e) = self.persist() {
            self.broker.restore(before.broker);
            self.chain = before.chain;
            return Err(e);
        }
        for event in self.broker.drain_events() {
            match serde_json::to_string(&event) {
                Ok(json) => info!(event = %json, "Broker event"),
                Err(e) => warn!(error = %e, "Failed to encode broker event"),
            }
            if self.recent_events.len() == RECENT_EVENTS {
                self.recent_events.pop_front();
            }
            self.recent_events.push_back(event);
        }
        Ok(())
    }

    pub fn recent_events(&self) -> impl Iterator<Item = &BrokerEvent> {
        self.recent_events.iter()
    }

    fn persist(&self) -> Result<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        store.save(&self.snapshot())
    }
}
