//! JSON snapshots of the hosted ledger.
//!
//! Written to a sibling temp file and renamed into place, so a crash mid-write
//! leaves the previous snapshot intact.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use vrf_broker::BrokerState;
use vrf_broker::local::LocalChain;

/// Everything needed to resume the node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub broker: BrokerState,
    pub chain: LocalChain,
}

#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
}

impl Store {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the snapshot, or `None` if none has been written yet.
    pub fn load(&self) -> Result<Option<Snapshot>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        let snapshot = serde_json::from_slice(&raw)
            .with_context(|| format!("failed to parse {}", self.path.display()))?;
        Ok(Some(snapshot))
    }

    pub fn save(&self, snapshot: &Snapshot) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let raw = serde_json::to_vec_pretty(snapshot).context("failed to encode snapshot")?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, raw).with_context(|| format!("failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to replace {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vrf_broker::{Address, InternalRequestId, KeyHash, RequestConfig};

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("vrf-broker-store-{}-{name}", std::process::id()))
            .join("state.json")
    }

    #[test]
    fn missing_file_loads_as_none() {
        let store = Store::new(temp_path("missing"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn saved_snapshot_loads_back() {
        let path = temp_path("roundtrip");
        let store = Store::new(&path);

        let config = RequestConfig::new(KeyHash([7; 32]), 100_000, 3, 1).unwrap();
        let mut broker = BrokerState::new(Address([0xB0; 32]), Address([0xAA; 32]), config);
        broker.last_request_id = InternalRequestId(4);
        let mut chain = LocalChain::new(Address([0xAA; 32]), Address([0xCC; 32]), 1);
        chain.mint(Address([3; 32]), 25).unwrap();
        chain.advance(9);
        let snapshot = Snapshot { broker, chain };

        store.save(&snapshot).unwrap();
        assert_eq!(store.load().unwrap(), Some(snapshot));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
