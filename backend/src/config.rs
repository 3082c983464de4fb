//! Application configuration loaded from environment variables.
//!
//! Required: `HMAC_SECRET`, `AUTH_SECRET`, `ADMIN_ADDRESS`
//! Optional: `ORACLE_ADDRESS`, `KEY_HASH`, `CALLBACK_COMPUTE_LIMIT`,
//!           `REQUEST_CONFIRMATIONS`, `NUM_WORDS`, `FEE_PER_WORD`,
//!           `BLOCK_TIME_MS`, `MAX_RETRIES`, `HTTP_PORT`, `STATE_PATH`,
//!           `INITIAL_BALANCES`

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::str::FromStr;
use vrf_broker::{Address, Amount, KeyHash, RequestConfig};

/// Derive a fixed ledger address from a seed label: `sha256("vrf-broker:" || seed)`.
pub fn derive_address(seed: &str) -> Address {
    let mut hasher = Sha256::new();
    hasher.update(b"vrf-broker:");
    hasher.update(seed.as_bytes());
    Address(hasher.finalize().into())
}

/// Application configuration for the broker backend.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Secret key for the development oracle's HMAC-SHA256 output.
    pub hmac_secret: Vec<u8>,
    /// Secret the per-account HTTP signing keys are derived from.
    pub auth_secret: Vec<u8>,
    /// Account allowed to manage the subscription and configuration.
    pub admin: Address,
    /// Account the development oracle signs callbacks as.
    pub oracle: Address,
    /// The broker's own (custody and consumer) account.
    pub broker: Address,
    /// Funding token asset address.
    pub token: Address,
    /// Oracle coordinator address (receives subscription funding).
    pub coordinator: Address,
    /// Oracle routing key.
    pub key_hash: KeyHash,
    pub callback_compute_limit: u32,
    pub request_confirmations: u16,
    pub num_words: u32,
    /// Coordinator fee per requested word.
    pub fee_per_word: Amount,
    /// Interval between local blocks in milliseconds.
    pub block_time_ms: u64,
    /// Maximum answer attempts per oracle job.
    pub max_retries: u32,
    /// HTTP server port.
    pub http_port: u16,
    /// Snapshot file; `None` keeps state in memory only.
    pub state_path: Option<PathBuf>,
    /// Funding-token grants applied when starting from an empty ledger.
    pub initial_balances: Vec<(Address, Amount)>,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let hmac_secret = var("HMAC_SECRET")
            .context("HMAC_SECRET env var must be set")?
            .into_bytes();
        let auth_secret = var("AUTH_SECRET")
            .filter(|s| !s.is_empty())
            .context("AUTH_SECRET env var must be set")?
            .into_bytes();

        let admin_str = var("ADMIN_ADDRESS").context("ADMIN_ADDRESS env var must be set")?;
        let admin = Address::from_str(&admin_str)
            .with_context(|| format!("invalid ADMIN_ADDRESS: {admin_str}"))?;

        let oracle = match var("ORACLE_ADDRESS") {
            Some(s) => {
                Address::from_str(&s).with_context(|| format!("invalid ORACLE_ADDRESS: {s}"))?
            }
            None => derive_address("oracle"),
        };

        let key_hash = match var("KEY_HASH") {
            Some(s) => KeyHash::from_str(&s).with_context(|| format!("invalid KEY_HASH: {s}"))?,
            None => KeyHash(derive_address("key-hash").to_bytes()),
        };

        let callback_compute_limit = parse_or(&var, "CALLBACK_COMPUTE_LIMIT", 200_000)?;
        let request_confirmations = parse_or(&var, "REQUEST_CONFIRMATIONS", 3)?;
        let num_words = parse_or(&var, "NUM_WORDS", 1)?;
        let fee_per_word = parse_or(&var, "FEE_PER_WORD", 1)?;
        let block_time_ms = parse_or(&var, "BLOCK_TIME_MS", 400)?;
        let max_retries = parse_or(&var, "MAX_RETRIES", 3)?;
        let http_port = parse_or(&var, "HTTP_PORT", 8080)?;

        let state_path = var("STATE_PATH")
            .filter(|s| !s.is_empty())
            .map(|s| PathBuf::from(shellexpand::tilde(&s).to_string()));

        let initial_balances = match var("INITIAL_BALANCES") {
            Some(s) => parse_balances(&s)?,
            None => Vec::new(),
        };

        Ok(Self {
            hmac_secret,
            auth_secret,
            admin,
            oracle,
            broker: derive_address("broker"),
            token: derive_address("funding-token"),
            coordinator: derive_address("coordinator"),
            key_hash,
            callback_compute_limit,
            request_confirmations,
            num_words,
            fee_per_word,
            block_time_ms,
            max_retries,
            http_port,
            state_path,
            initial_balances,
        })
    }

    /// The broker's request config as configured (no subscription attached).
    pub fn request_config(&self) -> Result<RequestConfig> {
        RequestConfig::new(
            self.key_hash,
            self.callback_compute_limit,
            self.request_confirmations,
            self.num_words,
        )
        .context("invalid request config")
    }
}

fn parse_or<T: FromStr>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T> {
    match var(key) {
        Some(raw) => raw
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid {key}: {raw}")),
        None => Ok(default),
    }
}

/// Parse `addr=amount,addr=amount`.
fn parse_balances(raw: &str) -> Result<Vec<(Address, Amount)>> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (addr, amount) = entry
                .split_once('=')
                .with_context(|| format!("invalid INITIAL_BALANCES entry: {entry}"))?;
            let addr = Address::from_str(addr.trim())
                .with_context(|| format!("invalid address in INITIAL_BALANCES: {addr}"))?;
            let amount = amount
                .trim()
                .parse()
                .with_context(|| format!("invalid amount in INITIAL_BALANCES: {amount}"))?;
            Ok((addr, amount))
        })
        .collect()
}
