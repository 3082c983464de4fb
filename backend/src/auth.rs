//! Caller authentication for the HTTP surface.
//!
//! A request proves the account named in `x-caller` with `x-signature`,
//! the base64 of
//!
//! ```text
//! HMAC-SHA256(account_key, method "\n" path "\n" caller "\n" body)
//! ```
//!
//! where `account_key = HMAC-SHA256(AUTH_SECRET, "vrf-broker-account:" || address)`.
//! The operator hands each account its key (`vrf-broker-backend account-key <ADDRESS>`).

use hmac::{Hmac, Mac};
use sha2::Sha256;
use vrf_broker::Address;

type HmacSha256 = Hmac<Sha256>;

pub const CALLER_HEADER: &str = "x-caller";
pub const SIGNATURE_HEADER: &str = "x-signature";

/// Verifies request signatures against keys derived from one server secret.
#[derive(Clone)]
pub struct RequestAuth {
    secret: Vec<u8>,
}

impl RequestAuth {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// The signing key issued to `account`.
    pub fn account_key(&self, account: &Address) -> [u8; 32] {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts keys of any size");
        mac.update(b"vrf-broker-account:");
        mac.update(&account.0);
        mac.finalize().into_bytes().into()
    }

    /// Constant-time check of `signature` over the request.
    pub fn verify(
        &self,
        account: &Address,
        method: &str,
        path: &str,
        body: &[u8],
        signature: &[u8],
    ) -> bool {
        request_mac(&self.account_key(account), account, method, path, body)
            .verify_slice(signature)
            .is_ok()
    }
}

/// The signature a client sends for a request made as `account`.
#[cfg(test)]
pub fn sign(account_key: &[u8], account: &Address, method: &str, path: &str, body: &[u8]) -> [u8; 32] {
    request_mac(account_key, account, method, path, body)
        .finalize()
        .into_bytes()
        .into()
}

fn request_mac(
    account_key: &[u8],
    account: &Address,
    method: &str,
    path: &str,
    body: &[u8],
) -> HmacSha256 {
    let mut mac = HmacSha256::new_from_slice(account_key).expect("HMAC accepts keys of any size");
    mac.update(method.as_bytes());
    mac.update(b"\n");
    mac.update(path.as_bytes());
    mac.update(b"\n");
    mac.update(account.to_string().as_bytes());
    mac.update(b"\n");
    mac.update(body);
    mac
}
