//! Development oracle output computation.
//!
//! Uses HMAC-SHA256 keyed by the oracle's secret to produce a 32-byte
//! pseudo-random output that is deterministic (same inputs = same output)
//! but unpredictable without the secret key. No proof is produced; this
//! stands in for the external oracle network.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use vrf_broker::{OracleHandle, RandomValue};

type HmacSha256 = Hmac<Sha256>;

/// Compute the 32-byte base output for an oracle request.
///
/// ```text
/// output = HMAC-SHA256(secret, handle || request_height_le)
/// ```
pub fn compute_randomness(
    hmac_secret: &[u8],
    handle: &OracleHandle,
    request_height: u64,
) -> [u8; 32] {
    let mut mac =
        HmacSha256::new_from_slice(hmac_secret).expect("HMAC accepts keys of any size");

    mac.update(&handle.0);
    mac.update(&request_height.to_le_bytes());

    mac.finalize().into_bytes().into()
}

/// Expand base randomness into multiple words: `word[i] = SHA256(base || i_le)`.
pub fn expand_randomness(base: &[u8; 32], num_words: u32) -> Vec<RandomValue> {
    (0..num_words)
        .map(|i| {
            let mut hasher = Sha256::new();
            hasher.update(base);
            hasher.update(i.to_le_bytes());
            RandomValue(hasher.finalize().into())
        })
        .collect()
}

/// Words delivered for one request.
pub fn random_words(
    hmac_secret: &[u8],
    handle: &OracleHandle,
    request_height: u64,
    num_words: u32,
) -> Vec<RandomValue> {
    expand_randomness(&compute_randomness(hmac_secret, handle, request_height), num_words)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HANDLE: OracleHandle = OracleHandle([1u8; 32]);

    #[test]
    fn deterministic_for_same_inputs() {
        let secret = b"test-secret";

        let r1 = compute_randomness(secret, &HANDLE, 100);
        let r2 = compute_randomness(secret, &HANDLE, 100);
        assert_eq!(r1, r2);
    }

    #[test]
    fn different_for_different_heights() {
        let secret = b"test-secret";

        let r1 = compute_randomness(secret, &HANDLE, 100);
        let r2 = compute_randomness(secret, &HANDLE, 101);
        assert_ne!(r1, r2);
    }

    #[test]
    fn different_for_different_handles() {
        let secret = b"test-secret";

        let r1 = compute_randomness(secret, &HANDLE, 100);
        let r2 = compute_randomness(secret, &OracleHandle([2u8; 32]), 100);
        assert_ne!(r1, r2);
    }

    #[test]
    fn expansion_yields_distinct_words() {
        let words = random_words(b"test-secret", &HANDLE, 7, 3);
        assert_eq!(words.len(), 3);
        assert_ne!(words[0], words[1]);
        assert_ne!(words[1], words[2]);
        assert!(random_words(b"test-secret", &HANDLE, 7, 0).is_empty());
    }
}
