//! Challenge issuance.
//!
//! A challenge is a single-use, time-boxed message a wallet must sign to
//! prove key ownership. The message embeds the wallet address, a random
//! nonce, and both timestamps, and tells the signer what the signature
//! authorizes so it cannot be replayed convincingly on a phishing page.

use crate::models::{normalize_address, StoredChallenge};
use crate::store::{now_ms, TtlStore};
use rand::Rng;

/// Result of issuing a challenge.
#[derive(Debug, Clone)]
pub struct IssuedChallenge {
    pub challenge_id: String,
    pub message: String,
    pub expires_at: u64,
}

/// Generate a cryptographically random 32-byte nonce, hex encoded.
fn generate_nonce() -> String {
    let mut rng = rand::rng();
    let mut bytes = [0u8; 32];
    rng.fill(&mut bytes);
    hex::encode(bytes)
}

/// Issue a challenge for a wallet address and register it in the store.
///
/// The address is lowercased before being bound to the challenge; the
/// caller is expected to have shape-validated it already.
pub fn issue_challenge(
    store: &TtlStore<StoredChallenge>,
    wallet_address: &str,
    expiry_ms: u64,
) -> IssuedChallenge {
    let wallet_address = normalize_address(wallet_address);
    let challenge_id = nanoid::nanoid!(21);
    let nonce = generate_nonce();

    let issued_at = now_ms();
    let expires_at = issued_at + expiry_ms;

    let message = format!(
        "Welcome! Sign this message to prove you own the wallet {wallet_address}.\n\
         \n\
         This signature only authenticates you to this site and does not\n\
         authorize any transaction. Only sign it on the official site.\n\
         \n\
         Nonce: {nonce}\n\
         Issued at: {issued_at}\n\
         Expires at: {expires_at}"
    );

    let challenge = StoredChallenge {
        challenge_id: challenge_id.clone(),
        wallet_address,
        message: message.clone(),
        issued_at,
        expires_at,
    };

    store.put(challenge_id.clone(), challenge);
    tracing::debug!(challenge_id = %challenge_id, "Challenge issued");

    IssuedChallenge {
        challenge_id,
        message,
        expires_at,
    }
}
