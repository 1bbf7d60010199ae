//! EIP-191 personal-message signature verification.
//!
//! Wallets sign the challenge message with `personal_sign`, which prefixes
//! the message with `"\x19Ethereum Signed Message:\n{len}"` before hashing
//! with Keccak-256. We recover the signing address from the 65-byte
//! recoverable signature and compare it to the claimed address.
//!
//! This module is stateless and safe to call concurrently.
//!
//! Malformed signatures and address mismatches both surface as
//! [`AppError::InvalidSignature`] so callers cannot use the distinction
//! as an oracle; the real cause is logged at debug level.

use crate::error::AppError;
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};

/// Recover the Ethereum address that signed `message` via personal_sign.
///
/// # Arguments
/// * `message` - The exact UTF-8 message that was signed (unprefixed)
/// * `signature_hex` - Hex-encoded 65-byte signature (r || s || v), with
///   or without a `0x` prefix
///
/// # Returns
/// The lowercase `0x`-prefixed recovered address, or
/// `AppError::InvalidSignature` if the signature cannot be decoded or
/// recovery fails.
pub fn recover_address(message: &str, signature_hex: &str) -> Result<String, AppError> {
    let sig_bytes = hex::decode(signature_hex.trim_start_matches("0x")).map_err(|e| {
        tracing::debug!(error = %e, "Signature is not valid hex");
        AppError::InvalidSignature
    })?;

    if sig_bytes.len() != 65 {
        tracing::debug!(len = sig_bytes.len(), "Signature must be 65 bytes");
        return Err(AppError::InvalidSignature);
    }

    // Split into r+s (64 bytes) and the recovery byte v
    let (rs, v_byte) = sig_bytes.split_at(64);
    let v = match v_byte[0] {
        0 | 27 => 0u8,
        1 | 28 => 1u8,
        v => {
            tracing::debug!(v, "Invalid recovery id");
            return Err(AppError::InvalidSignature);
        }
    };

    let signature = Signature::from_slice(rs).map_err(|e| {
        tracing::debug!(error = %e, "Invalid ECDSA signature");
        AppError::InvalidSignature
    })?;

    let recovery_id = RecoveryId::new(v != 0, false);

    let digest = personal_message_digest(message);

    let verifying_key = VerifyingKey::recover_from_prehash(&digest, &signature, recovery_id)
        .map_err(|e| {
            tracing::debug!(error = %e, "Signature recovery failed");
            AppError::InvalidSignature
        })?;

    // Address = last 20 bytes of Keccak-256 of the uncompressed public key
    // (skipping the 0x04 SEC1 tag byte)
    let pubkey_bytes = verifying_key.to_encoded_point(false);
    let pubkey_uncompressed = &pubkey_bytes.as_bytes()[1..];
    let address_hash = keccak256(pubkey_uncompressed);

    Ok(format!("0x{}", hex::encode(&address_hash[12..])))
}

/// Verify that `signature_hex` over `message` was produced by
/// `claimed_address` (case-insensitive comparison).
pub fn verify_wallet_signature(
    message: &str,
    signature_hex: &str,
    claimed_address: &str,
) -> Result<(), AppError> {
    let recovered = recover_address(message, signature_hex)?;
    if recovered.eq_ignore_ascii_case(claimed_address.trim()) {
        Ok(())
    } else {
        tracing::debug!(
            recovered = %recovered,
            "Recovered address does not match claimed address"
        );
        Err(AppError::InvalidSignature)
    }
}

/// Keccak-256 digest of the EIP-191 prefixed message.
fn personal_message_digest(message: &str) -> [u8; 32] {
    let prefixed = format!("\x19Ethereum Signed Message:\n{}{}", message.len(), message);
    keccak256(prefixed.as_bytes())
}

fn keccak256(data: &[u8]) -> [u8; 32] {
    use tiny_keccak::{Hasher, Keccak};
    let mut hasher = Keccak::v256();
    let mut output = [0u8; 32];
    hasher.update(data);
    hasher.finalize(&mut output);
    output
}

#[cfg(test)]
pub mod test_helpers {
    //! Signing helpers shared by unit and integration tests.

    use super::*;
    use k256::ecdsa::SigningKey;

    /// Generate a random signing key and its Ethereum address.
    pub fn test_wallet() -> (SigningKey, String) {
        let mut seed = [0u8; 32];
        rand::fill(&mut seed);
        let signing_key = SigningKey::from_slice(&seed).expect("random seed is a valid scalar");
        let address = address_of(&signing_key);
        (signing_key, address)
    }

    /// Derive the lowercase address for a signing key.
    pub fn address_of(signing_key: &SigningKey) -> String {
        let pubkey_bytes = signing_key.verifying_key().to_encoded_point(false);
        let pubkey_uncompressed = &pubkey_bytes.as_bytes()[1..];
        let address_hash = keccak256(pubkey_uncompressed);
        format!("0x{}", hex::encode(&address_hash[12..]))
    }

    /// Produce a personal_sign signature over `message`, hex encoded.
    pub fn sign_message(signing_key: &SigningKey, message: &str) -> String {
        let digest = personal_message_digest(message);
        let (signature, recovery_id) = signing_key
            .sign_prehash_recoverable(&digest)
            .expect("signing failed");

        let mut sig_bytes = Vec::with_capacity(65);
        sig_bytes.extend_from_slice(&signature.to_bytes());
        sig_bytes.push(recovery_id.to_byte() + 27);
        format!("0x{}", hex::encode(&sig_bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::test_helpers::{sign_message, test_wallet};
    use super::*;

    #[test]
    fn test_recover_valid_signature() {
        let (key, address) = test_wallet();
        let message = "Sign in to walletgate";
        let signature = sign_message(&key, message);

        let recovered = recover_address(message, &signature).unwrap();
        assert_eq!(recovered, address);
    }

    #[test]
    fn test_verify_matches_claimed_address() {
        let (key, address) = test_wallet();
        let message = "test message";
        let signature = sign_message(&key, message);

        assert!(verify_wallet_signature(message, &signature, &address).is_ok());
    }

    #[test]
    fn test_verify_is_case_insensitive() {
        let (key, address) = test_wallet();
        let message = "test message";
        let signature = sign_message(&key, message);

        let upper = address.to_uppercase().replace("0X", "0x");
        assert!(verify_wallet_signature(message, &signature, &upper).is_ok());
    }

    #[test]
    fn test_verify_rejects_wrong_message() {
        let (key, address) = test_wallet();
        let signature = sign_message(&key, "original message");

        let result = verify_wallet_signature("tampered message", &signature, &address);
        assert!(matches!(result, Err(AppError::InvalidSignature)));
    }

    #[test]
    fn test_verify_rejects_wrong_address() {
        let (key, _) = test_wallet();
        let (_, other_address) = test_wallet();
        let message = "test message";
        let signature = sign_message(&key, message);

        let result = verify_wallet_signature(message, &signature, &other_address);
        assert!(matches!(result, Err(AppError::InvalidSignature)));
    }

    #[test]
    fn test_recover_rejects_invalid_hex() {
        let result = recover_address("msg", "not-hex-at-all!");
        assert!(matches!(result, Err(AppError::InvalidSignature)));
    }

    #[test]
    fn test_recover_rejects_wrong_length() {
        let result = recover_address("msg", &hex::encode([0u8; 32]));
        assert!(matches!(result, Err(AppError::InvalidSignature)));
    }

    #[test]
    fn test_recover_rejects_bad_recovery_byte() {
        let mut sig = [1u8; 65];
        sig[64] = 99;
        let result = recover_address("msg", &hex::encode(sig));
        assert!(matches!(result, Err(AppError::InvalidSignature)));
    }

    #[test]
    fn test_keccak256_known_vector() {
        let hash = keccak256(b"hello");
        assert_eq!(
            hex::encode(hash),
            "1c8aff950685c2ed4bc3174f3472287b56d9517b9c948127319a09a7a36deac8"
        );
    }
}
