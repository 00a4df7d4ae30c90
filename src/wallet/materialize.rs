//! Wallet materialization from raw secret strings
//!
//! The key family is decided by the catalog; this is the single place that
//! switches on it.

use secp256k1::{PublicKey, Secp256k1, SecretKey};
use sha3::{Digest, Keccak256};
use solana_sdk::signer::keypair::keypair_from_seed;
use solana_sdk::signer::Signer;
use zeroize::Zeroizing;

use crate::error::{Error, Result};
use crate::secrets::catalog::{KeyFamily, SecretCatalogEntry};

use super::types::{EvmWallet, NetworkProvider, SolanaWallet, WalletHandle};

/// secp256k1 private key length in bytes
const EVM_KEY_LEN: usize = 32;

/// Solana secret key length (seed + public key) in bytes
const SOLANA_KEYPAIR_LEN: usize = 64;
const SOLANA_SEED_LEN: usize = 32;

/// Build a wallet handle from a raw secret value
///
/// Fails with `Error::InvalidKeyMaterial` naming the secret when the value
/// is not a well-formed key for the entry's family.
pub fn materialize(
    entry: &SecretCatalogEntry,
    raw_secret: &str,
    provider: &NetworkProvider,
) -> Result<WalletHandle> {
    let name = entry.catalog_name();
    match entry.key_family() {
        KeyFamily::EvmStyle => evm_wallet(name, raw_secret, provider).map(WalletHandle::Evm),
        KeyFamily::Ed25519Style => solana_wallet(name, raw_secret).map(WalletHandle::Solana),
    }
}

fn evm_wallet(name: &str, raw_secret: &str, provider: &NetworkProvider) -> Result<EvmWallet> {
    let trimmed = raw_secret.trim();
    let hex_key = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if hex_key.len() != EVM_KEY_LEN * 2 {
        return Err(Error::invalid_key(
            name,
            format!("expected {} hex characters", EVM_KEY_LEN * 2),
        ));
    }

    let bytes = Zeroizing::new(
        hex::decode(hex_key).map_err(|_| Error::invalid_key(name, "not a hex string"))?,
    );

    let signing_key = SecretKey::from_slice(&bytes)
        .map_err(|_| Error::invalid_key(name, "not a valid secp256k1 private key"))?;

    let address = evm_address(&signing_key);
    Ok(EvmWallet::new(address, signing_key, provider.clone()))
}

fn solana_wallet(name: &str, raw_secret: &str) -> Result<SolanaWallet> {
    let bytes = Zeroizing::new(
        bs58::decode(raw_secret.trim())
            .into_vec()
            .map_err(|_| Error::invalid_key(name, "not a base58 string"))?,
    );

    if bytes.len() != SOLANA_KEYPAIR_LEN {
        return Err(Error::invalid_key(
            name,
            format!(
                "decoded secret key is {} bytes, expected {}",
                bytes.len(),
                SOLANA_KEYPAIR_LEN
            ),
        ));
    }

    // `Keypair::from_bytes` does not check that the halves belong together
    let (seed, public) = bytes.split_at(SOLANA_SEED_LEN);
    let keypair = keypair_from_seed(seed)
        .map_err(|e| Error::invalid_key(name, format!("invalid ed25519 secret key: {}", e)))?;

    if keypair.pubkey().to_bytes()[..] != *public {
        return Err(Error::invalid_key(
            name,
            "public key does not match secret key",
        ));
    }

    Ok(SolanaWallet::new(keypair))
}

/// EIP-55 checksummed address of a secp256k1 key
pub fn evm_address(signing_key: &SecretKey) -> String {
    let secp = Secp256k1::signing_only();
    let public_key = PublicKey::from_secret_key(&secp, signing_key);
    let uncompressed = public_key.serialize_uncompressed();

    // Skip the 0x04 prefix; the address is the last 20 bytes of the hash
    let hash = Keccak256::digest(&uncompressed[1..]);
    to_checksum_address(&hash[12..])
}

fn to_checksum_address(address: &[u8]) -> String {
    let lower = hex::encode(address);
    let hash = Keccak256::digest(lower.as_bytes());

    let checksummed: String = lower
        .chars()
        .enumerate()
        .map(|(i, c)| {
            let nibble = if i % 2 == 0 {
                hash[i / 2] >> 4
            } else {
                hash[i / 2] & 0x0f
            };
            if c.is_ascii_alphabetic() && nibble >= 8 {
                c.to_ascii_uppercase()
            } else {
                c
            }
        })
        .collect();

    format!("0x{}", checksummed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::signature::Keypair;

    // Well-known development keys with published addresses
    const HARDHAT_KEY_0: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const HARDHAT_ADDR_0: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
    const WEB3_DOC_KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
    const WEB3_DOC_ADDR: &str = "0x2c7536E3605D9C16a7a3D7b1898e529396a65c23";

    fn provider() -> NetworkProvider {
        NetworkProvider::new("https://devnet.neonevm.org", 245022926).unwrap()
    }

    fn entry(name: &str) -> SecretCatalogEntry {
        SecretCatalogEntry::new(name).unwrap()
    }

    #[test]
    fn test_evm_address_derivation() {
        let owner = entry("PRIVATE_KEY_OWNER");

        let handle = materialize(&owner, HARDHAT_KEY_0, &provider()).unwrap();
        assert_eq!(handle.public_id(), HARDHAT_ADDR_0);

        let handle = materialize(&owner, WEB3_DOC_KEY, &provider()).unwrap();
        assert_eq!(handle.public_id(), WEB3_DOC_ADDR);

        let wallet = handle.as_evm().unwrap();
        assert_eq!(wallet.provider().chain_id(), 245022926);
    }

    #[test]
    fn test_evm_key_tolerates_whitespace_and_prefix() {
        let user = entry("PRIVATE_KEY_USER_1");
        let raw = format!("  0X{}\n", HARDHAT_KEY_0);
        let handle = materialize(&user, &raw, &provider()).unwrap();
        assert_eq!(handle.public_id(), HARDHAT_ADDR_0);
    }

    #[test]
    fn test_evm_key_rejects_malformed() {
        let user = entry("PRIVATE_KEY_USER_2");
        let zero = "0".repeat(64);
        let order = "fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364141";
        let too_short = &HARDHAT_KEY_0[..62];
        let not_hex = format!("zz{}", &HARDHAT_KEY_0[2..]);

        for raw in [too_short, not_hex.as_str(), zero.as_str(), order, ""] {
            let err = materialize(&user, raw, &provider()).unwrap_err();
            assert!(
                matches!(&err, Error::InvalidKeyMaterial { secret, .. } if secret == "PRIVATE_KEY_USER_2"),
                "unexpected error for {raw:?}: {err}"
            );
        }
    }

    #[test]
    fn test_solana_keypair_roundtrip() {
        let keypair = Keypair::new();
        let encoded = keypair.to_base58_string();

        let handle = materialize(&entry("PRIVATE_KEY_SOLANA"), &encoded, &provider()).unwrap();
        assert_eq!(handle.key_family(), KeyFamily::Ed25519Style);
        assert_eq!(handle.as_solana().unwrap().pubkey(), keypair.pubkey());
        assert_eq!(handle.public_id(), keypair.pubkey().to_string());
    }

    #[test]
    fn test_solana_keypair_rejects_malformed() {
        let solana = entry("PRIVATE_KEY_SOLANA_2");
        let short = bs58::encode([7u8; 32]).into_string();

        for raw in ["not-base58-0OIl", short.as_str(), ""] {
            let err = materialize(&solana, raw, &provider()).unwrap_err();
            assert!(err.allows_store_fallback(), "unexpected error for {raw:?}: {err}");
        }
    }

    #[test]
    fn test_solana_keypair_rejects_mismatched_halves() {
        let a = Keypair::new();
        let b = Keypair::new();
        let mut spliced = a.to_bytes()[..32].to_vec();
        spliced.extend_from_slice(&b.pubkey().to_bytes());
        let encoded = bs58::encode(&spliced).into_string();

        let err = materialize(&entry("PRIVATE_KEY_SOLANA_3"), &encoded, &provider()).unwrap_err();
        assert!(err.allows_store_fallback());
        assert!(err.to_string().contains("does not match"));
        assert!(!err.to_string().contains(&encoded));
    }

    #[test]
    fn test_error_never_contains_secret() {
        let user = entry("PRIVATE_KEY_USER_3");
        let raw = format!("{}00", HARDHAT_KEY_0);
        let err = materialize(&user, &raw, &provider()).unwrap_err();
        assert!(!err.to_string().contains(HARDHAT_KEY_0));
    }
}
