//! Wallet handle types
//!
//! A resolved secret becomes either an EVM signer bound to a network
//! provider or a Solana keypair. Neither type prints key material.

use std::collections::HashMap;
use std::fmt;

use secp256k1::SecretKey;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;
use solana_sdk::signer::Signer;
use url::Url;

use crate::error::{Error, Result};
use crate::secrets::catalog::KeyFamily;

/// EVM network endpoint a signer is bound to
///
/// Only carried through to wallets; nothing here talks to the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkProvider {
    rpc_url: Url,
    chain_id: u64,
}

impl NetworkProvider {
    pub fn new(rpc_url: &str, chain_id: u64) -> Result<Self> {
        let rpc_url = Url::parse(rpc_url)
            .map_err(|e| Error::Config(format!("Invalid EVM RPC URL {}: {}", rpc_url, e)))?;

        if !matches!(rpc_url.scheme(), "http" | "https" | "ws" | "wss") {
            return Err(Error::Config(format!(
                "Unsupported EVM RPC URL scheme: {}",
                rpc_url.scheme()
            )));
        }

        if chain_id == 0 {
            return Err(Error::Config("EVM chain id must be non-zero".into()));
        }

        Ok(Self { rpc_url, chain_id })
    }

    pub fn rpc_url(&self) -> &Url {
        &self.rpc_url
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }
}

/// secp256k1 signer for NeonEVM
pub struct EvmWallet {
    /// EIP-55 checksummed address
    address: String,
    signing_key: SecretKey,
    provider: NetworkProvider,
}

impl EvmWallet {
    pub(crate) fn new(address: String, signing_key: SecretKey, provider: NetworkProvider) -> Self {
        Self {
            address,
            signing_key,
            provider,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn signing_key(&self) -> &SecretKey {
        &self.signing_key
    }

    pub fn provider(&self) -> &NetworkProvider {
        &self.provider
    }
}

impl fmt::Debug for EvmWallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvmWallet")
            .field("address", &self.address)
            .field("chain_id", &self.provider.chain_id)
            .finish_non_exhaustive()
    }
}

/// ed25519 keypair for Solana
pub struct SolanaWallet {
    keypair: Keypair,
}

impl SolanaWallet {
    pub(crate) fn new(keypair: Keypair) -> Self {
        Self { keypair }
    }

    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }
}

impl fmt::Debug for SolanaWallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SolanaWallet")
            .field("pubkey", &self.pubkey().to_string())
            .finish_non_exhaustive()
    }
}

/// A materialized secret
#[derive(Debug)]
pub enum WalletHandle {
    Evm(EvmWallet),
    Solana(SolanaWallet),
}

impl WalletHandle {
    /// Address (EVM) or base58 public key (Solana)
    pub fn public_id(&self) -> String {
        match self {
            WalletHandle::Evm(wallet) => wallet.address().to_string(),
            WalletHandle::Solana(wallet) => wallet.pubkey().to_string(),
        }
    }

    pub fn key_family(&self) -> KeyFamily {
        match self {
            WalletHandle::Evm(_) => KeyFamily::EvmStyle,
            WalletHandle::Solana(_) => KeyFamily::Ed25519Style,
        }
    }

    pub fn as_evm(&self) -> Option<&EvmWallet> {
        match self {
            WalletHandle::Evm(wallet) => Some(wallet),
            WalletHandle::Solana(_) => None,
        }
    }

    pub fn as_solana(&self) -> Option<&SolanaWallet> {
        match self {
            WalletHandle::Solana(wallet) => Some(wallet),
            WalletHandle::Evm(_) => None,
        }
    }
}

/// Wallets produced by one resolution run, keyed by short name
#[derive(Debug, Default)]
pub struct ResolvedWallets {
    wallets: HashMap<String, WalletHandle>,
    /// Short names in resolution order
    order: Vec<String>,
}

impl ResolvedWallets {
    /// Insert a wallet; the first wallet for a short name wins
    pub(crate) fn insert(&mut self, short_name: &str, handle: WalletHandle) -> bool {
        if self.wallets.contains_key(short_name) {
            return false;
        }
        self.order.push(short_name.to_string());
        self.wallets.insert(short_name.to_string(), handle);
        true
    }

    pub fn get(&self, short_name: &str) -> Option<&WalletHandle> {
        self.wallets.get(short_name)
    }

    pub fn evm(&self, short_name: &str) -> Option<&EvmWallet> {
        self.get(short_name).and_then(WalletHandle::as_evm)
    }

    pub fn solana(&self, short_name: &str) -> Option<&SolanaWallet> {
        self.get(short_name).and_then(WalletHandle::as_solana)
    }

    pub fn contains(&self, short_name: &str) -> bool {
        self.wallets.contains_key(short_name)
    }

    pub fn len(&self) -> usize {
        self.wallets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wallets.is_empty()
    }

    /// Iterate in resolution order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &WalletHandle)> {
        self.order
            .iter()
            .filter_map(|name| self.wallets.get(name).map(|w| (name.as_str(), w)))
    }

    pub fn into_map(self) -> HashMap<String, WalletHandle> {
        self.wallets
    }
}
