//! Wallet materialization module
//!
//! Turns resolved secret strings into usable wallets:
//! - NeonEVM signers (secp256k1, bound to a network provider)
//! - Solana keypairs (ed25519, base58 secret keys)

pub mod materialize;
pub mod types;

pub use materialize::{evm_address, materialize};
pub use types::{EvmWallet, NetworkProvider, ResolvedWallets, SolanaWallet, WalletHandle};
