//! Active wallet/network context and per-wallet mutual exclusion

use crate::config::NetworkConfig;
use crate::error::{PipelineError, Result};
use alloy::primitives::Address;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

/// Kind of wallet behind a signing context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletType {
    /// Single-key wallet with an external signer
    Standard,
    /// Multi-signature wallet
    MultiSig,
    /// Hardware wallet
    Ledger,
    /// Watch-only wallet without signing capability
    ReadOnly,
}

impl WalletType {
    /// Voting requires a single signature over the vote digest
    pub fn can_vote(self) -> bool {
        matches!(self, WalletType::Standard | WalletType::Ledger)
    }
}

/// Wallet and network selected when a command starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletContext {
    /// Stable wallet identifier, also the lock key
    pub wallet_id: String,
    pub wallet_type: WalletType,
    /// Chain the wallet's main-chain subwallet belongs to
    pub chain_code: String,
    /// Owner EOA for account-abstraction operations
    pub evm_owner: Option<Address>,
    /// Network active at command start
    pub network: NetworkConfig,
}

impl WalletContext {
    pub fn new(wallet_id: impl Into<String>, network: NetworkConfig) -> Self {
        Self {
            wallet_id: wallet_id.into(),
            wallet_type: WalletType::Standard,
            chain_code: network.chain_code.clone(),
            evm_owner: None,
            network,
        }
    }

    pub fn with_wallet_type(mut self, wallet_type: WalletType) -> Self {
        self.wallet_type = wallet_type;
        self
    }

    pub fn with_chain_code(mut self, chain_code: impl Into<String>) -> Self {
        self.chain_code = chain_code.into();
        self
    }

    pub fn with_evm_owner(mut self, owner: Address) -> Self {
        self.evm_owner = Some(owner);
        self
    }
}

/// Process-wide active wallet/network.
///
/// Pipelines never read this directly mid-flight; they take a
/// [`snapshot`](ActiveContext::snapshot) when a command starts.
#[derive(Debug, Clone)]
pub struct ActiveContext {
    tx: Arc<watch::Sender<WalletContext>>,
}

impl ActiveContext {
    pub fn new(initial: WalletContext) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    /// Switch the active wallet or network
    pub fn set(&self, context: WalletContext) {
        self.tx.send_replace(context);
    }

    /// Owned copy of the current context
    pub fn snapshot(&self) -> WalletContext {
        self.tx.borrow().clone()
    }
}

/// Set of wallets with a command in flight
#[derive(Debug, Clone, Default)]
pub struct WalletLocks {
    busy: Arc<Mutex<HashSet<String>>>,
}

impl WalletLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the wallet, or fail with `WalletBusy` if a command already holds it
    pub fn try_acquire(&self, wallet_id: &str) -> Result<WalletGuard> {
        let mut busy = self.busy.lock().unwrap_or_else(|e| e.into_inner());
        if !busy.insert(wallet_id.to_string()) {
            return Err(PipelineError::WalletBusy(wallet_id.to_string()).into());
        }
        Ok(WalletGuard {
            wallet_id: wallet_id.to_string(),
            busy: self.busy.clone(),
        })
    }

    pub fn is_busy(&self, wallet_id: &str) -> bool {
        self.busy
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(wallet_id)
    }
}

/// Releases the wallet when dropped
#[derive(Debug)]
pub struct WalletGuard {
    wallet_id: String,
    busy: Arc<Mutex<HashSet<String>>>,
}

impl Drop for WalletGuard {
    fn drop(&mut self) {
        self.busy
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.wallet_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::classify;

    #[test]
    fn test_snapshot_is_isolated_from_switches() {
        let active = ActiveContext::new(WalletContext::new("w1", NetworkConfig::mainnet()));
        let snapshot = active.snapshot();

        active.set(WalletContext::new("w2", NetworkConfig::testnet()));

        assert_eq!(snapshot.wallet_id, "w1");
        assert_eq!(snapshot.network.network, "MainNet");
        assert_eq!(active.snapshot().wallet_id, "w2");
    }

    #[test]
    fn test_wallet_lock_rejects_second_command() {
        let locks = WalletLocks::new();
        let guard = locks.try_acquire("w1").unwrap();

        let err = locks.try_acquire("w1").unwrap_err();
        assert!(matches!(classify(&err), Some(PipelineError::WalletBusy(id)) if id == "w1"));

        // other wallets are independent
        let other = locks.try_acquire("w2");
        assert!(other.is_ok());

        drop(guard);
        assert!(!locks.is_busy("w1"));
        assert!(locks.try_acquire("w1").is_ok());
    }

    #[test]
    fn test_wallet_types_that_vote() {
        assert!(WalletType::Standard.can_vote());
        assert!(WalletType::Ledger.can_vote());
        assert!(!WalletType::MultiSig.can_vote());
        assert!(!WalletType::ReadOnly.can_vote());
    }
}
