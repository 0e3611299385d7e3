//! Network and pipeline configuration

use crate::constants::{
    DEFAULT_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL, DEFAULT_SIGNER_TIMEOUT, ELA_CHAIN_CODE,
};
use crate::error::{Context, Result};
use alloy::primitives::{address, Address, U256};
use std::str::FromStr;
use std::time::Duration;

/// Main chain network the classic pipeline broadcasts to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    /// Chain code wallets must carry to submit here ("ELA")
    pub chain_code: String,
    /// Network name (MainNet, TestNet, ...)
    pub network: String,
    /// ELA node JSON-RPC endpoint
    pub rpc_url: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self::mainnet()
    }
}

impl NetworkConfig {
    /// ELA main chain, public API node
    pub fn mainnet() -> Self {
        Self {
            chain_code: ELA_CHAIN_CODE.to_string(),
            network: "MainNet".to_string(),
            rpc_url: "https://api.elastos.io/ela".to_string(),
        }
    }

    /// ELA main chain test network
    pub fn testnet() -> Self {
        Self {
            chain_code: ELA_CHAIN_CODE.to_string(),
            network: "TestNet".to_string(),
            rpc_url: "https://api-testnet.elastos.io/ela".to_string(),
        }
    }

    /// Load from `ELA_NETWORK` / `ELA_RPC_URL`, falling back to mainnet
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let base = match std::env::var("ELA_NETWORK").as_deref() {
            Ok("TestNet") | Ok("testnet") => Self::testnet(),
            _ => Self::mainnet(),
        };
        match std::env::var("ELA_RPC_URL") {
            Ok(url) => base.with_rpc_url(url),
            Err(_) => base,
        }
    }

    /// Create custom configuration with specific RPC URL
    pub fn with_rpc_url(mut self, rpc_url: impl Into<String>) -> Self {
        self.rpc_url = rpc_url.into();
        self
    }
}

/// Growth of the delay between polling attempts
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// Same interval between every attempt
    Fixed,
    /// Interval multiplied by `factor` after each attempt, capped at `max_interval`
    Exponential { factor: u32, max_interval: Duration },
}

/// Bounded retry policy for receipt polling
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollingPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl Default for PollingPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_POLL_ATTEMPTS,
            backoff: Backoff::Fixed,
        }
    }
}

impl PollingPolicy {
    pub fn fixed(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
            backoff: Backoff::Fixed,
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Delay to wait after the given (1-based) attempt
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.interval,
            Backoff::Exponential {
                factor,
                max_interval,
            } => {
                let exponent = attempt.saturating_sub(1);
                let multiplier = factor.max(1).saturating_pow(exponent);
                self.interval
                    .checked_mul(multiplier)
                    .unwrap_or(max_interval)
                    .min(max_interval)
            }
        }
    }
}

/// ERC-4337 account abstraction settings for one EVM chain
#[derive(Debug, Clone)]
pub struct AccountAbstractionConfig {
    /// EVM chain ID (20 for Elastos Smart Chain)
    pub chain_id: u64,
    /// EVM RPC endpoint used for entry point reads and fee data
    pub rpc_url: String,
    /// Bundler JSON-RPC endpoint
    pub bundler_url: String,
    /// EntryPoint contract address
    pub entry_point: Address,
    /// Account factory used to derive init code
    pub factory: Address,
    /// CREATE2 salt for the account (0 unless an owner needs several accounts)
    pub salt: U256,
    /// Receipt polling policy
    pub polling: PollingPolicy,
}

impl Default for AccountAbstractionConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AccountAbstractionConfig {
    /// Elastos Smart Chain mainnet with the v0.6 entry point
    pub fn new() -> Self {
        Self {
            chain_id: 20,
            rpc_url: "https://api.elastos.io/esc".to_string(),
            bundler_url: "https://bundler.elastos.io/rpc".to_string(),
            entry_point: address!("5FF137D4b0FDCD49DcA30c7CF57E578a026d2789"),
            factory: address!("9406Cc6185a346906296840746125a0E44976454"),
            salt: U256::ZERO,
            polling: PollingPolicy::default(),
        }
    }

    /// Load overrides from the environment.
    ///
    /// Reads `AA_CHAIN_ID`, `AA_RPC_URL`, `AA_BUNDLER_URL`, `AA_ENTRY_POINT`,
    /// `AA_FACTORY`, `AA_SALT`, `AA_POLL_INTERVAL_MS` and `AA_POLL_ATTEMPTS`.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = Self::new();

        if let Some(chain_id) = env_parse::<u64>("AA_CHAIN_ID")? {
            config.chain_id = chain_id;
        }
        if let Ok(url) = std::env::var("AA_RPC_URL") {
            config.rpc_url = url;
        }
        if let Ok(url) = std::env::var("AA_BUNDLER_URL") {
            config.bundler_url = url;
        }
        if let Some(entry_point) = env_parse::<Address>("AA_ENTRY_POINT")? {
            config.entry_point = entry_point;
        }
        if let Some(factory) = env_parse::<Address>("AA_FACTORY")? {
            config.factory = factory;
        }
        if let Some(salt) = env_parse::<U256>("AA_SALT")? {
            config.salt = salt;
        }
        if let Some(ms) = env_parse::<u64>("AA_POLL_INTERVAL_MS")? {
            config.polling.interval = Duration::from_millis(ms);
        }
        if let Some(attempts) = env_parse::<u32>("AA_POLL_ATTEMPTS")? {
            config.polling.max_attempts = attempts;
        }

        Ok(config)
    }

    pub fn with_bundler_url(mut self, bundler_url: impl Into<String>) -> Self {
        self.bundler_url = bundler_url.into();
        self
    }

    pub fn with_rpc_url(mut self, rpc_url: impl Into<String>) -> Self {
        self.rpc_url = rpc_url.into();
        self
    }

    pub fn with_salt(mut self, salt: U256) -> Self {
        self.salt = salt;
        self
    }

    pub fn with_polling(mut self, polling: PollingPolicy) -> Self {
        self.polling = polling;
        self
    }
}

/// External signer settings
#[derive(Debug, Clone, Copy)]
pub struct SignerConfig {
    /// How long to wait for the user to approve or dismiss a signing request
    pub timeout: Duration,
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_SIGNER_TIMEOUT,
        }
    }
}

impl SignerConfig {
    /// Reads `SIGNER_TIMEOUT_SECS`
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let timeout = env_parse::<u64>("SIGNER_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_SIGNER_TIMEOUT);
        Ok(Self { timeout })
    }
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("Invalid value for {key}")),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{ENTRY_POINT_V06, SIMPLE_ACCOUNT_FACTORY_V06};

    #[test]
    fn test_default_addresses_match_constants() {
        let config = AccountAbstractionConfig::default();
        assert_eq!(config.entry_point, ENTRY_POINT_V06.parse::<Address>().unwrap());
        assert_eq!(
            config.factory,
            SIMPLE_ACCOUNT_FACTORY_V06.parse::<Address>().unwrap()
        );
        assert_eq!(config.salt, U256::ZERO);
    }

    #[test]
    fn test_default_polling_policy() {
        let policy = PollingPolicy::default();
        assert_eq!(policy.interval, Duration::from_millis(2000));
        assert_eq!(policy.max_attempts, 30);
        assert_eq!(policy.delay_after(7), Duration::from_millis(2000));
    }

    #[test]
    fn test_exponential_backoff_is_capped() {
        let policy = PollingPolicy::fixed(Duration::from_millis(100), 10).with_backoff(
            Backoff::Exponential {
                factor: 2,
                max_interval: Duration::from_millis(500),
            },
        );
        assert_eq!(policy.delay_after(1), Duration::from_millis(100));
        assert_eq!(policy.delay_after(2), Duration::from_millis(200));
        assert_eq!(policy.delay_after(3), Duration::from_millis(400));
        assert_eq!(policy.delay_after(4), Duration::from_millis(500));
        assert_eq!(policy.delay_after(40), Duration::from_millis(500));
    }

    #[test]
    fn test_network_builders() {
        let config = NetworkConfig::testnet().with_rpc_url("http://localhost:20336");
        assert_eq!(config.chain_code, "ELA");
        assert_eq!(config.network, "TestNet");
        assert_eq!(config.rpc_url, "http://localhost:20336");
    }
}
