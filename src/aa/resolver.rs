//! Sender, nonce and initCode resolution

use super::chain::AccountChain;
use crate::contracts::ISimpleAccountFactory;
use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::SolCall;
use eyre::{Context, Result};

/// Account state a user operation is built on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAccount {
    pub sender: Address,
    pub nonce: U256,
    /// Empty once the account is deployed
    pub init_code: Bytes,
}

/// `factory ++ createAccount(owner, salt)`
pub fn build_init_code(factory: Address, owner: Address, salt: U256) -> Bytes {
    let call = ISimpleAccountFactory::createAccountCall { owner, salt };
    let mut init_code = factory.to_vec();
    init_code.extend_from_slice(&call.abi_encode());
    Bytes::from(init_code)
}

pub struct AccountResolver {
    entry_point: Address,
    factory: Address,
    salt: U256,
}

impl AccountResolver {
    pub fn new(entry_point: Address, factory: Address, salt: U256) -> Self {
        Self {
            entry_point,
            factory,
            salt,
        }
    }

    /// Resolve the account of `owner`.
    ///
    /// `sender` overrides the counterfactual address when the caller already
    /// knows it. initCode is only attached while no code exists at the sender.
    pub async fn resolve<C: AccountChain>(
        &self,
        chain: &C,
        owner: Address,
        sender: Option<Address>,
    ) -> Result<ResolvedAccount> {
        let sender = match sender {
            Some(sender) => sender,
            None => chain
                .get_sender_address(self.factory, owner, self.salt)
                .await
                .context("Failed to derive account address")?,
        };

        let (nonce, code) = futures::future::try_join(
            chain.get_nonce(self.entry_point, sender),
            chain.get_code(sender),
        )
        .await
        .with_context(|| format!("Failed to read account state of {sender}"))?;

        let init_code = if code.is_empty() {
            tracing::debug!("Account {} not deployed, attaching initCode", sender);
            build_init_code(self.factory, owner, self.salt)
        } else {
            Bytes::new()
        };

        Ok(ResolvedAccount {
            sender,
            nonce,
            init_code,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aa::tests::MockChain;
    use alloy::primitives::address;

    const OWNER: Address = address!("00000000000000000000000000000000000000e1");
    const FACTORY: Address = address!("9406Cc6185a346906296840746125a0E44976454");

    #[test]
    fn test_init_code_layout() {
        let init_code = build_init_code(FACTORY, OWNER, U256::from(5));
        assert_eq!(&init_code[..20], FACTORY.as_slice());
        assert_eq!(
            &init_code[20..24],
            &ISimpleAccountFactory::createAccountCall::SELECTOR
        );
        // selector + two 32-byte words
        assert_eq!(init_code.len(), 20 + 4 + 64);
    }

    #[tokio::test]
    async fn test_undeployed_account_gets_init_code() {
        let chain = MockChain::default();
        let resolver = AccountResolver::new(Address::ZERO, FACTORY, U256::ZERO);
        let resolved = resolver.resolve(&chain, OWNER, None).await.unwrap();

        assert_eq!(resolved.sender, chain.sender);
        assert_eq!(resolved.nonce, U256::ZERO);
        assert!(resolved.init_code.starts_with(FACTORY.as_slice()));
    }

    #[tokio::test]
    async fn test_deployed_account_has_empty_init_code() {
        let chain = MockChain {
            code: Bytes::from(vec![0x60, 0x80]),
            nonce: U256::from(4),
            ..Default::default()
        };
        let resolver = AccountResolver::new(Address::ZERO, FACTORY, U256::ZERO);
        let resolved = resolver.resolve(&chain, OWNER, None).await.unwrap();

        assert!(resolved.init_code.is_empty());
        assert_eq!(resolved.nonce, U256::from(4));
    }

    #[tokio::test]
    async fn test_explicit_sender_is_kept() {
        let chain = MockChain::default();
        let explicit = address!("2222222222222222222222222222222222222222");
        let resolver = AccountResolver::new(Address::ZERO, FACTORY, U256::ZERO);
        let resolved = resolver
            .resolve(&chain, OWNER, Some(explicit))
            .await
            .unwrap();
        assert_eq!(resolved.sender, explicit);
    }
}
