//! Call encoding for v0.6 SimpleAccount

use crate::contracts::ISimpleAccount;
use crate::error::invalid;
use crate::types::Call;
use alloy::primitives::{Bytes, U256};
use alloy::sol_types::SolCall;
use eyre::{Context, Result};

/// Encode calls as the account's call data.
///
/// One call goes through `execute(dest, value, func)`. Several calls go
/// through `executeBatch(dest[], func[])`, which carries no value, so a batch
/// with a valued call is rejected.
pub fn encode_batch(calls: &[Call]) -> Result<Bytes> {
    match calls {
        [] => Err(invalid("a user operation needs at least one call")),
        [call] => {
            let call = ISimpleAccount::executeCall {
                dest: call.target,
                value: call.value,
                func: call.data.clone(),
            };
            Ok(Bytes::from(call.abi_encode()))
        }
        calls => {
            if let Some(index) = calls.iter().position(|c| !c.value.is_zero()) {
                return Err(invalid(format!(
                    "call {index} carries value; executeBatch cannot transfer value"
                )));
            }
            let call = ISimpleAccount::executeBatchCall {
                dest: calls.iter().map(|c| c.target).collect(),
                func: calls.iter().map(|c| c.data.clone()).collect(),
            };
            Ok(Bytes::from(call.abi_encode()))
        }
    }
}

/// Inverse of [`encode_batch`]
pub fn decode_batch(call_data: &[u8]) -> Result<Vec<Call>> {
    let selector = call_data.get(..4).unwrap_or_default();

    if selector == ISimpleAccount::executeCall::SELECTOR {
        let decoded = ISimpleAccount::executeCall::abi_decode(call_data)
            .context("Call data is not a valid execute call")?;
        return Ok(vec![Call {
            target: decoded.dest,
            value: decoded.value,
            data: decoded.func,
        }]);
    }

    if selector == ISimpleAccount::executeBatchCall::SELECTOR {
        let decoded = ISimpleAccount::executeBatchCall::abi_decode(call_data)
            .context("Call data is not a valid executeBatch call")?;
        eyre::ensure!(
            decoded.dest.len() == decoded.func.len(),
            "executeBatch arrays differ in length"
        );
        return Ok(decoded
            .dest
            .into_iter()
            .zip(decoded.func)
            .map(|(target, data)| Call { target, value: U256::ZERO, data })
            .collect());
    }

    eyre::bail!("Call data is neither execute nor executeBatch")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{classify, PipelineError};
    use alloy::primitives::address;

    #[test]
    fn test_account_selectors() {
        // SimpleAccount v0.6
        assert_eq!(ISimpleAccount::executeCall::SELECTOR, [0xb6, 0x1d, 0x27, 0xf6]);
        assert_eq!(ISimpleAccount::executeBatchCall::SELECTOR, [0x18, 0xdf, 0xb3, 0xc7]);
    }

    #[test]
    fn test_batch_preserves_order() {
        let calls = vec![
            Call::new(address!("3333333333333333333333333333333333333333"), vec![0x03, 0x33]),
            Call::new(address!("1111111111111111111111111111111111111111"), vec![0x01]),
            Call::new(address!("2222222222222222222222222222222222222222"), vec![0x02, 0x22, 0x22]),
        ];

        let call_data = encode_batch(&calls).unwrap();
        assert_eq!(&call_data[..4], &ISimpleAccount::executeBatchCall::SELECTOR);

        let decoded = decode_batch(&call_data).unwrap();
        assert_eq!(decoded, calls);
        let targets: Vec<_> = decoded.iter().map(|c| c.target).collect();
        assert_eq!(
            targets,
            vec![
                address!("3333333333333333333333333333333333333333"),
                address!("1111111111111111111111111111111111111111"),
                address!("2222222222222222222222222222222222222222"),
            ]
        );
    }

    #[test]
    fn test_single_call_uses_execute_with_value() {
        let calls = vec![
            Call::new(address!("1111111111111111111111111111111111111111"), vec![0xaa])
                .with_value(U256::from(7)),
        ];

        let call_data = encode_batch(&calls).unwrap();
        assert_eq!(&call_data[..4], &ISimpleAccount::executeCall::SELECTOR);
        assert_eq!(decode_batch(&call_data).unwrap(), calls);
    }

    #[test]
    fn test_valued_batch_is_rejected() {
        let calls = vec![
            Call::new(address!("1111111111111111111111111111111111111111"), vec![0xaa]),
            Call::new(address!("2222222222222222222222222222222222222222"), Bytes::new())
                .with_value(U256::from(7)),
        ];

        let err = encode_batch(&calls).unwrap_err();
        assert!(matches!(classify(&err), Some(PipelineError::Validation(_))));
    }

    #[test]
    fn test_empty_batch_is_rejected() {
        assert!(encode_batch(&[]).is_err());
    }

    #[test]
    fn test_unknown_selector_is_rejected() {
        assert!(decode_batch(&[0xde, 0xad, 0xbe, 0xef]).is_err());
        assert!(decode_batch(&[]).is_err());
    }
}
