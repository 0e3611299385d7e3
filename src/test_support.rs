//! Fixtures shared by unit tests

use crate::command::CommandRequest;
use crate::config::NetworkConfig;
use crate::context::WalletContext;
use alloy::primitives::{address, Address};
use serde_json::json;

/// Standard address, program hash 0x21 followed by bytes 1..=20
pub const ADDRESS: &str = "EHFEaZFspRCXhkHP58q4wv8Ks29vhY28Rp";
/// Second standard address, program hash 0x21 followed by twenty 0xab
pub const OTHER_ADDRESS: &str = "EYochGYSdC8eFjeZ2Q1C1aL6rLbNZrWGta";
/// Council member CID
pub const CID: &str = "imaKV1yr9qxtgGVZYMVotNMQj3rzi3vpah";
/// DID identifier without the did:elastos: prefix
pub const DID: &str = "iUeKC869YJ4cK8prb1UnZQfQpQeKSAg2ma";
pub const OWNER_KEY: &str = "025f5f5f5f5f5f5f5f5f5f5f5f5f5f5f5f5f5f5f5f5f5f5f5f5f5f5f5f5f5f5f5f";
pub const HASH: &str = "9c9c9c9c9c9c9c9c9c9c9c9c9c9c9c9c3a3a3a3a3a3a3a3a3a3a3a3a3a3a3a3a";
pub const EVM_OWNER: Address = address!("00000000000000000000000000000000000000e1");

/// Route pipeline logs to the test harness output
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

pub fn standard_context() -> WalletContext {
    WalletContext::new("wallet-1", NetworkConfig::mainnet()).with_evm_owner(EVM_OWNER)
}

pub fn withdraw_request() -> CommandRequest {
    CommandRequest::new(
        "withdraw",
        json!({
            "amount": 500000000,
            "proposalHash": HASH,
            "ownerPublicKey": OWNER_KEY,
            "recipient": ADDRESS,
        }),
    )
}

/// One valid request per command kind
pub fn sample_requests() -> Vec<CommandRequest> {
    let common = |extra: serde_json::Value| {
        let mut data = json!({
            "categoryData": "",
            "ownerPublicKey": OWNER_KEY,
            "draftHash": HASH,
        });
        if let (Some(base), Some(extra)) = (data.as_object_mut(), extra.as_object()) {
            base.extend(extra.clone());
        }
        data
    };

    vec![
        CommandRequest::new(
            "normal-proposal",
            common(json!({
                "budgets": [{ "type": "NormalPayment", "stage": 0, "amount": "12.5" }],
                "recipient": ADDRESS,
            })),
        ),
        CommandRequest::new(
            "change-owner",
            common(json!({
                "targetProposalHash": HASH,
                "newRecipient": OTHER_ADDRESS,
            })),
        ),
        CommandRequest::new(
            "close-proposal",
            common(json!({ "targetProposalHash": HASH })),
        ),
        CommandRequest::new(
            "secretary-election",
            common(json!({
                "secretaryPublicKey": OWNER_KEY,
                "secretaryDid": format!("did:elastos:{DID}"),
            })),
        ),
        CommandRequest::new(
            "reserve-custom-id",
            common(json!({ "reservedCustomIdList": ["alice", "bob"] })),
        ),
        CommandRequest::new(
            "receive-custom-id",
            common(json!({
                "receivedCustomIdList": ["alice"],
                "receiverDid": DID,
            })),
        ),
        CommandRequest::new(
            "change-custom-id-fee",
            common(json!({
                "customIdFeeRateInfo": {
                    "rateOfCustomIdFee": "1000",
                    "eidEffectiveHeight": 1200000,
                },
            })),
        ),
        CommandRequest::new(
            "register-sidechain",
            common(json!({
                "sidechainInfo": {
                    "sideChainName": "ESC",
                    "magicNumber": 2017002,
                    "genesisHash": HASH,
                    "exchangeRate": "1",
                    "effectiveHeight": 1300000,
                    "resourcePath": "https://elastos.io",
                },
            })),
        ),
        withdraw_request(),
        CommandRequest::new(
            "impeachment",
            json!({
                "candidates": [{ "cid": CID, "amount": "10" }],
                "memo": "impeach",
            }),
        ),
        CommandRequest::new(
            "renewal-vote",
            json!({
                "renewals": [{
                    "referKey": HASH,
                    "candidate": OWNER_KEY,
                    "amount": 3,
                    "lockTime": 2000000,
                }],
            }),
        ),
        CommandRequest::new(
            "user-operation",
            json!({
                "calls": [{
                    "to": "0x1111111111111111111111111111111111111111",
                    "value": "1000",
                    "data": "0x",
                }],
            }),
        ),
    ]
}
