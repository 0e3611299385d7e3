//! Signing digests for chain payloads
//!
//! Each payload family has its own scheme. The digest is the SHA-256 of the
//! canonical unsigned encoding, shown in reversed byte order like every other
//! 32-byte hash on the ELA main chain.

use crate::encoding::{sha256, ElaWriter};
use crate::error::{PipelineError, Result};
use crate::types::Payload;
use alloy::primitives::{hex, B256};
use std::fmt;

/// Digest function selected by payload variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestScheme {
    /// Owner signature over a council proposal
    ProposalOwner,
    /// Owner signature over a budget withdrawal
    Withdraw,
    /// Voter signature over vote contents
    Vote,
}

impl DigestScheme {
    pub fn of(payload: &Payload) -> Self {
        match payload {
            Payload::NormalProposal(_)
            | Payload::ChangeOwner(_)
            | Payload::CloseProposal(_)
            | Payload::SecretaryElection(_)
            | Payload::ReserveCustomId(_)
            | Payload::ReceiveCustomId(_)
            | Payload::ChangeCustomIdFee(_)
            | Payload::RegisterSidechain(_) => DigestScheme::ProposalOwner,
            Payload::Withdraw(_) => DigestScheme::Withdraw,
            Payload::Impeachment(_) | Payload::RenewalVote(_) => DigestScheme::Vote,
        }
    }

    fn domain(self) -> &'static [u8] {
        match self {
            // Proposal encodings already lead with their type code
            DigestScheme::ProposalOwner => b"",
            DigestScheme::Withdraw => b"CRCProposalWithdraw",
            DigestScheme::Vote => b"Voting",
        }
    }
}

/// 32-byte digest in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest(pub B256);

impl Digest {
    /// Hex without 0x prefix, as handed to the signer
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Compute the signing digest of a payload
pub fn compute_digest(payload: &Payload) -> Result<Digest> {
    let scheme = DigestScheme::of(payload);
    let mut w = ElaWriter::new();
    w.write_bytes(scheme.domain());
    payload.encode_unsigned(&mut w).map_err(|e| {
        PipelineError::DigestComputation(format!("{} payload: {e}", payload.kind()))
    })?;

    let mut hash = sha256(w.as_bytes());
    hash.reverse();
    Ok(Digest(B256::from(hash)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::PayloadBuilder;
    use crate::error::classify;
    use crate::test_support::{sample_requests, standard_context};
    use crate::types::WithdrawPayload;

    fn payloads() -> Vec<Payload> {
        let context = standard_context();
        sample_requests()
            .into_iter()
            .filter(|request| request.command_type != "user-operation")
            .map(|request| {
                let command = request.parse().unwrap();
                PayloadBuilder::new().build(&command, &context).unwrap()
            })
            .collect()
    }

    #[test]
    fn test_digest_is_deterministic_for_every_kind() {
        for payload in payloads() {
            let first = compute_digest(&payload).unwrap();
            let second = compute_digest(&payload.clone()).unwrap();
            assert_eq!(first, second, "{} digest changed", payload.kind());
            assert_eq!(first.to_hex().len(), 64);
        }
    }

    #[test]
    fn test_digests_differ_between_kinds() {
        let digests: Vec<_> = payloads()
            .iter()
            .map(|p| compute_digest(p).unwrap())
            .collect();
        for (i, a) in digests.iter().enumerate() {
            for b in &digests[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_digest_binds_amount() {
        let Payload::Withdraw(base) = payloads()
            .into_iter()
            .find(|p| matches!(p, Payload::Withdraw(_)))
            .unwrap()
        else {
            unreachable!()
        };
        let changed = WithdrawPayload {
            amount: "500000001".into(),
            ..base.clone()
        };
        assert_ne!(
            compute_digest(&Payload::Withdraw(base)).unwrap(),
            compute_digest(&Payload::Withdraw(changed)).unwrap()
        );
    }

    #[test]
    fn test_malformed_payload_is_digest_error() {
        let payload = Payload::Withdraw(WithdrawPayload {
            proposal_hash: "0xabc".into(),
            owner_public_key: "02ab".into(),
            recipient: "EHFEaZFspRCXhkHP58q4wv8Ks29vhY28Rp".into(),
            amount: "500000000".into(),
        });
        let err = compute_digest(&payload).unwrap_err();
        assert!(matches!(
            classify(&err),
            Some(PipelineError::DigestComputation(msg)) if msg.starts_with("withdraw payload")
        ));
    }
}
