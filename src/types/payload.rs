//! Chain payloads produced by the payload builder

use crate::command::CommandKind;
use crate::encoding::ElaWriter;
use crate::error::Result;
use serde::Serialize;

/// Council proposal type codes
pub mod proposal_type {
    pub const NORMAL: u16 = 0x0000;
    pub const SECRETARY_GENERAL: u16 = 0x0400;
    pub const CHANGE_PROPOSAL_OWNER: u16 = 0x0401;
    pub const CLOSE_PROPOSAL: u16 = 0x0402;
    pub const REGISTER_SIDECHAIN: u16 = 0x0410;
    pub const RESERVE_CUSTOM_ID: u16 = 0x0500;
    pub const RECEIVE_CUSTOM_ID: u16 = 0x0501;
    pub const CHANGE_CUSTOM_ID_FEE: u16 = 0x0502;
}

/// Vote content type for council impeachment
pub const VOTE_TYPE_CRC_IMPEACHMENT: u8 = 0x03;

/// Marker written ahead of renewal vote contents
pub const RENEWAL_VOTE_VERSION: u8 = 0x01;

/// Fields every proposal starts with
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProposalHeader {
    #[serde(rename = "Type")]
    pub proposal_type: u16,
    pub category_data: String,
    pub owner_public_key: String,
    pub draft_hash: String,
}

impl ProposalHeader {
    fn encode(&self, w: &mut ElaWriter) -> Result<()> {
        w.write_u16(self.proposal_type)
            .write_var_string(&self.category_data)
            .write_public_key(&self.owner_public_key)?
            .write_hash(&self.draft_hash)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BudgetType {
    Imprest = 0x00,
    NormalPayment = 0x01,
    FinalPayment = 0x02,
}

impl BudgetType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "imprest" => Some(BudgetType::Imprest),
            "normalpayment" => Some(BudgetType::NormalPayment),
            "finalpayment" => Some(BudgetType::FinalPayment),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Budget {
    #[serde(rename = "Type")]
    pub budget_type: u8,
    pub stage: u8,
    /// Sela, decimal string
    pub amount: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct NormalProposalPayload {
    #[serde(flatten)]
    pub header: ProposalHeader,
    pub budgets: Vec<Budget>,
    pub recipient: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChangeOwnerPayload {
    #[serde(flatten)]
    pub header: ProposalHeader,
    pub target_proposal_hash: String,
    pub new_recipient: String,
    pub new_owner_public_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CloseProposalPayload {
    #[serde(flatten)]
    pub header: ProposalHeader,
    pub target_proposal_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SecretaryElectionPayload {
    #[serde(flatten)]
    pub header: ProposalHeader,
    #[serde(rename = "SecretaryGeneralPublicKey")]
    pub secretary_public_key: String,
    #[serde(rename = "SecretaryGeneralDID")]
    pub secretary_did: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReserveCustomIdPayload {
    #[serde(flatten)]
    pub header: ProposalHeader,
    #[serde(rename = "ReservedCustomIDList")]
    pub reserved_custom_id_list: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReceiveCustomIdPayload {
    #[serde(flatten)]
    pub header: ProposalHeader,
    #[serde(rename = "ReceivedCustomIDList")]
    pub received_custom_id_list: Vec<String>,
    #[serde(rename = "ReceiverDID")]
    pub receiver_did: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CustomIdFeeRateInfo {
    /// Sela, decimal string
    #[serde(rename = "RateOfCustomIDFee")]
    pub rate_of_custom_id_fee: String,
    #[serde(rename = "EIDEffectiveHeight")]
    pub eid_effective_height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChangeCustomIdFeePayload {
    #[serde(flatten)]
    pub header: ProposalHeader,
    #[serde(rename = "CustomIDFeeRateInfo")]
    pub fee_rate_info: CustomIdFeeRateInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SidechainInfo {
    pub side_chain_name: String,
    pub magic_number: u32,
    pub genesis_hash: String,
    /// Scaled by 10^8, decimal string
    pub exchange_rate: String,
    pub effective_height: u32,
    pub resource_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RegisterSidechainPayload {
    #[serde(flatten)]
    pub header: ProposalHeader,
    #[serde(rename = "SideChainInfo")]
    pub sidechain_info: SidechainInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct WithdrawPayload {
    pub proposal_hash: String,
    pub owner_public_key: String,
    pub recipient: String,
    /// Sela, decimal string
    pub amount: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct VoteCandidate {
    /// Council member CID
    pub candidate: String,
    /// Sela, decimal string
    pub votes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ImpeachmentPayload {
    pub vote_type: u8,
    pub candidates: Vec<VoteCandidate>,
    pub timestamp: u64,
    pub memo: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RenewalVote {
    pub refer_key: String,
    pub candidate: String,
    /// Sela, decimal string
    pub votes: String,
    pub lock_time: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RenewalVotePayload {
    pub renewal_votes: Vec<RenewalVote>,
    pub timestamp: u64,
    pub memo: String,
}

/// Chain payload, one variant per classic command kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    NormalProposal(NormalProposalPayload),
    ChangeOwner(ChangeOwnerPayload),
    CloseProposal(CloseProposalPayload),
    SecretaryElection(SecretaryElectionPayload),
    ReserveCustomId(ReserveCustomIdPayload),
    ReceiveCustomId(ReceiveCustomIdPayload),
    ChangeCustomIdFee(ChangeCustomIdFeePayload),
    RegisterSidechain(RegisterSidechainPayload),
    Withdraw(WithdrawPayload),
    Impeachment(ImpeachmentPayload),
    RenewalVote(RenewalVotePayload),
}

impl Payload {
    pub fn kind(&self) -> CommandKind {
        match self {
            Payload::NormalProposal(_) => CommandKind::NormalProposal,
            Payload::ChangeOwner(_) => CommandKind::ChangeOwner,
            Payload::CloseProposal(_) => CommandKind::CloseProposal,
            Payload::SecretaryElection(_) => CommandKind::SecretaryElection,
            Payload::ReserveCustomId(_) => CommandKind::ReserveCustomId,
            Payload::ReceiveCustomId(_) => CommandKind::ReceiveCustomId,
            Payload::ChangeCustomIdFee(_) => CommandKind::ChangeCustomIdFee,
            Payload::RegisterSidechain(_) => CommandKind::RegisterSidechain,
            Payload::Withdraw(_) => CommandKind::Withdraw,
            Payload::Impeachment(_) => CommandKind::Impeachment,
            Payload::RenewalVote(_) => CommandKind::RenewalVote,
        }
    }

    /// Canonical encoding of everything the signature covers
    pub fn encode_unsigned(&self, w: &mut ElaWriter) -> Result<()> {
        match self {
            Payload::NormalProposal(p) => {
                p.header.encode(w)?;
                w.write_var_uint(p.budgets.len() as u64);
                for budget in &p.budgets {
                    w.write_u8(budget.budget_type)
                        .write_u8(budget.stage)
                        .write_u64(parse_sela(&budget.amount)?);
                }
                w.write_address(&p.recipient)?;
            }
            Payload::ChangeOwner(p) => {
                p.header.encode(w)?;
                w.write_hash(&p.target_proposal_hash)?;
                if p.new_recipient.is_empty() {
                    w.write_bytes(&[0u8; crate::encoding::PROGRAM_HASH_LEN]);
                } else {
                    w.write_address(&p.new_recipient)?;
                }
                if p.new_owner_public_key.is_empty() {
                    w.write_var_bytes(&[]);
                } else {
                    w.write_public_key(&p.new_owner_public_key)?;
                }
            }
            Payload::CloseProposal(p) => {
                p.header.encode(w)?;
                w.write_hash(&p.target_proposal_hash)?;
            }
            Payload::SecretaryElection(p) => {
                p.header.encode(w)?;
                w.write_public_key(&p.secretary_public_key)?
                    .write_did(&p.secretary_did)?;
            }
            Payload::ReserveCustomId(p) => {
                p.header.encode(w)?;
                write_string_list(w, &p.reserved_custom_id_list);
            }
            Payload::ReceiveCustomId(p) => {
                p.header.encode(w)?;
                write_string_list(w, &p.received_custom_id_list);
                w.write_did(&p.receiver_did)?;
            }
            Payload::ChangeCustomIdFee(p) => {
                p.header.encode(w)?;
                w.write_u64(parse_sela(&p.fee_rate_info.rate_of_custom_id_fee)?)
                    .write_u32(p.fee_rate_info.eid_effective_height);
            }
            Payload::RegisterSidechain(p) => {
                p.header.encode(w)?;
                let info = &p.sidechain_info;
                w.write_var_string(&info.side_chain_name)
                    .write_u32(info.magic_number)
                    .write_hash(&info.genesis_hash)?
                    .write_u64(parse_sela(&info.exchange_rate)?)
                    .write_u32(info.effective_height)
                    .write_var_string(&info.resource_path);
            }
            Payload::Withdraw(p) => {
                w.write_hash(&p.proposal_hash)?
                    .write_public_key(&p.owner_public_key)?
                    .write_address(&p.recipient)?
                    .write_u64(parse_sela(&p.amount)?);
            }
            Payload::Impeachment(p) => {
                w.write_u8(p.vote_type)
                    .write_var_uint(p.candidates.len() as u64);
                for candidate in &p.candidates {
                    w.write_address(&candidate.candidate)?
                        .write_u64(parse_sela(&candidate.votes)?);
                }
                w.write_u64(p.timestamp).write_var_string(&p.memo);
            }
            Payload::RenewalVote(p) => {
                w.write_u8(RENEWAL_VOTE_VERSION)
                    .write_var_uint(p.renewal_votes.len() as u64);
                for vote in &p.renewal_votes {
                    w.write_hash(&vote.refer_key)?
                        .write_public_key(&vote.candidate)?
                        .write_u64(parse_sela(&vote.votes)?)
                        .write_u32(vote.lock_time);
                }
                w.write_u64(p.timestamp).write_var_string(&p.memo);
            }
        }
        Ok(())
    }
}

fn write_string_list(w: &mut ElaWriter, items: &[String]) {
    w.write_var_uint(items.len() as u64);
    for item in items {
        w.write_var_string(item);
    }
}

fn parse_sela(amount: &str) -> Result<u64> {
    amount
        .parse()
        .map_err(|_| crate::error::eyre!("amount {amount:?} is not a base-unit integer"))
}

/// Payload with the externally produced signature attached
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedPayload {
    pub payload: Payload,
    /// Digest that was signed, display hex
    pub digest: String,
    /// Signature hex as returned by the signer
    pub signature: String,
}

/// Transaction type codes on the ELA main chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TxKind {
    CrcProposal = 0x25,
    CrcProposalWithdraw = 0x29,
    Voting = 0x63,
}

impl TxKind {
    pub fn of(payload: &Payload) -> Self {
        match payload {
            Payload::NormalProposal(_)
            | Payload::ChangeOwner(_)
            | Payload::CloseProposal(_)
            | Payload::SecretaryElection(_)
            | Payload::ReserveCustomId(_)
            | Payload::ReceiveCustomId(_)
            | Payload::ChangeCustomIdFee(_)
            | Payload::RegisterSidechain(_) => TxKind::CrcProposal,
            Payload::Withdraw(_) => TxKind::CrcProposalWithdraw,
            Payload::Impeachment(_) | Payload::RenewalVote(_) => TxKind::Voting,
        }
    }
}

/// Chain-encoded transaction, immutable once produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTransaction {
    pub kind: TxKind,
    hex: String,
}

impl RawTransaction {
    pub fn new(kind: TxKind, bytes: &[u8]) -> Self {
        Self {
            kind,
            hex: alloy::primitives::hex::encode(bytes),
        }
    }

    pub fn hex(&self) -> &str {
        &self.hex
    }
}
