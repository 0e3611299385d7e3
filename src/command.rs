//! Incoming command requests and their typed variants

use crate::error::{invalid, PipelineError, Result};
use alloy::primitives::{Address, Bytes};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Raw request as it arrives from an intent or the UI
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandRequest {
    /// Correlation id of the originating intent, if any
    #[serde(default)]
    pub intent_id: Option<String>,
    /// Operation discriminator ("withdraw", "impeachment", ...)
    #[serde(rename = "type")]
    pub command_type: String,
    /// Variant-specific data bag
    #[serde(default)]
    pub data: serde_json::Value,
    /// Off-chain suggestion this command was created from
    #[serde(default)]
    pub suggestion_id: Option<String>,
}

impl CommandRequest {
    pub fn new(command_type: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            intent_id: None,
            command_type: command_type.into(),
            data,
            suggestion_id: None,
        }
    }

    pub fn with_intent_id(mut self, intent_id: impl Into<String>) -> Self {
        self.intent_id = Some(intent_id.into());
        self
    }

    pub fn with_suggestion_id(mut self, suggestion_id: impl Into<String>) -> Self {
        self.suggestion_id = Some(suggestion_id.into());
        self
    }

    /// Resolve the discriminator and decode the data bag into a typed command
    pub fn parse(&self) -> Result<Command> {
        let kind: CommandKind = self.command_type.parse()?;
        let data = &self.data;
        let command = match kind {
            CommandKind::NormalProposal => Command::NormalProposal(decode(kind, data)?),
            CommandKind::ChangeOwner => Command::ChangeOwner(decode(kind, data)?),
            CommandKind::CloseProposal => Command::CloseProposal(decode(kind, data)?),
            CommandKind::SecretaryElection => Command::SecretaryElection(decode(kind, data)?),
            CommandKind::ReserveCustomId => Command::ReserveCustomId(decode(kind, data)?),
            CommandKind::ReceiveCustomId => Command::ReceiveCustomId(decode(kind, data)?),
            CommandKind::ChangeCustomIdFee => Command::ChangeCustomIdFee(decode(kind, data)?),
            CommandKind::RegisterSidechain => Command::RegisterSidechain(decode(kind, data)?),
            CommandKind::Withdraw => Command::Withdraw(decode(kind, data)?),
            CommandKind::Impeachment => Command::Impeachment(decode(kind, data)?),
            CommandKind::RenewalVote => Command::RenewalVote(decode(kind, data)?),
            CommandKind::UserOperation => Command::UserOperation(decode(kind, data)?),
        };
        Ok(command)
    }
}

fn decode<T: DeserializeOwned>(kind: CommandKind, data: &serde_json::Value) -> Result<T> {
    T::deserialize(data).map_err(|e| invalid(format!("malformed {kind} data: {e}")))
}

/// Discriminator of a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    NormalProposal,
    ChangeOwner,
    CloseProposal,
    SecretaryElection,
    ReserveCustomId,
    ReceiveCustomId,
    ChangeCustomIdFee,
    RegisterSidechain,
    Withdraw,
    Impeachment,
    RenewalVote,
    UserOperation,
}

impl CommandKind {
    pub const ALL: [CommandKind; 12] = [
        CommandKind::NormalProposal,
        CommandKind::ChangeOwner,
        CommandKind::CloseProposal,
        CommandKind::SecretaryElection,
        CommandKind::ReserveCustomId,
        CommandKind::ReceiveCustomId,
        CommandKind::ChangeCustomIdFee,
        CommandKind::RegisterSidechain,
        CommandKind::Withdraw,
        CommandKind::Impeachment,
        CommandKind::RenewalVote,
        CommandKind::UserOperation,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CommandKind::NormalProposal => "normal-proposal",
            CommandKind::ChangeOwner => "change-owner",
            CommandKind::CloseProposal => "close-proposal",
            CommandKind::SecretaryElection => "secretary-election",
            CommandKind::ReserveCustomId => "reserve-custom-id",
            CommandKind::ReceiveCustomId => "receive-custom-id",
            CommandKind::ChangeCustomIdFee => "change-custom-id-fee",
            CommandKind::RegisterSidechain => "register-sidechain",
            CommandKind::Withdraw => "withdraw",
            CommandKind::Impeachment => "impeachment",
            CommandKind::RenewalVote => "renewal-vote",
            CommandKind::UserOperation => "user-operation",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommandKind {
    type Err = PipelineError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        CommandKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| PipelineError::UnsupportedCommandType(s.to_string()))
    }
}

/// A pending chain operation, one variant per operation kind
#[derive(Debug, Clone)]
pub enum Command {
    NormalProposal(NormalProposalData),
    ChangeOwner(ChangeOwnerData),
    CloseProposal(CloseProposalData),
    SecretaryElection(SecretaryElectionData),
    ReserveCustomId(ReserveCustomIdData),
    ReceiveCustomId(ReceiveCustomIdData),
    ChangeCustomIdFee(ChangeCustomIdFeeData),
    RegisterSidechain(RegisterSidechainData),
    Withdraw(WithdrawData),
    Impeachment(ImpeachmentData),
    RenewalVote(RenewalVoteData),
    UserOperation(UserOperationData),
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::NormalProposal(_) => CommandKind::NormalProposal,
            Command::ChangeOwner(_) => CommandKind::ChangeOwner,
            Command::CloseProposal(_) => CommandKind::CloseProposal,
            Command::SecretaryElection(_) => CommandKind::SecretaryElection,
            Command::ReserveCustomId(_) => CommandKind::ReserveCustomId,
            Command::ReceiveCustomId(_) => CommandKind::ReceiveCustomId,
            Command::ChangeCustomIdFee(_) => CommandKind::ChangeCustomIdFee,
            Command::RegisterSidechain(_) => CommandKind::RegisterSidechain,
            Command::Withdraw(_) => CommandKind::Withdraw,
            Command::Impeachment(_) => CommandKind::Impeachment,
            Command::RenewalVote(_) => CommandKind::RenewalVote,
            Command::UserOperation(_) => CommandKind::UserOperation,
        }
    }
}

/// Amount as sent by the caller: a JSON string or a JSON number.
///
/// Kept as its decimal text so conversion never goes through a float.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    Text(String),
    Number(serde_json::Number),
}

impl AmountInput {
    pub fn as_decimal(&self) -> String {
        match self {
            AmountInput::Text(text) => text.trim().to_string(),
            AmountInput::Number(number) => number.to_string(),
        }
    }
}

impl From<&str> for AmountInput {
    fn from(value: &str) -> Self {
        AmountInput::Text(value.to_string())
    }
}

/// Fields shared by every council proposal
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalCommon {
    #[serde(default)]
    pub category_data: String,
    pub owner_public_key: String,
    pub draft_hash: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetInput {
    /// "imprest", "normalpayment" or "finalpayment"
    #[serde(rename = "type")]
    pub budget_type: String,
    pub stage: u8,
    /// Display units (ELA)
    pub amount: AmountInput,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalProposalData {
    #[serde(flatten)]
    pub common: ProposalCommon,
    pub budgets: Vec<BudgetInput>,
    pub recipient: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeOwnerData {
    #[serde(flatten)]
    pub common: ProposalCommon,
    pub target_proposal_hash: String,
    #[serde(default)]
    pub new_recipient: Option<String>,
    #[serde(default)]
    pub new_owner_public_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseProposalData {
    #[serde(flatten)]
    pub common: ProposalCommon,
    pub target_proposal_hash: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretaryElectionData {
    #[serde(flatten)]
    pub common: ProposalCommon,
    pub secretary_public_key: String,
    pub secretary_did: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReserveCustomIdData {
    #[serde(flatten)]
    pub common: ProposalCommon,
    pub reserved_custom_id_list: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiveCustomIdData {
    #[serde(flatten)]
    pub common: ProposalCommon,
    pub received_custom_id_list: Vec<String>,
    pub receiver_did: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomIdFeeRateInput {
    /// Base units
    pub rate_of_custom_id_fee: AmountInput,
    #[serde(rename = "eidEffectiveHeight")]
    pub eid_effective_height: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeCustomIdFeeData {
    #[serde(flatten)]
    pub common: ProposalCommon,
    pub custom_id_fee_rate_info: CustomIdFeeRateInput,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SidechainInfoInput {
    pub side_chain_name: String,
    pub magic_number: u32,
    pub genesis_hash: String,
    /// Display units, 8 decimals
    pub exchange_rate: AmountInput,
    pub effective_height: u32,
    #[serde(default)]
    pub resource_path: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterSidechainData {
    #[serde(flatten)]
    pub common: ProposalCommon,
    pub sidechain_info: SidechainInfoInput,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawData {
    pub proposal_hash: String,
    pub owner_public_key: String,
    pub recipient: String,
    /// Base units (sela)
    pub amount: AmountInput,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteCandidateInput {
    /// Council member CID
    pub cid: String,
    /// Display units (ELA)
    pub amount: AmountInput,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpeachmentData {
    pub candidates: Vec<VoteCandidateInput>,
    #[serde(default)]
    pub memo: Option<String>,
    #[serde(default)]
    pub timestamp: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenewalInput {
    /// Hash of the vote being renewed
    pub refer_key: String,
    /// Producer node public key
    pub candidate: String,
    /// Display units (ELA)
    pub amount: AmountInput,
    pub lock_time: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenewalVoteData {
    pub renewals: Vec<RenewalInput>,
    #[serde(default)]
    pub memo: Option<String>,
    #[serde(default)]
    pub timestamp: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallInput {
    pub to: Address,
    /// Wei, decimal or 0x-hex
    #[serde(default)]
    pub value: Option<AmountInput>,
    #[serde(default)]
    pub data: Option<Bytes>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperationData {
    pub calls: Vec<CallInput>,
    /// Smart account address; derived from the owner when absent
    #[serde(default)]
    pub sender: Option<Address>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::classify;
    use serde_json::json;

    #[test]
    fn test_parse_withdraw_request() {
        let request: CommandRequest = serde_json::from_value(json!({
            "intentId": "intent-1",
            "type": "withdraw",
            "data": {
                "amount": 500000000,
                "proposalHash": "0xabc",
                "ownerPublicKey": "02ab",
                "recipient": "EHFEaZFspRCXhkHP58q4wv8Ks29vhY28Rp"
            },
            "suggestionId": "s-9"
        }))
        .unwrap();

        assert_eq!(request.intent_id.as_deref(), Some("intent-1"));
        assert_eq!(request.suggestion_id.as_deref(), Some("s-9"));

        let Command::Withdraw(data) = request.parse().unwrap() else {
            panic!("expected withdraw");
        };
        assert_eq!(data.amount.as_decimal(), "500000000");
        assert_eq!(data.proposal_hash, "0xabc");
    }

    #[test]
    fn test_unknown_type_is_unsupported() {
        let request = CommandRequest::new("crcouncilmemberclaimnode", json!({}));
        let err = request.parse().unwrap_err();
        assert!(matches!(
            classify(&err),
            Some(PipelineError::UnsupportedCommandType(t)) if t == "crcouncilmemberclaimnode"
        ));
    }

    #[test]
    fn test_malformed_data_is_validation_error() {
        let request = CommandRequest::new("withdraw", json!({ "amount": 1 }));
        let err = request.parse().unwrap_err();
        assert!(matches!(classify(&err), Some(PipelineError::Validation(_))));
    }

    #[test]
    fn test_kind_round_trips_through_str() {
        for kind in CommandKind::ALL {
            assert_eq!(kind.as_str().parse::<CommandKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_flattened_proposal_fields() {
        let request = CommandRequest::new(
            "close-proposal",
            json!({
                "categoryData": "close",
                "ownerPublicKey": "02ab",
                "draftHash": "11",
                "targetProposalHash": "22"
            }),
        );
        let Command::CloseProposal(data) = request.parse().unwrap() else {
            panic!("expected close-proposal");
        };
        assert_eq!(data.common.category_data, "close");
        assert_eq!(data.target_proposal_hash, "22");
        assert_eq!(request.parse().unwrap().kind(), CommandKind::CloseProposal);
    }

    #[test]
    fn test_amount_input_keeps_decimal_text() {
        let amount: AmountInput = serde_json::from_value(json!(1.25)).unwrap();
        assert_eq!(amount.as_decimal(), "1.25");
        let amount: AmountInput = serde_json::from_value(json!(" 7 ")).unwrap();
        assert_eq!(amount.as_decimal(), "7");
    }
}
