//! Payload builder: typed command + wallet snapshot → chain payload

use crate::command::{
    BudgetInput, ChangeCustomIdFeeData, ChangeOwnerData, Command, ImpeachmentData,
    NormalProposalData, ProposalCommon, RegisterSidechainData, RenewalVoteData, WithdrawData,
};
use crate::constants::{check_sela, parse_ela, scale_to_decimals, ELA_DECIMALS};
use crate::context::WalletContext;
use crate::encoding::{decode_hex, is_valid_address, PUBLIC_KEY_LEN};
use crate::error::{invalid, PipelineError, Result};
use crate::types::payload::proposal_type;
use crate::types::{
    Budget, BudgetType, ChangeCustomIdFeePayload, ChangeOwnerPayload, CloseProposalPayload,
    CustomIdFeeRateInfo, ImpeachmentPayload, NormalProposalPayload, Payload, ProposalHeader,
    ReceiveCustomIdPayload, RegisterSidechainPayload, RenewalVote, RenewalVotePayload,
    ReserveCustomIdPayload, SecretaryElectionPayload, SidechainInfo, VoteCandidate,
    WithdrawPayload, VOTE_TYPE_CRC_IMPEACHMENT,
};

/// Maps each command variant to its payload shape
#[derive(Debug, Clone, Copy, Default)]
pub struct PayloadBuilder;

impl PayloadBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Build the payload for a classic command.
    ///
    /// Reads nothing but its arguments. User operations have no classic
    /// payload and are reported as unsupported here.
    pub fn build(&self, command: &Command, wallet: &WalletContext) -> Result<Payload> {
        let payload = match command {
            Command::NormalProposal(data) => Payload::NormalProposal(normal_proposal(data)?),
            Command::ChangeOwner(data) => Payload::ChangeOwner(change_owner(data)?),
            Command::CloseProposal(data) => Payload::CloseProposal(CloseProposalPayload {
                header: header(proposal_type::CLOSE_PROPOSAL, &data.common)?,
                target_proposal_hash: hash("targetProposalHash", &data.target_proposal_hash)?,
            }),
            Command::SecretaryElection(data) => {
                Payload::SecretaryElection(SecretaryElectionPayload {
                    header: header(proposal_type::SECRETARY_GENERAL, &data.common)?,
                    secretary_public_key: public_key(
                        "secretaryPublicKey",
                        &data.secretary_public_key,
                    )?,
                    secretary_did: required("secretaryDid", &data.secretary_did)?,
                })
            }
            Command::ReserveCustomId(data) => Payload::ReserveCustomId(ReserveCustomIdPayload {
                header: header(proposal_type::RESERVE_CUSTOM_ID, &data.common)?,
                reserved_custom_id_list: non_empty_list(
                    "reservedCustomIdList",
                    &data.reserved_custom_id_list,
                )?,
            }),
            Command::ReceiveCustomId(data) => Payload::ReceiveCustomId(ReceiveCustomIdPayload {
                header: header(proposal_type::RECEIVE_CUSTOM_ID, &data.common)?,
                received_custom_id_list: non_empty_list(
                    "receivedCustomIdList",
                    &data.received_custom_id_list,
                )?,
                receiver_did: required("receiverDid", &data.receiver_did)?,
            }),
            Command::ChangeCustomIdFee(data) => {
                Payload::ChangeCustomIdFee(change_custom_id_fee(data)?)
            }
            Command::RegisterSidechain(data) => {
                Payload::RegisterSidechain(register_sidechain(data)?)
            }
            Command::Withdraw(data) => Payload::Withdraw(withdraw(data)?),
            Command::Impeachment(data) => {
                ensure_can_vote(wallet)?;
                Payload::Impeachment(impeachment(data)?)
            }
            Command::RenewalVote(data) => {
                ensure_can_vote(wallet)?;
                Payload::RenewalVote(renewal_vote(data)?)
            }
            Command::UserOperation(_) => {
                return Err(PipelineError::UnsupportedCommandType(
                    command.kind().as_str().to_string(),
                )
                .into())
            }
        };

        tracing::debug!("Built {} payload for wallet {}", command.kind(), wallet.wallet_id);
        Ok(payload)
    }
}

fn header(proposal_type: u16, common: &ProposalCommon) -> Result<ProposalHeader> {
    Ok(ProposalHeader {
        proposal_type,
        category_data: common.category_data.clone(),
        owner_public_key: public_key("ownerPublicKey", &common.owner_public_key)?,
        draft_hash: hash("draftHash", &common.draft_hash)?,
    })
}

fn required(field: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(invalid(format!("{field} is required")));
    }
    Ok(value.to_string())
}

fn non_empty_list(field: &str, items: &[String]) -> Result<Vec<String>> {
    if items.is_empty() {
        return Err(invalid(format!("{field} must not be empty")));
    }
    items.iter().map(|item| required(field, item)).collect()
}

fn address(field: &str, value: &str) -> Result<String> {
    let value = required(field, value)?;
    if !is_valid_address(&value) {
        return Err(invalid(format!("{field} {value:?} is not a valid address")));
    }
    Ok(value)
}

/// 32-byte hash in hex
fn hash(field: &str, value: &str) -> Result<String> {
    let value = required(field, value)?;
    match decode_hex(&value) {
        Ok(bytes) if bytes.len() == 32 => Ok(value),
        Ok(bytes) => Err(invalid(format!(
            "{field} must be 32 bytes, got {}",
            bytes.len()
        ))),
        Err(_) => Err(invalid(format!("{field} {value:?} is not valid hex"))),
    }
}

/// Compressed secp256r1 public key in hex
fn public_key(field: &str, value: &str) -> Result<String> {
    let value = required(field, value)?;
    let bytes =
        decode_hex(&value).map_err(|_| invalid(format!("{field} {value:?} is not valid hex")))?;
    if bytes.len() != PUBLIC_KEY_LEN || !matches!(bytes[0], 0x02 | 0x03) {
        return Err(invalid(format!(
            "{field} must be a {PUBLIC_KEY_LEN}-byte compressed public key"
        )));
    }
    Ok(value)
}

fn ensure_can_vote(wallet: &WalletContext) -> Result<()> {
    if !wallet.wallet_type.can_vote() {
        return Err(invalid(format!(
            "{:?} wallets cannot vote",
            wallet.wallet_type
        )));
    }
    Ok(())
}

fn budget(input: &BudgetInput) -> Result<Budget> {
    let budget_type = BudgetType::parse(&input.budget_type)
        .ok_or_else(|| invalid(format!("unknown budget type {:?}", input.budget_type)))?;
    let sela = parse_ela(&input.amount.as_decimal())?;
    Ok(Budget {
        budget_type: budget_type as u8,
        stage: input.stage,
        amount: sela.to_string(),
    })
}

fn normal_proposal(data: &NormalProposalData) -> Result<NormalProposalPayload> {
    if data.budgets.is_empty() {
        return Err(invalid("a proposal needs at least one budget"));
    }
    let budgets = data.budgets.iter().map(budget).collect::<Result<Vec<_>>>()?;
    Ok(NormalProposalPayload {
        header: header(proposal_type::NORMAL, &data.common)?,
        budgets,
        recipient: address("recipient", &data.recipient)?,
    })
}

fn change_owner(data: &ChangeOwnerData) -> Result<ChangeOwnerPayload> {
    let new_recipient = match data.new_recipient.as_deref() {
        Some(recipient) if !recipient.trim().is_empty() => address("newRecipient", recipient)?,
        _ => String::new(),
    };
    let new_owner_public_key = match data.new_owner_public_key.as_deref() {
        Some(key) if !key.trim().is_empty() => public_key("newOwnerPublicKey", key)?,
        _ => String::new(),
    };
    if new_recipient.is_empty() && new_owner_public_key.is_empty() {
        return Err(invalid(
            "change-owner needs a new recipient or a new owner public key",
        ));
    }

    Ok(ChangeOwnerPayload {
        header: header(proposal_type::CHANGE_PROPOSAL_OWNER, &data.common)?,
        target_proposal_hash: hash("targetProposalHash", &data.target_proposal_hash)?,
        new_recipient,
        new_owner_public_key,
    })
}

fn change_custom_id_fee(data: &ChangeCustomIdFeeData) -> Result<ChangeCustomIdFeePayload> {
    let info = &data.custom_id_fee_rate_info;
    let rate = scale_to_decimals(&info.rate_of_custom_id_fee.as_decimal(), 0)?;
    Ok(ChangeCustomIdFeePayload {
        header: header(proposal_type::CHANGE_CUSTOM_ID_FEE, &data.common)?,
        fee_rate_info: CustomIdFeeRateInfo {
            rate_of_custom_id_fee: rate.to_string(),
            eid_effective_height: info.eid_effective_height,
        },
    })
}

fn register_sidechain(data: &RegisterSidechainData) -> Result<RegisterSidechainPayload> {
    let info = &data.sidechain_info;
    let exchange_rate = scale_to_decimals(&info.exchange_rate.as_decimal(), ELA_DECIMALS)?;
    if exchange_rate == 0 {
        return Err(invalid("exchangeRate must be positive"));
    }
    Ok(RegisterSidechainPayload {
        header: header(proposal_type::REGISTER_SIDECHAIN, &data.common)?,
        sidechain_info: SidechainInfo {
            side_chain_name: required("sideChainName", &info.side_chain_name)?,
            magic_number: info.magic_number,
            genesis_hash: hash("genesisHash", &info.genesis_hash)?,
            exchange_rate: exchange_rate.to_string(),
            effective_height: info.effective_height,
            resource_path: info.resource_path.clone(),
        },
    })
}

fn withdraw(data: &WithdrawData) -> Result<WithdrawPayload> {
    // Withdraw amounts already arrive in sela
    let sela = check_sela(scale_to_decimals(&data.amount.as_decimal(), 0)?)?;
    Ok(WithdrawPayload {
        proposal_hash: hash("proposalHash", &data.proposal_hash)?,
        owner_public_key: public_key("ownerPublicKey", &data.owner_public_key)?,
        recipient: address("recipient", &data.recipient)?,
        amount: sela.to_string(),
    })
}

fn impeachment(data: &ImpeachmentData) -> Result<ImpeachmentPayload> {
    if data.candidates.is_empty() {
        return Err(invalid("no candidates to vote for"));
    }
    let candidates = data
        .candidates
        .iter()
        .map(|c| {
            Ok(VoteCandidate {
                candidate: address("cid", &c.cid)?,
                votes: parse_ela(&c.amount.as_decimal())?.to_string(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(ImpeachmentPayload {
        vote_type: VOTE_TYPE_CRC_IMPEACHMENT,
        candidates,
        timestamp: data.timestamp.unwrap_or(0),
        memo: data.memo.clone().unwrap_or_default(),
    })
}

fn renewal_vote(data: &RenewalVoteData) -> Result<RenewalVotePayload> {
    if data.renewals.is_empty() {
        return Err(invalid("no votes to renew"));
    }
    let renewal_votes = data
        .renewals
        .iter()
        .map(|r| {
            Ok(RenewalVote {
                refer_key: hash("referKey", &r.refer_key)?,
                candidate: public_key("candidate", &r.candidate)?,
                votes: parse_ela(&r.amount.as_decimal())?.to_string(),
                lock_time: r.lock_time,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(RenewalVotePayload {
        renewal_votes,
        timestamp: data.timestamp.unwrap_or(0),
        memo: data.memo.clone().unwrap_or_default(),
    })
}
