//! Payload and user operation types

pub mod payload;
pub mod user_operation;

pub use payload::{
    Budget, BudgetType, ChangeCustomIdFeePayload, ChangeOwnerPayload, CloseProposalPayload,
    CustomIdFeeRateInfo, ImpeachmentPayload, NormalProposalPayload, Payload, ProposalHeader,
    RawTransaction, ReceiveCustomIdPayload, RegisterSidechainPayload, RenewalVote,
    RenewalVotePayload, ReserveCustomIdPayload, SecretaryElectionPayload, SidechainInfo,
    SignedPayload, TxKind, VoteCandidate, WithdrawPayload, RENEWAL_VOTE_VERSION,
    VOTE_TYPE_CRC_IMPEACHMENT,
};
pub use user_operation::{
    Call, FeeEstimate, GasEstimate, TransactionReceiptInfo, UserOperation, UserOperationReceipt,
};
