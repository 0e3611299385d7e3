//! Top-level command handler
//!
//! `CommandPipeline::process` is the only place errors are turned into user
//! feedback and intent responses. Every stage below it returns `Result`.

use crate::aa::{NoAccountAbstraction, UserOpOutcome, UserOpRequest, UserOpRunner};
use crate::builder::PayloadBuilder;
use crate::command::{Command, CommandRequest};
use crate::config::SignerConfig;
use crate::context::{ActiveContext, WalletLocks};
use crate::coordinator::SignatureCoordinator;
use crate::error::{classify, presentation_of, Presentation, Result};
use crate::intent::{Feedback, IntentResponder, IntentResponse, TracingFeedback};
use crate::signer::{DigestSigner, RequestMeta};
use crate::submitter::{Broadcaster, TransactionSubmitter, TxResult};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// How a command ended
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    /// Classic transaction accepted by the node
    Broadcast(TxResult),
    /// User operation submitted; mined or still pending
    UserOperation(UserOpOutcome),
    /// User dismissed signing, the signer timed out, or the caller cancelled
    Cancelled,
    Failed {
        message: String,
        presentation: Presentation,
    },
}

pub struct CommandPipeline<S, B, A = NoAccountAbstraction> {
    builder: PayloadBuilder,
    coordinator: SignatureCoordinator<S>,
    submitter: TransactionSubmitter<B>,
    aa: A,
    active: ActiveContext,
    locks: WalletLocks,
    responder: Option<Arc<dyn IntentResponder>>,
    feedback: Arc<dyn Feedback>,
}

impl<S: DigestSigner, B: Broadcaster> CommandPipeline<S, B> {
    pub fn new(signer: S, broadcaster: B, active: ActiveContext, signer_config: SignerConfig) -> Self {
        Self {
            builder: PayloadBuilder::new(),
            coordinator: SignatureCoordinator::new(signer, signer_config),
            submitter: TransactionSubmitter::new(broadcaster),
            aa: NoAccountAbstraction,
            active,
            locks: WalletLocks::new(),
            responder: None,
            feedback: Arc::new(TracingFeedback),
        }
    }
}

impl<S: DigestSigner, B: Broadcaster, A: UserOpRunner> CommandPipeline<S, B, A> {
    /// Route `user-operation` commands through `aa`
    pub fn with_account_abstraction<A2: UserOpRunner>(self, aa: A2) -> CommandPipeline<S, B, A2> {
        CommandPipeline {
            builder: self.builder,
            coordinator: self.coordinator,
            submitter: self.submitter,
            aa,
            active: self.active,
            locks: self.locks,
            responder: self.responder,
            feedback: self.feedback,
        }
    }

    pub fn with_responder(mut self, responder: Arc<dyn IntentResponder>) -> Self {
        self.responder = Some(responder);
        self
    }

    pub fn with_feedback(mut self, feedback: Arc<dyn Feedback>) -> Self {
        self.feedback = feedback;
        self
    }

    /// Share wallet locks with other pipelines
    pub fn with_locks(mut self, locks: WalletLocks) -> Self {
        self.locks = locks;
        self
    }

    pub fn locks(&self) -> &WalletLocks {
        &self.locks
    }

    pub fn active(&self) -> &ActiveContext {
        &self.active
    }

    pub fn submitter(&self) -> &TransactionSubmitter<B> {
        &self.submitter
    }

    pub fn account_abstraction(&self) -> &A {
        &self.aa
    }

    /// Run one command to completion.
    ///
    /// Never fails: every error is mapped to an outcome, shown to the user
    /// and, for intents, answered exactly once.
    pub async fn process(&self, request: CommandRequest, cancel: CancellationToken) -> CommandOutcome {
        tracing::info!(
            "Processing {} command (intent: {})",
            request.command_type,
            request.intent_id.as_deref().unwrap_or("-")
        );

        let outcome = match self.execute(&request, &cancel).await {
            Ok(outcome) => outcome,
            Err(e) => self.outcome_of_error(&request, e),
        };

        let response = self.present(&outcome);
        if let Some(intent_id) = &request.intent_id {
            match &self.responder {
                Some(responder) => responder.respond(intent_id, response),
                None => tracing::debug!("No intent responder for {}", intent_id),
            }
        }
        outcome
    }

    async fn execute(
        &self,
        request: &CommandRequest,
        cancel: &CancellationToken,
    ) -> Result<CommandOutcome> {
        let command = request.parse()?;
        let wallet = self.active.snapshot();
        let _guard = self.locks.try_acquire(&wallet.wallet_id)?;

        let meta = RequestMeta {
            command_id: request.intent_id.clone(),
            command_type: command.kind().to_string(),
            suggestion_id: request.suggestion_id.clone(),
        };

        if let Command::UserOperation(data) = &command {
            let op_request = UserOpRequest::from_data(data, wallet.evm_owner)?;
            let outcome = self
                .aa
                .run_user_operation(op_request, &self.coordinator, meta, cancel)
                .await?;
            return Ok(outcome
                .map(CommandOutcome::UserOperation)
                .unwrap_or(CommandOutcome::Cancelled));
        }

        let payload = self.builder.build(&command, &wallet)?;
        let Some(signed) = self.coordinator.sign(payload, meta, cancel).await? else {
            return Ok(CommandOutcome::Cancelled);
        };
        if cancel.is_cancelled() {
            tracing::info!("Command cancelled after signing, nothing broadcast");
            return Ok(CommandOutcome::Cancelled);
        }

        let result = self.submitter.submit(&signed, &wallet).await?;
        Ok(CommandOutcome::Broadcast(result))
    }

    fn outcome_of_error(&self, request: &CommandRequest, e: eyre::Report) -> CommandOutcome {
        let presentation = presentation_of(&e);
        match presentation {
            Presentation::Silent => {
                tracing::info!("{} command ended silently: {:#}", request.command_type, e);
                CommandOutcome::Cancelled
            }
            _ => {
                tracing::error!("{} command failed: {:#}", request.command_type, e);
                CommandOutcome::Failed {
                    message: failure_message(&e),
                    presentation,
                }
            }
        }
    }

    /// Show the outcome to the user and build the intent response
    fn present(&self, outcome: &CommandOutcome) -> IntentResponse {
        match outcome {
            CommandOutcome::Broadcast(result) => {
                self.feedback
                    .success(&format!("Transaction sent: {}", result.txid));
                IntentResponse::Success {
                    txid: result.txid.clone(),
                }
            }
            CommandOutcome::UserOperation(op) => match &op.receipt {
                Some(receipt) if receipt.success => {
                    let txid = receipt.receipt.transaction_hash.to_string();
                    self.feedback.success(&format!("Transaction sent: {txid}"));
                    IntentResponse::Success { txid }
                }
                Some(receipt) => {
                    let message = receipt
                        .reason
                        .clone()
                        .filter(|r| !r.is_empty())
                        .unwrap_or_else(|| "user operation reverted".to_string());
                    self.feedback.popup(&message);
                    IntentResponse::Failed { message }
                }
                None => {
                    self.feedback.unconfirmed(&format!(
                        "Unable to confirm user operation {}",
                        op.user_op_hash
                    ));
                    IntentResponse::Pending {
                        user_op_hash: op.user_op_hash.to_string(),
                    }
                }
            },
            CommandOutcome::Cancelled => IntentResponse::Cancelled,
            CommandOutcome::Failed {
                message,
                presentation,
            } => {
                match presentation {
                    Presentation::Unconfirmed => self.feedback.unconfirmed(message),
                    _ => self.feedback.popup(message),
                }
                IntentResponse::Failed {
                    message: message.clone(),
                }
            }
        }
    }
}

/// User-facing text of a failure.
///
/// The typed error carries the underlying reason (a bundler's revert string,
/// a node's rejection); untyped reports keep their whole context chain.
fn failure_message(e: &eyre::Report) -> String {
    classify(e)
        .map(|typed| typed.to_string())
        .unwrap_or_else(|| format!("{e:#}"))
}
