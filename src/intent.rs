//! Intent responses and user feedback
//!
//! Commands that originate from an intent get exactly one response carrying
//! the intent id. Feedback is what the user sees locally.

use serde::Serialize;
use tokio::sync::mpsc;

/// Final answer to an intent
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum IntentResponse {
    /// Transaction accepted by the chain or bundler
    #[serde(rename_all = "camelCase")]
    Success { txid: String },
    /// User operation submitted, receipt not seen yet
    #[serde(rename_all = "camelCase")]
    Pending { user_op_hash: String },
    /// User dismissed signing or the request timed out
    Cancelled,
    Failed { message: String },
}

/// Where intent responses go
pub trait IntentResponder: Send + Sync {
    fn respond(&self, intent_id: &str, response: IntentResponse);
}

/// Local user feedback
pub trait Feedback: Send + Sync {
    fn success(&self, message: &str);
    /// Blocking error popup
    fn popup(&self, message: &str);
    /// Submitted but unconfirmed, not an error
    fn unconfirmed(&self, message: &str);
}

/// Feedback that only logs
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingFeedback;

impl Feedback for TracingFeedback {
    fn success(&self, message: &str) {
        tracing::info!("{}", message);
    }

    fn popup(&self, message: &str) {
        tracing::error!("{}", message);
    }

    fn unconfirmed(&self, message: &str) {
        tracing::warn!("{}", message);
    }
}

/// Forwards responses over a channel to whoever answers the intent
#[derive(Debug, Clone)]
pub struct ChannelResponder {
    tx: mpsc::UnboundedSender<(String, IntentResponse)>,
}

impl ChannelResponder {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<(String, IntentResponse)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl IntentResponder for ChannelResponder {
    fn respond(&self, intent_id: &str, response: IntentResponse) {
        if self.tx.send((intent_id.to_string(), response)).is_err() {
            tracing::warn!("Intent {} answered after its receiver went away", intent_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_wire_format() {
        let success = IntentResponse::Success { txid: "ab".into() };
        assert_eq!(
            serde_json::to_value(success).unwrap(),
            json!({ "status": "success", "txid": "ab" })
        );

        let pending = IntentResponse::Pending {
            user_op_hash: "0x01".into(),
        };
        assert_eq!(
            serde_json::to_value(pending).unwrap(),
            json!({ "status": "pending", "userOpHash": "0x01" })
        );

        assert_eq!(
            serde_json::to_value(IntentResponse::Cancelled).unwrap(),
            json!({ "status": "cancelled" })
        );
    }

    #[tokio::test]
    async fn test_channel_responder_forwards() {
        let (responder, mut rx) = ChannelResponder::channel();
        responder.respond("intent-1", IntentResponse::Cancelled);
        assert_eq!(
            rx.recv().await.unwrap(),
            ("intent-1".to_string(), IntentResponse::Cancelled)
        );
    }
}
