//! Messages exchanged with the NLU layer.
//!
//! `InboundMessage` is what the webhook hands the dispatcher for one turn.
//! `NluReply` and `ConverseOutcome` model the text-based entrypoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One inbound delivery from the NLU layer.
///
/// Parley only relies on `conversation_id`; the remaining fields are carried
/// through for middlewares to read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Stable identifier grouping every turn of one conversation.
    pub conversation_id: String,
    /// Raw user text, when the delivery carried any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Intent name resolved by the NLU layer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
    /// Whether the NLU layer matched its fallback ("didn't understand") intent.
    #[serde(default)]
    pub fallback: bool,
    /// Intent parameters, passed through untouched.
    #[serde(default)]
    pub parameters: serde_json::Value,
    /// Language tag reported for this delivery.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub received_at: DateTime<Utc>,
}

impl InboundMessage {
    /// A text message for `conversation_id`, received now.
    pub fn text(conversation_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            text: Some(text.into()),
            intent: None,
            fallback: false,
            parameters: serde_json::Value::Null,
            language: None,
            received_at: Utc::now(),
        }
    }

    /// Mark this message as an NLU fallback.
    pub fn with_fallback(mut self, fallback: bool) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn with_intent(mut self, intent: impl Into<String>) -> Self {
        self.intent = Some(intent.into());
        self
    }
}

/// Raw answer from a converse-by-text call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NluReply {
    /// Reply text; absent or blank when the NLU layer had nothing to say.
    #[serde(default)]
    pub reply: Option<String>,
    /// Token to pass back on the next call to continue the conversation.
    pub conversation_token: String,
}

/// Result of the text-based entrypoint.
///
/// `NoReply` is a successful call that produced nothing usable, kept apart
/// from hard failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConverseOutcome {
    Reply {
        text: String,
        conversation_token: String,
    },
    NoReply {
        conversation_token: String,
    },
}

impl From<NluReply> for ConverseOutcome {
    fn from(reply: NluReply) -> Self {
        match reply.reply {
            Some(text) if !text.trim().is_empty() => ConverseOutcome::Reply {
                text,
                conversation_token: reply.conversation_token,
            },
            _ => ConverseOutcome::NoReply {
                conversation_token: reply.conversation_token,
            },
        }
    }
}

impl ConverseOutcome {
    pub fn conversation_token(&self) -> &str {
        match self {
            ConverseOutcome::Reply {
                conversation_token, ..
            }
            | ConverseOutcome::NoReply { conversation_token } => conversation_token,
        }
    }
}
