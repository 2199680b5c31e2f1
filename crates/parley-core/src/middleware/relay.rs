use parley_types::message::ConverseOutcome;
use tracing::debug;

use crate::dispatch::{Middleware, Next, TurnContext};

/// Forwards the turn's text to the NLU service and queues its answer.
///
/// Fallback turns and messages without text are skipped. The conversation
/// id doubles as the NLU conversation token.
#[derive(Debug, Default, Clone, Copy)]
pub struct NluRelay;

impl Middleware for NluRelay {
    fn name(&self) -> &str {
        "nlu-relay"
    }

    async fn handle(&self, ctx: &mut TurnContext, next: Next<'_>) -> anyhow::Result<()> {
        let message = ctx.message();
        let text = message.text.as_deref().map(str::trim).unwrap_or_default();

        if !message.fallback && !text.is_empty() {
            let outcome = ctx
                .nlu()
                .converse(text, Some(message.conversation_id.as_str()))
                .await?;
            match outcome {
                ConverseOutcome::Reply { text, .. } => ctx.reply(text),
                ConverseOutcome::NoReply { conversation_token } => {
                    debug!(%conversation_token, "nothing to relay");
                }
            }
        }

        next.run(ctx).await?;
        Ok(())
    }
}
