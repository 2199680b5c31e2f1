use std::time::Instant;

use tracing::{info, warn};

use crate::dispatch::{Middleware, Next, TurnContext};

/// Logs each turn around the rest of the chain, with elapsed time.
#[derive(Debug, Default, Clone, Copy)]
pub struct TurnLogger;

impl Middleware for TurnLogger {
    fn name(&self) -> &str {
        "turn-logger"
    }

    async fn handle(&self, ctx: &mut TurnContext, next: Next<'_>) -> anyhow::Result<()> {
        let start = Instant::now();
        let message = ctx.message();
        info!(
            conversation_id = %message.conversation_id,
            intent = message.intent.as_deref().unwrap_or("-"),
            fallback = message.fallback,
            remaining = next.remaining(),
            "turn started"
        );

        let result = next.run(ctx).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;
        let conversation_id = &ctx.message().conversation_id;

        match &result {
            Ok(()) => info!(
                %conversation_id,
                replies = ctx.replies().len(),
                message_count = ctx.session().map(|s| s.message_count),
                elapsed_ms,
                "turn finished"
            ),
            Err(err) => warn!(%conversation_id, elapsed_ms, error = %err, "turn failed"),
        }
        result?;
        Ok(())
    }
}
