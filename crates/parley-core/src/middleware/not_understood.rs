use parley_types::session::MAX_CONSECUTIVE_NOT_UNDERSTAND;
use tracing::debug;

use crate::dispatch::{Middleware, Next, TurnContext};

/// Tracks consecutive NLU fallbacks and queues an escalating re-prompt.
///
/// On a fallback turn the counter becomes the pre-turn value plus one
/// (capped), is saved, and the matching re-prompt is queued. Other turns
/// leave the dispatcher's reset in place. Always continues the chain.
#[derive(Debug, Default, Clone, Copy)]
pub struct NotUnderstoodTracker;

impl Middleware for NotUnderstoodTracker {
    fn name(&self) -> &str {
        "not-understood-tracker"
    }

    async fn handle(&self, ctx: &mut TurnContext, next: Next<'_>) -> anyhow::Result<()> {
        if ctx.message().fallback {
            let count = match ctx.previous_not_understand() {
                Some(previous) => {
                    let next_count = i64::from(previous) + 1;
                    if let Some(session) = ctx.session_mut() {
                        session.set_consecutive_not_understand(next_count);
                    }
                    ctx.save_session().await?;
                    ctx.session()
                        .map_or(1, |s| s.consecutive_not_understand())
                }
                // No session tracking: every miss is the first.
                None => 1,
            };

            debug!(
                conversation_id = %ctx.message().conversation_id,
                consecutive_not_understand = count,
                max = MAX_CONSECUTIVE_NOT_UNDERSTAND,
                "fallback turn"
            );

            if let Some(prompt) = reprompt(&ctx.config().fallback.reprompts, count) {
                ctx.reply(prompt);
            }
        }

        next.run(ctx).await?;
        Ok(())
    }
}

/// Prompt for the `count`th consecutive miss, reusing the last one when the
/// list is shorter.
fn reprompt(prompts: &[String], count: u8) -> Option<String> {
    let index = usize::from(count.max(1)) - 1;
    prompts.get(index).or_else(|| prompts.last()).cloned()
}
