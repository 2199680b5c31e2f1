//! `parley send` and `parley converse`.

use anyhow::Result;
use console::style;
use parley_types::message::{ConverseOutcome, InboundMessage};

use crate::state::AppState;

/// Run one turn locally, exactly as the webhook would.
pub async fn send(
    state: &AppState,
    conversation_id: &str,
    text: &str,
    fallback: bool,
    intent: Option<String>,
    json: bool,
) -> Result<()> {
    let mut message = InboundMessage::text(conversation_id, text).with_fallback(fallback);
    if let Some(intent) = intent {
        message = message.with_intent(intent);
    }

    let ctx = state.dispatcher.on_message(message).await?;

    if json {
        let out = serde_json::json!({
            "conversation_id": conversation_id,
            "replies": ctx.replies(),
            "session": ctx.session(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    if ctx.replies().is_empty() {
        println!("  {} (no reply)", style("i").blue().bold());
    }
    for reply in ctx.replies() {
        println!("  {} {}", style(">").green().bold(), reply);
    }
    if let Some(session) = ctx.session() {
        println!();
        println!(
            "  {}",
            style(format!(
                "turn {} · {} consecutive misses",
                session.message_count,
                session.consecutive_not_understand()
            ))
            .dim()
        );
    }
    println!();
    Ok(())
}

/// Send text to the NLU service without running the dispatcher.
pub async fn converse(state: &AppState, text: &str, token: Option<&str>, json: bool) -> Result<()> {
    let outcome = state.dispatcher.nlu().converse(text, token).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    println!();
    match &outcome {
        ConverseOutcome::Reply { text, .. } => {
            println!("  {} {}", style(">").green().bold(), text);
        }
        ConverseOutcome::NoReply { .. } => {
            println!("  {} (no reply)", style("i").blue().bold());
        }
    }
    println!(
        "  {}",
        style(format!("token: {}", outcome.conversation_token())).dim()
    );
    println!();
    Ok(())
}
