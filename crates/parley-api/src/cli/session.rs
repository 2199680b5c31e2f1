//! `parley session <conversation_id>`.

use anyhow::{Context, Result};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use crate::state::AppState;

pub async fn show_session(state: &AppState, conversation_id: &str, json: bool) -> Result<()> {
    let Some(store) = state.dispatcher.store() else {
        println!();
        println!(
            "  {} Session tracking is off. Add a {} section to the config to enable it.",
            style("i").blue().bold(),
            style("[persistence]").yellow()
        );
        println!();
        return Ok(());
    };

    let session = store
        .find_by_id(conversation_id)
        .await
        .with_context(|| format!("Session '{conversation_id}' not found"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&session)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Field").fg(Color::White),
        Cell::new("Value").fg(Color::White),
    ]);
    table.add_row(vec![
        Cell::new("Conversation"),
        Cell::new(session.conversation_id()).fg(Color::Cyan),
    ]);
    table.add_row(vec![
        Cell::new("Messages"),
        Cell::new(session.message_count),
    ]);

    let misses = session.consecutive_not_understand();
    let miss_color = if misses == 0 { Color::Green } else { Color::Yellow };
    table.add_row(vec![
        Cell::new("Consecutive misses"),
        Cell::new(misses).fg(miss_color),
    ]);
    table.add_row(vec![
        Cell::new("Created"),
        Cell::new(session.created_at.format("%Y-%m-%d %H:%M:%S")),
    ]);
    table.add_row(vec![
        Cell::new("Updated"),
        Cell::new(session.updated_at.format("%Y-%m-%d %H:%M:%S")),
    ]);

    println!();
    println!("{table}");
    println!();
    Ok(())
}
