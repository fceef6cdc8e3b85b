use anyhow::Result;
use chrono::Local;
use tracing::{debug, info};

use crate::engine::{EngineState, Reply, ReplyEngine, Rule};
use crate::platform::UpdateSource;

/// Poll forever, answering each message before fetching the next.
pub async fn run<S: UpdateSource>(mut source: S, engine: ReplyEngine) -> Result<()> {
    let mut state = EngineState::new(Local::now().date_naive());

    info!("Bot @{} is polling for messages...", source.bot_username());

    loop {
        serve_one(&mut source, &engine, &mut state).await?;
    }
}

/// Handle a single inbound message. Returns the reply that was sent, if any.
pub async fn serve_one<S: UpdateSource>(
    source: &mut S,
    engine: &ReplyEngine,
    state: &mut EngineState,
) -> Result<Option<Reply>> {
    let message = source.get_latest_message().await?;
    debug!(
        "Message in {} [{}]: {}",
        message.chat_label(),
        message.chat_type.as_deref().unwrap_or("unknown"),
        message.text
    );

    let reply = engine.reply_now(&message, state);
    match &reply {
        Some(reply) => {
            info!(
                "Replying '{}' ({}) to '{}' in {}",
                reply.text,
                reply.rule,
                message.text,
                message.chat_label()
            );
            source.send_message(message.chat_id, &reply.text).await;
            if reply.rule == Rule::Resurrection {
                debug!("Notified {} chat(s) since start", state.greeted_count());
            }
        }
        None => debug!("No rule matched"),
    }

    Ok(reply)
}
