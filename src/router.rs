use tracing::{debug, info, warn};

use crate::config::ReservedAction;
use crate::error::AppError;
use crate::matching::{find_match, match_reserved};
use crate::signal::InboundMessage;
use crate::state::State;

/// Handle one inbound message: register the conversation, answer reserved
/// phrases, otherwise reply from the first matching trigger.
pub(crate) async fn handle_message(state: &State, msg: &InboundMessage) -> Result<(), AppError> {
    let lowered = msg.text.to_lowercase();

    if state.recipients.add(&msg.reply_to) {
        info!(
            recipient = %msg.reply_to,
            sender_name = %msg.sender_name,
            known = state.recipients.len(),
            "New recipient registered"
        );
    }

    if lowered.trim().is_empty() {
        debug!(sender = %msg.sender, "Message without text");
        return Ok(());
    }

    match match_reserved(&state.config.reserved_phrases, &lowered) {
        Some(ReservedAction::Weather) => return reply_weather(state, &msg.reply_to).await,
        Some(ReservedAction::RandomContent) => {
            if reply_random_content(state, &msg.reply_to).await? {
                return Ok(());
            }
        }
        None => {}
    }

    let Some(trigger) = find_match(state.triggers.as_ref(), &lowered)? else {
        debug!(sender = %msg.sender, "No trigger matched");
        return Ok(());
    };
    let Some(response) = state.selector.pick(&trigger.responses) else {
        debug!(trigger_id = trigger.id, value = %trigger.value, "Matched trigger has no responses");
        return Ok(());
    };
    info!(recipient = %msg.reply_to, trigger_id = trigger.id, "Trigger reply");
    state.send_message(&msg.reply_to, &response.text).await
}

async fn reply_weather(state: &State, reply_to: &str) -> Result<(), AppError> {
    match state.weather.fetch(&state.config.city).await {
        Ok(weather) => state.send_message(reply_to, &weather.format_message()).await,
        Err(e) => {
            warn!(recipient = %reply_to, "Weather lookup failed: {e}");
            state
                .send_message(reply_to, &state.config.weather_failure_reply)
                .await
        }
    }
}

/// Returns false when there was nothing to send, so matching continues.
async fn reply_random_content(state: &State, reply_to: &str) -> Result<bool, AppError> {
    let item = match state.content.random_item() {
        Ok(Some(item)) => item,
        Ok(None) => {
            debug!("Content store empty, falling through to triggers");
            return Ok(false);
        }
        Err(e) => {
            warn!("Content lookup failed, falling through to triggers: {e}");
            return Ok(false);
        }
    };
    state.send_message(reply_to, &item.text).await?;
    Ok(true)
}
