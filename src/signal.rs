use base64::Engine;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct InboundMessage {
    /// Where replies and broadcasts go: the sender for direct chats, the group otherwise.
    pub(crate) reply_to: String,
    pub(crate) sender: String,
    pub(crate) sender_name: String,
    pub(crate) text: String,
}

/// Signal REST addresses a group as `group.` + base64 of the internal group id.
pub(crate) fn group_address(group_id: &str) -> String {
    format!(
        "group.{}",
        base64::engine::general_purpose::STANDARD.encode(group_id.as_bytes())
    )
}

/// Parse a Signal envelope JSON into an inbound message.
/// Returns None for receipts, typing indicators and sync copies of our own
/// messages. A data message without text (attachment, sticker, reaction)
/// yields an empty `text` so the conversation is still registered.
pub(crate) fn parse_envelope(envelope: &Value) -> Option<InboundMessage> {
    let env = &envelope["envelope"];
    let sender = env["sourceNumber"]
        .as_str()
        .or_else(|| env["source"].as_str())
        .filter(|s| !s.is_empty())?
        .to_string();

    let data = env.get("dataMessage").filter(|d| d.is_object())?;
    let text = data["message"].as_str().unwrap_or_default();

    let reply_to = match data["groupInfo"]["groupId"].as_str() {
        Some(group_id) if !group_id.is_empty() => group_address(group_id),
        _ => sender.clone(),
    };
    let sender_name = env["sourceName"].as_str().unwrap_or("unknown").to_string();

    Some(InboundMessage {
        reply_to,
        sender,
        sender_name,
        text: text.to_string(),
    })
}

/// Open the receive websocket and expose it as a stream of inbound messages.
/// The stream ends when the socket closes; reconnecting means calling this again.
pub(crate) async fn connect_inbound(
    api_url: &str,
    account: &str,
) -> Result<BoxStream<'static, Result<InboundMessage, AppError>>, AppError> {
    let ws_url = format!("{}/v1/receive/{}", api_url.replacen("http", "ws", 1), account);
    info!("Connecting to {ws_url}");
    let (ws, _) = tokio_tungstenite::connect_async(&ws_url).await?;
    info!("WebSocket connected");

    let stream = ws.filter_map(|msg| async move {
        let msg = match msg {
            Ok(m) => m,
            Err(e) => return Some(Err(AppError::from(e))),
        };
        if !msg.is_text() {
            return None;
        }
        let text = match msg.into_text() {
            Ok(t) => t,
            Err(e) => return Some(Err(AppError::from(e))),
        };
        decode_frame(&text).map(Ok)
    });
    Ok(stream.boxed())
}

/// Longest prefix of a raw frame that goes into the debug log.
const FRAME_LOG_CHARS: usize = 200;

fn frame_preview(raw: &str) -> String {
    crate::helpers::truncate(raw, FRAME_LOG_CHARS)
}

/// Decode one websocket text frame. Frames that are not JSON or carry no
/// data message yield None.
pub(crate) fn decode_frame(raw: &str) -> Option<InboundMessage> {
    debug!("Received: {}", frame_preview(raw));
    match serde_json::from_str::<Value>(raw) {
        Ok(envelope) => parse_envelope(&envelope),
        Err(e) => {
            warn!("Failed to parse message: {e}");
            None
        }
    }
}
