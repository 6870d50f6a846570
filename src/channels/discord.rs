use super::traits::{GatewayEvent, MessageHandle, MessageSink};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

const API_BASE: &str = "https://discord.com/api/v10";
const GATEWAY_URL: &str = "wss://gateway.discord.gg/?v=10&encoding=json";

/// GUILDS | GUILD_MESSAGES | GUILD_MESSAGE_TYPING | MESSAGE_CONTENT
const GATEWAY_INTENTS: u64 = (1 << 0) | (1 << 9) | (1 << 11) | (1 << 15);

/// ADMINISTRATOR bit in the member permission set
const ADMINISTRATOR: u128 = 1 << 3;

const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Discord REST adapter — the production `MessageSink`
pub struct DiscordRest {
    bot_token: String,
    client: reqwest::Client,
}

impl DiscordRest {
    pub fn new(bot_token: String) -> Self {
        Self {
            bot_token,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, path: &str) -> String {
        format!("{API_BASE}{path}")
    }

    fn auth_header(&self) -> String {
        format!("Bot {}", self.bot_token)
    }
}

#[async_trait]
impl MessageSink for DiscordRest {
    async fn send(&self, channel_id: &str, text: &str) -> anyhow::Result<MessageHandle> {
        let body = serde_json::json!({ "content": text });

        let resp = self
            .client
            .post(self.api_url(&format!("/channels/{channel_id}/messages")))
            .header("Authorization", self.auth_header())
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let err = resp.text().await.unwrap_or_default();
            anyhow::bail!("Discord send failed ({status}): {err}");
        }

        let data: Value = resp.json().await?;
        let message_id = data
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow::anyhow!("Discord send response missing message id"))?
            .to_string();

        Ok(MessageHandle {
            channel_id: channel_id.to_string(),
            message_id,
        })
    }

    async fn edit(&self, handle: &MessageHandle, text: &str) -> anyhow::Result<()> {
        let body = serde_json::json!({ "content": text });

        let resp = self
            .client
            .patch(self.api_url(&format!(
                "/channels/{}/messages/{}",
                handle.channel_id, handle.message_id
            )))
            .header("Authorization", self.auth_header())
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let err = resp.text().await.unwrap_or_default();
            anyhow::bail!("Discord edit failed ({status}): {err}");
        }

        Ok(())
    }

    async fn delete(&self, handle: &MessageHandle) -> anyhow::Result<()> {
        let resp = self
            .client
            .delete(self.api_url(&format!(
                "/channels/{}/messages/{}",
                handle.channel_id, handle.message_id
            )))
            .header("Authorization", self.auth_header())
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let err = resp.text().await.unwrap_or_default();
            anyhow::bail!("Discord delete failed ({status}): {err}");
        }

        Ok(())
    }

    async fn react(&self, channel_id: &str, message_id: &str, emoji: &str) -> anyhow::Result<()> {
        let resp = self
            .client
            .put(self.api_url(&format!(
                "/channels/{channel_id}/messages/{message_id}/reactions/{}/@me",
                urlencoding::encode(emoji)
            )))
            .header("Authorization", self.auth_header())
            .header("Content-Length", "0")
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let err = resp.text().await.unwrap_or_default();
            anyhow::bail!("Discord react failed ({status}): {err}");
        }

        Ok(())
    }
}

/// Discord gateway listener — connects over WebSocket, identifies with the
/// typing/message intents, and forwards normalized events to the tracker.
pub struct DiscordGateway {
    bot_token: String,
}

impl DiscordGateway {
    pub fn new(bot_token: String) -> Self {
        Self { bot_token }
    }

    /// Listen forever, reconnecting with a short delay when the stream drops.
    pub async fn listen(&self, tx: mpsc::UnboundedSender<GatewayEvent>) -> anyhow::Result<()> {
        loop {
            if let Err(e) = self.run_connection(&tx).await {
                if tx.is_closed() {
                    return Ok(());
                }
                tracing::warn!("Discord gateway connection lost: {e}");
            }
            tokio::time::sleep(RECONNECT_DELAY).await;
        }
    }

    async fn run_connection(&self, tx: &mpsc::UnboundedSender<GatewayEvent>) -> anyhow::Result<()> {
        tracing::info!("Discord: connecting to gateway...");
        let (ws_stream, _) = tokio_tungstenite::connect_async(GATEWAY_URL).await?;
        let (mut write, mut read) = ws_stream.split();

        let mut heartbeat: Option<tokio::time::Interval> = None;
        let mut last_seq: Option<u64> = None;
        let mut self_id = String::new();

        loop {
            tokio::select! {
                () = async {
                    match heartbeat.as_mut() {
                        Some(interval) => { interval.tick().await; }
                        None => std::future::pending::<()>().await,
                    }
                } => {
                    let beat = serde_json::json!({ "op": 1, "d": last_seq });
                    write.send(Message::Text(beat.to_string().into())).await?;
                }
                frame = read.next() => {
                    let Some(frame) = frame else {
                        anyhow::bail!("Discord gateway stream ended");
                    };
                    let text = match frame {
                        Ok(Message::Text(t)) => t,
                        Ok(Message::Close(_)) => anyhow::bail!("Discord gateway closed the connection"),
                        Ok(_) => continue,
                        Err(e) => anyhow::bail!("Discord gateway read error: {e}"),
                    };

                    let frame: Value = match serde_json::from_str(&text) {
                        Ok(v) => v,
                        Err(_) => continue,
                    };

                    if let Some(seq) = frame.get("s").and_then(Value::as_u64) {
                        last_seq = Some(seq);
                    }

                    match frame.get("op").and_then(Value::as_u64) {
                        // HELLO: start heartbeating, then identify
                        Some(10) => {
                            let interval_ms = frame
                                .pointer("/d/heartbeat_interval")
                                .and_then(Value::as_u64)
                                .unwrap_or(41_250);
                            let mut interval =
                                tokio::time::interval(Duration::from_millis(interval_ms));
                            // First tick fires immediately, which doubles as the initial beat
                            interval.set_missed_tick_behavior(
                                tokio::time::MissedTickBehavior::Delay,
                            );
                            heartbeat = Some(interval);

                            let identify = serde_json::json!({
                                "op": 2,
                                "d": {
                                    "token": self.bot_token,
                                    "intents": GATEWAY_INTENTS,
                                    "properties": {
                                        "os": std::env::consts::OS,
                                        "browser": "typewatch",
                                        "device": "typewatch",
                                    }
                                }
                            });
                            write.send(Message::Text(identify.to_string().into())).await?;
                        }
                        // Immediate heartbeat request
                        Some(1) => {
                            let beat = serde_json::json!({ "op": 1, "d": last_seq });
                            write.send(Message::Text(beat.to_string().into())).await?;
                        }
                        // Heartbeat ACK
                        Some(11) => {}
                        // RECONNECT / INVALID_SESSION: drop and let `listen` retry
                        Some(7 | 9) => anyhow::bail!("Discord gateway requested reconnect"),
                        Some(0) => {
                            let event_type =
                                frame.get("t").and_then(Value::as_str).unwrap_or_default();
                            let data = frame.get("d").cloned().unwrap_or(Value::Null);

                            if event_type == "READY" {
                                self_id = data
                                    .pointer("/user/id")
                                    .and_then(Value::as_str)
                                    .unwrap_or_default()
                                    .to_string();
                                tracing::info!("Discord: gateway ready");
                                continue;
                            }

                            if let Some(event) = decode_dispatch(event_type, &data, &self_id) {
                                if tx.send(event).is_err() {
                                    return Ok(());
                                }
                            }
                        }
                        _ => {}
                    }
                }
            }
        }
    }
}

/// Normalize a gateway dispatch into a tracker event. Events outside a
/// guild (DMs) and unrecognized dispatch types yield `None`.
fn decode_dispatch(event_type: &str, data: &Value, self_id: &str) -> Option<GatewayEvent> {
    match event_type {
        "TYPING_START" => {
            let guild_id = data.get("guild_id").and_then(Value::as_str)?;
            let user_id = data.get("user_id").and_then(Value::as_str)?;
            let channel_id = data.get("channel_id").and_then(Value::as_str)?;
            let is_bot = data
                .pointer("/member/user/bot")
                .and_then(Value::as_bool)
                .unwrap_or(false);

            Some(GatewayEvent::TypingStart {
                user_id: user_id.to_string(),
                guild_id: guild_id.to_string(),
                channel_id: channel_id.to_string(),
                is_bot,
            })
        }
        "MESSAGE_CREATE" => {
            let guild_id = data.get("guild_id").and_then(Value::as_str)?;
            let id = data.get("id").and_then(Value::as_str)?;
            let author_id = data.pointer("/author/id").and_then(Value::as_str)?;
            let channel_id = data.get("channel_id").and_then(Value::as_str)?;
            let text = data
                .get("content")
                .and_then(Value::as_str)
                .unwrap_or_default();

            let mentions_self = data
                .get("mentions")
                .and_then(Value::as_array)
                .is_some_and(|mentions| {
                    mentions
                        .iter()
                        .any(|m| m.get("id").and_then(Value::as_str) == Some(self_id))
                });

            let author_is_admin = data
                .pointer("/member/permissions")
                .and_then(Value::as_str)
                .is_some_and(permissions_include_admin);

            Some(GatewayEvent::MessagePosted {
                id: id.to_string(),
                author_id: author_id.to_string(),
                guild_id: guild_id.to_string(),
                channel_id: channel_id.to_string(),
                mentions_self,
                author_is_admin,
                text: text.to_string(),
            })
        }
        _ => None,
    }
}

fn permissions_include_admin(permissions: &str) -> bool {
    permissions
        .parse::<u128>()
        .is_ok_and(|bits| bits & ADMINISTRATOR != 0)
}
