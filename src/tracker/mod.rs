pub mod phrases;
pub mod registry;
pub mod session;

pub use phrases::PhraseBank;
pub use registry::SessionRegistry;
pub use session::{Session, SessionKey, SessionState, SinkOp, StatusText};

use crate::channels::traits::{GatewayEvent, MessageHandle, MessageSink};
use crate::scope::ScopeGate;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

pub const ENABLE_REACTION: &str = "📈";
pub const DISABLE_REACTION: &str = "📉";

const ENABLE_WORD: &str = "go";
const DISABLE_WORD: &str = "stop";

/// Everything the tracker consumes, serialized onto one queue.
#[derive(Debug)]
pub enum Event {
    Gateway(GatewayEvent),
    StopTimer { key: SessionKey, generation: u64 },
    StaleTimer { key: SessionKey, generation: u64 },
}

/// The typing-activity state machine. Owns all sessions and the scope
/// gate; every event is handled on one logical thread of control, so no
/// two handlers ever race on the registry.
pub struct Tracker {
    registry: SessionRegistry,
    scope: ScopeGate,
    phrases: PhraseBank,
    sink: Arc<dyn MessageSink>,
    /// Loopback sender: armed timers post their expiry back onto the
    /// tracker's own queue.
    events: mpsc::UnboundedSender<Event>,
    stop_after: Duration,
    stale_after: Duration,
}

impl Tracker {
    pub fn new(
        scope: ScopeGate,
        phrases: PhraseBank,
        sink: Arc<dyn MessageSink>,
        events: mpsc::UnboundedSender<Event>,
        stop_after: Duration,
        stale_after: Duration,
    ) -> Self {
        Self {
            registry: SessionRegistry::new(),
            scope,
            phrases,
            sink,
            events,
            stop_after,
            stale_after,
        }
    }

    /// Drain the event queue until every sender is gone.
    pub async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Event>) {
        while let Some(event) = rx.recv().await {
            self.handle_event(event);
        }
    }

    /// Single entry point for every event. Advances state and enqueues
    /// sink ops synchronously; never waits on the sink itself.
    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::Gateway(GatewayEvent::TypingStart {
                user_id,
                guild_id,
                channel_id,
                is_bot,
            }) => self.handle_typing_start(user_id, guild_id, channel_id, is_bot),
            Event::Gateway(GatewayEvent::MessagePosted {
                id,
                author_id,
                guild_id,
                channel_id,
                mentions_self,
                author_is_admin,
                text,
            }) => self.handle_message_posted(
                &id,
                author_id,
                &guild_id,
                channel_id,
                mentions_self,
                author_is_admin,
                &text,
            ),
            Event::StopTimer { key, generation } => self.handle_stop_timer(&key, generation),
            Event::StaleTimer { key, generation } => self.handle_stale_timer(&key, generation),
        }
    }

    fn handle_typing_start(
        &mut self,
        user_id: String,
        guild_id: String,
        channel_id: String,
        is_bot: bool,
    ) {
        if is_bot {
            return;
        }
        if !self.scope.is_active(&guild_id) {
            return;
        }

        let key = SessionKey {
            user_id,
            channel_id,
        };

        if let Some(session) = self.registry.get_mut(&key) {
            match session.state {
                SessionState::FirstPause => {
                    tracing::info!("{} resumed typing in {}", key.user_id, key.channel_id);
                    session.status.append(self.phrases.resumed());
                    session.state = SessionState::Resumed;
                    let _ = session.ops.send(SinkOp::Edit {
                        text: session.status.render(),
                    });
                }
                SessionState::OtherPause => {
                    tracing::info!("{} resumed typing again in {}", key.user_id, key.channel_id);
                    session.status.unstrike();
                    session.state = SessionState::Resumed;
                    let _ = session.ops.send(SinkOp::Edit {
                        text: session.status.render(),
                    });
                }
                SessionState::FirstTyping | SessionState::Resumed => {
                    tracing::debug!("{} still typing in {}", key.user_id, key.channel_id);
                }
            }
        } else {
            tracing::info!("{} started typing in {}", key.user_id, key.channel_id);
            let text = self.phrases.started(&mention(&key.user_id));
            let ops = spawn_sink_worker(self.sink.clone());
            let _ = ops.send(SinkOp::Send {
                channel_id: key.channel_id.clone(),
                text: text.clone(),
            });
            self.registry
                .insert(key.clone(), Session::new(StatusText::new(text), ops));
        }

        self.arm_timers(&key);
    }

    #[allow(clippy::too_many_arguments)]
    fn handle_message_posted(
        &mut self,
        message_id: &str,
        author_id: String,
        guild_id: &str,
        channel_id: String,
        mentions_self: bool,
        author_is_admin: bool,
        text: &str,
    ) {
        if self.scope.is_active(guild_id) {
            let key = SessionKey {
                user_id: author_id,
                channel_id: channel_id.clone(),
            };
            if let Some(session) = self.registry.get_mut(&key) {
                tracing::info!(
                    "{} posted in {}, removing status message",
                    key.user_id,
                    key.channel_id
                );
                let _ = session.ops.send(SinkOp::Delete);
                self.registry.remove(&key);
            }
        }

        // The admin surface works regardless of the gate, otherwise a
        // disabled guild could never be enabled again.
        if !(mentions_self && author_is_admin) {
            return;
        }

        if text.contains(ENABLE_WORD) && !self.scope.is_active(guild_id) {
            tracing::info!("enabling tracking in guild {guild_id}");
            if let Err(e) = self.scope.activate(guild_id) {
                tracing::warn!("failed to persist active guilds: {e}");
            }
            self.spawn_react(channel_id, message_id.to_string(), ENABLE_REACTION);
        } else if text.contains(DISABLE_WORD) && self.scope.is_active(guild_id) {
            tracing::info!("disabling tracking in guild {guild_id}");
            if let Err(e) = self.scope.deactivate(guild_id) {
                tracing::warn!("failed to persist active guilds: {e}");
            }
            self.spawn_react(channel_id, message_id.to_string(), DISABLE_REACTION);
        }
    }

    fn handle_stop_timer(&mut self, key: &SessionKey, generation: u64) {
        let Some(session) = self.registry.get_mut(key) else {
            return;
        };
        if session.generation != generation {
            return;
        }

        match session.state {
            SessionState::FirstTyping => {
                tracing::info!("{} stopped typing in {}", key.user_id, key.channel_id);
                session.status.append(self.phrases.paused());
                session.state = SessionState::FirstPause;
                let _ = session.ops.send(SinkOp::Edit {
                    text: session.status.render(),
                });
            }
            SessionState::Resumed => {
                tracing::info!("{} stopped typing again in {}", key.user_id, key.channel_id);
                session.status.strike();
                session.state = SessionState::OtherPause;
                let _ = session.ops.send(SinkOp::Edit {
                    text: session.status.render(),
                });
            }
            SessionState::FirstPause | SessionState::OtherPause => {}
        }
    }

    fn handle_stale_timer(&mut self, key: &SessionKey, generation: u64) {
        let Some(session) = self.registry.get_mut(key) else {
            return;
        };
        if session.generation != generation {
            return;
        }

        tracing::info!(
            "status for {} in {} went stale, deleting",
            key.user_id,
            key.channel_id
        );
        let _ = session.ops.send(SinkOp::Delete);
        self.registry.remove(key);
    }

    /// Cancel and replace both timers, invalidating anything still queued
    /// from the previous arming.
    fn arm_timers(&mut self, key: &SessionKey) {
        let stop_after = self.stop_after;
        let stale_after = self.stale_after;
        let Some(session) = self.registry.get_mut(key) else {
            return;
        };

        session.cancel_timers();
        session.generation += 1;
        let generation = session.generation;

        let events = self.events.clone();
        let stop_key = key.clone();
        session.stop_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(stop_after).await;
            let _ = events.send(Event::StopTimer {
                key: stop_key,
                generation,
            });
        }));

        let events = self.events.clone();
        let stale_key = key.clone();
        session.stale_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(stale_after).await;
            let _ = events.send(Event::StaleTimer {
                key: stale_key,
                generation,
            });
        }));
    }

    fn spawn_react(&self, channel_id: String, message_id: String, emoji: &'static str) {
        let sink = self.sink.clone();
        tokio::spawn(async move {
            if let Err(e) = sink.react(&channel_id, &message_id, emoji).await {
                tracing::warn!("reaction failed: {e}");
            }
        });
    }
}

fn mention(user_id: &str) -> String {
    format!("<@{user_id}>")
}

/// Spawn the per-session sink worker. Ops execute strictly in submission
/// order, so an in-flight edit can never clobber a later transition and
/// nothing follows a delete. The worker owns the message handle produced
/// by the initial send.
fn spawn_sink_worker(sink: Arc<dyn MessageSink>) -> mpsc::UnboundedSender<SinkOp> {
    let (tx, mut rx) = mpsc::unbounded_channel::<SinkOp>();
    tokio::spawn(async move {
        let mut handle: Option<MessageHandle> = None;
        while let Some(op) = rx.recv().await {
            match op {
                SinkOp::Send { channel_id, text } => {
                    match sink.send(&channel_id, &text).await {
                        Ok(h) => handle = Some(h),
                        Err(e) => tracing::warn!("status send failed: {e}"),
                    }
                }
                SinkOp::Edit { text } => {
                    let Some(h) = handle.as_ref() else {
                        tracing::warn!("skipping edit, status message was never created");
                        continue;
                    };
                    if let Err(e) = sink.edit(h, &text).await {
                        tracing::warn!("status edit failed: {e}");
                    }
                }
                SinkOp::Delete => {
                    if let Some(h) = handle.as_ref() {
                        if let Err(e) = sink.delete(h).await {
                            tracing::warn!("status delete failed: {e}");
                        }
                    }
                    break;
                }
            }
        }
    });
    tx
}
