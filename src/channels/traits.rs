use async_trait::async_trait;

/// Handle to a sink-created message: everything needed to edit or delete it later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHandle {
    pub channel_id: String,
    pub message_id: String,
}

/// A platform event normalized for the tracker.
#[derive(Debug, Clone)]
pub enum GatewayEvent {
    /// A user began composing a message in a channel.
    TypingStart {
        user_id: String,
        guild_id: String,
        channel_id: String,
        is_bot: bool,
    },
    /// A user posted a message in a channel.
    MessagePosted {
        id: String,
        author_id: String,
        guild_id: String,
        channel_id: String,
        mentions_self: bool,
        author_is_admin: bool,
        text: String,
    },
}

/// Core message capability — implement for any messaging platform
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Post a new message and return a handle to it
    async fn send(&self, channel_id: &str, text: &str) -> anyhow::Result<MessageHandle>;

    /// Replace the text of a previously sent message
    async fn edit(&self, handle: &MessageHandle, text: &str) -> anyhow::Result<()>;

    /// Delete a previously sent message
    async fn delete(&self, handle: &MessageHandle) -> anyhow::Result<()>;

    /// React to any message with an emoji
    async fn react(&self, channel_id: &str, message_id: &str, emoji: &str) -> anyhow::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct DummySink;

    #[async_trait]
    impl MessageSink for DummySink {
        async fn send(&self, channel_id: &str, _text: &str) -> anyhow::Result<MessageHandle> {
            Ok(MessageHandle {
                channel_id: channel_id.to_string(),
                message_id: "1".to_string(),
            })
        }

        async fn edit(&self, _handle: &MessageHandle, _text: &str) -> anyhow::Result<()> {
            Ok(())
        }

        async fn delete(&self, _handle: &MessageHandle) -> anyhow::Result<()> {
            Ok(())
        }

        async fn react(
            &self,
            _channel_id: &str,
            _message_id: &str,
            _emoji: &str,
        ) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn send_returns_handle_for_channel() {
        let sink = DummySink;
        let handle = sink.send("chan", "hello").await.unwrap();
        assert_eq!(handle.channel_id, "chan");
        assert_eq!(handle.message_id, "1");
    }

    #[tokio::test]
    async fn handle_round_trips_through_edit_and_delete() {
        let sink = DummySink;
        let handle = sink.send("chan", "hello").await.unwrap();
        assert!(sink.edit(&handle, "changed").await.is_ok());
        assert!(sink.delete(&handle).await.is_ok());
    }

    #[test]
    fn gateway_event_clone_preserves_fields() {
        let event = GatewayEvent::TypingStart {
            user_id: "u1".into(),
            guild_id: "g1".into(),
            channel_id: "c1".into(),
            is_bot: false,
        };

        let GatewayEvent::TypingStart {
            user_id,
            guild_id,
            channel_id,
            is_bot,
        } = event.clone()
        else {
            panic!("wrong variant");
        };
        assert_eq!(user_id, "u1");
        assert_eq!(guild_id, "g1");
        assert_eq!(channel_id, "c1");
        assert!(!is_bot);
    }
}
