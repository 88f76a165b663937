use async_trait::async_trait;
use tokio::sync::mpsc;

use super::ChatMessage;
use crate::effects::{EffectDefinition, EffectError, EffectEvent, EffectOutcome, EffectType};

pub struct ChatEffect {
    definition: EffectDefinition,
    sink: mpsc::Sender<ChatMessage>,
}

impl ChatEffect {
    pub const ID: &'static str = "cuebot:chat";

    pub fn new(sink: mpsc::Sender<ChatMessage>) -> Self {
        Self {
            definition: EffectDefinition::new(Self::ID, "Chat", "Send a chat message.")
                .icon("fad fa-comment-lines")
                .categories(&["common", "chat based"])
                .dependencies(&["chat"]),
            sink,
        }
    }
}

#[async_trait]
impl EffectType for ChatEffect {
    fn definition(&self) -> &EffectDefinition {
        &self.definition
    }

    async fn trigger(&self, event: EffectEvent) -> Result<EffectOutcome, EffectError> {
        let text = event.str_arg("message")?;
        if text.trim().is_empty() {
            return Err(EffectError::invalid("message", "message is empty"));
        }

        let message = ChatMessage {
            text,
            whisper_to: event.opt_str_arg("whisper").filter(|w| !w.is_empty()),
            triggered_by: event.context.username.clone(),
        };
        self.sink
            .send(message)
            .await
            .map_err(|_| EffectError::Failed("chat connection is closed".to_string()))?;

        Ok(EffectOutcome::done())
    }
}
