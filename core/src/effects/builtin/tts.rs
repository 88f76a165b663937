use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use super::SpeechRequest;
use crate::effects::{EffectDefinition, EffectError, EffectEvent, EffectOutcome, EffectType};

/// Speaks `text`. Completes when the speech consumer signals `done`, so an
/// instance with `wait: true` holds the list until speech finishes.
pub struct TextToSpeechEffect {
    definition: EffectDefinition,
    sink: mpsc::Sender<SpeechRequest>,
}

impl TextToSpeechEffect {
    pub const ID: &'static str = "cuebot:text-to-speech";

    pub fn new(sink: mpsc::Sender<SpeechRequest>) -> Self {
        Self {
            definition: EffectDefinition::new(
                Self::ID,
                "Text-To-Speech",
                "Have the computer read some text out loud.",
            )
            .icon("fad fa-microphone-alt")
            .categories(&["fun"]),
            sink,
        }
    }
}

#[async_trait]
impl EffectType for TextToSpeechEffect {
    fn definition(&self) -> &EffectDefinition {
        &self.definition
    }

    async fn trigger(&self, event: EffectEvent) -> Result<EffectOutcome, EffectError> {
        let text = event.str_arg("text")?;
        let (done, completion) = oneshot::channel();

        self.sink
            .send(SpeechRequest {
                text,
                voice_id: event.opt_str_arg("voiceId").filter(|v| v != "default"),
                done,
            })
            .await
            .map_err(|_| EffectError::Failed("speech service is not running".to_string()))?;

        Ok(EffectOutcome::done().with_completion(completion))
    }
}
