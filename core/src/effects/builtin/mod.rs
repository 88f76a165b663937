//! Built-in effect types
//!
//! Chat and speech effects hand their work to outbound channels consumed by
//! the platform layer (the CLI prints them). Everything else acts on engine
//! state directly.

mod chat;
mod custom_variable;
mod delay;
mod effect_output;
mod stop;
mod tts;

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use super::EffectRegistry;
use crate::custom_variables::CustomVariableStore;

pub use chat::ChatEffect;
pub use custom_variable::CustomVariableEffect;
pub use delay::DelayEffect;
pub use effect_output::EffectOutputEffect;
pub use stop::StopEffectExecution;
pub use tts::TextToSpeechEffect;

const OUTBOUND_CAPACITY: usize = 32;

/// Chat message for the platform layer
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub text: String,
    /// Send as a whisper to this user instead of the channel
    pub whisper_to: Option<String>,
    pub triggered_by: String,
}

/// Speech request; send `()` on `done` once spoken
#[derive(Debug)]
pub struct SpeechRequest {
    pub text: String,
    pub voice_id: Option<String>,
    pub done: oneshot::Sender<()>,
}

/// Sending half held by the built-in effects
#[derive(Debug, Clone)]
pub struct EffectSinks {
    pub chat: mpsc::Sender<ChatMessage>,
    pub speech: mpsc::Sender<SpeechRequest>,
}

/// Receiving half handed to the platform layer
#[derive(Debug)]
pub struct Outbound {
    pub chat: mpsc::Receiver<ChatMessage>,
    pub speech: mpsc::Receiver<SpeechRequest>,
}

pub fn outbound_channels() -> (EffectSinks, Outbound) {
    let (chat_tx, chat_rx) = mpsc::channel(OUTBOUND_CAPACITY);
    let (speech_tx, speech_rx) = mpsc::channel(OUTBOUND_CAPACITY);
    (
        EffectSinks {
            chat: chat_tx,
            speech: speech_tx,
        },
        Outbound {
            chat: chat_rx,
            speech: speech_rx,
        },
    )
}

/// Register every built-in effect type
pub fn register_builtins(
    registry: &mut EffectRegistry,
    sinks: &EffectSinks,
    store: &Arc<CustomVariableStore>,
) {
    registry.register(Arc::new(ChatEffect::new(sinks.chat.clone())));
    registry.register(Arc::new(TextToSpeechEffect::new(sinks.speech.clone())));
    registry.register(Arc::new(DelayEffect::new()));
    registry.register(Arc::new(CustomVariableEffect::new(Arc::clone(store))));
    registry.register(Arc::new(EffectOutputEffect::new()));
    registry.register(Arc::new(StopEffectExecution::new()));
}
