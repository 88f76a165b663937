//! Effect types
//!
//! An effect is one declarative action in an effect list. Handlers implement
//! [`EffectType`] and are looked up by type id through [`EffectRegistry`].
//!
//! ```text
//! EffectInstance { type: "cuebot:chat", args: { message: "hi $user" } }
//!                              │
//!                 resolve args against TriggerContext
//!                              │
//!                              ▼
//!            EffectRegistry["cuebot:chat"].trigger(event)
//!                              │
//!                              ▼
//!         EffectOutcome { outputs, completion?, control }
//! ```

pub mod builtin;
mod definition;
mod error;
mod registry;

pub use builtin::{
    ChatMessage, EffectSinks, Outbound, SpeechRequest, outbound_channels, register_builtins,
};
pub use definition::{
    Completion, EffectDefinition, EffectEvent, EffectOutcome, EffectType, ListControl,
};
pub use error::EffectError;
pub use registry::EffectRegistry;
