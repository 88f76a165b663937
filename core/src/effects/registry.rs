use std::collections::HashMap;
use std::sync::Arc;

use super::{EffectDefinition, EffectType};

/// Effect handlers keyed by type id
#[derive(Default, Clone)]
pub struct EffectRegistry {
    effects: HashMap<String, Arc<dyn EffectType>>,
}

impl EffectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a handler under its definition id
    pub fn register(&mut self, effect: Arc<dyn EffectType>) {
        let id = effect.definition().id.clone();
        if self.effects.insert(id.clone(), effect).is_some() {
            tracing::debug!(effect_type = %id, "Replaced effect handler");
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn EffectType>> {
        self.effects.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.effects.contains_key(id)
    }

    pub fn definition(&self, id: &str) -> Option<&EffectDefinition> {
        self.effects.get(id).map(|e| e.definition())
    }

    /// Every definition, sorted by id
    pub fn definitions(&self) -> Vec<EffectDefinition> {
        let mut defs: Vec<_> = self.effects.values().map(|e| e.definition().clone()).collect();
        defs.sort_by(|a, b| a.id.cmp(&b.id));
        defs
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
}
