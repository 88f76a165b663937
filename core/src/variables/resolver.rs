//! Bounded-depth template evaluation

use std::sync::Arc;

use serde_json::{Map, Value};

use super::builtin::value_to_text;
use super::definition::{EvalScope, VariableRegistry};
use super::parser::{self, Handle, Segment, Sigil};
use super::{ResolveMode, VariableError};
use crate::custom_variables::CustomVariableStore;
use crate::trigger::TriggerContext;

pub const DEFAULT_MAX_DEPTH: usize = 10;

/// Expands `$name[...]` and `&name[...]` handles in effect arguments.
///
/// Arguments are resolved before the variable that receives them. Text
/// produced by a variable is only expanded again when the variable opts in
/// (`ReplaceVariable::expands_result`), and every expansion counts towards
/// `max_depth`.
#[derive(Clone)]
pub struct VariableResolver {
    registry: Arc<VariableRegistry>,
    store: Arc<CustomVariableStore>,
    max_depth: usize,
}

impl VariableResolver {
    pub fn new(registry: Arc<VariableRegistry>, store: Arc<CustomVariableStore>) -> Self {
        Self {
            registry,
            store,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn registry(&self) -> &VariableRegistry {
        &self.registry
    }

    pub fn store(&self) -> &Arc<CustomVariableStore> {
        &self.store
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Resolve a template for execution
    pub fn resolve(&self, template: &str, ctx: &TriggerContext) -> Result<String, VariableError> {
        self.resolve_with_mode(template, ctx, ResolveMode::Execute)
    }

    pub fn resolve_with_mode(
        &self,
        template: &str,
        ctx: &TriggerContext,
        mode: ResolveMode,
    ) -> Result<String, VariableError> {
        let scope = EvalScope {
            trigger: ctx,
            store: &self.store,
            mode,
        };
        self.resolve_at(template, &scope, 0)
    }

    /// Resolve every string leaf of an effect's argument object.
    /// Non-string values pass through untouched.
    pub fn resolve_args(
        &self,
        args: &Map<String, Value>,
        ctx: &TriggerContext,
    ) -> Result<Map<String, Value>, VariableError> {
        args.iter()
            .map(|(key, value)| Ok((key.clone(), self.resolve_value(value, ctx)?)))
            .collect()
    }

    fn resolve_value(&self, value: &Value, ctx: &TriggerContext) -> Result<Value, VariableError> {
        Ok(match value {
            Value::String(s) => Value::String(self.resolve(s, ctx)?),
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.resolve_value(item, ctx))
                    .collect::<Result<_, _>>()?,
            ),
            Value::Object(map) => Value::Object(self.resolve_args(map, ctx)?),
            other => other.clone(),
        })
    }

    fn resolve_at(
        &self,
        template: &str,
        scope: &EvalScope<'_>,
        depth: usize,
    ) -> Result<String, VariableError> {
        if depth > self.max_depth {
            return Err(VariableError::DepthExceeded {
                depth: self.max_depth,
            });
        }
        if !parser::contains_handle(template) {
            return Ok(template.to_string());
        }

        let mut out = String::with_capacity(template.len());
        for segment in parser::parse(template)? {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Handle(handle) => {
                    out.push_str(&self.evaluate_handle(&handle, scope, depth)?);
                }
            }
        }
        Ok(out)
    }

    fn evaluate_handle(
        &self,
        handle: &Handle<'_>,
        scope: &EvalScope<'_>,
        depth: usize,
    ) -> Result<String, VariableError> {
        // A bare `&word` with no output behind it is ordinary text ("Q&A")
        if handle.sigil == Sigil::Ampersand
            && handle.args.is_empty()
            && scope.trigger.outputs().get(handle.name).is_none()
        {
            return Ok(format!("&{}", handle.name));
        }

        let mut args = handle
            .args
            .iter()
            .map(|arg| self.resolve_at(arg, scope, depth + 1))
            .collect::<Result<Vec<_>, _>>()?;

        // `&name[a, b]` is `$effectOutput[name, a.b]`
        let key = match handle.sigil {
            Sigil::Dollar => format!("${}", handle.name),
            Sigil::Ampersand => {
                let path = args.join(".");
                args = vec![handle.name.to_string()];
                if !path.is_empty() {
                    args.push(path);
                }
                "$effectOutput".to_string()
            }
        };

        let Some(variable) = self.registry.get(&key) else {
            tracing::debug!(handle = %key, "Unknown variable, resolving to empty");
            return Ok(String::new());
        };

        let definition = variable.definition();
        if definition.spoof {
            return Err(VariableError::SpoofedVariable {
                handle: definition.handle.clone(),
            });
        }
        if definition.side_effects && scope.mode == ResolveMode::Preview {
            return Err(VariableError::SideEffectInPreview {
                handle: definition.handle.clone(),
            });
        }

        let text = value_to_text(&variable.evaluate(scope, &args)?);
        if variable.expands_result() {
            self.resolve_at(&text, scope, depth + 1)
        } else {
            Ok(text)
        }
    }
}
