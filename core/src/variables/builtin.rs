//! Built-in replace variables

use std::sync::Arc;

use rand::Rng;
use serde_json::Value;

use super::definition::{EvalScope, ReplaceVariable, VariableDefinition, VariableRegistry};
use super::{ResolveMode, VariableError};

pub(crate) fn register_all(registry: &mut VariableRegistry) {
    registry.register(Arc::new(User::new("$user")));
    registry.register(Arc::new(User::new("$username")));
    registry.register(Arc::new(Arg::new()));
    registry.register(Arc::new(ArgCount::new()));
    registry.register(Arc::new(Target::new()));
    registry.register(Arc::new(TriggerType::new()));
    registry.register(Arc::new(CommandTrigger::new()));
    registry.register(Arc::new(EventData::new()));
    registry.register(Arc::new(EffectOutput::new()));
    registry.register(Arc::new(CustomVariable::new()));
    registry.register(Arc::new(SetCustomVariable::new()));
    registry.register(Arc::new(PresetListArg::new()));
    registry.register(Arc::new(RandomNumber::new()));
    registry.register(Arc::new(If::new()));

    registry.register_spoof(
        VariableDefinition::new(
            "&name",
            "&name[...path?]",
            "Retrieves the value for an effectOutput. If path is specified, walks the item before returning the value",
        )
        .example(
            "&example",
            "Returns the value of the effectOutput 'example'; Synonymous with $effectOutput[example]",
        )
        .example(
            "&example[path, to, value]",
            "Returns the value of the effectOutput 'example'; Synonymous with $effectOutput[example, path.to.value]",
        )
        .categories(&["advanced"])
        .outputs(&["ALL"]),
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Value helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Render a value for substitution into a template
pub(crate) fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Walk a dot-separated path (`a.b.0.c`) into a JSON value
pub(crate) fn walk_path(value: &Value, path: &str) -> Option<Value> {
    let mut current = value;
    for key in path.split('.').map(str::trim).filter(|k| !k.is_empty()) {
        current = match current {
            Value::Object(map) => map.get(key)?,
            Value::Array(items) => items.get(key.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current.clone())
}

fn arg<'a>(args: &'a [String], index: usize) -> Option<&'a str> {
    args.get(index).map(String::as_str).filter(|a| !a.is_empty())
}

fn invalid(handle: &str, reason: impl Into<String>) -> VariableError {
    VariableError::InvalidArgument {
        handle: handle.to_string(),
        reason: reason.into(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Trigger variables
// ─────────────────────────────────────────────────────────────────────────────

struct User(VariableDefinition);

impl User {
    fn new(handle: &str) -> Self {
        Self(
            VariableDefinition::new(handle, handle, "The name of the user who triggered the effect list.")
                .categories(&["common", "user based"]),
        )
    }
}

impl ReplaceVariable for User {
    fn definition(&self) -> &VariableDefinition {
        &self.0
    }

    fn evaluate(&self, scope: &EvalScope<'_>, _args: &[String]) -> Result<Value, VariableError> {
        Ok(Value::String(scope.trigger.username.clone()))
    }
}

struct Arg(VariableDefinition);

impl Arg {
    fn new() -> Self {
        Self(
            VariableDefinition::new("$arg", "$arg[#]", "Grabs the command argument at the given index.")
                .example("$arg[1]", "The first argument")
                .example("$arg[all]", "Every argument joined by spaces")
                .categories(&["common", "trigger based"]),
        )
    }
}

impl ReplaceVariable for Arg {
    fn definition(&self) -> &VariableDefinition {
        &self.0
    }

    fn evaluate(&self, scope: &EvalScope<'_>, args: &[String]) -> Result<Value, VariableError> {
        let command_args = &scope.trigger.metadata.args;
        let Some(index) = arg(args, 0) else {
            return Ok(Value::String(String::new()));
        };

        if index.eq_ignore_ascii_case("all") {
            return Ok(Value::String(command_args.join(" ")));
        }

        let position: usize = index
            .parse()
            .map_err(|_| invalid("$arg", format!("'{index}' is not an index")))?;

        // Indexes are 1-based
        let value = position
            .checked_sub(1)
            .and_then(|i| command_args.get(i))
            .cloned()
            .unwrap_or_default();
        Ok(Value::String(value))
    }
}

struct ArgCount(VariableDefinition);

impl ArgCount {
    fn new() -> Self {
        Self(
            VariableDefinition::new("$argCount", "$argCount", "Number of command arguments.")
                .categories(&["trigger based", "numbers"])
                .outputs(&["number"]),
        )
    }
}

impl ReplaceVariable for ArgCount {
    fn definition(&self) -> &VariableDefinition {
        &self.0
    }

    fn evaluate(&self, scope: &EvalScope<'_>, _args: &[String]) -> Result<Value, VariableError> {
        Ok(Value::from(scope.trigger.metadata.args.len()))
    }
}

struct Target(VariableDefinition);

impl Target {
    fn new() -> Self {
        Self(
            VariableDefinition::new(
                "$target",
                "$target",
                "The target user: explicit trigger target, or the first argument without a leading '@'.",
            )
            .categories(&["common", "user based"]),
        )
    }
}

impl ReplaceVariable for Target {
    fn definition(&self) -> &VariableDefinition {
        &self.0
    }

    fn evaluate(&self, scope: &EvalScope<'_>, _args: &[String]) -> Result<Value, VariableError> {
        let meta = &scope.trigger.metadata;
        let target = meta
            .target
            .clone()
            .or_else(|| meta.args.first().map(|a| a.trim_start_matches('@').to_string()))
            .unwrap_or_default();
        Ok(Value::String(target))
    }
}

struct TriggerType(VariableDefinition);

impl TriggerType {
    fn new() -> Self {
        Self(
            VariableDefinition::new("$triggerType", "$triggerType", "What started this effect list.")
                .categories(&["trigger based"]),
        )
    }
}

impl ReplaceVariable for TriggerType {
    fn definition(&self) -> &VariableDefinition {
        &self.0
    }

    fn evaluate(&self, scope: &EvalScope<'_>, _args: &[String]) -> Result<Value, VariableError> {
        Ok(Value::String(scope.trigger.kind.as_str().to_string()))
    }
}

struct CommandTrigger(VariableDefinition);

impl CommandTrigger {
    fn new() -> Self {
        Self(
            VariableDefinition::new("$commandTrigger", "$commandTrigger", "The trigger of the running command, e.g. !so.")
                .categories(&["trigger based"]),
        )
    }
}

impl ReplaceVariable for CommandTrigger {
    fn definition(&self) -> &VariableDefinition {
        &self.0
    }

    fn evaluate(&self, scope: &EvalScope<'_>, _args: &[String]) -> Result<Value, VariableError> {
        Ok(Value::String(
            scope.trigger.metadata.command_trigger.clone().unwrap_or_default(),
        ))
    }
}

struct EventData(VariableDefinition);

impl EventData {
    fn new() -> Self {
        Self(
            VariableDefinition::new("$eventData", "$eventData[path?]", "Reads the raw event payload.")
                .example("$eventData[bits]", "The 'bits' field of a cheer event")
                .categories(&["trigger based", "advanced"])
                .outputs(&["ALL"]),
        )
    }
}

impl ReplaceVariable for EventData {
    fn definition(&self) -> &VariableDefinition {
        &self.0
    }

    fn evaluate(&self, scope: &EvalScope<'_>, args: &[String]) -> Result<Value, VariableError> {
        let data = &scope.trigger.metadata.event_data;
        Ok(match arg(args, 0) {
            Some(path) => walk_path(data, path).unwrap_or(Value::Null),
            None => data.clone(),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// State variables
// ─────────────────────────────────────────────────────────────────────────────

struct EffectOutput(VariableDefinition);

impl EffectOutput {
    fn new() -> Self {
        Self(
            VariableDefinition::new(
                "$effectOutput",
                "$effectOutput[name, path?]",
                "Value written by an earlier effect in the same run.",
            )
            .example("$effectOutput[winner, user.name]", "Walks into the 'winner' output")
            .categories(&["advanced"])
            .outputs(&["ALL"]),
        )
    }
}

impl ReplaceVariable for EffectOutput {
    fn definition(&self) -> &VariableDefinition {
        &self.0
    }

    fn evaluate(&self, scope: &EvalScope<'_>, args: &[String]) -> Result<Value, VariableError> {
        let Some(name) = arg(args, 0) else {
            return Ok(Value::Null);
        };
        let Some(value) = scope.trigger.outputs().get(name) else {
            return Ok(Value::Null);
        };
        Ok(match arg(args, 1) {
            Some(path) => walk_path(&value, path).unwrap_or(Value::Null),
            None => value,
        })
    }

    fn expands_result(&self) -> bool {
        true
    }
}

struct CustomVariable(VariableDefinition);

impl CustomVariable {
    fn new() -> Self {
        Self(
            VariableDefinition::new(
                "$customVariable",
                "$customVariable[name, path?, default?]",
                "Reads a custom variable. Expired or missing variables yield the default.",
            )
            .example("$customVariable[lastFollower]", "The stored value")
            .example("$customVariable[stats, wins, 0]", "Walks into 'stats', 0 if missing")
            .categories(&["common", "advanced"])
            .outputs(&["ALL"]),
        )
    }
}

impl ReplaceVariable for CustomVariable {
    fn definition(&self) -> &VariableDefinition {
        &self.0
    }

    fn evaluate(&self, scope: &EvalScope<'_>, args: &[String]) -> Result<Value, VariableError> {
        let Some(name) = arg(args, 0) else {
            return Err(invalid("$customVariable", "missing variable name"));
        };
        let fallback = || {
            arg(args, 2)
                .map(|d| Value::String(d.to_string()))
                .unwrap_or(Value::Null)
        };

        let Some(value) = scope.store.get(name) else {
            return Ok(fallback());
        };
        Ok(match arg(args, 1) {
            Some(path) => walk_path(&value, path).unwrap_or_else(fallback),
            None => value,
        })
    }

    fn expands_result(&self) -> bool {
        true
    }
}

struct SetCustomVariable(VariableDefinition);

impl SetCustomVariable {
    fn new() -> Self {
        Self(
            VariableDefinition::new(
                "$setCustomVariable",
                "$setCustomVariable[name, value, ttl?]",
                "Writes a custom variable inline and resolves to nothing.",
            )
            .categories(&["advanced"])
            .with_side_effects(),
        )
    }
}

impl ReplaceVariable for SetCustomVariable {
    fn definition(&self) -> &VariableDefinition {
        &self.0
    }

    fn evaluate(&self, scope: &EvalScope<'_>, args: &[String]) -> Result<Value, VariableError> {
        if scope.mode == ResolveMode::Preview {
            return Err(VariableError::SideEffectInPreview {
                handle: self.0.handle.clone(),
            });
        }
        let Some(name) = arg(args, 0) else {
            return Err(invalid("$setCustomVariable", "missing variable name"));
        };
        let value = args
            .get(1)
            .map(|v| serde_json::from_str(v).unwrap_or_else(|_| Value::String(v.clone())))
            .unwrap_or(Value::Null);
        let ttl = match arg(args, 2) {
            Some(ttl) => Some(
                ttl.parse::<u64>()
                    .map_err(|_| invalid("$setCustomVariable", format!("'{ttl}' is not a ttl")))?,
            ),
            None => None,
        };

        scope.store.set(name, value, ttl);
        Ok(Value::Null)
    }
}

struct PresetListArg(VariableDefinition);

impl PresetListArg {
    fn new() -> Self {
        Self(
            VariableDefinition::new(
                "$presetListArg",
                "$presetListArg[name]",
                "Argument passed to the running preset effect list.",
            )
            .categories(&["advanced"])
            .outputs(&["ALL"]),
        )
    }
}

impl ReplaceVariable for PresetListArg {
    fn definition(&self) -> &VariableDefinition {
        &self.0
    }

    fn evaluate(&self, scope: &EvalScope<'_>, args: &[String]) -> Result<Value, VariableError> {
        Ok(arg(args, 0)
            .and_then(|name| scope.trigger.metadata.preset_args.get(name).cloned())
            .unwrap_or(Value::Null))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Utility variables
// ─────────────────────────────────────────────────────────────────────────────

struct RandomNumber(VariableDefinition);

impl RandomNumber {
    fn new() -> Self {
        Self(
            VariableDefinition::new("$randomNumber", "$randomNumber[min, max]", "Random whole number, inclusive.")
                .example("$randomNumber[1, 6]", "Roll a die")
                .categories(&["common", "numbers"])
                .outputs(&["number"]),
        )
    }
}

impl ReplaceVariable for RandomNumber {
    fn definition(&self) -> &VariableDefinition {
        &self.0
    }

    fn evaluate(&self, _scope: &EvalScope<'_>, args: &[String]) -> Result<Value, VariableError> {
        let bound = |index: usize| -> Result<i64, VariableError> {
            let raw = arg(args, index).ok_or_else(|| invalid("$randomNumber", "expected min and max"))?;
            raw.parse()
                .map_err(|_| invalid("$randomNumber", format!("'{raw}' is not a whole number")))
        };
        let (min, max) = (bound(0)?, bound(1)?);
        if min > max {
            return Err(invalid("$randomNumber", "min is greater than max"));
        }
        Ok(Value::from(rand::thread_rng().gen_range(min..=max)))
    }
}

struct If(VariableDefinition);

impl If {
    fn new() -> Self {
        Self(
            VariableDefinition::new(
                "$if",
                "$if[left, operator, right, then, else?]",
                "Compares two values. Operators: ==, !=, >, >=, <, <=, contains.",
            )
            .example("$if[$argCount, >, 0, has args, no args]", "Branch on argument count")
            .categories(&["advanced"]),
        )
    }
}

impl ReplaceVariable for If {
    fn definition(&self) -> &VariableDefinition {
        &self.0
    }

    fn evaluate(&self, _scope: &EvalScope<'_>, args: &[String]) -> Result<Value, VariableError> {
        if args.len() < 4 {
            return Err(invalid("$if", "expected at least left, operator, right, then"));
        }
        let (left, op, right) = (args[0].as_str(), args[1].as_str(), args[2].as_str());
        let numeric = left.parse::<f64>().ok().zip(right.parse::<f64>().ok());

        let holds = match (op, numeric) {
            ("==", Some((l, r))) => l == r,
            ("!=", Some((l, r))) => l != r,
            ("==", None) => left == right,
            ("!=", None) => left != right,
            (">", Some((l, r))) => l > r,
            (">=", Some((l, r))) => l >= r,
            ("<", Some((l, r))) => l < r,
            ("<=", Some((l, r))) => l <= r,
            (">" | ">=" | "<" | "<=", None) => false,
            ("contains", _) => left.contains(right),
            (other, _) => return Err(invalid("$if", format!("unknown operator '{other}'"))),
        };

        let branch = if holds { args.get(3) } else { args.get(4) };
        Ok(Value::String(branch.cloned().unwrap_or_default()))
    }
}
