use std::io::Write;
use std::time::Duration;

use cuebot_core::context::EngineConfigExt;
use cuebot_core::{
    ApiRequest, CommandDispatch, EffectStatus, EngineConfig, EngineError, Method, PresetDispatch,
    QueueTicket, RunResult, TimerAction, TriggerContext, TriggerKind,
};
use cuebot_types::CommandKind;
use serde_json::{Map, Value};

use crate::CliContext;

fn print_ticket(ticket: &QueueTicket) {
    println!(
        "Queued on '{}' (entry {}, {} ahead)",
        ticket.queue, ticket.entry_id, ticket.position
    );
}

fn print_run_result(result: &RunResult) {
    for record in &result.effects {
        let status = match &record.status {
            EffectStatus::Success => "ok".to_string(),
            EffectStatus::Skipped { reason } => format!("skipped ({reason:?})"),
            EffectStatus::Failed { error } => format!("failed: {error}"),
        };
        println!("  {:<16} {:<32} {}", record.effect_id, record.effect_type, status);
    }
    if result.stopped {
        println!("  list stopped early");
    }
    if result.aborted {
        println!("  list aborted");
    }
    for (name, value) in &result.outputs {
        println!("  &{name} = {value}");
    }
}

/// Simulate a chat message from `user`
pub async fn chat(ctx: &CliContext, user: &str, message: &str) -> Result<(), String> {
    match ctx.engine.dispatcher().dispatch_chat(user, message).await {
        None => println!("No command matches '{message}'"),
        Some(Ok(CommandDispatch::Started(ticket))) => print_ticket(&ticket),
        Some(Ok(CommandDispatch::OnCooldown {
            scope,
            remaining_secs,
        })) => println!("On {scope} cooldown for another {remaining_secs}s"),
        Some(Err(e)) => return Err(e.to_string()),
    }
    Ok(())
}

/// Run a preset list. `args` are `name=value` pairs.
pub async fn preset(
    ctx: &CliContext,
    id: &str,
    args: &[String],
    user: Option<&str>,
    wait: bool,
) -> Result<(), String> {
    let mut preset_args = Map::new();
    for pair in args {
        let (name, value) = pair
            .split_once('=')
            .ok_or_else(|| format!("expected name=value, got '{pair}'"))?;
        preset_args.insert(name.to_string(), Value::String(value.to_string()));
    }

    let dispatch = ctx
        .engine
        .dispatcher()
        .dispatch_preset(id, preset_args, user, wait)
        .await
        .map_err(|e| e.to_string())?;

    match dispatch {
        PresetDispatch::Completed(result) => {
            println!("Preset '{id}' finished");
            print_run_result(&result);
        }
        PresetDispatch::Acknowledged(ticket) => print_ticket(&ticket),
    }
    Ok(())
}

pub fn list_commands(ctx: &CliContext) {
    let commands = ctx.engine.dispatcher().commands(None);
    if commands.is_empty() {
        println!("No commands defined");
        return;
    }

    println!("{:<16} {:<16} {:<8} {:<8} Cooldown (user/global)", "Trigger", "Id", "Kind", "Active");
    println!("{}", "-".repeat(72));
    for c in commands {
        let kind = match c.kind {
            CommandKind::System => "system",
            CommandKind::Custom => "custom",
        };
        println!(
            "{:<16} {:<16} {:<8} {:<8} {}s/{}s",
            c.trigger, c.id, kind, c.active, c.cooldown.user_secs, c.cooldown.global_secs
        );
    }
}

pub fn list_queues(ctx: &CliContext) {
    let queues = ctx.engine.queues().list();
    if queues.is_empty() {
        println!("No queues yet");
        return;
    }

    println!(
        "{:<20} {:<8} {:<8} {:<8} {:<10} {:<10} Interval",
        "Queue", "Paused", "Pending", "Running", "Completed", "Failed"
    );
    println!("{}", "-".repeat(80));
    for q in queues {
        println!(
            "{:<20} {:<8} {:<8} {:<8} {:<10} {:<10} {}ms",
            q.id, q.paused, q.pending_count, q.currently_running, q.completed, q.failed, q.interval_ms
        );
    }
}

/// pause | resume | toggle | clear | interval=<ms>
pub fn queue_action(ctx: &CliContext, id: &str, action: &str) -> Result<(), String> {
    let queues = ctx.engine.queues();
    if !queues.contains(id) {
        return Err(format!("queue '{id}' not found"));
    }

    let state = match action {
        "pause" => queues.pause(id),
        "resume" => queues.resume(id),
        "toggle" => queues.toggle(id),
        "clear" => {
            let discarded = queues.clear(id);
            println!("Discarded {discarded} pending entries");
            queues.state(id)
        }
        other => match other.strip_prefix("interval=") {
            Some(ms) => {
                let ms: u64 = ms.parse().map_err(|_| format!("invalid interval '{ms}'"))?;
                queues.set_interval(id, Duration::from_millis(ms))
            }
            None => return Err(format!("unknown queue action '{other}'")),
        },
    };

    println!(
        "{}: paused={} pending={} running={}",
        state.id, state.paused, state.pending_count, state.currently_running
    );
    Ok(())
}

pub fn list_timers(ctx: &CliContext) {
    let timers = ctx.engine.timers().timers();
    if timers.is_empty() {
        println!("No timers defined");
        return;
    }
    for t in timers {
        println!(
            "{:<20} every {:>5}s  active={} running={}",
            t.id, t.interval_secs, t.active, t.running
        );
    }
}

pub fn timer_action(ctx: &CliContext, id: &str, action: &str) -> Result<(), String> {
    let action: TimerAction = action.parse().map_err(|e: EngineError| e.to_string())?;
    let status = ctx
        .engine
        .timers()
        .apply(id, action)
        .map_err(|e| e.to_string())?;
    println!("{}: active={} running={}", status.id, status.active, status.running);
    Ok(())
}

pub fn list_vars(ctx: &CliContext) {
    let entries = ctx.engine.store().entries();
    if entries.is_empty() {
        println!("No custom variables");
        return;
    }
    for (name, variable) in entries {
        match variable.expires_at {
            Some(at) => println!("{name} = {} (expires {at})", variable.value),
            None => println!("{name} = {}", variable.value),
        }
    }
}

pub fn get_var(ctx: &CliContext, name: &str) {
    match ctx.engine.store().get(name) {
        Some(value) => println!("{value}"),
        None => println!("'{name}' is not set"),
    }
}

/// Values holding JSON are stored parsed
pub fn set_var(ctx: &CliContext, name: &str, value: &str, ttl: Option<u64>) {
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    ctx.engine.store().set(name, value, ttl);
}

pub fn list_effects(ctx: &CliContext) {
    for definition in ctx.engine.effects().definitions() {
        println!("{:<32} {}", definition.id, definition.name);
    }
}

pub fn list_variables(ctx: &CliContext) {
    for entry in ctx.engine.variables().catalog() {
        let spoof = if entry.definition.spoof { " (alias)" } else { "" };
        println!("{:<40} {}{}", entry.definition.usage, entry.definition.description, spoof);
    }
}

/// Resolve a template without side effects
pub fn preview(ctx: &CliContext, template: &str, user: &str, args: &[String]) -> Result<(), String> {
    let trigger = TriggerContext::new(TriggerKind::Manual, user).with_args(args.iter().cloned());
    let resolved = ctx.engine.preview(template, &trigger).map_err(|e| e.to_string())?;
    println!("{resolved}");
    Ok(())
}

/// Send a raw request through the router
pub async fn api(ctx: &CliContext, method: &str, path: &str, body: Option<&str>) -> Result<(), String> {
    let method: Method = method.parse().map_err(|e: EngineError| e.to_string())?;
    let body = match body {
        Some(raw) => serde_json::from_str(raw).map_err(|e| format!("invalid JSON body: {e}"))?,
        None => Value::Null,
    };

    let response = ctx
        .router
        .handle(ApiRequest::new(method, path).with_body(body))
        .await;
    let pretty = serde_json::to_string_pretty(&response.body).map_err(|e| e.to_string())?;
    println!("{} {}", response.status, pretty);
    Ok(())
}

pub fn reload(ctx: &CliContext) -> Result<(), String> {
    let definitions = ctx.reload()?;
    println!(
        "Reloaded {} commands, {} presets, {} timers from {}",
        definitions.commands.len(),
        definitions.presets.len(),
        definitions.timers.len(),
        ctx.definitions_path.display()
    );
    Ok(())
}

pub fn show_config(ctx: &CliContext) {
    match EngineConfig::config_path() {
        Ok(path) => println!("Config file:      {}", path.display()),
        Err(e) => println!("Config file:      unavailable ({e})"),
    }
    println!("Definitions:      {}", ctx.definitions_path.display());
    println!("Bot name:         {}", ctx.config.bot_name);
    println!("Variable depth:   {}", ctx.config.max_variable_depth);
    println!("Sweep interval:   {}s", ctx.config.variable_sweep_interval_secs);
    println!("Queue interval:   {}ms", ctx.config.default_queue_interval_ms);
}

pub fn exit(ctx: &CliContext) {
    ctx.engine.shutdown();
    let _ = write!(std::io::stdout(), "quitting...");
    let _ = std::io::stdout().flush();
}
