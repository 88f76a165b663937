//! Definition loading
//!
//! Load commands, presets, timers and queues from a TOML file or from every
//! `.toml` file under a directory.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use cuebot_types::{Definitions, EffectList};

use super::DefinitionError;

/// Parse definitions from TOML text. `path` is only used for errors.
pub fn parse_definitions(content: &str, path: &Path) -> Result<Definitions, DefinitionError> {
    toml::from_str(content).map_err(|source| DefinitionError::ParseToml {
        path: path.to_path_buf(),
        source,
    })
}

/// Load and validate definitions from a single TOML file
pub fn load_definitions_from_file(path: &Path) -> Result<Definitions, DefinitionError> {
    let content = fs::read_to_string(path).map_err(|source| DefinitionError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;

    let definitions = parse_definitions(&content, path)?;
    validate(&definitions)?;

    tracing::info!(
        path = %path.display(),
        commands = definitions.commands.len(),
        presets = definitions.presets.len(),
        timers = definitions.timers.len(),
        "Loaded definitions"
    );
    Ok(definitions)
}

/// Load every `.toml` file under `dir` (recursively, in path order) and
/// merge them. A missing directory yields no definitions.
pub fn load_definitions_from_dir(dir: &Path) -> Result<Definitions, DefinitionError> {
    let mut merged = Definitions::default();
    if !dir.exists() {
        return Ok(merged);
    }

    let mut files = Vec::new();
    collect_toml_files(dir, &mut files)?;
    files.sort();

    for file in &files {
        let content = fs::read_to_string(file).map_err(|source| DefinitionError::ReadFile {
            path: file.clone(),
            source,
        })?;
        let definitions = parse_definitions(&content, file)?;
        merged.commands.extend(definitions.commands);
        merged.presets.extend(definitions.presets);
        merged.timers.extend(definitions.timers);
        merged.queues.extend(definitions.queues);
    }

    validate(&merged)?;
    tracing::info!(dir = %dir.display(), files = files.len(), "Loaded definition directory");
    Ok(merged)
}

fn collect_toml_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), DefinitionError> {
    let entries = fs::read_dir(dir).map_err(|source| DefinitionError::ReadDir {
        path: dir.to_path_buf(),
        source,
    })?;

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_toml_files(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            out.push(path);
        }
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Validation
// ─────────────────────────────────────────────────────────────────────────────

/// Check ids are present and unique per kind, triggers are unique and
/// timers have a non-zero interval
pub fn validate(definitions: &Definitions) -> Result<(), DefinitionError> {
    unique_ids("command", definitions.commands.iter().map(|c| c.id.as_str()))?;
    unique_ids("preset", definitions.presets.iter().map(|p| p.id.as_str()))?;
    unique_ids("timer", definitions.timers.iter().map(|t| t.id.as_str()))?;
    unique_ids("queue", definitions.queues.iter().map(|q| q.id.as_str()))?;

    let mut triggers = HashSet::new();
    for command in &definitions.commands {
        let trigger = command.trigger.trim().to_lowercase();
        if trigger.is_empty() {
            return Err(invalid("command", &command.id, "trigger is empty"));
        }
        if !triggers.insert(trigger) {
            return Err(DefinitionError::Duplicate {
                kind: "command trigger",
                id: command.trigger.clone(),
            });
        }
        effect_list("command", &command.id, &command.effects)?;
    }

    for preset in &definitions.presets {
        effect_list("preset", &preset.id, &preset.effects)?;
    }

    for timer in &definitions.timers {
        if timer.interval_secs == 0 {
            return Err(invalid("timer", &timer.id, "interval_secs must be greater than zero"));
        }
        effect_list("timer", &timer.id, &timer.effects)?;
    }

    Ok(())
}

fn unique_ids<'a>(
    kind: &'static str,
    ids: impl Iterator<Item = &'a str>,
) -> Result<(), DefinitionError> {
    let mut seen = HashSet::new();
    for id in ids {
        if id.trim().is_empty() {
            return Err(invalid(kind, id, "id is empty"));
        }
        if !seen.insert(id) {
            return Err(DefinitionError::Duplicate {
                kind,
                id: id.to_string(),
            });
        }
    }
    Ok(())
}

fn effect_list(kind: &'static str, owner: &str, list: &EffectList) -> Result<(), DefinitionError> {
    let mut seen = HashSet::new();
    for effect in &list.list {
        if effect.effect_type.trim().is_empty() {
            return Err(invalid(kind, owner, format!("effect '{}' has no type", effect.id)));
        }
        if !seen.insert(effect.id.as_str()) {
            return Err(invalid(kind, owner, format!("effect id '{}' is repeated", effect.id)));
        }
        if let Some(weight) = effect.percent_weight
            && !(0.0..=100.0).contains(&weight)
        {
            return Err(invalid(
                kind,
                owner,
                format!("effect '{}' weight {weight} is outside 0-100", effect.id),
            ));
        }
    }
    Ok(())
}

fn invalid(kind: &'static str, id: &str, reason: impl Into<String>) -> DefinitionError {
    DefinitionError::InvalidDefinition {
        kind,
        id: id.to_string(),
        reason: reason.into(),
    }
}
