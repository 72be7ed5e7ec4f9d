//! PL-005: Context resolution — merge, required-key checks, and
//! `{{env.*}}` / `{{context.*}}` template interpolation.
//!
//! `build` is a pure merge: identical inputs always produce an identical
//! mapping, and later values win for a repeated key. Policy template files
//! are resolved against a caller-supplied base directory, never the process
//! working directory.

use super::error::Error;
use super::types::{Context, ContextValue};
use std::collections::HashMap;
use std::path::Path;

/// Merge a base context with overrides. Pure: neither input is mutated.
/// Override values win for a repeated key; insertion order is preserved,
/// with new override keys appended after the base keys.
pub fn build(base: &Context, overrides: &Context) -> Context {
    let mut merged = base.clone();
    for (key, value) in overrides {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Check that every required key is present after merging.
pub fn require_keys(template: &str, context: &Context, required: &[&str]) -> Result<(), Error> {
    for key in required {
        if !context.contains_key(*key) {
            return Err(Error::MissingRequiredKey {
                template: template.to_string(),
                key: (*key).to_string(),
            });
        }
    }
    Ok(())
}

/// Capture the process environment as an injectable snapshot.
pub fn env_snapshot() -> HashMap<String, String> {
    std::env::vars().collect()
}

/// Resolve all template variables in a string.
///
/// `{{env.NAME}}` reads from the environment snapshot; `{{context.key}}`
/// reads from the context when one is available (strings splice verbatim,
/// lists and maps as JSON). `site` names the rendering location for error
/// messages.
pub fn interpolate(
    template: &str,
    site: &str,
    env: &HashMap<String, String>,
    context: Option<&Context>,
) -> Result<String, Error> {
    let mut result = template.to_string();
    let mut start = 0;

    while let Some(open) = result[start..].find("{{") {
        let open = start + open;
        let close = result[open..].find("}}").ok_or_else(|| {
            Error::validation(format!("unclosed template at position {} in {}", open, site))
        })?;
        let close = open + close + 2;
        let key = result[open + 2..close - 2].trim().to_string();

        let value = if let Some(var) = key.strip_prefix("env.") {
            env.get(var)
                .cloned()
                .ok_or_else(|| Error::MissingEnvironmentVariable(var.to_string()))?
        } else if let Some(ctx_key) = key.strip_prefix("context.") {
            let context = context.ok_or_else(|| {
                Error::validation(format!(
                    "context variables are not available in {}",
                    site
                ))
            })?;
            context
                .get(ctx_key)
                .map(ContextValue::render)
                .ok_or_else(|| Error::MissingRequiredKey {
                    template: site.to_string(),
                    key: ctx_key.to_string(),
                })?
        } else {
            return Err(Error::validation(format!(
                "unknown template variable '{}' in {}",
                key, site
            )));
        };

        result.replace_range(open..close, &value);
        start = open + value.len();
    }

    Ok(result)
}

/// Resolve `{{env.*}}` references in a declaration string.
/// Context variables are not in scope at declaration time.
pub fn resolve_env(s: &str, env: &HashMap<String, String>, site: &str) -> Result<String, Error> {
    interpolate(s, site, env, None)
}

/// Resolve `{{env.*}}` references across every string leaf of a context,
/// including list elements and nested mappings.
pub fn resolve_context_env(
    context: &Context,
    env: &HashMap<String, String>,
    site: &str,
) -> Result<Context, Error> {
    let mut resolved = Context::new();
    for (key, value) in context {
        resolved.insert(key.clone(), resolve_value_env(value, env, site)?);
    }
    Ok(resolved)
}

fn resolve_value_env(
    value: &ContextValue,
    env: &HashMap<String, String>,
    site: &str,
) -> Result<ContextValue, Error> {
    match value {
        ContextValue::Str(s) => Ok(ContextValue::Str(resolve_env(s, env, site)?)),
        ContextValue::List(items) => items
            .iter()
            .map(|s| resolve_env(s, env, site))
            .collect::<Result<Vec<_>, _>>()
            .map(ContextValue::List),
        ContextValue::Map(m) => resolve_context_env(m, env, site).map(ContextValue::Map),
    }
}

/// Render a policy document template file: read, interpolate, parse as JSON.
pub fn render_policy_file(
    path: &Path,
    site: &str,
    env: &HashMap<String, String>,
    context: &Context,
) -> Result<serde_json::Value, Error> {
    let raw = std::fs::read_to_string(path).map_err(|e| Error::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let rendered = interpolate(&raw, site, env, Some(context))?;
    serde_json::from_str(&rendered).map_err(|e| Error::PolicyJson {
        path: path.to_path_buf(),
        source: e,
    })
}
