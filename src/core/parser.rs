//! PL-003: Declaration parsing and structural validation.
//!
//! Parses plasmar.yaml and validates structural constraints:
//! - Version must be "1.0"
//! - Project environment references must exist
//! - Invocation project references must exist
//! - Invocation templates must be registered, with required keys present

use super::error::Error;
use super::types::PlasmarConfig;
use crate::templates::TemplateRegistry;
use std::path::Path;

/// A single validation finding.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub message: String,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

fn issue(issues: &mut Vec<ValidationIssue>, message: String) {
    issues.push(ValidationIssue { message });
}

/// Parse a plasmar.yaml file from disk.
pub fn parse_config_file(path: &Path) -> Result<PlasmarConfig, Error> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_config(&content)
}

/// Parse a plasmar.yaml from a string.
pub fn parse_config(yaml: &str) -> Result<PlasmarConfig, Error> {
    Ok(serde_yaml_ng::from_str(yaml)?)
}

/// Validate a parsed declaration against a template registry.
/// Returns a list of issues (empty = valid).
pub fn validate_config(
    config: &PlasmarConfig,
    registry: &TemplateRegistry,
) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if config.version != "1.0" {
        issue(
            &mut issues,
            format!("version must be \"1.0\", got \"{}\"", config.version),
        );
    }

    if config.name.is_empty() {
        issue(&mut issues, "name must not be empty".to_string());
    }

    for (name, project) in &config.projects {
        if project.environments.is_empty() {
            issue(
                &mut issues,
                format!("project '{}' declares no environments", name),
            );
        }
        for env_name in &project.environments {
            if !config.environments.contains_key(env_name) {
                issue(
                    &mut issues,
                    format!(
                        "project '{}' references unknown environment '{}'",
                        name, env_name
                    ),
                );
            }
        }
    }

    for (id, invocation) in &config.resources {
        if !config.projects.contains_key(&invocation.project) {
            issue(
                &mut issues,
                format!(
                    "resource '{}' references unknown project '{}'",
                    id, invocation.project
                ),
            );
        }

        match registry.resolve(&invocation.template) {
            Err(_) => issue(
                &mut issues,
                format!(
                    "resource '{}' references unknown template '{}'",
                    id, invocation.template
                ),
            ),
            Ok(template) => {
                for key in template.required_keys {
                    if !invocation.context.contains_key(*key) {
                        issue(
                            &mut issues,
                            format!(
                                "resource '{}' ({}) missing required context key '{}'",
                                id, invocation.template, key
                            ),
                        );
                    }
                }
            }
        }
    }

    issues
}
