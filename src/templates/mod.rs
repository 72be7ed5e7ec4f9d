//! PL-006: Template registry and invocation call surface.
//!
//! A template is a named, reusable generator: given a call (project,
//! environment, resolved context), it produces resource descriptors.
//! Duplicate-name policy is configurable. The default is overwrite — last
//! registration wins, since templates are code and shadowing a built-in
//! with a local variant is routine. Catalog declarations are the opposite:
//! a duplicate there is always fatal.

pub mod assumed_role;
pub mod deployer;

use crate::core::context;
use crate::core::error::{DeclKind, Error};
use crate::core::types::{Context, ContextValue, Environment, Project, ResourceDescriptor};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Generator function: invoked once per materialization with a resolved call.
pub type GeneratorFn = fn(&TemplateCall) -> Result<Vec<ResourceDescriptor>, Error>;

/// A registered template: required context keys plus the generator.
#[derive(Debug, Clone)]
pub struct Template {
    pub required_keys: &'static [&'static str],
    pub generate: GeneratorFn,
}

/// What `register` does when a name is already taken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Last registration wins.
    #[default]
    Overwrite,
    /// Fail with `DuplicateDeclaration`, matching catalog semantics.
    Reject,
}

#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    templates: IndexMap<String, Template>,
    policy: DuplicatePolicy,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: DuplicatePolicy) -> Self {
        Self {
            templates: IndexMap::new(),
            policy,
        }
    }

    /// Registry pre-loaded with the built-in templates.
    pub fn builtin() -> Self {
        let mut templates = IndexMap::new();
        templates.insert(assumed_role::NAME.to_string(), assumed_role::template());
        templates.insert(deployer::NAME.to_string(), deployer::template());
        Self {
            templates,
            policy: DuplicatePolicy::default(),
        }
    }

    /// Register a template under a name.
    ///
    /// Under `DuplicatePolicy::Overwrite` (the default) a repeated name
    /// replaces the earlier registration — last wins. Under `Reject` a
    /// repeated name fails with `DuplicateDeclaration`.
    pub fn register(&mut self, name: &str, template: Template) -> Result<(), Error> {
        if self.templates.contains_key(name) {
            match self.policy {
                DuplicatePolicy::Overwrite => {
                    tracing::debug!(template = name, "re-registered template, last wins");
                }
                DuplicatePolicy::Reject => {
                    return Err(Error::DuplicateDeclaration {
                        kind: DeclKind::Template,
                        name: name.to_string(),
                    });
                }
            }
        }
        self.templates.insert(name.to_string(), template);
        Ok(())
    }

    /// Look up a template. Fails with `UnknownTemplate` if absent.
    pub fn resolve(&self, name: &str) -> Result<&Template, Error> {
        self.templates
            .get(name)
            .ok_or_else(|| Error::UnknownTemplate(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Template)> {
        self.templates.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

// ============================================================================
// Template call
// ============================================================================

/// A resolved template invocation handed to a generator.
#[derive(Debug)]
pub struct TemplateCall<'a> {
    /// Template name, for error messages
    pub template: &'a str,
    pub project: &'a Project,
    pub environment: &'a Environment,
    pub context: &'a Context,
    /// Directory file-valued context keys resolve against
    pub base_dir: &'a Path,
    /// Environment snapshot for policy rendering
    pub env: &'a HashMap<String, String>,
}

impl TemplateCall<'_> {
    fn get(&self, key: &str) -> Result<&ContextValue, Error> {
        self.context.get(key).ok_or_else(|| Error::MissingRequiredKey {
            template: self.template.to_string(),
            key: key.to_string(),
        })
    }

    pub fn str_value(&self, key: &str) -> Result<&str, Error> {
        self.get(key)?.as_str().ok_or_else(|| {
            Error::validation(format!(
                "template '{}': context key '{}' must be a string",
                self.template, key
            ))
        })
    }

    /// A string-valued key that may be absent.
    pub fn opt_str(&self, key: &str) -> Result<Option<&str>, Error> {
        match self.context.get(key) {
            None => Ok(None),
            Some(v) => v
                .as_str()
                .map(Some)
                .ok_or_else(|| {
                    Error::validation(format!(
                        "template '{}': context key '{}' must be a string",
                        self.template, key
                    ))
                }),
        }
    }

    /// A list-valued key. A single string normalizes to a one-element list.
    pub fn list(&self, key: &str) -> Result<Vec<String>, Error> {
        self.get(key)?.as_list().ok_or_else(|| {
            Error::validation(format!(
                "template '{}': context key '{}' must be a string or list",
                self.template, key
            ))
        })
    }

    /// A nested mapping; empty when the key is absent.
    pub fn map_or_empty(&self, key: &str) -> Result<Context, Error> {
        match self.context.get(key) {
            None => Ok(Context::new()),
            Some(v) => v.as_map().cloned().ok_or_else(|| {
                Error::validation(format!(
                    "template '{}': context key '{}' must be a mapping",
                    self.template, key
                ))
            }),
        }
    }

    /// Resolve a file-valued context key against the base directory.
    pub fn file(&self, key: &str) -> Result<PathBuf, Error> {
        let raw = self.str_value(key)?;
        let path = Path::new(raw);
        if path.is_absolute() {
            Ok(path.to_path_buf())
        } else {
            Ok(self.base_dir.join(path))
        }
    }

    /// Render the policy document a file-valued key points at.
    pub fn render_policy(&self, key: &str, render_ctx: &Context) -> Result<serde_json::Value, Error> {
        let path = self.file(key)?;
        let site = format!("{}.{}", self.template, key);
        context::render_policy_file(&path, &site, self.env, render_ctx)
    }
}

// ============================================================================
// Shared document helpers
// ============================================================================

/// Build an sts:AssumeRole trust policy for a principal entry.
pub fn trust_policy(principal: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "Version": "2012-10-17",
        "Statement": [{
            "Effect": "Allow",
            "Principal": principal,
            "Action": "sts:AssumeRole",
        }]
    })
}

/// Tags stamped onto a generated role: the project's tags plus ProjectName
/// and ConfigName defaults — the tags a step deployer validates on every
/// role it touches before deploying.
pub fn role_tags(project: &Project, environment: &Environment) -> serde_json::Value {
    let mut tags = project.tags.clone();
    tags.entry("ProjectName".to_string())
        .or_insert_with(|| project.full_name());
    tags.entry("ConfigName".to_string())
        .or_insert_with(|| environment.name.clone());

    serde_json::Value::Array(
        tags.iter()
            .map(|(k, v)| serde_json::json!({"Key": k, "Value": v}))
            .collect(),
    )
}
