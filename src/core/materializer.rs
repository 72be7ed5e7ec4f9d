//! PL-009: Descriptor materialization.
//!
//! Validates the invocation target, resolves the template, checks required
//! context keys, and invokes the generator. Reads policy files; performs no
//! other filesystem or network effects — handing descriptors to a provider
//! adapter is the caller's job. Any validation failure aborts the run
//! before a single descriptor is produced.

use super::catalog::Catalog;
use super::context;
use super::error::Error;
use super::types::{Context, PlasmarConfig, ResourceDescriptor};
use crate::templates::{TemplateCall, TemplateRegistry};
use std::collections::HashMap;
use std::path::Path;

/// Everything a materialization run needs besides the invocation itself.
pub struct Materializer<'a> {
    pub catalog: &'a Catalog,
    pub registry: &'a TemplateRegistry,
    /// Directory file-valued context keys resolve against
    /// (the declaration file's directory, not the process CWD)
    pub base_dir: &'a Path,
    /// Target environment name
    pub environment: &'a str,
    /// Environment snapshot for `{{env.*}}` references
    pub env: &'a HashMap<String, String>,
}

impl Materializer<'_> {
    /// Materialize one template invocation into descriptors.
    pub fn materialize(
        &self,
        template_name: &str,
        project_name: &str,
        context: &Context,
    ) -> Result<Vec<ResourceDescriptor>, Error> {
        let project = self.catalog.project(project_name).ok_or_else(|| {
            Error::validation(format!("unknown project '{}'", project_name))
        })?;

        // Every environment the project references must have been declared.
        for env_name in &project.environments {
            if self.catalog.environment(env_name).is_none() {
                return Err(Error::validation(format!(
                    "project '{}' references undeclared environment '{}'",
                    project_name, env_name
                )));
            }
        }

        if !project.environments.iter().any(|e| e == self.environment) {
            return Err(Error::validation(format!(
                "project '{}' is not declared for environment '{}'",
                project_name, self.environment
            )));
        }
        let environment = self.catalog.environment(self.environment).ok_or_else(|| {
            Error::validation(format!("unknown environment '{}'", self.environment))
        })?;

        let template = self.registry.resolve(template_name)?;
        context::require_keys(template_name, context, template.required_keys)?;

        let call = TemplateCall {
            template: template_name,
            project,
            environment,
            context,
            base_dir: self.base_dir,
            env: self.env,
        };
        let descriptors = (template.generate)(&call)?;
        tracing::info!(
            template = template_name,
            project = project_name,
            count = descriptors.len(),
            "materialized"
        );
        Ok(descriptors)
    }

    /// Materialize every invocation in a declaration, in declaration order,
    /// resolving `{{env.*}}` in each invocation context first. An optional
    /// project filter restricts the run to one project's invocations.
    pub fn materialize_config(
        &self,
        decl: &PlasmarConfig,
        project_filter: Option<&str>,
    ) -> Result<Vec<ResourceDescriptor>, Error> {
        let mut all = Vec::new();
        for (id, invocation) in &decl.resources {
            if let Some(filter) = project_filter {
                if invocation.project != filter {
                    continue;
                }
            }
            let site = format!("resources.{}", id);
            let resolved = context::resolve_context_env(&invocation.context, self.env, &site)?;
            all.extend(self.materialize(&invocation.template, &invocation.project, &resolved)?);
        }
        Ok(all)
    }
}
