//! PL-004: Environment and project catalog.
//!
//! An explicit value threaded through declaration and materialization — not
//! a process-wide singleton. Populated once during the declaration phase,
//! frozen, then read-only. Re-declaring a name is fatal: infrastructure
//! targets are never silently overwritten. Project environment references
//! are checked at materialization time, before template resolution.

use super::context;
use super::error::{DeclKind, Error};
use super::types::{Environment, PlasmarConfig, Project};
use indexmap::IndexMap;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    environments: IndexMap<String, Environment>,
    projects: IndexMap<String, Project>,
    frozen: bool,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an environment. Fails on a repeated name or a frozen catalog.
    pub fn declare_environment(&mut self, env: Environment) -> Result<(), Error> {
        self.check_open("environment")?;
        if self.environments.contains_key(&env.name) {
            return Err(Error::DuplicateDeclaration {
                kind: DeclKind::Environment,
                name: env.name,
            });
        }
        tracing::debug!(environment = %env.name, region = %env.region, "declared environment");
        self.environments.insert(env.name.clone(), env);
        Ok(())
    }

    /// Declare a project. Fails on a repeated name or a frozen catalog.
    pub fn declare_project(&mut self, project: Project) -> Result<(), Error> {
        self.check_open("project")?;
        if self.projects.contains_key(&project.name) {
            return Err(Error::DuplicateDeclaration {
                kind: DeclKind::Project,
                name: project.name,
            });
        }
        tracing::debug!(project = %project.name, org = %project.org, "declared project");
        self.projects.insert(project.name.clone(), project);
        Ok(())
    }

    /// End the declaration phase. The catalog is read-only afterward.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn environment(&self, name: &str) -> Option<&Environment> {
        self.environments.get(name)
    }

    pub fn project(&self, name: &str) -> Option<&Project> {
        self.projects.get(name)
    }

    pub fn environments(&self) -> &IndexMap<String, Environment> {
        &self.environments
    }

    pub fn projects(&self) -> &IndexMap<String, Project> {
        &self.projects
    }

    fn check_open(&self, what: &str) -> Result<(), Error> {
        if self.frozen {
            return Err(Error::validation(format!(
                "catalog is frozen; cannot declare {} after the declaration phase",
                what
            )));
        }
        Ok(())
    }

    /// Build and freeze a catalog from a parsed declaration, resolving
    /// `{{env.*}}` references in environment fields.
    pub fn from_decl(decl: &PlasmarConfig, env: &HashMap<String, String>) -> Result<Self, Error> {
        let mut catalog = Self::new();

        for (name, d) in &decl.environments {
            let site = format!("environments.{}", name);
            catalog.declare_environment(Environment {
                name: name.clone(),
                region: context::resolve_env(&d.region, env, &site)?,
                account_id: context::resolve_env(&d.account_id, env, &site)?,
            })?;
        }

        for (name, p) in &decl.projects {
            catalog.declare_project(Project {
                name: name.clone(),
                org: p.org.clone(),
                environments: p.environments.clone(),
                tags: p.tags.clone(),
            })?;
        }

        catalog.freeze();
        Ok(catalog)
    }
}
