//! PL-012: CLI subcommands — init, validate, templates, materialize.

use crate::core::catalog::Catalog;
use crate::core::context;
use crate::core::error::Error;
use crate::core::materializer::Materializer;
use crate::core::parser;
use crate::core::types::PlasmarConfig;
use crate::emit::manifest::{self, OutputFormat};
use crate::templates::TemplateRegistry;
use clap::Subcommand;
use std::path::{Path, PathBuf};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new plasmar project
    Init {
        /// Directory to initialize (default: current)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Validate a declaration file without reading the environment
    Validate {
        /// Path to plasmar.yaml
        #[arg(short, long, default_value = "plasmar.yaml")]
        file: PathBuf,
    },

    /// List registered templates and their required context keys
    Templates,

    /// Materialize a declaration into a descriptor manifest
    Materialize {
        /// Path to plasmar.yaml
        #[arg(short, long, default_value = "plasmar.yaml")]
        file: PathBuf,

        /// Target environment (falls back to PLASMAR_ENV, then the sole
        /// declared environment)
        #[arg(short, long)]
        environment: Option<String>,

        /// Only materialize invocations for this project
        #[arg(short, long)]
        project: Option<String>,

        /// Write the manifest here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Manifest encoding
        #[arg(long, value_enum, default_value_t = OutputFormat::Yaml)]
        format: OutputFormat,
    },
}

/// Dispatch a CLI command.
pub fn dispatch(cmd: Commands) -> Result<(), Error> {
    match cmd {
        Commands::Init { path } => cmd_init(&path),
        Commands::Validate { file } => cmd_validate(&file),
        Commands::Templates => cmd_templates(),
        Commands::Materialize {
            file,
            environment,
            project,
            output,
            format,
        } => cmd_materialize(
            &file,
            environment.as_deref(),
            project.as_deref(),
            output.as_deref(),
            format,
        ),
    }
}

const DECL_SCAFFOLD: &str = r#"version: "1.0"
name: my-infrastructure
description: "Managed by plasmar"

environments:
  development:
    region: "{{env.AWS_REGION}}"
    account_id: "{{env.AWS_ACCOUNT_ID}}"

projects:
  my-project:
    org: my-org
    environments: [development]
    tags:
      DeployWith: step-deployer

resources:
  assumed:
    template: step_assumed
    project: my-project
    context:
      assumed_role_name: my-org-my-project-assumed
      assumable_from: ["{{env.AWS_ACCOUNT_ID}}"]
      assumed_policy_file: policies/assumed_policy.json
"#;

const POLICY_SCAFFOLD: &str = r#"{
  "Version": "2012-10-17",
  "Statement": [
    {
      "Effect": "Allow",
      "Action": ["cloudformation:DescribeStacks"],
      "Resource": "*"
    }
  ]
}
"#;

fn cmd_init(path: &Path) -> Result<(), Error> {
    let config_path = path.join("plasmar.yaml");
    if config_path.exists() {
        return Err(Error::validation(format!(
            "{} already exists",
            config_path.display()
        )));
    }

    let policies_dir = path.join("policies");
    std::fs::create_dir_all(&policies_dir).map_err(|e| Error::Io {
        path: policies_dir.clone(),
        source: e,
    })?;

    std::fs::write(&config_path, DECL_SCAFFOLD).map_err(|e| Error::Io {
        path: config_path.clone(),
        source: e,
    })?;
    let policy_path = policies_dir.join("assumed_policy.json");
    std::fs::write(&policy_path, POLICY_SCAFFOLD).map_err(|e| Error::Io {
        path: policy_path.clone(),
        source: e,
    })?;

    println!("Initialized plasmar project at {}", path.display());
    println!("  Created: {}", config_path.display());
    println!("  Created: {}", policy_path.display());
    Ok(())
}

fn cmd_validate(file: &Path) -> Result<(), Error> {
    let config = parser::parse_config_file(file)?;
    let issues = parser::validate_config(&config, &TemplateRegistry::builtin());

    if issues.is_empty() {
        println!(
            "OK: {} ({} environments, {} projects, {} resources)",
            config.name,
            config.environments.len(),
            config.projects.len(),
            config.resources.len()
        );
        Ok(())
    } else {
        for i in &issues {
            eprintln!("  ERROR: {}", i);
        }
        Err(Error::validation(format!(
            "{} validation error(s)",
            issues.len()
        )))
    }
}

fn cmd_templates() -> Result<(), Error> {
    let registry = TemplateRegistry::builtin();
    for (name, template) in registry.iter() {
        if template.required_keys.is_empty() {
            println!("{}", name);
        } else {
            println!("{}: requires {}", name, template.required_keys.join(", "));
        }
    }
    Ok(())
}

fn cmd_materialize(
    file: &Path,
    environment: Option<&str>,
    project_filter: Option<&str>,
    output: Option<&Path>,
    format: OutputFormat,
) -> Result<(), Error> {
    let config = parse_and_validate(file)?;
    let env = context::env_snapshot();
    let catalog = Catalog::from_decl(&config, &env)?;
    let environment = select_environment(environment, &env, &catalog)?;

    // File references resolve against the declaration's directory.
    let base_dir = match file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let registry = TemplateRegistry::builtin();
    let materializer = Materializer {
        catalog: &catalog,
        registry: &registry,
        base_dir: &base_dir,
        environment: &environment,
        env: &env,
    };
    let descriptors = materializer.materialize_config(&config, project_filter)?;
    let count = descriptors.len();

    let manifest = manifest::build(&config.name, &environment, descriptors);
    match output {
        Some(path) => {
            manifest::write(&manifest, path, format)?;
            println!(
                "Materialized {} descriptor(s) for {} into {}",
                count,
                environment,
                path.display()
            );
        }
        None => {
            print!("{}", manifest::encode(&manifest, format)?);
        }
    }
    Ok(())
}

/// Parse and validate a declaration file, printing issues if invalid.
fn parse_and_validate(file: &Path) -> Result<PlasmarConfig, Error> {
    let config = parser::parse_config_file(file)?;
    let issues = parser::validate_config(&config, &TemplateRegistry::builtin());
    if issues.is_empty() {
        return Ok(config);
    }
    for i in &issues {
        eprintln!("  ERROR: {}", i);
    }
    Err(Error::validation("validation failed"))
}

/// Pick the target environment: flag, then PLASMAR_ENV, then the sole
/// declared environment.
fn select_environment(
    flag: Option<&str>,
    env: &std::collections::HashMap<String, String>,
    catalog: &Catalog,
) -> Result<String, Error> {
    let selected = flag
        .map(str::to_string)
        .or_else(|| env.get("PLASMAR_ENV").cloned());

    if let Some(name) = selected {
        if catalog.environment(&name).is_none() {
            return Err(Error::validation(format!(
                "unknown environment '{}'",
                name
            )));
        }
        return Ok(name);
    }

    if catalog.environments().len() == 1 {
        if let Some(name) = catalog.environments().keys().next() {
            return Ok(name.clone());
        }
    }

    Err(Error::validation(
        "no target environment: pass --environment or set PLASMAR_ENV",
    ))
}
