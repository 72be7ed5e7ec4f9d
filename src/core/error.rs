//! PL-002: Error taxonomy for the declaration-to-materialization pipeline.
//!
//! Every error is fatal at the point it occurs: no retry, no partial-success
//! mode, nothing swallowed or auto-corrected. Messages name the offending
//! declaration, key, or file.

use std::path::PathBuf;
use thiserror::Error;

/// Which namespace a duplicate declaration collided in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Environment,
    Project,
    Template,
}

impl std::fmt::Display for DeclKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Environment => write!(f, "environment"),
            Self::Project => write!(f, "project"),
            Self::Template => write!(f, "template"),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("missing required environment variable '{0}'")]
    MissingEnvironmentVariable(String),

    #[error("unknown template '{0}'")]
    UnknownTemplate(String),

    #[error("template '{template}' requires context key '{key}'")]
    MissingRequiredKey { template: String, key: String },

    #[error("{0}")]
    Validation(String),

    #[error("duplicate {kind} declaration '{name}'")]
    DuplicateDeclaration { kind: DeclKind, name: String },

    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml_ng::Error),

    #[error("invalid policy document {}: {source}", path.display())]
    PolicyJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    /// Shorthand for a `Validation` error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pl002_display_missing_env() {
        let e = Error::MissingEnvironmentVariable("AWS_REGION".to_string());
        assert_eq!(
            e.to_string(),
            "missing required environment variable 'AWS_REGION'"
        );
    }

    #[test]
    fn test_pl002_display_unknown_template() {
        let e = Error::UnknownTemplate("step_assumed".to_string());
        assert_eq!(e.to_string(), "unknown template 'step_assumed'");
    }

    #[test]
    fn test_pl002_display_missing_key() {
        let e = Error::MissingRequiredKey {
            template: "step_assumed".to_string(),
            key: "assumed_role_name".to_string(),
        };
        assert!(e.to_string().contains("step_assumed"));
        assert!(e.to_string().contains("assumed_role_name"));
    }

    #[test]
    fn test_pl002_display_duplicate() {
        let e = Error::DuplicateDeclaration {
            kind: DeclKind::Environment,
            name: "development".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "duplicate environment declaration 'development'"
        );
    }

    #[test]
    fn test_pl002_decl_kind_display() {
        assert_eq!(DeclKind::Environment.to_string(), "environment");
        assert_eq!(DeclKind::Project.to_string(), "project");
        assert_eq!(DeclKind::Template.to_string(), "template");
    }
}
