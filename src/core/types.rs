//! PL-001: All plasmar schema and output types.
//!
//! Defines the YAML schema for declaration files (environments, projects,
//! template invocations) and the provider-agnostic descriptor output.
//! All schema types derive Serialize/Deserialize for YAML roundtripping.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Top-level plasmar.yaml
// ============================================================================

/// Root declaration — environments, projects, and template invocations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlasmarConfig {
    /// Schema version (must be "1.0")
    pub version: String,

    /// Human-readable declaration name
    pub name: String,

    /// Optional description
    #[serde(default)]
    pub description: Option<String>,

    /// Environment declarations (order-preserving)
    #[serde(default)]
    pub environments: IndexMap<String, EnvironmentDecl>,

    /// Project declarations (order-preserving)
    #[serde(default)]
    pub projects: IndexMap<String, ProjectDecl>,

    /// Template invocations, keyed by invocation id
    pub resources: IndexMap<String, Invocation>,
}

// ============================================================================
// Environments
// ============================================================================

/// An environment as written in the declaration file.
/// Fields may contain `{{env.NAME}}` references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentDecl {
    /// Cloud region (e.g. us-east-1)
    pub region: String,

    /// Numeric account identifier
    pub account_id: String,
}

/// A resolved environment. Immutable once declared into a catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    pub name: String,
    pub region: String,
    pub account_id: String,
}

// ============================================================================
// Projects
// ============================================================================

/// A project as written in the declaration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectDecl {
    /// Owning organization
    pub org: String,

    /// Environment names this project applies to
    pub environments: Vec<String>,

    /// Tags stamped onto every role the project produces
    #[serde(default)]
    pub tags: IndexMap<String, String>,
}

/// A resolved project. Environment references are checked against the
/// catalog before any template resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub name: String,
    pub org: String,
    pub environments: Vec<String>,
    pub tags: IndexMap<String, String>,
}

impl Project {
    /// Canonical `org/name` form, used for the ProjectName tag.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.org, self.name)
    }
}

// ============================================================================
// Context
// ============================================================================

/// The resolved key-value inputs available to a template invocation.
pub type Context = IndexMap<String, ContextValue>;

/// A context value — string, list of strings, or nested mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContextValue {
    Str(String),
    List(Vec<String>),
    Map(Context),
}

impl ContextValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Normalize a single string or a list to a list.
    pub fn as_list(&self) -> Option<Vec<String>> {
        match self {
            Self::Str(s) => Some(vec![s.clone()]),
            Self::List(v) => Some(v.clone()),
            Self::Map(_) => None,
        }
    }

    pub fn as_map(&self) -> Option<&Context> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Convert to a JSON value (for policy document rendering).
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Str(s) => serde_json::Value::String(s.clone()),
            Self::List(v) => serde_json::Value::Array(
                v.iter()
                    .map(|s| serde_json::Value::String(s.clone()))
                    .collect(),
            ),
            Self::Map(m) => serde_json::Value::Object(
                m.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }

    /// Render for string interpolation: strings verbatim, lists and maps
    /// as JSON so they splice into policy documents.
    pub fn render(&self) -> String {
        match self {
            Self::Str(s) => s.clone(),
            other => other.to_json().to_string(),
        }
    }
}

// ============================================================================
// Template invocations
// ============================================================================

/// A single template invocation: (template, project, context).
/// Evaluated once during materialization and discarded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invocation {
    /// Registered template name
    pub template: String,

    /// Target project name
    pub project: String,

    /// Caller-supplied context
    #[serde(default)]
    pub context: Context,
}

// ============================================================================
// Resource descriptors
// ============================================================================

/// Descriptor kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptorKind {
    Role,
    PolicyAttachment,
}

impl fmt::Display for DescriptorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Role => write!(f, "IAM role"),
            Self::PolicyAttachment => write!(f, "policy attachment"),
        }
    }
}

/// An abstract, provider-agnostic description of an infrastructure object.
/// Owned by the materializer until handed to a provider adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    /// Descriptor kind
    pub kind: DescriptorKind,

    /// Resource name (e.g. role name)
    pub name: String,

    /// Owning project
    pub project: String,

    /// Target environment
    pub environment: String,

    /// Rendered resource body (trust policy, policy document, tags)
    pub body: serde_json::Value,
}
