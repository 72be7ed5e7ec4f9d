//! PL-011: Manifest emission — the seam to an external provider adapter.
//!
//! A manifest is the full set of descriptors from one materialization run,
//! each entry fingerprinted so an adapter can skip unchanged resources.
//! Written atomically (temp file + rename).

use crate::core::error::Error;
use crate::core::types::ResourceDescriptor;
use crate::emit::hash;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Manifest encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

/// One materialization run's output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// Schema version
    pub schema: String,

    /// Declaration name
    pub name: String,

    /// Target environment
    pub environment: String,

    /// When the manifest was generated
    pub generated_at: String,

    /// Generator version string
    pub generator: String,

    /// Fingerprinted descriptors, in materialization order
    pub resources: Vec<ManifestEntry>,
}

/// A descriptor plus its fingerprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    #[serde(flatten)]
    pub descriptor: ResourceDescriptor,

    /// BLAKE3 fingerprint of the descriptor
    pub hash: String,
}

/// Generate an RFC 3339 UTC timestamp.
pub fn now_iso8601() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

/// Assemble a manifest from a materialization run.
pub fn build(name: &str, environment: &str, descriptors: Vec<ResourceDescriptor>) -> Manifest {
    let resources = descriptors
        .into_iter()
        .map(|descriptor| ManifestEntry {
            hash: hash::fingerprint(&descriptor),
            descriptor,
        })
        .collect();

    Manifest {
        schema: "1.0".to_string(),
        name: name.to_string(),
        environment: environment.to_string(),
        generated_at: now_iso8601(),
        generator: format!("plasmar {}", env!("CARGO_PKG_VERSION")),
        resources,
    }
}

/// Encode a manifest.
pub fn encode(manifest: &Manifest, format: OutputFormat) -> Result<String, Error> {
    match format {
        OutputFormat::Yaml => serde_yaml_ng::to_string(manifest)
            .map_err(|e| Error::validation(format!("serialize error: {}", e))),
        OutputFormat::Json => serde_json::to_string_pretty(manifest)
            .map_err(|e| Error::validation(format!("serialize error: {}", e))),
    }
}

/// Write a manifest atomically (temp file + rename).
pub fn write(manifest: &Manifest, path: &Path, format: OutputFormat) -> Result<(), Error> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| Error::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
    }

    let encoded = encode(manifest, format)?;

    let tmp_path = path.with_extension("tmp");
    std::fs::write(&tmp_path, &encoded).map_err(|e| Error::Io {
        path: tmp_path.clone(),
        source: e,
    })?;
    std::fs::rename(&tmp_path, path).map_err(|e| Error::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(())
}

/// Load a manifest back (YAML or JSON — YAML is a superset here).
pub fn load(path: &Path) -> Result<Manifest, Error> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(serde_yaml_ng::from_str(&content)?)
}
