//! TOML manifests defining custom case lists.
//!
//! A manifest is a list of `[[case]]` tables; problem parameters default to
//! the standard benchmark problem, so a minimal case is just a name and a
//! kernel:
//!
//! ```toml
//! [[case]]
//! name = "unrolled-short"
//! kernel = "unrolled"
//! rounds = 4
//! cycle_budget = 40000
//!
//! [[case]]
//! name = "scalar-full"
//! kernel = "scalar"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::bench::{Case, KernelVariant};
use crate::reference::Problem;

/// Manifest loading failure.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse manifest: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("case {case:?} names unknown kernel {kernel:?}")]
    UnknownKernel { case: String, kernel: String },

    #[error("manifest defines no cases")]
    Empty,
}

/// One `[[case]]` table.
#[derive(Debug, Clone, Deserialize)]
pub struct CaseDef {
    pub name: String,
    pub kernel: String,
    #[serde(default = "default_forest_height")]
    pub forest_height: u32,
    #[serde(default = "default_rounds")]
    pub rounds: u32,
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
    #[serde(default = "default_seed")]
    pub seed: u32,
    #[serde(default)]
    pub cycle_budget: Option<u64>,
}

fn default_forest_height() -> u32 {
    Problem::standard().forest_height
}

fn default_rounds() -> u32 {
    Problem::standard().rounds
}

fn default_batch_size() -> u32 {
    Problem::standard().batch_size
}

fn default_seed() -> u32 {
    Problem::standard().seed
}

/// A parsed case manifest.
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    #[serde(rename = "case")]
    pub cases: Vec<CaseDef>,
}

impl Manifest {
    /// Parse manifest TOML.
    pub fn parse_str(content: &str) -> Result<Self, ManifestError> {
        let manifest: Manifest = toml::from_str(content)?;
        if manifest.cases.is_empty() {
            return Err(ManifestError::Empty);
        }
        Ok(manifest)
    }

    /// Load a manifest from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let manifest = Self::parse_str(&content)?;
        log::info!(
            "loaded manifest {} with {} cases",
            path.display(),
            manifest.cases.len()
        );
        Ok(manifest)
    }

    /// Resolve the case list, validating kernel names.
    pub fn cases(&self) -> Result<Vec<Case>, ManifestError> {
        self.cases
            .iter()
            .map(|def| {
                let variant = KernelVariant::from_name(&def.kernel).ok_or_else(|| {
                    ManifestError::UnknownKernel {
                        case: def.name.clone(),
                        kernel: def.kernel.clone(),
                    }
                })?;
                Ok(Case {
                    name: def.name.clone(),
                    variant,
                    problem: Problem {
                        forest_height: def.forest_height,
                        rounds: def.rounds,
                        batch_size: def.batch_size,
                        seed: def.seed,
                    },
                    cycle_budget: def.cycle_budget,
                })
            })
            .collect()
    }
}
