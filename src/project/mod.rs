mod foundry;

pub use foundry::FoundryConfig;

use std::path::{Path, PathBuf};

use crate::error::DeployError;

/// Directory for artifacts produced outside Foundry or Hardhat.
pub const PLAIN_ARTIFACTS_DIR: &str = "compiled";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectType {
    Foundry,
    Hardhat,
    Plain,
}

impl std::fmt::Display for ProjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProjectType::Foundry => write!(f, "Foundry"),
            ProjectType::Hardhat => write!(f, "Hardhat"),
            ProjectType::Plain => write!(f, "plain"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Project {
    pub project_type: ProjectType,
    pub root: PathBuf,
    /// Where compiled artifacts are looked up by default.
    pub artifacts_dir: PathBuf,
}

/// Detect the project layout from the configuration files in `path`.
pub fn detect(path: &Path) -> Result<Project, DeployError> {
    if path.join("foundry.toml").exists() {
        let config = FoundryConfig::load(path)?;
        tracing::info!("Detected Foundry project at {:?}", path);
        return Ok(Project {
            project_type: ProjectType::Foundry,
            root: path.to_path_buf(),
            artifacts_dir: path.join(config.out_dir()),
        });
    }

    if path.join("hardhat.config.js").exists() || path.join("hardhat.config.ts").exists() {
        tracing::info!("Detected Hardhat project at {:?}", path);
        return Ok(Project {
            project_type: ProjectType::Hardhat,
            root: path.to_path_buf(),
            artifacts_dir: path.join("artifacts"),
        });
    }

    tracing::debug!("No Foundry or Hardhat config at {:?}", path);
    Ok(Project {
        project_type: ProjectType::Plain,
        root: path.to_path_buf(),
        artifacts_dir: path.join(PLAIN_ARTIFACTS_DIR),
    })
}
