use std::fs;
use std::path::{Path, PathBuf};

use alloy::{json_abi::JsonAbi, primitives::Bytes};
use serde::Deserialize;
use serde_json::Value;

use super::abi::parse_abi;
use crate::error::DeployError;

/// A compiled contract: interface plus creation bytecode.
#[derive(Debug, Clone)]
pub struct CompiledArtifact {
    pub name: String,
    pub abi: JsonAbi,
    pub bytecode: Bytes,
    pub path: PathBuf,
}

/// On-disk artifact. Flat `compiled/` files and Hardhat artifacts store the
/// bytecode as a hex string, Foundry nests it under `object`.
#[derive(Debug, Deserialize)]
struct ArtifactFile {
    abi: Value,
    bytecode: BytecodeField,
    #[serde(rename = "contractName")]
    contract_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BytecodeField {
    Hex(String),
    Object { object: String },
}

impl BytecodeField {
    fn as_hex(&self) -> &str {
        match self {
            BytecodeField::Hex(s) => s,
            BytecodeField::Object { object } => object,
        }
    }
}

/// Loads compiled artifacts by contract name from one directory.
#[derive(Debug, Clone)]
pub struct ArtifactLoader {
    dir: PathBuf,
}

impl ArtifactLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Every location an artifact for `name` may live at, in lookup order.
    pub fn candidates(&self, name: &str) -> Vec<PathBuf> {
        let file = format!("{}.json", name);
        let source = format!("{}.sol", name);

        vec![
            self.dir.join(&file),
            self.dir.join(&source).join(&file),
            self.dir.join("contracts").join(&source).join(&file),
        ]
    }

    pub fn load(&self, name: &str) -> Result<CompiledArtifact, DeployError> {
        let candidates = self.candidates(name);

        let path = candidates
            .iter()
            .find(|p| p.is_file())
            .cloned()
            .ok_or_else(|| DeployError::ArtifactNotFound {
                name: name.to_string(),
                searched: candidates
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
            })?;

        let artifact = parse_artifact_file(name, &path)?;

        tracing::info!(
            "Loaded artifact {} from {:?} ({} ABI entries, {} bytes of bytecode)",
            artifact.name,
            artifact.path,
            artifact.abi.len(),
            artifact.bytecode.len()
        );

        Ok(artifact)
    }
}

fn parse_artifact_file(name: &str, path: &Path) -> Result<CompiledArtifact, DeployError> {
    let invalid = |reason: String| DeployError::InvalidArtifact {
        path: path.to_path_buf(),
        reason,
    };

    let content = fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;

    let file: ArtifactFile =
        serde_json::from_str(&content).map_err(|e| invalid(format!("not an artifact: {}", e)))?;

    let abi = parse_abi(&file.abi).map_err(invalid)?;

    let hex_str = file.bytecode.as_hex().trim();
    let hex_str = hex_str.strip_prefix("0x").unwrap_or(hex_str);
    let bytecode = hex::decode(hex_str).map_err(|e| invalid(format!("bad bytecode hex: {}", e)))?;

    if bytecode.is_empty() {
        return Err(invalid(
            "bytecode is empty (abstract contract or interface?)".to_string(),
        ));
    }

    Ok(CompiledArtifact {
        name: file.contract_name.unwrap_or_else(|| name.to_string()),
        abi,
        bytecode: bytecode.into(),
        path: path.to_path_buf(),
    })
}
