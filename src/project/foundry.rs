use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::DeployError;

/// The parts of foundry.toml that decide where artifacts land.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FoundryConfig {
    #[serde(default)]
    pub profile: HashMap<String, ProfileConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileConfig {
    pub out: Option<String>,
}

impl FoundryConfig {
    pub fn load(root: &Path) -> Result<Self, DeployError> {
        let path = root.join("foundry.toml");
        let invalid = |reason: String| DeployError::InvalidConfig {
            field: path.display().to_string(),
            reason,
        };

        let content = fs::read_to_string(&path).map_err(|e| invalid(e.to_string()))?;
        toml::from_str(&content).map_err(|e| invalid(e.to_string()))
    }

    pub fn out_dir(&self) -> &str {
        self.profile
            .get("default")
            .and_then(|p| p.out.as_deref())
            .unwrap_or("out")
    }
}
