use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::error::DeployError;

/// Line-oriented `KEY=value` file, read once per run.
#[derive(Debug, Clone, Default)]
pub struct EnvStore {
    path: PathBuf,
    entries: Vec<(String, String)>,
}

impl EnvStore {
    /// Load the store. A missing file is an empty store, not an error.
    pub fn load(path: &Path) -> Result<Self, DeployError> {
        match fs::read_to_string(path) {
            Ok(content) => Self::parse(path, &content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!("Env file {:?} does not exist; continuing without it", path);
                Ok(Self {
                    path: path.to_path_buf(),
                    entries: Vec::new(),
                })
            }
            Err(e) => Err(DeployError::InvalidConfig {
                field: path.display().to_string(),
                reason: e.to_string(),
            }),
        }
    }

    /// Parse `KEY=value` lines with dotenvy's grammar (quotes, escapes,
    /// `export`, comments). Nothing is written to the process environment.
    pub fn parse(path: &Path, content: &str) -> Result<Self, DeployError> {
        let entries = dotenvy::from_read_iter(content.as_bytes())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DeployError::InvalidConfig {
                field: path.display().to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// First definition of `key`, ignoring empty values.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .filter(|v| !v.is_empty())
    }
}

/// Whether `line` assigns `key`, in any of the forms `KEY=v`, `KEY = v`,
/// `export KEY=v` or indented. Comments never match.
fn defines_key(line: &str, key: &str) -> bool {
    let trimmed = line.trim_start();
    if trimmed.starts_with('#') {
        return false;
    }

    let trimmed = trimmed
        .strip_prefix("export ")
        .map(str::trim_start)
        .unwrap_or(trimmed);

    trimmed
        .split_once('=')
        .is_some_and(|(k, _)| k.trim() == key)
}

/// Replace the first definition of `key` with `key=value`, drop any later
/// definitions of it, or append one when absent.
pub fn upsert(content: &str, key: &str, value: &str) -> String {
    let entry = format!("{}={}", key, value);
    let mut replaced = false;
    let mut lines: Vec<&str> = Vec::new();

    for line in content.lines() {
        if defines_key(line, key) {
            if !replaced {
                lines.push(&entry);
                replaced = true;
            }
            continue;
        }
        lines.push(line);
    }

    if !replaced {
        lines.push(&entry);
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// The config store could not be updated after a successful deployment.
#[derive(Debug, Clone, Error)]
#[error("could not write {key}={value} to {path:?}: {reason}")]
pub struct PersistenceWarning {
    pub path: PathBuf,
    pub key: String,
    pub value: String,
    pub reason: String,
}

/// Upsert `key=value` into the file at `path`. The file must already exist;
/// failures come back as a warning since the on-chain result is unaffected.
pub fn persist_entry(path: &Path, key: &str, value: &str) -> Result<(), PersistenceWarning> {
    let warning = |reason: String| PersistenceWarning {
        path: path.to_path_buf(),
        key: key.to_string(),
        value: value.to_string(),
        reason,
    };

    let content = fs::read_to_string(path).map_err(|e| warning(e.to_string()))?;
    fs::write(path, upsert(&content, key, value)).map_err(|e| warning(e.to_string()))?;

    tracing::info!("Saved {}={} to {:?}", key, value, path);
    Ok(())
}

/// Store key for a deployed contract's address: `ERC20Token` becomes
/// `ERC20_TOKEN_CONTRACT_ADDRESS`.
pub fn address_key(contract_name: &str) -> String {
    let chars: Vec<char> = contract_name.chars().collect();
    let mut key = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_ascii_alphanumeric() {
            if !key.ends_with('_') && !key.is_empty() {
                key.push('_');
            }
            continue;
        }

        if c.is_ascii_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
            let boundary = prev.is_ascii_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_ascii_uppercase() && next_is_lower);
            if boundary && !key.ends_with('_') {
                key.push('_');
            }
        }
        key.push(c.to_ascii_uppercase());
    }

    format!("{}_CONTRACT_ADDRESS", key.trim_end_matches('_'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> EnvStore {
        EnvStore::parse(Path::new(".env"), content).unwrap()
    }

    #[test]
    fn test_parse_env_content() {
        let content = r#"
# deployer keys
PRIVATE_KEY=0xabc
RPC_URL = "https://sepolia.base.org"
export CHAIN_ID=84532
EMPTY=
"#;
        let store = parse(content);
        assert_eq!(store.get("PRIVATE_KEY"), Some("0xabc"));
        assert_eq!(store.get("RPC_URL"), Some("https://sepolia.base.org"));
        assert_eq!(store.get("CHAIN_ID"), Some("84532"));
        assert_eq!(store.get("EMPTY"), None);
        assert_eq!(store.get("MISSING"), None);
    }

    #[test]
    fn test_inline_comment_is_not_part_of_value() {
        let store = parse("RPC_URL=http://localhost:8545\nCHAIN_ID=84532 # base sepolia\n");
        assert_eq!(store.get("CHAIN_ID"), Some("84532"));
    }

    #[test]
    fn test_escaped_quotes_in_double_quoted_value() {
        let store = parse("LABEL=\"my \\\"test\\\" deploy\"\nSINGLE='raw # kept'\n");
        assert_eq!(store.get("LABEL"), Some("my \"test\" deploy"));
        assert_eq!(store.get("SINGLE"), Some("raw # kept"));
    }

    #[test]
    fn test_malformed_line_is_configuration_error() {
        let err = EnvStore::parse(Path::new(".env"), "not a line\n").unwrap_err();
        assert!(matches!(err, DeployError::InvalidConfig { .. }));
    }

    #[test]
    fn test_missing_env_file_is_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = EnvStore::load(&dir.path().join(".env")).unwrap();
        assert_eq!(store.get("PRIVATE_KEY"), None);
    }

    #[test]
    fn test_upsert_appends_when_absent() {
        let out = upsert("RPC_URL=http://localhost:8545", "TOKEN_CONTRACT_ADDRESS", "0x1");
        assert_eq!(out, "RPC_URL=http://localhost:8545\nTOKEN_CONTRACT_ADDRESS=0x1\n");
    }

    #[test]
    fn test_upsert_replaces_in_place() {
        let content = "A=1\nTOKEN_CONTRACT_ADDRESS=0xold\nB=2\n";
        let out = upsert(content, "TOKEN_CONTRACT_ADDRESS", "0xnew");
        assert_eq!(out, "A=1\nTOKEN_CONTRACT_ADDRESS=0xnew\nB=2\n");
    }

    #[test]
    fn test_upsert_matches_other_textual_forms() {
        let content = "export TOKEN_CONTRACT_ADDRESS = \"0xold\"\n  TOKEN_CONTRACT_ADDRESS=0xdup\n";
        let out = upsert(content, "TOKEN_CONTRACT_ADDRESS", "0xnew");
        assert_eq!(out, "TOKEN_CONTRACT_ADDRESS=0xnew\n");
    }

    #[test]
    fn test_upsert_does_not_touch_prefix_keys_or_comments() {
        let content = "# TOKEN_CONTRACT_ADDRESS=0xcomment\nMY_TOKEN_CONTRACT_ADDRESS=0xother\n";
        let out = upsert(content, "TOKEN_CONTRACT_ADDRESS", "0xnew");
        assert_eq!(
            out,
            "# TOKEN_CONTRACT_ADDRESS=0xcomment\nMY_TOKEN_CONTRACT_ADDRESS=0xother\nTOKEN_CONTRACT_ADDRESS=0xnew\n"
        );
    }

    #[test]
    fn test_persist_twice_leaves_one_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        fs::write(&path, "PRIVATE_KEY=0xabc\n").unwrap();

        persist_entry(&path, "TOKEN_CONTRACT_ADDRESS", "0xV1").unwrap();
        persist_entry(&path, "TOKEN_CONTRACT_ADDRESS", "0xV2").unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let matching: Vec<&str> = content
            .lines()
            .filter(|l| l.starts_with("TOKEN_CONTRACT_ADDRESS="))
            .collect();
        assert_eq!(matching, vec!["TOKEN_CONTRACT_ADDRESS=0xV2"]);
        assert!(content.starts_with("PRIVATE_KEY=0xabc\n"));
    }

    #[test]
    fn test_persist_to_missing_file_is_warning() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.env");

        let warning = persist_entry(&path, "TOKEN_CONTRACT_ADDRESS", "0x1").unwrap_err();
        assert_eq!(warning.key, "TOKEN_CONTRACT_ADDRESS");
        assert!(!path.exists());
    }

    #[test]
    fn test_address_key() {
        assert_eq!(address_key("Token"), "TOKEN_CONTRACT_ADDRESS");
        assert_eq!(address_key("SimpleStorage"), "SIMPLE_STORAGE_CONTRACT_ADDRESS");
        assert_eq!(address_key("ERC20Token"), "ERC20_TOKEN_CONTRACT_ADDRESS");
        assert_eq!(address_key("HTTPRegistry"), "HTTP_REGISTRY_CONTRACT_ADDRESS");
        assert_eq!(address_key("my-vault"), "MY_VAULT_CONTRACT_ADDRESS");
    }
}
