use std::{
    fs,
    path::{Path, PathBuf},
};

use bytes::Bytes;
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("no artifact for contract `{contract}` under {root}")]
    NotFound { contract: String, root: PathBuf },
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error(
        "artifact for `{0}` has no deployable bytecode (abstract contract or unlinked library)"
    )]
    InvalidBytecode(String),
}

/// Resolves a contract name to its creation bytecode.
pub trait ArtifactSource: Send + Sync {
    fn init_code(&self, contract: &str) -> Result<Bytes, ArtifactError>;
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HardhatArtifact {
    contract_name: Option<String>,
    bytecode: String,
}

/// Hardhat compilation output: `<root>/**/<Contract>.json`.
#[derive(Debug, Clone)]
pub struct HardhatArtifacts {
    root: PathBuf,
}

impl HardhatArtifacts {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn find(&self, dir: &Path, file_name: &str) -> Result<Option<PathBuf>, ArtifactError> {
        let entries = fs::read_dir(dir).map_err(|source| ArtifactError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let mut subdirs = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|source| ArtifactError::Io {
                    path: dir.to_path_buf(),
                    source,
                })?
                .path();
            if path.is_dir() {
                // build-info holds the full compiler input/output, never artifacts
                if path.file_name().is_some_and(|name| name != "build-info") {
                    subdirs.push(path);
                }
            } else if path.file_name().is_some_and(|name| name == file_name) {
                return Ok(Some(path));
            }
        }
        subdirs.sort();
        for subdir in subdirs {
            if let Some(found) = self.find(&subdir, file_name)? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }
}

impl ArtifactSource for HardhatArtifacts {
    fn init_code(&self, contract: &str) -> Result<Bytes, ArtifactError> {
        let path = self
            .find(&self.root, &format!("{contract}.json"))?
            .ok_or_else(|| ArtifactError::NotFound {
                contract: contract.to_owned(),
                root: self.root.clone(),
            })?;
        debug!(contract, path = %path.display(), "Loading artifact");

        let raw = fs::read_to_string(&path).map_err(|source| ArtifactError::Io {
            path: path.clone(),
            source,
        })?;
        let artifact: HardhatArtifact =
            serde_json::from_str(&raw).map_err(|source| ArtifactError::Json {
                path: path.clone(),
                source,
            })?;
        if artifact
            .contract_name
            .as_deref()
            .is_some_and(|name| name != contract)
        {
            return Err(ArtifactError::NotFound {
                contract: contract.to_owned(),
                root: self.root.clone(),
            });
        }

        let code = hex::decode(artifact.bytecode.trim_start_matches("0x"))
            .map_err(|_| ArtifactError::InvalidBytecode(contract.to_owned()))?;
        if code.is_empty() {
            return Err(ArtifactError::InvalidBytecode(contract.to_owned()));
        }
        Ok(Bytes::from(code))
    }
}
