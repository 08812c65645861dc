//! Loading of compiled contract artifacts

use std::{
    fs,
    path::{Path, PathBuf},
};

use alloy_primitives::{hex::FromHex, Bytes};
use serde_json::Value;

use crate::{
    constants::{
        ARTIFACT_EXTENSION, BYTECODE_KEY, BYTECODE_OBJECT_KEY, HARDHAT_SOURCES_DIR,
        SOLIDITY_EXTENSION,
    },
    errors::ScriptError,
};

/// The creation bytecode of a compiled contract
#[derive(Debug, Clone)]
pub struct ContractArtifact {
    /// The name of the contract
    pub contract_name: String,
    /// The creation bytecode, without constructor arguments
    pub bytecode: Bytes,
}

/// The locations at which an artifact for `contract_name` may live, in lookup order
fn candidate_paths(artifacts_dir: &Path, contract_name: &str) -> Vec<PathBuf> {
    let file_name = format!("{contract_name}.{ARTIFACT_EXTENSION}");
    let source_dir = format!("{contract_name}.{SOLIDITY_EXTENSION}");

    vec![
        artifacts_dir.join(&file_name),
        artifacts_dir.join(&source_dir).join(&file_name),
        artifacts_dir
            .join(HARDHAT_SOURCES_DIR)
            .join(&source_dir)
            .join(&file_name),
    ]
}

/// Load the artifact for `contract_name` from `artifacts_dir`.
///
/// Accepts flat, foundry (`<Name>.sol/<Name>.json`), and hardhat
/// (`contracts/<Name>.sol/<Name>.json`) layouts.
pub fn load_artifact(
    artifacts_dir: &Path,
    contract_name: &str,
) -> Result<ContractArtifact, ScriptError> {
    let path = candidate_paths(artifacts_dir, contract_name)
        .into_iter()
        .find(|p| p.is_file())
        .ok_or_else(|| {
            ScriptError::ArtifactParsing(format!(
                "no artifact for `{}` under {}",
                contract_name,
                artifacts_dir.display()
            ))
        })?;

    let contents =
        fs::read_to_string(&path).map_err(|e| ScriptError::ArtifactParsing(e.to_string()))?;
    let bytecode = parse_bytecode(&contents)
        .map_err(|e| ScriptError::ArtifactParsing(format!("{}: {}", path.display(), e)))?;

    Ok(ContractArtifact {
        contract_name: contract_name.to_string(),
        bytecode,
    })
}

/// Extract the creation bytecode from an artifact's JSON
fn parse_bytecode(contents: &str) -> Result<Bytes, String> {
    let json: Value = serde_json::from_str(contents).map_err(|e| e.to_string())?;

    let hex_str = match &json[BYTECODE_KEY] {
        Value::String(s) => s.as_str(),
        Value::Object(obj) => obj
            .get(BYTECODE_OBJECT_KEY)
            .and_then(Value::as_str)
            .ok_or("bytecode object has no hex `object` field")?,
        _ => return Err("missing `bytecode` field".to_string()),
    };

    let bytecode = Bytes::from_hex(hex_str).map_err(|e| e.to_string())?;
    if bytecode.is_empty() {
        return Err("empty bytecode, the contract is abstract or an interface".to_string());
    }

    Ok(bytecode)
}
