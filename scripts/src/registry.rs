//! The address registry, mapping contract names to their deployed addresses.
//!
//! Entries persist across runs so that a later deployment can look up the
//! address of a contract deployed by an earlier one.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    str::FromStr,
    sync::Mutex,
};

use alloy_primitives::Address;
use serde_json::{Map, Value};
use tracing::debug;

use crate::errors::ScriptError;

/// A name -> address store with last-write-wins semantics
pub trait AddressRegistry: Send + Sync {
    /// Look up the address recorded under `name`
    fn get(&self, name: &str) -> Result<Address, ScriptError>;

    /// Record `address` under `name`, replacing any previous entry
    fn set(&self, name: &str, address: Address) -> Result<(), ScriptError>;

    /// A snapshot of every entry in the registry
    fn entries(&self) -> Result<BTreeMap<String, Address>, ScriptError>;
}

// -----------------
// | File Registry |
// -----------------

/// A registry persisted as a flat JSON object in a deployments file
#[derive(Debug, Clone)]
pub struct FileRegistry {
    /// The path of the deployments file
    path: PathBuf,
}

impl FileRegistry {
    /// Create a registry backed by the file at `path`.
    ///
    /// The file is not touched until the first read or write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The path of the backing deployments file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the raw JSON object from the deployments file.
    ///
    /// A missing file is an empty registry.
    fn read_json(&self) -> Result<Map<String, Value>, ScriptError> {
        if !self.path.exists() {
            return Ok(Map::new());
        }

        let contents = fs::read_to_string(&self.path)
            .map_err(|e| ScriptError::ReadDeployments(e.to_string()))?;
        if contents.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str(&contents)
            .map_err(|e| ScriptError::ReadDeployments(e.to_string()))?
        {
            Value::Object(map) => Ok(map),
            _ => Err(ScriptError::ReadDeployments(format!(
                "{} does not contain a JSON object",
                self.path.display()
            ))),
        }
    }

    /// Write the JSON object to the deployments file.
    ///
    /// The contents go to a sibling temporary file first, which is then renamed
    /// over the deployments file.
    fn write_json(&self, json: &Map<String, Value>) -> Result<(), ScriptError> {
        let contents = serde_json::to_string_pretty(json)
            .map_err(|e| ScriptError::WriteDeployments(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| ScriptError::WriteDeployments(e.to_string()))?;
        }

        let mut tmp_path = self.path.clone().into_os_string();
        tmp_path.push(".tmp");
        let tmp_path = PathBuf::from(tmp_path);

        fs::write(&tmp_path, contents).map_err(|e| ScriptError::WriteDeployments(e.to_string()))?;
        fs::rename(&tmp_path, &self.path)
            .map_err(|e| ScriptError::WriteDeployments(e.to_string()))
    }
}

/// Parse an address stored under `name`
fn parse_stored_address(name: &str, value: &Value) -> Result<Address, ScriptError> {
    let addr_str = value.as_str().ok_or_else(|| {
        ScriptError::ReadDeployments(format!("entry for `{}` is not a string", name))
    })?;

    Address::from_str(addr_str).map_err(|e| {
        ScriptError::ReadDeployments(format!("invalid address for `{}`: {}", name, e))
    })
}

impl AddressRegistry for FileRegistry {
    fn get(&self, name: &str) -> Result<Address, ScriptError> {
        let json = self.read_json()?;
        let value = json
            .get(name)
            .ok_or_else(|| ScriptError::MissingEntry(name.to_string()))?;

        parse_stored_address(name, value)
    }

    fn set(&self, name: &str, address: Address) -> Result<(), ScriptError> {
        let mut json = self.read_json()?;
        json.insert(name.to_string(), Value::String(address.to_checksum(None)));
        self.write_json(&json)?;

        debug!("recorded {name} = {address} in {}", self.path.display());
        Ok(())
    }

    /// Every entry holding an address; other values in the file are skipped
    fn entries(&self) -> Result<BTreeMap<String, Address>, ScriptError> {
        let entries = self
            .read_json()?
            .iter()
            .filter_map(|(name, value)| match parse_stored_address(name, value) {
                Ok(address) => Some((name.clone(), address)),
                Err(e) => {
                    debug!("skipping non-address entry: {e}");
                    None
                }
            })
            .collect();

        Ok(entries)
    }
}

// -------------------
// | Memory Registry |
// -------------------

/// An in-process registry, used for dry runs and tests
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    /// The entries and the number of writes performed
    inner: Mutex<(BTreeMap<String, Address>, usize)>,
}

impl MemoryRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of `set` calls that have been applied
    pub fn num_writes(&self) -> usize {
        self.inner.lock().map(|inner| inner.1).unwrap_or_default()
    }

    /// Lock the inner state
    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, (BTreeMap<String, Address>, usize)>, ScriptError> {
        self.inner
            .lock()
            .map_err(|_| ScriptError::WriteDeployments("registry lock poisoned".to_string()))
    }
}

impl AddressRegistry for MemoryRegistry {
    fn get(&self, name: &str) -> Result<Address, ScriptError> {
        self.lock()?
            .0
            .get(name)
            .copied()
            .ok_or_else(|| ScriptError::MissingEntry(name.to_string()))
    }

    fn set(&self, name: &str, address: Address) -> Result<(), ScriptError> {
        let mut inner = self.lock()?;
        inner.0.insert(name.to_string(), address);
        inner.1 += 1;
        Ok(())
    }

    fn entries(&self) -> Result<BTreeMap<String, Address>, ScriptError> {
        Ok(self.lock()?.0.clone())
    }
}
