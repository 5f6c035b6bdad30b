//! Chain-scoped registry of deployed contracts.
//!
//! The book is a JSON file keyed by chain id, then contract name:
//!
//! ```json
//! { "1": { "Controller": { "address": "0x...", "proxy": true } } }
//! ```
//!
//! Entries are read-only to this tool. Writing the new implementation
//! back after an upgrade is deferred.

use std::{collections::HashMap, fs, path::Path};

use alloy::primitives::Address;
use eyre::{eyre, Context, Result};
use serde::Deserialize;

/// A single deployment entry in the address book.
///
/// Unknown fields (creation tx hashes, constructor args and the like)
/// are tolerated and ignored.
#[derive(Clone, Debug, Deserialize)]
pub(crate) struct DeploymentRecord {
    /// Address the contract is reachable at.
    pub(crate) address: Address,
    /// Whether the contract was deployed behind an upgradeable proxy.
    #[serde(default)]
    pub(crate) proxy: bool,
}

/// The address book section for one chain, keyed by contract name.
#[derive(Clone, Debug)]
pub(crate) struct AddressBook {
    entries: HashMap<String, DeploymentRecord>,
}

impl AddressBook {
    /// Load the section for `chain_id` from the JSON book at `path`.
    pub(crate) fn load(path: &Path, chain_id: u64) -> Result<Self> {
        let raw = fs::read_to_string(path).wrap_err_with(|| {
            format!("failed to read address book {}", path.display())
        })?;
        let mut book: HashMap<String, HashMap<String, DeploymentRecord>> =
            serde_json::from_str(&raw).wrap_err_with(|| {
                format!("malformed address book {}", path.display())
            })?;

        let entries = book
            .remove(&chain_id.to_string())
            .ok_or_else(|| eyre!("no address book entries for chain {chain_id}"))?;
        Ok(Self { entries })
    }

    /// In-memory book, used by tests.
    #[cfg(test)]
    pub(crate) fn from_entries(
        entries: impl IntoIterator<Item = (String, DeploymentRecord)>,
    ) -> Self {
        Self { entries: entries.into_iter().collect() }
    }

    /// Look up the deployment record for `name`.
    pub(crate) fn entry(&self, name: &str) -> Option<&DeploymentRecord> {
        self.entries.get(name)
    }
}
