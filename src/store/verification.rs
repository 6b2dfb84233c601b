use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::{PoisonError, RwLock},
};

use anyhow::{anyhow, bail, Context, Result};
use sha2::{Digest, Sha256};

use crate::{log_debug, log_info, log_warn};

const ENABLE_LOGS: bool = true;

/// SHA-256 of a signing certificate as upper-case hex pairs joined by `:`.
pub fn fingerprint(certificate: &[u8]) -> String {
    Sha256::digest(certificate)
        .iter()
        .map(|byte| hex::encode_upper([*byte]))
        .collect::<Vec<_>>()
        .join(":")
}

fn single_signature_fingerprint(package_name: &str, signatures: &[Vec<u8>]) -> Result<String> {
    match signatures {
        [certificate] => Ok(fingerprint(certificate)),
        _ => bail!("{} has {} signatures", package_name, signatures.len()),
    }
}

/// Remembers the signing fingerprint of every package the service has filled
/// for. The first fingerprint seen for a package is trusted.
pub struct PackageVerificationStore {
    path: PathBuf,
    signatures: RwLock<BTreeMap<String, String>>,
}

impl PackageVerificationStore {
    pub fn open(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create verification directory {}", parent.display())
            })?;
        }

        let signatures = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read signatures from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            signatures: RwLock::new(signatures),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True when `package_name` is signed by exactly one certificate whose
    /// fingerprint matches the stored one, or when the package is new (its
    /// fingerprint is then stored). Any failure counts as not verified.
    pub fn put_package_signatures(&self, package_name: &str, signatures: &[Vec<u8>]) -> bool {
        let hash = match single_signature_fingerprint(package_name, signatures) {
            Ok(hash) => hash,
            Err(err) => {
                log_warn!("Error getting hash for {}: {}", package_name, err);
                return false;
            }
        };
        log_debug!("Hash for {}: {}", package_name, hash);

        match self.verify_or_trust(package_name, hash) {
            Ok(verified) => verified,
            Err(err) => {
                log_warn!("Could not record signature for {}: {}", package_name, err);
                false
            }
        }
    }

    fn verify_or_trust(&self, package_name: &str, hash: String) -> Result<bool> {
        let mut guard = self
            .signatures
            .write()
            .map_err(|_| anyhow!("signature store lock poisoned"))?;

        if let Some(known) = guard.get(package_name) {
            return Ok(*known == hash);
        }

        let mut next = guard.clone();
        next.insert(package_name.to_string(), hash);
        self.persist(&next)?;
        *guard = next;
        log_info!("Trusting first-seen signature for {}", package_name);
        Ok(true)
    }

    pub fn contains(&self, package_name: &str) -> bool {
        self.signatures
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(package_name)
    }

    pub fn clear(&self) -> Result<()> {
        let mut guard = self
            .signatures
            .write()
            .map_err(|_| anyhow!("signature store lock poisoned"))?;
        self.persist(&BTreeMap::new())?;
        guard.clear();
        Ok(())
    }

    fn persist(&self, signatures: &BTreeMap<String, String>) -> Result<()> {
        let serialized = serde_json::to_string_pretty(signatures)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write signatures to {}", self.path.display()))
    }
}
