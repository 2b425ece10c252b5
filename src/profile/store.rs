//! Profile persistence
//!
//! One JSON file per identity, sealed with a SHA-256 checksum so silent
//! corruption (or hand edits) never feeds garbage traits into a live
//! session. Every overwrite keeps the previous file as `.bak`; loading
//! falls back to the backup and, as a last resort, regenerates. The host
//! is never taken down by a bad profile file.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::core::config;
use crate::core::error::{HumError, Result};
use crate::core::types::{EpochMillis, IdentityId};
use crate::profile::generation::generate_profile;
use crate::profile::traits::{BehavioralProfile, CURRENT_SCHEMA_VERSION};

const CHECKSUM_FIELD: &str = "checksum";

#[derive(Debug, Clone)]
pub struct ProfileStore {
    dir: PathBuf,
}

impl ProfileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn profile_path(&self, identity: IdentityId) -> PathBuf {
        self.dir.join(format!("{identity}.json"))
    }

    fn backup_path(&self, identity: IdentityId) -> PathBuf {
        self.profile_path(identity).with_extension("json.bak")
    }

    /// Load the identity's profile, healing or regenerating as needed
    ///
    /// Main file corrupt: try the backup (and reseal the main file from
    /// it). Both unusable: generate fresh. Only I/O and generation
    /// failures surface as errors.
    pub fn load_or_generate(
        &self,
        identity: IdentityId,
        now_ms: EpochMillis,
    ) -> Result<BehavioralProfile> {
        let path = self.profile_path(identity);
        if !path.exists() {
            info!(%identity, "no stored profile, generating fresh");
            return self.generate_new(identity, now_ms);
        }

        match self.read_verified(&path, identity) {
            Ok(profile) => Ok(profile),
            Err(err) => {
                warn!(%identity, error = %err, "stored profile unusable, trying backup");
                match self.read_verified(&self.backup_path(identity), identity) {
                    Ok(profile) => {
                        info!(%identity, "recovered profile from backup");
                        self.save(&profile)?;
                        Ok(profile)
                    }
                    Err(backup_err) => {
                        warn!(
                            %identity,
                            error = %backup_err,
                            "backup unusable too, regenerating"
                        );
                        self.generate_new(identity, now_ms)
                    }
                }
            }
        }
    }

    /// Verify checksum, migrate older schemas, validate
    pub fn load(&self, identity: IdentityId) -> Result<BehavioralProfile> {
        self.read_verified(&self.profile_path(identity), identity)
    }

    /// Write the profile, keeping the previous file as backup
    ///
    /// The write is atomic (temp file, then rename), so a crash mid-save
    /// leaves either the old file or the new one, never a torn file.
    pub fn save(&self, profile: &BehavioralProfile) -> Result<()> {
        profile.validate().map_err(HumError::ProfileCorrupt)?;

        let mut value = serde_json::to_value(profile)?;
        let checksum = canonical_checksum(&value)?;
        match value.as_object_mut() {
            Some(obj) => obj.insert(CHECKSUM_FIELD.to_string(), json!(checksum)),
            None => return Err(HumError::ProfileCorrupt("profile is not a JSON object".into())),
        };
        let text = serde_json::to_string_pretty(&value)?;

        fs::create_dir_all(&self.dir)?;
        let path = self.profile_path(profile.identity);
        if path.exists() {
            fs::copy(&path, self.backup_path(profile.identity))?;
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &path)?;

        debug!(identity = %profile.identity, path = %path.display(), "profile saved");
        Ok(())
    }

    fn generate_new(
        &self,
        identity: IdentityId,
        now_ms: EpochMillis,
    ) -> Result<BehavioralProfile> {
        let seed = rand::random::<u64>();
        let profile = generate_profile(identity, seed, now_ms)?;
        self.save(&profile)?;
        Ok(profile)
    }

    fn read_verified(&self, path: &Path, identity: IdentityId) -> Result<BehavioralProfile> {
        let text = fs::read_to_string(path)?;
        let mut value: Value = serde_json::from_str(&text)?;
        let obj = value
            .as_object_mut()
            .ok_or_else(|| HumError::ProfileCorrupt("profile file is not a JSON object".into()))?;

        let stored = obj
            .remove(CHECKSUM_FIELD)
            .and_then(|v| v.as_str().map(String::from))
            .ok_or_else(|| HumError::ProfileCorrupt("checksum field missing".into()))?;
        let computed = canonical_checksum(&value)?;
        if stored != computed {
            return Err(HumError::ProfileCorrupt(format!(
                "checksum mismatch: stored {stored}, computed {computed}"
            )));
        }

        let version = value
            .get("schema_version")
            .and_then(Value::as_u64)
            .ok_or_else(|| HumError::ProfileCorrupt("schema_version missing".into()))?;
        if version > CURRENT_SCHEMA_VERSION as u64 {
            return Err(HumError::ProfileCorrupt(format!(
                "schema version {version} is newer than supported {CURRENT_SCHEMA_VERSION}"
            )));
        }
        if version < CURRENT_SCHEMA_VERSION as u64 {
            info!(%identity, from = version, to = CURRENT_SCHEMA_VERSION, "migrating profile schema");
            migrate_forward(&mut value, version);
        }

        let profile: BehavioralProfile = serde_json::from_value(value)?;
        profile.validate().map_err(HumError::ProfileCorrupt)?;
        if profile.identity != identity {
            return Err(HumError::ProfileCorrupt(format!(
                "profile belongs to {}, expected {identity}",
                profile.identity
            )));
        }
        Ok(profile)
    }
}

/// Checksum over the canonical serialization
///
/// serde_json orders object keys, so re-serializing the parsed value
/// yields the same bytes regardless of on-disk formatting. The checksum
/// field itself is removed before hashing.
fn canonical_checksum(value: &Value) -> Result<String> {
    let canonical = serde_json::to_string(value)?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(hasher.finalize().iter().map(|b| format!("{b:02x}")).collect())
}

/// Fill fields added since `from`, then stamp the current version
///
/// v1 predates the task ledger, daily-form carryover, and the long-term
/// drift cursor; the cursor is rebuilt from recorded playtime so an old
/// profile does not replay months of skill gain in one session.
fn migrate_forward(value: &mut Value, from: u64) {
    let Some(obj) = value.as_object_mut() else {
        return;
    };
    if from < 2 {
        obj.entry("task_minutes")
            .or_insert_with(|| Value::Object(Default::default()));
        obj.entry("daily_multiplier").or_insert(json!(1.0));
        obj.entry("daily_rolled_at_ms").or_insert(json!(0));
        if !obj.contains_key("long_term_blocks_applied") {
            let minutes = obj
                .get("total_playtime_minutes")
                .and_then(Value::as_f64)
                .unwrap_or(0.0);
            let blocks =
                (minutes / 60.0 / config::config().drift.long_term_block_hours) as u64;
            obj.insert("long_term_blocks_applied".to_string(), json!(blocks));
        }
    }
    obj.insert("schema_version".to_string(), json!(CURRENT_SCHEMA_VERSION));
}
