//! Local persistent store — key-scoped durable JSON storage.
//!
//! Tasks (nurse shape) and vitals live only here; they are never sent to
//! the backend. Every write is a full-collection overwrite: mutations
//! read the whole collection, apply the change, and persist the whole
//! new collection. Collections sit inside a `{version, data}` envelope
//! so a future shape change reads as absent data instead of silently
//! corrupting on load.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::{NURSE_TASKS_KEY, NURSE_VITALS_KEY, TOKEN_KEY};
use crate::error::StoreError;
use crate::models::{NursePriority, NurseTask, VitalRecord};

/// Schema version written into every collection envelope.
pub const STORE_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct Envelope<T> {
    version: u32,
    data: T,
}

/// One JSON file per key under a single directory.
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store rooted at the default app data directory.
    pub fn default_location() -> Self {
        Self::new(crate::config::local_store_dir())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    // ── Envelope-backed collections ─────────────────────────

    fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path)?;
        let envelope: Envelope<T> = serde_json::from_str(&raw)?;
        if envelope.version != STORE_VERSION {
            return Err(StoreError::Version {
                found: envelope.version,
                expected: STORE_VERSION,
            });
        }
        Ok(Some(envelope.data))
    }

    fn write<T: Serialize>(&self, key: &str, data: &T) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;
        let envelope = Envelope {
            version: STORE_VERSION,
            data,
        };
        let raw = serde_json::to_string_pretty(&envelope)?;
        fs::write(self.path_for(key), raw)?;
        Ok(())
    }

    // ── Tasks ───────────────────────────────────────────────

    /// Load the nurse task collection, seeding on first run.
    ///
    /// With no stored collection (or an unreadable envelope version),
    /// writes three fixed example tasks back immediately so the board is
    /// never empty on first use.
    pub fn load_or_seed_tasks(&self) -> Result<Vec<NurseTask>, StoreError> {
        match self.read::<Vec<NurseTask>>(NURSE_TASKS_KEY) {
            Ok(Some(tasks)) => Ok(tasks),
            Ok(None) => self.seed_tasks(),
            Err(StoreError::Version { found, expected }) => {
                tracing::warn!(found, expected, "stored tasks have unreadable schema, reseeding");
                self.seed_tasks()
            }
            Err(other) => Err(other),
        }
    }

    fn seed_tasks(&self) -> Result<Vec<NurseTask>, StoreError> {
        let seeded = vec![
            NurseTask::new(
                "Administer medication - Room 305",
                "10:30 AM",
                NursePriority::High,
            ),
            NurseTask::new(
                "Wound dressing change - Room 307",
                "11:00 AM",
                NursePriority::Medium,
            ),
            NurseTask::new(
                "Patient education - Room 310",
                "02:00 PM",
                NursePriority::Low,
            ),
        ];
        self.save_tasks(&seeded)?;
        tracing::info!(count = seeded.len(), "seeded example nurse tasks");
        Ok(seeded)
    }

    /// Full-collection overwrite.
    pub fn save_tasks(&self, tasks: &[NurseTask]) -> Result<(), StoreError> {
        self.write(NURSE_TASKS_KEY, &tasks)
    }

    // ── Vitals ──────────────────────────────────────────────

    /// Vitals have no seeding: an empty history is a valid state.
    pub fn load_vitals(&self) -> Result<Vec<VitalRecord>, StoreError> {
        match self.read::<Vec<VitalRecord>>(NURSE_VITALS_KEY) {
            Ok(Some(vitals)) => Ok(vitals),
            Ok(None) => Ok(Vec::new()),
            Err(StoreError::Version { found, expected }) => {
                tracing::warn!(found, expected, "stored vitals have unreadable schema, starting empty");
                Ok(Vec::new())
            }
            Err(other) => Err(other),
        }
    }

    /// Full-collection overwrite.
    pub fn save_vitals(&self, vitals: &[VitalRecord]) -> Result<(), StoreError> {
        self.write(NURSE_VITALS_KEY, &vitals)
    }

    // ── Session token ───────────────────────────────────────
    //
    // The token is a raw string file, not an envelope: it predates the
    // versioned collections and has no shape to migrate.

    pub fn load_token(&self) -> Option<String> {
        fs::read_to_string(self.path_for(TOKEN_KEY))
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    }

    pub fn store_token(&self, token: &str) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path_for(TOKEN_KEY), token)?;
        Ok(())
    }

    pub fn clear_token(&self) {
        let path = self.path_for(TOKEN_KEY);
        if path.exists() {
            if let Err(e) = fs::remove_file(&path) {
                tracing::warn!(error = %e, "failed to remove stored token");
            }
        }
    }
}
