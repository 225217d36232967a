//! Local state file
//!
//! `.gateflow/state.json` maps each declared resource (`kind.name`) to the
//! remote identity it was created with and the attributes last read back.
//! Member sets also keep the last successfully applied membership, which is
//! the `previous` side of the next diff.

use crate::error::{CloudError, Result};
use crate::resource::{MembershipSet, ResourceKind};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;

const STATE_VERSION: u32 = 1;
const STATE_DIR: &str = ".gateflow";
const STATE_FILE: &str = "state.json";
const STATE_BACKUP: &str = "state.json.backup";
const LOCK_FILE: &str = "lock.json";
const STALE_LOCK_HOURS: i64 = 1;

/// `kind.name`
pub fn address(kind: ResourceKind, name: &str) -> String {
    format!("{kind}.{name}")
}

/// Every tracked resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalState {
    pub version: u32,

    pub updated_at: DateTime<Utc>,

    /// Resources indexed by `kind.name`
    pub resources: BTreeMap<String, ResourceState>,
}

impl Default for GlobalState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            updated_at: Utc::now(),
            resources: BTreeMap::new(),
        }
    }
}

impl GlobalState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: ResourceKind, name: &str) -> Option<&ResourceState> {
        self.resources.get(&address(kind, name))
    }

    pub fn get_mut(&mut self, kind: ResourceKind, name: &str) -> Option<&mut ResourceState> {
        self.resources.get_mut(&address(kind, name))
    }

    /// Remote identity of a declared resource
    pub fn identity(&self, kind: ResourceKind, name: &str) -> Option<&str> {
        self.get(kind, name).map(|r| r.identity.as_str())
    }

    /// Tracked resources of one kind as `(name, state)`
    pub fn of_kind(&self, kind: ResourceKind) -> Vec<(String, &ResourceState)> {
        let prefix = format!("{kind}.");
        self.resources
            .iter()
            .filter_map(|(k, v)| k.strip_prefix(&prefix).map(|name| (name.to_string(), v)))
            .collect()
    }

    /// Add or replace a resource
    pub fn set(&mut self, name: &str, state: ResourceState) {
        self.resources.insert(address(state.kind, name), state);
        self.updated_at = Utc::now();
    }

    pub fn remove(&mut self, kind: ResourceKind, name: &str) -> Option<ResourceState> {
        let result = self.resources.remove(&address(kind, name));
        if result.is_some() {
            self.updated_at = Utc::now();
        }
        result
    }
}

/// State of a single resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceState {
    /// Remote identity (model id, team id, key, or team id for member sets)
    pub identity: String,

    pub kind: ResourceKind,

    /// Attributes last read back from the gateway, secrets excluded
    #[serde(default)]
    pub attributes: serde_json::Value,

    /// Last applied membership (member sets only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub members: Option<MembershipSet>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl ResourceState {
    pub fn new(kind: ResourceKind, identity: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            identity: identity.into(),
            kind,
            attributes: serde_json::Value::Null,
            members: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_attributes<T: Serialize>(mut self, attributes: &T) -> Result<Self> {
        self.attributes = serde_json::to_value(attributes)?;
        Ok(self)
    }

    pub fn with_members(mut self, members: MembershipSet) -> Self {
        self.members = Some(members);
        self
    }

    /// Replace identity and attributes, keeping the creation time
    /// when the identity did not change
    pub fn refresh(&mut self, identity: &str, attributes: serde_json::Value) {
        if self.identity != identity {
            self.identity = identity.to_string();
            self.created_at = Utc::now();
        }
        self.attributes = attributes;
        self.updated_at = Utc::now();
    }

    /// Attributes decoded into their typed form
    pub fn attributes_as<T: DeserializeOwned>(&self) -> Option<T> {
        serde_json::from_value(self.attributes.clone()).ok()
    }
}

/// Reads and writes the state file
pub struct StateManager {
    project_root: PathBuf,
}

impl StateManager {
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self {
            project_root: project_root.as_ref().to_path_buf(),
        }
    }

    fn state_dir(&self) -> PathBuf {
        self.project_root.join(STATE_DIR)
    }

    pub fn state_path(&self) -> PathBuf {
        self.state_dir().join(STATE_FILE)
    }

    fn backup_path(&self) -> PathBuf {
        self.state_dir().join(STATE_BACKUP)
    }

    fn lock_path(&self) -> PathBuf {
        self.state_dir().join(LOCK_FILE)
    }

    async fn ensure_state_dir(&self) -> Result<()> {
        let dir = self.state_dir();
        if !dir.exists() {
            fs::create_dir_all(&dir).await?;
            tracing::debug!("Created state directory: {}", dir.display());
        }
        Ok(())
    }

    /// Load the current state. A missing file is an empty state.
    pub async fn load(&self) -> Result<GlobalState> {
        let path = self.state_path();
        if !path.exists() {
            tracing::debug!("State file not found, starting from empty state");
            return Ok(GlobalState::new());
        }

        let content = fs::read_to_string(&path).await?;
        let state: GlobalState = serde_json::from_str(&content).map_err(|e| {
            CloudError::StateError(format!("{}: {}", path.display(), e))
        })?;

        if state.version > STATE_VERSION {
            return Err(CloudError::StateError(format!(
                "State file version {} is newer than supported version {}",
                state.version, STATE_VERSION
            )));
        }

        tracing::debug!("Loaded state with {} resources", state.resources.len());
        Ok(state)
    }

    /// Save the state, keeping the previous file as a backup
    pub async fn save(&self, state: &GlobalState) -> Result<()> {
        self.ensure_state_dir().await?;

        let path = self.state_path();
        let backup = self.backup_path();

        if path.exists() {
            if backup.exists() {
                fs::remove_file(&backup).await?;
            }
            fs::rename(&path, &backup).await?;
            tracing::debug!("Created state backup");
        }

        let content = serde_json::to_string_pretty(state)?;
        fs::write(&path, content).await?;

        tracing::debug!("Saved state with {} resources", state.resources.len());
        Ok(())
    }

    /// Acquire the advisory lock held during apply and destroy
    pub async fn acquire_lock(&self, operation: &str) -> Result<StateLock> {
        self.ensure_state_dir().await?;

        let lock_path = self.lock_path();

        if lock_path.exists() {
            let content = fs::read_to_string(&lock_path).await?;
            let lock_info: LockInfo = serde_json::from_str(&content)
                .map_err(|e| CloudError::LockError(format!("unreadable lock file: {e}")))?;

            let age = Utc::now().signed_duration_since(lock_info.acquired_at);
            if age.num_hours() < STALE_LOCK_HOURS {
                return Err(CloudError::LockError(format!(
                    "State is locked by {} ({}) since {}",
                    lock_info.holder, lock_info.operation, lock_info.acquired_at
                )));
            }

            tracing::warn!("Removing stale lock from {}", lock_info.holder);
        }

        let lock_info = LockInfo {
            holder: std::env::var("HOSTNAME")
                .or_else(|_| std::env::var("HOST"))
                .unwrap_or_else(|_| "unknown".to_string()),
            operation: operation.to_string(),
            acquired_at: Utc::now(),
        };

        let content = serde_json::to_string_pretty(&lock_info)?;
        fs::write(&lock_path, content).await?;

        tracing::debug!("Acquired state lock");
        Ok(StateLock {
            lock_path,
            released: false,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct LockInfo {
    holder: String,
    #[serde(default)]
    operation: String,
    acquired_at: DateTime<Utc>,
}

/// Guard for the state lock; the lock file is removed on release or drop
pub struct StateLock {
    lock_path: PathBuf,
    released: bool,
}

impl StateLock {
    pub async fn release(mut self) -> Result<()> {
        if !self.released {
            if self.lock_path.exists() {
                fs::remove_file(&self.lock_path).await?;
                tracing::debug!("Released state lock");
            }
            self.released = true;
        }
        Ok(())
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        if !self.released && self.lock_path.exists() {
            let _ = std::fs::remove_file(&self.lock_path);
        }
    }
}
