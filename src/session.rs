use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::storage;

pub const SESSION_KEY: &str = "user";

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("username is required")]
    EmptyUsername,
}

/// Persisted form of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub username: String,
    pub is_authenticated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub username: String,
}

pub trait SessionStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>>;
    fn save(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

impl SessionStore for storage::Store {
    fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.get_value(key)?.map(|entry| entry.value))
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        self.set_value(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.delete_value(key).map(|_| ())
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        self.values.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.values.lock().remove(key);
        Ok(())
    }
}

pub struct Manager {
    store: Arc<dyn SessionStore>,
    user: RwLock<Option<UserIdentity>>,
}

impl Manager {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            user: RwLock::new(None),
        }
    }

    /// Creates a manager and restores whatever identity was persisted.
    pub fn open(store: Arc<dyn SessionStore>) -> Self {
        let manager = Self::new(store);
        manager.restore();
        manager
    }

    /// Reloads the persisted identity. A missing or unreadable record leaves
    /// the session signed out.
    pub fn restore(&self) -> Option<UserIdentity> {
        let identity = match self.store.load(SESSION_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<UserRecord>(&raw) {
                Ok(record) if record.is_authenticated && !record.username.trim().is_empty() => {
                    Some(UserIdentity {
                        username: record.username,
                    })
                }
                Ok(_) => None,
                Err(err) => {
                    warn!(error = %err, "ignoring corrupt session record");
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                warn!(error = %err, "session store unavailable");
                None
            }
        };
        *self.user.write() = identity.clone();
        identity
    }

    pub fn login(&self, username: &str) -> Result<UserIdentity> {
        let username = username.trim();
        if username.is_empty() {
            bail!(SessionError::EmptyUsername);
        }

        let record = UserRecord {
            username: username.to_string(),
            is_authenticated: true,
        };
        let raw = serde_json::to_string(&record).context("session: encode user record")?;
        self.store
            .save(SESSION_KEY, &raw)
            .context("session: persist user record")?;

        let identity = UserIdentity {
            username: record.username,
        };
        *self.user.write() = Some(identity.clone());
        debug!(username = %identity.username, "signed in");
        Ok(identity)
    }

    pub fn logout(&self) -> Result<()> {
        self.store
            .remove(SESSION_KEY)
            .context("session: remove user record")?;
        *self.user.write() = None;
        debug!("signed out");
        Ok(())
    }

    pub fn user(&self) -> Option<UserIdentity> {
        self.user.read().clone()
    }

    pub fn username(&self) -> Option<String> {
        self.user.read().as_ref().map(|user| user.username.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.read().is_some()
    }
}
