//! Session cache
//!
//! Remembers which API key / universe pairs were used recently. The whole
//! list is read and rewritten on every change; stores only need to move one
//! JSON array in and out.

use crate::error::{MonetixError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sled::Db;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

const SESSIONS_KEY: &str = "monetix-sessions";

/// A remembered API key / universe pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub api_key: String,
    pub universe_id: String,
    pub experience_name: String,
    /// Epoch milliseconds
    pub last_used: i64,
}

/// Setup form input, validated and trimmed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDraft {
    pub api_key: String,
    pub universe_id: String,
    pub experience_name: String,
}

impl SessionDraft {
    pub fn new(api_key: &str, universe_id: &str, experience_name: &str) -> Result<Self> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(MonetixError::validation("API key is required."));
        }

        let universe_id = universe_id.trim();
        if universe_id.is_empty() || universe_id.parse::<u64>().is_err() {
            return Err(MonetixError::validation("A valid Universe ID is required."));
        }

        let experience_name = match experience_name.trim() {
            "" => format!("Universe {universe_id}"),
            name => name.to_string(),
        };

        Ok(Self {
            api_key: api_key.to_string(),
            universe_id: universe_id.to_string(),
            experience_name,
        })
    }
}

/// Read-all / write-all backing store for the session list
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Raw stored value, `None` when nothing was ever written
    async fn read_all(&self) -> Result<Option<Vec<u8>>>;

    async fn write_all(&self, value: Vec<u8>) -> Result<()>;
}

/// Session store using sled embedded database
pub struct SledSessionStore {
    db: Arc<Db>,
}

impl SledSessionStore {
    pub fn new(db_path: PathBuf) -> Result<Self> {
        let db = sled::open(db_path)
            .map_err(|e| MonetixError::StorageError(format!("Failed to open sled database: {e}")))?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Store under the platform data directory
    pub fn open_default() -> Result<Self> {
        let dir = dirs::data_dir()
            .ok_or_else(|| MonetixError::StorageError("No data directory available".to_string()))?;
        Self::new(dir.join("monetix").join("sessions"))
    }
}

#[async_trait]
impl SessionStore for SledSessionStore {
    async fn read_all(&self) -> Result<Option<Vec<u8>>> {
        let value = self
            .db
            .get(SESSIONS_KEY)
            .map_err(|e| MonetixError::StorageError(format!("Failed to read sessions: {e}")))?;
        Ok(value.map(|v| v.to_vec()))
    }

    async fn write_all(&self, value: Vec<u8>) -> Result<()> {
        self.db
            .insert(SESSIONS_KEY, value)
            .map_err(|e| MonetixError::StorageError(format!("Failed to write sessions: {e}")))?;

        self.db
            .flush_async()
            .await
            .map_err(|e| MonetixError::StorageError(format!("Failed to flush database: {e}")))?;
        Ok(())
    }
}

/// In-memory store
#[derive(Default)]
pub struct MemorySessionStore {
    value: Mutex<Option<Vec<u8>>>,
}

impl MemorySessionStore {
    pub fn with_raw(value: impl Into<Vec<u8>>) -> Self {
        Self {
            value: Mutex::new(Some(value.into())),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Option<Vec<u8>>>> {
        self.value
            .lock()
            .map_err(|_| MonetixError::StorageError("Session store lock poisoned".to_string()))
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn read_all(&self) -> Result<Option<Vec<u8>>> {
        Ok(self.lock()?.clone())
    }

    async fn write_all(&self, value: Vec<u8>) -> Result<()> {
        *self.lock()? = Some(value);
        Ok(())
    }
}

/// Session list operations on top of a [`SessionStore`]
pub struct SessionCache<S> {
    store: S,
}

impl<S: SessionStore> SessionCache<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// All sessions, most recently used first
    ///
    /// An unreadable entry reads as an empty list.
    pub async fn list(&self) -> Result<Vec<Session>> {
        let Some(raw) = self.store.read_all().await? else {
            return Ok(Vec::new());
        };

        let mut sessions: Vec<Session> = match serde_json::from_slice(&raw) {
            Ok(sessions) => sessions,
            Err(e) => {
                tracing::warn!("Ignoring unreadable session cache: {}", e);
                return Ok(Vec::new());
            }
        };
        sessions.sort_by(|a, b| b.last_used.cmp(&a.last_used));
        Ok(sessions)
    }

    pub async fn find(&self, id: &str) -> Result<Option<Session>> {
        Ok(self.list().await?.into_iter().find(|s| s.id == id))
    }

    /// Save or refresh a session
    pub async fn save(&self, draft: SessionDraft) -> Result<Session> {
        self.save_at(draft, chrono::Utc::now().timestamp_millis())
            .await
    }

    /// Same as [`SessionCache::save`] with an explicit timestamp
    ///
    /// A session with the same API key and universe is updated in place
    /// instead of duplicated.
    pub async fn save_at(&self, draft: SessionDraft, now_millis: i64) -> Result<Session> {
        let mut sessions = self.list().await?;

        let existing = sessions
            .iter_mut()
            .find(|s| s.api_key == draft.api_key && s.universe_id == draft.universe_id);

        let saved = match existing {
            Some(session) => {
                session.experience_name = draft.experience_name;
                session.last_used = now_millis;
                session.clone()
            }
            None => {
                let session = Session {
                    id: Uuid::new_v4().to_string(),
                    api_key: draft.api_key,
                    universe_id: draft.universe_id,
                    experience_name: draft.experience_name,
                    last_used: now_millis,
                };
                sessions.push(session.clone());
                session
            }
        };

        self.write(&sessions).await?;
        tracing::info!("Saved session {} ({})", saved.id, saved.experience_name);
        Ok(saved)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let sessions: Vec<Session> = self
            .list()
            .await?
            .into_iter()
            .filter(|s| s.id != id)
            .collect();

        self.write(&sessions).await?;
        tracing::info!("Deleted session {}", id);
        Ok(())
    }

    async fn write(&self, sessions: &[Session]) -> Result<()> {
        let bytes = serde_json::to_vec(sessions).map_err(|e| {
            MonetixError::SerializationError(format!("Failed to serialize sessions: {e}"))
        })?;
        self.store.write_all(bytes).await
    }
}
