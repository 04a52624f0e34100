//! Session state: the auth token, the logged-in flag and the cached salon profile.
//!
//! A [`SessionStore`] is constructed explicitly and shared (usually behind an
//! `Arc`) between the [`Client`](crate::Client) and application code. All three
//! fields live behind one lock, so readers never observe a token without its
//! flag or vice versa. Every mutation is mirrored to a [`SettingsStore`]; the
//! in-memory state stays authoritative if persistence fails.

use crate::errors::ClientError;
use crate::models::Salon;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{debug, warn};

/// Settings key holding the bearer token.
pub const AUTH_TOKEN_KEY: &str = "authToken";
/// Settings key holding the logged-in flag.
pub const IS_LOGGED_IN_KEY: &str = "isLoggedIn";
/// Settings key holding the JSON-encoded salon profile.
pub const SALON_DATA_KEY: &str = "salonData";

/// Error raised by a [`SettingsStore`] backend.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("settings I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("settings file is not a JSON object: {0}")]
    Format(#[from] serde_json::Error),
}

/// A key-value settings backend for persisting session fields.
pub trait SettingsStore: Send + Sync + fmt::Debug {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&self, key: &str, value: Value) -> Result<(), SettingsError>;
    fn remove(&self, key: &str) -> Result<(), SettingsError>;
}

/// Process-local settings. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemorySettings {
    values: RwLock<HashMap<String, Value>>,
}

impl MemorySettings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, key: &str) -> Option<Value> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: Value) -> Result<(), SettingsError> {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), SettingsError> {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

/// Settings persisted as a single JSON object file.
///
/// The whole file is rewritten on every change.
#[derive(Debug)]
pub struct JsonFileSettings {
    path: PathBuf,
    values: Mutex<Map<String, Value>>,
}

impl JsonFileSettings {
    /// Opens (or lazily creates) the settings file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or is not a JSON object.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref().to_path_buf();
        let values = match std::fs::read(&path) {
            Ok(data) if data.is_empty() => Map::new(),
            Ok(data) => serde_json::from_slice(&data)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => return Err(e.into()),
        };
        debug!("Opened settings file {} ({} keys)", path.display(), values.len());
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling file the next contents are staged in before the rename.
    fn temp_path(&self) -> Result<PathBuf, SettingsError> {
        let file_name = self.path.file_name().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "settings path has no file name",
            )
        })?;
        Ok(self
            .path
            .with_file_name(format!(".{}.tmp", file_name.to_string_lossy())))
    }

    /// Replaces the file atomically: write and sync a temp file in the same
    /// directory, then rename it over the settings file.
    fn flush(&self, values: &Map<String, Value>) -> Result<(), SettingsError> {
        let data = serde_json::to_vec_pretty(values)?;
        let tmp_path = self.temp_path()?;

        let mut tmp_file = File::create(&tmp_path)?;
        tmp_file.write_all(&data)?;
        tmp_file.sync_all()?;
        drop(tmp_file);

        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

impl SettingsStore for JsonFileSettings {
    fn get(&self, key: &str) -> Option<Value> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: Value) -> Result<(), SettingsError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value);
        self.flush(&values)
    }

    fn remove(&self, key: &str) -> Result<(), SettingsError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        if values.remove(key).is_some() {
            self.flush(&values)?;
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
struct SessionState {
    token: Option<String>,
    logged_in: bool,
    profile: Option<Salon>,
}

/// Holds the current login session.
pub struct SessionStore {
    state: RwLock<SessionState>,
    settings: Arc<dyn SettingsStore>,
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.read();
        f.debug_struct("SessionStore")
            .field("token", &state.token.as_ref().map(|_| "<redacted>"))
            .field("logged_in", &state.logged_in)
            .field("profile_id", &state.profile.as_ref().and_then(|p| p.id.as_deref()))
            .finish()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl SessionStore {
    /// An empty session that is not persisted anywhere.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            state: RwLock::new(SessionState::default()),
            settings: Arc::new(MemorySettings::new()),
        }
    }

    /// Restores a session from `settings`.
    ///
    /// A persisted logged-in flag without a token restores as logged out, and a
    /// profile blob that no longer decodes is dropped.
    #[must_use]
    pub fn load(settings: Arc<dyn SettingsStore>) -> Self {
        let token = settings
            .get(AUTH_TOKEN_KEY)
            .and_then(|v| v.as_str().map(str::to_string));
        let flag = settings
            .get(IS_LOGGED_IN_KEY)
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        let profile = settings
            .get(SALON_DATA_KEY)
            .and_then(|v| v.as_str().map(str::to_string))
            .and_then(|blob| match serde_json::from_str::<Salon>(&blob) {
                Ok(salon) => Some(salon),
                Err(e) => {
                    warn!("Discarding undecodable persisted salon profile: {}", e);
                    None
                }
            });

        let logged_in = flag && token.is_some();
        let state = SessionState {
            token: if logged_in { token } else { None },
            logged_in,
            profile,
        };
        debug!("Loaded session: logged_in={}", state.logged_in);

        Self {
            state: RwLock::new(state),
            settings,
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, key: &str, value: Option<Value>) {
        let result = match value {
            Some(value) => self.settings.set(key, value),
            None => self.settings.remove(key),
        };
        if let Err(e) = result {
            warn!("Failed to persist session field '{}': {}", key, e);
        }
    }

    /// Token and logged-in flag read under a single lock.
    pub(crate) fn snapshot(&self) -> (Option<String>, bool) {
        let state = self.read();
        (state.token.clone(), state.logged_in)
    }

    /// The stored bearer token, if the session is logged in.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.read().token.clone()
    }

    /// True iff a token is present and the logged-in flag is set.
    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        let state = self.read();
        state.logged_in && state.token.is_some()
    }

    /// Stores `token` and marks the session logged in, as one update.
    pub fn set_session(&self, token: impl Into<String>) {
        let token = token.into();
        let mut state = self.write();
        state.token = Some(token.clone());
        state.logged_in = true;
        self.persist(AUTH_TOKEN_KEY, Some(Value::String(token)));
        self.persist(IS_LOGGED_IN_KEY, Some(Value::Bool(true)));
        debug!("Session stored");
    }

    /// Drops the token, the logged-in flag and the cached profile together.
    pub fn clear(&self) {
        let mut state = self.write();
        *state = SessionState::default();
        self.persist(AUTH_TOKEN_KEY, None);
        self.persist(IS_LOGGED_IN_KEY, Some(Value::Bool(false)));
        self.persist(SALON_DATA_KEY, None);
        debug!("Session cleared");
    }

    #[must_use]
    pub fn profile(&self) -> Option<Salon> {
        self.read().profile.clone()
    }

    /// Caches `salon` as the current profile.
    pub fn set_profile(&self, salon: Salon) {
        let mut state = self.write();
        match serde_json::to_string(&salon) {
            Ok(blob) => self.persist(SALON_DATA_KEY, Some(Value::String(blob))),
            Err(e) => warn!("Failed to encode salon profile: {}", e),
        }
        state.profile = Some(salon);
    }

    pub fn clear_profile(&self) {
        let mut state = self.write();
        state.profile = None;
        self.persist(SALON_DATA_KEY, None);
    }

    /// Merges wire-named fields (e.g. `"mainPicture"`, `"_id"`) into the cached profile.
    ///
    /// Does nothing when no profile is cached.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Decode`] if the merged record is no longer a valid
    /// profile; the cached profile is left unchanged in that case.
    pub fn update_profile(&self, updates: Map<String, Value>) -> Result<(), ClientError> {
        let mut state = self.write();
        let Some(existing) = state.profile.as_ref() else {
            return Ok(());
        };

        let mut fields = match serde_json::to_value(existing)? {
            Value::Object(fields) => fields,
            _ => Map::new(),
        };
        fields.extend(updates);

        let updated: Salon =
            serde_json::from_value(Value::Object(fields)).map_err(|e| ClientError::Decode {
                context: "updated salon profile".to_string(),
                message: e.to_string(),
            })?;

        match serde_json::to_string(&updated) {
            Ok(blob) => self.persist(SALON_DATA_KEY, Some(Value::String(blob))),
            Err(e) => warn!("Failed to encode salon profile: {}", e),
        }
        state.profile = Some(updated);
        Ok(())
    }
}
