use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::error::ClientError;

/// On-disk / in-memory record kept under a single namespaced key. The backend
/// issues one token used as both access and refresh credential, so only one
/// opaque string is stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredCredentials {
    pub token: String,
    pub remember_me: bool,
    pub saved_at: DateTime<Utc>,
}

/// Snapshot handed to readers. Access and refresh tokens are both present or
/// both absent.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub access_token: String,
    pub refresh_token: String,
    pub remember_me: bool,
}

/// Exclusive owner of the persisted credentials. All other components read
/// or request mutation through this interface; token contents are opaque and
/// never validated here.
///
/// `persist = true` writes to the durable tier (a JSON file in the config
/// directory, surviving restarts); `persist = false` keeps the record in the
/// session tier (process memory) only.
pub struct CredentialStore {
    session: Mutex<Option<StoredCredentials>>,
    dir: PathBuf,
}

const CREDENTIALS_FILE: &str = "credentials.json";

pub fn get_config_dir() -> Result<PathBuf, ClientError> {
    let config_dir = if let Ok(custom_dir) = std::env::var("CONSOLE_CONFIG_DIR") {
        PathBuf::from(custom_dir)
    } else {
        let home = std::env::var("HOME").map_err(|_| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "HOME environment variable not set")
        })?;
        PathBuf::from(home).join(".config").join("console")
    };

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

impl CredentialStore {
    pub fn new() -> Result<Self, ClientError> {
        Ok(Self::with_dir(get_config_dir()?))
    }

    /// Build a store rooted at an explicit directory (test isolation).
    pub fn with_dir(dir: PathBuf) -> Self {
        Self {
            session: Mutex::new(None),
            dir,
        }
    }

    fn credentials_path(&self) -> PathBuf {
        self.dir.join(CREDENTIALS_FILE)
    }

    fn load_durable(&self) -> Option<StoredCredentials> {
        let path = self.credentials_path();
        if !path.exists() {
            return None;
        }
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("failed to read credentials file: {err}");
                return None;
            }
        };
        match serde_json::from_str(&content) {
            Ok(record) => Some(record),
            Err(err) => {
                tracing::warn!("ignoring malformed credentials file: {err}");
                None
            }
        }
    }

    fn current(&self) -> Option<StoredCredentials> {
        let session = self.session.lock().expect("credential store lock poisoned");
        session.clone().or_else(|| self.load_durable())
    }

    pub fn get(&self) -> Option<Credentials> {
        self.current().map(|record| Credentials {
            access_token: record.token.clone(),
            refresh_token: record.token,
            remember_me: record.remember_me,
        })
    }

    pub fn access_token(&self) -> Option<String> {
        self.current().map(|record| record.token)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.current().map(|record| record.token)
    }

    pub fn remember_me(&self) -> bool {
        self.current().map(|record| record.remember_me).unwrap_or(false)
    }

    /// Write both tokens. The caller decides the tier: `persist = true` for
    /// the durable file, `persist = false` for the session tier only. The
    /// write is complete when this returns.
    pub fn set(&self, access: &str, _refresh: &str, persist: bool) -> Result<(), ClientError> {
        let record = StoredCredentials {
            token: access.to_string(),
            remember_me: persist,
            saved_at: Utc::now(),
        };

        if persist {
            fs::create_dir_all(&self.dir)?;
            let content = serde_json::to_string_pretty(&record)?;
            fs::write(self.credentials_path(), content)?;
        } else if self.credentials_path().exists() {
            // A fresh non-persistent login supersedes an old durable record.
            fs::remove_file(self.credentials_path())?;
        }

        let mut session = self.session.lock().expect("credential store lock poisoned");
        *session = Some(record);
        Ok(())
    }

    /// Remove both tiers.
    pub fn clear(&self) -> Result<(), ClientError> {
        let mut session = self.session.lock().expect("credential store lock poisoned");
        *session = None;
        drop(session);

        let path = self.credentials_path();
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}
