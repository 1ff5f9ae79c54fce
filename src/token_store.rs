use std::fs::{self, DirBuilder, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Error;

const CACHE_DIR: &str = ".credentials";
const CACHE_NAME: &str = "sheets-to-tweets";

/// The cached Sheets credential. The on-disk shape matches the common
/// `{access_token, token_type, refresh_token, expiry}` layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthToken {
    pub access_token: String,
    #[serde(default = "bearer")]
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

fn bearer() -> String {
    "Bearer".to_string()
}

impl OAuthToken {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: bearer(),
            refresh_token: None,
            expiry: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("token cache not found")]
    NotFound,
    #[error("failed to read token cache: {0}")]
    Io(#[from] io::Error),
    #[error("failed to decode token cache: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Persistence for the single cached token.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Result<OAuthToken, LoadError>;
    fn save(&self, token: &OAuthToken) -> Result<(), Error>;
}

/// `<home>/.credentials/sheets-to-tweets`
pub fn default_cache_path() -> Result<PathBuf, Error> {
    let home = dirs::home_dir().ok_or_else(|| {
        Error::InvalidConfig("unable to determine home directory for token cache".into())
    })?;
    Ok(home
        .join(CACHE_DIR)
        .join(urlencoding::encode(CACHE_NAME).as_ref()))
}

/// JSON token file readable and writable by the owner only.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, token: &OAuthToken) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                let mut dir = DirBuilder::new();
                dir.recursive(true);
                #[cfg(unix)]
                std::os::unix::fs::DirBuilderExt::mode(&mut dir, 0o700);
                dir.create(parent)?;
                debug!("Created token cache directory: {:?}", parent);
            }
        }

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        std::os::unix::fs::OpenOptionsExt::mode(&mut options, 0o600);
        let mut file = options.open(&self.path)?;

        let json = serde_json::to_vec(token).map_err(io::Error::from)?;
        file.write_all(&json)?;
        file.write_all(b"\n")?;
        file.flush()
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<OAuthToken, LoadError> {
        let content = match fs::read(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(LoadError::NotFound),
            Err(e) => return Err(e.into()),
        };
        let token = serde_json::from_slice(&content)?;
        debug!("Loaded cached token from: {:?}", self.path);
        Ok(token)
    }

    fn save(&self, token: &OAuthToken) -> Result<(), Error> {
        info!("Saving credential file to: {:?}", self.path());
        self.write(token).map_err(|source| Error::CacheIo {
            path: self.path.clone(),
            source,
        })
    }
}
