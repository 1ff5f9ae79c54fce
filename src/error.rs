use std::path::PathBuf;

/// Errors that can end a run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The OAuth client secret file is missing or malformed.
    #[error("failed to read client secret file {path:?}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A required setting is missing or unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The authorization code could not be obtained or exchanged.
    #[error("authorization failed: {0}")]
    Auth(String),

    /// The token cache could not be written.
    #[error("failed to cache oauth token at {path:?}: {source}")]
    CacheIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The spreadsheet values call failed.
    #[error("failed to read sheet with id={sheet_id:?} and range={range:?}: {message}")]
    Read {
        sheet_id: String,
        range: String,
        message: String,
    },

    /// The spreadsheet returned no rows.
    #[error("no data found from spreadsheet")]
    EmptyResult,

    /// The status update could not be published.
    #[error("failed to post status: {0}")]
    Post(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Post(err.to_string())
    }
}
