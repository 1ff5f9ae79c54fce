use std::future::Future;
use std::io::{self, BufRead};
use std::path::Path;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use google_sheets4::oauth2::authenticator::Authenticator;
use google_sheets4::oauth2::authenticator_delegate::InstalledFlowDelegate;
use google_sheets4::oauth2::storage::{TokenInfo, TokenStorage};
use google_sheets4::oauth2::{
    self, ApplicationSecret, InstalledFlowAuthenticator, InstalledFlowReturnMethod,
};
use google_sheets4::{hyper, hyper_rustls};
use hyper::client::connect::Connection;
use hyper::service::Service;
use hyper::Uri;
use time::OffsetDateTime;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::token_store::{LoadError, OAuthToken, TokenStore};

pub const SHEETS_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets.readonly";

pub type HttpsConnector = hyper_rustls::HttpsConnector<hyper::client::HttpConnector>;

/// Shared HTTPS client for the token endpoint and the Sheets API.
pub fn https_client() -> hyper::Client<HttpsConnector> {
    let https = hyper_rustls::HttpsConnectorBuilder::new()
        .with_native_roots()
        .expect("could not load platform certs")
        .https_or_http()
        .enable_http1()
        .build();
    hyper::Client::builder().build(https)
}

/// Reads the OAuth client secret (`installed` or `web` layout).
pub async fn read_client_secret(path: &Path) -> Result<ApplicationSecret, Error> {
    debug!("Reading client secret from: {:?}", path);
    oauth2::read_application_secret(path)
        .await
        .map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })
}

/// Supplies the code a user receives after approving access at `auth_url`.
pub trait CodeProvider: Send + Sync {
    fn authorization_code(&self, auth_url: &str) -> Result<String, Error>;
}

/// Prints the authorization URL and waits for a line on stdin.
#[derive(Debug, Default)]
pub struct StdinCodeProvider;

impl CodeProvider for StdinCodeProvider {
    fn authorization_code(&self, auth_url: &str) -> Result<String, Error> {
        eprintln!(
            "Go to the following link in your browser then type the authorization code:\n{}",
            auth_url
        );
        read_code(&mut io::stdin().lock())
    }
}

fn read_code(reader: &mut impl BufRead) -> Result<String, Error> {
    let mut line = String::new();
    reader
        .read_line(&mut line)
        .map_err(|e| Error::Auth(format!("unable to read authorization code: {}", e)))?;
    let code = line.trim();
    if code.is_empty() {
        return Err(Error::Auth("no authorization code entered".into()));
    }
    Ok(code.to_string())
}

/// Obtains a Sheets token: the cached one when present, otherwise through
/// the interactive authorization-code exchange.
pub struct Authorizer<S> {
    store: S,
    codes: Arc<dyn CodeProvider>,
}

impl<S: TokenStore + 'static> Authorizer<S> {
    pub fn new(store: S, codes: Arc<dyn CodeProvider>) -> Self {
        Self { store, codes }
    }

    /// Builds an authenticator bound to `client` and fetches a token once so
    /// that authorization problems surface before any API call. Expired
    /// tokens carrying a refresh token are refreshed silently afterwards and
    /// written back through the store.
    pub async fn authorize<C>(
        self,
        secret: ApplicationSecret,
        client: hyper::Client<C>,
    ) -> Result<Authenticator<C>, Error>
    where
        C: Service<Uri> + Clone + Send + Sync + 'static,
        C::Response: Connection + AsyncRead + AsyncWrite + Send + Unpin + 'static,
        C::Future: Send + Unpin + 'static,
        C::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        info!("Initializing Google Sheets authorization");

        let storage = CacheStorage::new(self.store);
        let save_failure = Arc::clone(&storage.save_failure);

        let auth = InstalledFlowAuthenticator::with_client(
            secret,
            InstalledFlowReturnMethod::Interactive,
            client,
        )
        .with_storage(Box::new(storage))
        .flow_delegate(Box::new(CodePrompt { codes: self.codes }))
        .build()
        .await
        .map_err(|e| Error::Auth(format!("failed to build authenticator: {}", e)))?;

        match auth.token(&[SHEETS_READONLY_SCOPE]).await {
            Ok(_) => {
                info!("Authorized for Google Sheets");
                Ok(auth)
            }
            Err(e) => {
                let cache_err = save_failure.lock().ok().and_then(|mut slot| slot.take());
                Err(cache_err.unwrap_or_else(|| Error::Auth(e.to_string())))
            }
        }
    }
}

struct CodePrompt {
    codes: Arc<dyn CodeProvider>,
}

impl InstalledFlowDelegate for CodePrompt {
    fn present_user_url<'a>(
        &'a self,
        url: &'a str,
        _need_code: bool,
    ) -> Pin<Box<dyn Future<Output = Result<String, String>> + Send + 'a>> {
        Box::pin(async move {
            let codes = Arc::clone(&self.codes);
            let url = url.to_owned();
            tokio::task::spawn_blocking(move || codes.authorization_code(&url))
                .await
                .map_err(|e| e.to_string())?
                .map_err(|e| match e {
                    // Re-wrapped as `Error::Auth` by `authorize`.
                    Error::Auth(message) => message,
                    other => other.to_string(),
                })
        })
    }
}

/// Adapts a [`TokenStore`] to the authenticator's storage hook. The cache
/// holds a single token regardless of scope.
struct CacheStorage<S> {
    store: S,
    save_failure: Arc<Mutex<Option<Error>>>,
}

impl<S> CacheStorage<S> {
    fn new(store: S) -> Self {
        Self {
            store,
            save_failure: Arc::new(Mutex::new(None)),
        }
    }
}

#[async_trait]
impl<S: TokenStore + 'static> TokenStorage for CacheStorage<S> {
    async fn set(&self, _scopes: &[&str], token: TokenInfo) -> anyhow::Result<()> {
        let token = from_token_info(token)
            .ok_or_else(|| anyhow::anyhow!("token response carried no access token"))?;
        if let Err(e) = self.store.save(&token) {
            let message = e.to_string();
            if let Ok(mut slot) = self.save_failure.lock() {
                *slot = Some(e);
            }
            anyhow::bail!(message);
        }
        Ok(())
    }

    async fn get(&self, _scopes: &[&str]) -> Option<TokenInfo> {
        match self.store.load() {
            Ok(token) => {
                let mut info = to_token_info(token);
                // Only a refreshable token is checked for expiry. Anything
                // else is used as-is and a stale one fails at the API call.
                if info.refresh_token.is_none() {
                    info.expires_at = None;
                }
                Some(info)
            }
            Err(LoadError::NotFound) => {
                debug!("No cached token, authorization required");
                None
            }
            Err(e) => {
                warn!("Ignoring unusable token cache: {}", e);
                None
            }
        }
    }
}

fn to_token_info(token: OAuthToken) -> TokenInfo {
    TokenInfo {
        access_token: Some(token.access_token),
        refresh_token: token.refresh_token,
        expires_at: token
            .expiry
            .and_then(|t| OffsetDateTime::from_unix_timestamp(t.timestamp()).ok()),
        id_token: None,
    }
}

fn from_token_info(info: TokenInfo) -> Option<OAuthToken> {
    Some(OAuthToken {
        access_token: info.access_token?,
        token_type: "Bearer".to_string(),
        refresh_token: info.refresh_token,
        expiry: info
            .expires_at
            .and_then(|t| Utc.timestamp_opt(t.unix_timestamp(), 0).single()),
    })
}
