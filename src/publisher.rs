use std::collections::BTreeMap;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use tracing::{debug, info};

use crate::cfg::PublisherConfig;
use crate::error::Error;
use crate::status::StatusMessage;

const TWEETS_URL: &str = "https://api.twitter.com/2/tweets";

const SIGNATURE_METHOD: &str = "HMAC-SHA1";

/// RFC 3986 unreserved characters stay as-is, everything else is escaped.
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

type HmacSha1 = Hmac<Sha1>;

/// ID of a published status.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct PostId(pub String);

#[async_trait]
pub trait Publisher: Send + Sync {
    async fn post(&self, status: &StatusMessage) -> Result<PostId, Error>;
}

/// Posts through the Twitter v2 API with OAuth 1.0a user credentials.
#[derive(Debug, Clone)]
pub struct TwitterPublisher {
    client: reqwest::Client,
    credentials: PublisherConfig,
    endpoint: String,
    reply_to: Option<String>,
}

impl TwitterPublisher {
    pub fn new(credentials: PublisherConfig) -> Result<Self, Error> {
        const USER_AGENT: &str = concat!("sheets_to_tweets/", env!("CARGO_PKG_VERSION"));

        Ok(Self {
            client: reqwest::Client::builder().user_agent(USER_AGENT).build()?,
            credentials,
            endpoint: TWEETS_URL.to_string(),
            reply_to: None,
        })
    }

    #[cfg(test)]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Posts as a reply to the given status.
    #[must_use]
    pub fn in_reply_to(mut self, post_id: impl Into<String>) -> Self {
        self.reply_to = Some(post_id.into());
        self
    }

    fn body<'a>(&'a self, status: &'a StatusMessage) -> CreateTweet<'a> {
        CreateTweet {
            text: status.as_str(),
            reply: self.reply_to.as_deref().map(|id| Reply {
                in_reply_to_tweet_id: id,
            }),
        }
    }
}

#[async_trait]
impl Publisher for TwitterPublisher {
    #[tracing::instrument(skip_all)]
    async fn post(&self, status: &StatusMessage) -> Result<PostId, Error> {
        info!("Posting status ({} chars)", status.as_str().chars().count());

        // JSON bodies are not part of the OAuth 1.0a signature.
        let signer = OAuth1::new(&self.credentials);
        let authorization = signer.authorization("POST", &self.endpoint, &[]);

        let response = self
            .client
            .post(&self.endpoint)
            .header(AUTHORIZATION, authorization)
            .json(&self.body(status))
            .send()
            .await?;

        let code = response.status();
        if !code.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Post(format!("{}: {}", code, body)));
        }

        let TweetResponse { data } = response.json().await?;
        info!(post_id = %data.id.0, "Posted status");
        Ok(data.id)
    }
}

/// Logs the status instead of posting it.
#[derive(Debug, Default)]
pub struct DryRunPublisher;

#[async_trait]
impl Publisher for DryRunPublisher {
    async fn post(&self, status: &StatusMessage) -> Result<PostId, Error> {
        info!("Would have posted status: {}", status);
        Ok(PostId("dry-run".to_string()))
    }
}

#[derive(Serialize)]
struct CreateTweet<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply: Option<Reply<'a>>,
}

#[derive(Serialize)]
struct Reply<'a> {
    in_reply_to_tweet_id: &'a str,
}

#[derive(Deserialize)]
struct TweetResponse {
    data: TweetData,
}

#[derive(Deserialize)]
struct TweetData {
    id: PostId,
}

/// OAuth 1.0a request signer.
///
/// See <https://developer.twitter.com/en/docs/authentication/oauth-1-0a/creating-a-signature>
struct OAuth1<'a> {
    credentials: &'a PublisherConfig,
    nonce: String,
    timestamp: i64,
}

impl<'a> OAuth1<'a> {
    fn new(credentials: &'a PublisherConfig) -> Self {
        Self {
            credentials,
            nonce: uuid::Uuid::new_v4().simple().to_string(),
            timestamp: chrono::Utc::now().timestamp(),
        }
    }

    fn oauth_params(&self) -> BTreeMap<&'static str, String> {
        BTreeMap::from([
            ("oauth_consumer_key", self.credentials.consumer_key.clone()),
            ("oauth_nonce", self.nonce.clone()),
            ("oauth_signature_method", SIGNATURE_METHOD.to_string()),
            ("oauth_timestamp", self.timestamp.to_string()),
            ("oauth_token", self.credentials.access_token.clone()),
            ("oauth_version", "1.0".to_string()),
        ])
    }

    /// `Authorization` header value for a request. `params` are the query or
    /// form parameters that travel with it.
    fn authorization(&self, method: &str, url: &str, params: &[(&str, &str)]) -> String {
        let mut header_params = self.oauth_params();

        let mut all = header_params
            .iter()
            .map(|(k, v)| (encode(k), encode(v)))
            .chain(params.iter().map(|(k, v)| (encode(k), encode(v))))
            .collect::<Vec<_>>();
        all.sort();

        let base = signature_base(method, url, &all);
        debug!(base = %base, "OAuth signature base");
        header_params.insert("oauth_signature", self.sign(&base));

        let fields = header_params
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(v)))
            .collect::<Vec<_>>();
        format!("OAuth {}", fields.join(", "))
    }

    fn sign(&self, base: &str) -> String {
        let key = format!(
            "{}&{}",
            encode(&self.credentials.consumer_secret),
            encode(&self.credentials.access_secret)
        );
        let mac = HmacSha1::new_from_slice(key.as_bytes())
            .expect("hmac accepts keys of any length")
            .chain_update(base.as_bytes())
            .finalize();
        base64::encode(mac.into_bytes())
    }
}

fn encode(s: &str) -> String {
    utf8_percent_encode(s, OAUTH_ENCODE_SET).to_string()
}

/// `METHOD&url&params` with sorted, already-encoded parameter pairs.
fn signature_base(method: &str, url: &str, encoded_params: &[(String, String)]) -> String {
    let params = encoded_params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");
    format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        encode(url),
        encode(&params)
    )
}
