use std::fmt;
use std::path::PathBuf;

use config::{Config, Environment, File, Map};
use tracing::{debug, info};

use crate::args::Args;
use crate::error::Error;
use crate::token_store;

const ENV_PREFIX: &str = "SHEETS_TO_TWEETS";

/// Where to read from: the Sheets side of the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetsConfig {
    pub secret_path: PathBuf,
    pub id: String,
    pub name: String,
    pub cell_range: String,
}

impl SheetsConfig {
    /// The A1 range expression sent to the values endpoint, e.g. `Sheet1!A2:E`.
    pub fn range(&self) -> String {
        crate::sheets::a1_range(&self.name, &self.cell_range)
    }
}

/// Credentials for the status-update API. Unrelated to the Sheets OAuth flow.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct PublisherConfig {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub access_token: String,
    pub access_secret: String,
}

impl fmt::Debug for PublisherConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublisherConfig")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"<secret>")
            .field("access_token", &self.access_token)
            .field("access_secret", &"<secret>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Cfg {
    pub sheets: SheetsConfig,
    pub publisher: PublisherConfig,
    pub token_cache: PathBuf,
    pub reply_to: Option<String>,
    pub dry_run: bool,
}

impl Cfg {
    /// Layers defaults, the optional config file, `SHEETS_TO_TWEETS_*`
    /// environment variables and finally the command line.
    pub fn load(args: Args) -> Result<Self, Error> {
        Self::load_with_env(args, None)
    }

    /// `env` replaces the process environment when given.
    fn load_with_env(args: Args, env: Option<Map<String, String>>) -> Result<Self, Error> {
        let mut builder = Config::builder();
        if let Some(ref path) = args.config {
            info!("Loading configuration from: {}", path);
            builder = builder.add_source(File::with_name(path).required(false));
        }
        let layered = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).source(env))
            .build()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;

        let lookup = |key: &str, flag: Option<String>| -> Option<String> {
            if flag.is_some() {
                debug!("Overriding {} from command line", key);
                return flag;
            }
            layered.get_string(key).ok()
        };

        let sheets = SheetsConfig {
            secret_path: lookup("client_secret_file", args.client_secret_file)
                .unwrap_or_else(|| "./client_secret.json".to_string())
                .into(),
            id: lookup("sheet_id", args.sheet_id).unwrap_or_default(),
            name: lookup("sheet_name", args.sheet_name).unwrap_or_else(|| "Sheet1".to_string()),
            cell_range: lookup("read_range", args.read_range).unwrap_or_default(),
        };

        let publisher = PublisherConfig {
            consumer_key: lookup("twitter_consumer_key", args.twitter_consumer_key)
                .unwrap_or_default(),
            consumer_secret: lookup("twitter_consumer_secret", args.twitter_consumer_secret)
                .unwrap_or_default(),
            access_token: lookup("twitter_access_token", args.twitter_access_token)
                .unwrap_or_default(),
            access_secret: lookup("twitter_access_secret", args.twitter_access_secret)
                .unwrap_or_default(),
        };

        let token_cache = match lookup("token_cache", args.token_cache) {
            Some(path) => PathBuf::from(path),
            None => token_store::default_cache_path()?,
        };

        let reply_to = lookup("reply_to", args.reply_to).filter(|id| !id.is_empty());
        let dry_run = args.dry_run || layered.get_bool("dry_run").unwrap_or(false);

        let cfg = Cfg {
            sheets,
            publisher,
            token_cache,
            reply_to,
            dry_run,
        };
        debug!("Final configuration: {:?}", cfg);
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.sheets.id.is_empty() {
            return Err(Error::InvalidConfig("sheet_id must be set".into()));
        }
        if self.sheets.name.is_empty() {
            return Err(Error::InvalidConfig("sheet_name cannot be empty".into()));
        }
        if self.sheets.cell_range.is_empty() {
            return Err(Error::InvalidConfig(
                "read_range must be set (e.g. 'A2:E')".into(),
            ));
        }

        // Posting needs all four credentials; a dry run needs none.
        if !self.dry_run {
            let p = &self.publisher;
            let missing = [
                ("twitter_consumer_key", &p.consumer_key),
                ("twitter_consumer_secret", &p.consumer_secret),
                ("twitter_access_token", &p.access_token),
                ("twitter_access_secret", &p.access_secret),
            ]
            .into_iter()
            .filter(|(_, v)| v.is_empty())
            .map(|(k, _)| k)
            .collect::<Vec<_>>();
            if !missing.is_empty() {
                return Err(Error::InvalidConfig(format!(
                    "missing publisher credentials: {}",
                    missing.join(", ")
                )));
            }
        }

        info!("Configuration validation passed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn load(args: Args) -> Result<Cfg, Error> {
        Cfg::load_with_env(args, Some(Map::new()))
    }

    fn env(vars: &[(&str, &str)]) -> Option<Map<String, String>> {
        Some(
            vars.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    fn full_args() -> Args {
        Args {
            sheet_id: Some("abc123".into()),
            read_range: Some("A2:E".into()),
            twitter_consumer_key: Some("ck".into()),
            twitter_consumer_secret: Some("cs".into()),
            twitter_access_token: Some("at".into()),
            twitter_access_secret: Some("as".into()),
            token_cache: Some("/tmp/sheets-to-tweets-test".into()),
            ..Args::default()
        }
    }

    #[test]
    fn defaults_apply_when_flags_are_absent() {
        let cfg = load(full_args()).unwrap();
        assert_eq!(cfg.sheets.secret_path, PathBuf::from("./client_secret.json"));
        assert_eq!(cfg.sheets.name, "Sheet1");
        assert_eq!(cfg.sheets.range(), "Sheet1!A2:E");
        assert!(!cfg.dry_run);
        cfg.validate().unwrap();
    }

    #[test]
    fn file_values_are_overridden_by_flags() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "sheet_name = \"Tweets\"").unwrap();
        writeln!(file, "read_range = \"B1:B\"").unwrap();
        file.flush().unwrap();

        let args = Args {
            config: Some(file.path().to_string_lossy().into_owned()),
            read_range: Some("C3:D".into()),
            ..full_args()
        };
        let cfg = load(args).unwrap();
        assert_eq!(cfg.sheets.name, "Tweets");
        assert_eq!(cfg.sheets.cell_range, "C3:D");
    }

    #[test]
    fn env_overrides_file_and_flags_override_env() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "sheet_name = \"FromFile\"").unwrap();
        writeln!(file, "read_range = \"B1:B\"").unwrap();
        file.flush().unwrap();

        let args = Args {
            config: Some(file.path().to_string_lossy().into_owned()),
            read_range: None,
            twitter_access_secret: Some("from-flag".into()),
            ..full_args()
        };
        let vars = env(&[
            ("SHEETS_TO_TWEETS_SHEET_NAME", "FromEnv"),
            ("SHEETS_TO_TWEETS_TWITTER_ACCESS_SECRET", "from-env"),
            ("SHEETS_TO_TWEETS_TWITTER_CONSUMER_KEY", "ck-env"),
            ("UNRELATED_SHEET_ID", "ignored"),
        ]);
        let cfg = Cfg::load_with_env(args, vars).unwrap();

        assert_eq!(cfg.sheets.name, "FromEnv");
        assert_eq!(cfg.sheets.cell_range, "B1:B");
        assert_eq!(cfg.sheets.id, "abc123");
        assert_eq!(cfg.publisher.access_secret, "from-flag");
        assert_eq!(cfg.publisher.consumer_key, "ck");
    }

    #[test]
    fn env_supplies_credentials_missing_from_flags() {
        let args = Args {
            twitter_access_secret: None,
            dry_run: false,
            ..full_args()
        };
        let vars = env(&[
            ("SHEETS_TO_TWEETS_TWITTER_ACCESS_SECRET", "from-env"),
            ("SHEETS_TO_TWEETS_DRY_RUN", "true"),
        ]);
        let cfg = Cfg::load_with_env(args, vars).unwrap();

        assert_eq!(cfg.publisher.access_secret, "from-env");
        assert!(cfg.dry_run);
        cfg.validate().unwrap();
    }

    #[test]
    fn missing_config_file_is_not_an_error() {
        let args = Args {
            config: Some("/nonexistent/sheets_to_tweets.toml".into()),
            ..full_args()
        };
        assert!(load(args).is_ok());
    }

    #[test]
    fn validate_rejects_missing_sheet_id() {
        let args = Args {
            sheet_id: None,
            ..full_args()
        };
        let cfg = load(args).unwrap();
        assert!(matches!(cfg.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn validate_names_missing_publisher_credentials() {
        let args = Args {
            twitter_access_secret: None,
            ..full_args()
        };
        let cfg = load(args).unwrap();
        let err = cfg.validate().unwrap_err().to_string();
        assert!(err.contains("twitter_access_secret"), "{err}");
    }

    #[test]
    fn dry_run_does_not_need_publisher_credentials() {
        let args = Args {
            twitter_consumer_key: None,
            twitter_consumer_secret: None,
            twitter_access_token: None,
            twitter_access_secret: None,
            dry_run: true,
            ..full_args()
        };
        load(args).unwrap().validate().unwrap();
    }

    #[test]
    fn publisher_debug_redacts_secrets() {
        let cfg = load(full_args()).unwrap();
        let shown = format!("{:?}", cfg.publisher);
        assert!(shown.contains("<secret>"));
        assert!(!shown.contains("\"cs\""));
        assert!(!shown.contains("\"as\""));
    }
}
