use clap::Parser;

#[derive(Parser, Debug, Default)]
#[command(name = "sheets_to_tweets")]
#[command(about = "Read rows from a Google Sheet and post them as a status update")]
#[command(version)]
pub struct Args {
    /// Path of the Sheets OAuth client secret file
    #[arg(long = "client_secret_file", value_name = "PATH")]
    pub client_secret_file: Option<String>,

    /// ID of the spreadsheet to read
    #[arg(long = "sheet_id", value_name = "SHEET_ID")]
    pub sheet_id: Option<String>,

    /// Name of the sheet to read from
    #[arg(long = "sheet_name", value_name = "NAME")]
    pub sheet_name: Option<String>,

    /// Cell range to read from the sheet (e.g. "A2:E")
    #[arg(long = "read_range", value_name = "RANGE")]
    pub read_range: Option<String>,

    /// Consumer key for the Twitter account
    #[arg(long = "twitter_consumer_key", value_name = "KEY")]
    pub twitter_consumer_key: Option<String>,

    /// Consumer secret for the Twitter account
    #[arg(long = "twitter_consumer_secret", value_name = "SECRET")]
    pub twitter_consumer_secret: Option<String>,

    /// Access token for the Twitter account
    #[arg(long = "twitter_access_token", value_name = "TOKEN")]
    pub twitter_access_token: Option<String>,

    /// Access token secret for the Twitter account
    #[arg(long = "twitter_access_secret", value_name = "SECRET")]
    pub twitter_access_secret: Option<String>,

    /// Post the status as a reply to this tweet ID
    #[arg(long = "reply_to", value_name = "TWEET_ID")]
    pub reply_to: Option<String>,

    /// Where to cache the Sheets OAuth token (default: ~/.credentials/sheets-to-tweets)
    #[arg(long = "token_cache", value_name = "PATH")]
    pub token_cache: Option<String>,

    /// Format and log the status without posting it
    #[arg(long = "dry_run")]
    pub dry_run: bool,

    /// Log level
    #[arg(long = "log_level", default_value = "info")]
    pub log_level: String,

    /// Path to an optional TOML config file
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,
}
