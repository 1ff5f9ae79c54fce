use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use google_sheets4::Sheets;
use tracing::{error, info};

mod args;
mod auth;
mod cfg;
mod error;
mod job;
mod publisher;
mod sheets;
mod status;
mod token_store;

use args::Args;
use auth::{Authorizer, StdinCodeProvider};
use cfg::Cfg;
use job::NoopMarker;
use publisher::{DryRunPublisher, Publisher, TwitterPublisher};
use sheets::SheetsReader;
use token_store::FileTokenStore;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging
    init_logging(&args.log_level);

    info!("Starting sheets_to_tweets");

    match run(args).await {
        Ok(()) => {
            info!("sheets_to_tweets completed successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), error::Error> {
    let cfg = Cfg::load(args)?;
    cfg.validate()?;

    let secret = auth::read_client_secret(&cfg.sheets.secret_path).await?;

    let client = auth::https_client();
    let authorizer = Authorizer::new(
        FileTokenStore::new(&cfg.token_cache),
        Arc::new(StdinCodeProvider),
    );
    let authenticator = authorizer.authorize(secret, client.clone()).await?;
    let reader = SheetsReader::new(Sheets::new(client, authenticator));

    let publisher: Box<dyn Publisher> = if cfg.dry_run {
        info!("Dry run: the status will not be posted");
        Box::new(DryRunPublisher)
    } else {
        let twitter = TwitterPublisher::new(cfg.publisher.clone())?;
        let twitter = match cfg.reply_to {
            Some(ref id) => twitter.in_reply_to(id.clone()),
            None => twitter,
        };
        Box::new(twitter)
    };

    job::run_with_error_handling(&cfg.sheets, &reader, publisher.as_ref(), &NoopMarker).await?;
    Ok(())
}

fn init_logging(level: &str) {
    let filter = match level {
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_max_level(filter)
        .with_writer(std::io::stderr)
        .init();
}
