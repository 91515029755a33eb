mod logging;

use background_service::{BackgroundService, Session, SessionOptions};
use clip_core::{log_channels, ConfigError, CoreError, ErrorExt, HostingError, Settings};
use clip_fetcher::ClipFetcher;
use dedup_store::DedupStore;
use reddit_client::{RedditClient, RedditCredentials};
use std::sync::Arc;
use youtube_client::{YouTubeAuth, YouTubePublisher, CREDENTIALS_CONSOLE_URL};

#[tokio::main]
async fn main() -> Result<(), CoreError> {
    let settings_path = Settings::path_from_env();
    let settings = match Settings::load_or_scaffold(&settings_path) {
        Ok(settings) => settings,
        Err(ConfigError::Scaffolded { path }) => {
            Settings::default().create_asset_dirs()?;
            println!("Created a default settings file at {}.", path);
            println!("Add your communities and account details, then start again.");
            return Ok(());
        }
        Err(e) => {
            eprintln!(
                "Could not use {}: {}",
                settings_path.display(),
                e.user_friendly_message()
            );
            return Ok(());
        }
    };

    settings.create_asset_dirs()?;
    let _log_guards = logging::init(&settings.paths.log_dir)?;
    tracing::info!(target: log_channels::SESSION, "Starting ClipToTube");

    let reddit = RedditClient::new(RedditCredentials::from(&settings.reddit))?;
    if let Err(e) = reddit.authenticate().await {
        e.log_error();
        eprintln!("Reddit login failed: {}", e.user_friendly_message());
        return Ok(());
    }
    println!("Logged in to Reddit as u/{}", reddit.username());

    let publisher = match authorize_youtube(&settings).await {
        Ok(publisher) => publisher,
        Err(e) => {
            e.log_error();
            match &e {
                CoreError::Hosting(HostingError::MissingClientSecret { path }) => {
                    eprintln!("YouTube client secret not found at {}.", path);
                    eprintln!(
                        "Create an OAuth client at {} and save its JSON there.",
                        CREDENTIALS_CONSOLE_URL
                    );
                }
                _ => eprintln!("YouTube authorization failed: {}", e.user_friendly_message()),
            }
            return Ok(());
        }
    };
    println!("YouTube upload access granted");

    let fetcher = ClipFetcher::new(&settings.paths.clips_dir)?;
    let store = match DedupStore::load(&settings.paths.dedup_file).await {
        Ok(store) => store,
        Err(e) => {
            e.log_error();
            eprintln!(
                "Could not read {}: {}",
                settings.paths.dedup_file.display(),
                e.user_friendly_message()
            );
            return Ok(());
        }
    };

    let session = Session::new(
        Arc::new(reddit),
        Arc::new(fetcher),
        Arc::new(publisher),
        store,
        SessionOptions::from(&settings),
    );
    let service = BackgroundService::start(session);
    println!("Running. Press Ctrl+C to stop.");

    tokio::signal::ctrl_c().await?;
    service.stop().await?;
    tracing::info!(target: log_channels::SESSION, "Shut down");
    Ok(())
}

async fn authorize_youtube(settings: &Settings) -> Result<YouTubePublisher, CoreError> {
    let auth = YouTubeAuth::from_files(
        &settings.youtube.client_secret_path,
        settings.youtube.token_path.clone(),
    )
    .await?;
    auth.authorize().await?;
    YouTubePublisher::new(auth)
}
