use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use url::Url;

use homedeck::app::App;
use homedeck::capability::Capabilities;
use homedeck::config::Config;
use homedeck::feed::FeedFetcher;
use homedeck::http::ReqwestHttp;
use homedeck::keybindings::KeybindingRegistry;
use homedeck::music::{MusicSession, SessionConfig};
use homedeck::storage::{SqliteStore, StoreError};
use homedeck::theme::Palette;
use homedeck::ui;
use homedeck::widget::{FeedWidget, PlayerWidget};

/// Get the config directory path (~/.config/homedeck/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("homedeck"))
}

#[derive(Parser, Debug)]
#[command(
    name = "homedeck",
    about = "Terminal start page with an RSS reader and Spotify now playing"
)]
struct Args {
    /// Config file (default: ~/.config/homedeck/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Finish a Spotify login with the URL the browser was redirected to
    #[arg(long, value_name = "URL")]
    callback: Option<Url>,

    /// Clear the stored Spotify session and exit
    #[arg(long)]
    logout: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so they never corrupt the alternate screen
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_dir = get_config_dir()?;
    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;
    }

    // SEC: the session database holds a bearer token; keep the directory user-only
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Err(e) =
            std::fs::set_permissions(&config_dir, std::fs::Permissions::from_mode(0o700))
        {
            tracing::warn!(
                path = %config_dir.display(),
                error = %e,
                "Failed to set config directory permissions to 0700"
            );
        }
    }

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let session_path = config_dir.join("session.db");
    let session_path_str = session_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in session database path"))?;
    let store = match SqliteStore::open(session_path_str).await {
        Ok(store) => store,
        Err(StoreError::InstanceLocked) => {
            eprintln!(
                "Error: Another instance of homedeck appears to be running. Please close it and try again."
            );
            std::process::exit(1);
        }
        Err(e) => return Err(anyhow::anyhow!("Failed to open session store: {}", e)),
    };

    let http = Arc::new(ReqwestHttp::new().context("Failed to create HTTP client")?);
    let caps = Capabilities::new(Arc::new(store), http.clone());
    let session = Arc::new(MusicSession::new(SessionConfig::from_config(&config), caps));

    if args.logout {
        session.logout().await;
        println!("Logged out of Spotify.");
        return Ok(());
    }

    let fetcher = Arc::new(FeedFetcher::new(http, config.endpoints.feed_converter.clone()));
    let feed = FeedWidget::new(fetcher, config.feeds.clone(), config.max_items_per_feed);
    let player = PlayerWidget::new(session, args.callback.clone());

    let mut keybindings = KeybindingRegistry::new();
    for warning in keybindings.apply_overrides(&config.keybindings) {
        tracing::warn!("{}", warning);
    }

    let mut app = App::new(
        feed,
        player,
        Palette::from_config(&config.palette),
        keybindings,
    );

    ui::run(&mut app).await?;

    if let Some(url) = app.pending_login.take() {
        println!("Continue the Spotify login in your browser:");
        println!("  {}", url);
        println!();
        println!("After approving, copy the address you were redirected to and run:");
        println!("  homedeck --callback '<redirected URL>'");
    }

    Ok(())
}
