use std::sync::Arc;

use anyhow::Context;
use blogger::app::{router, AppState, Repositories};
use blogger::config::AppConfig;
use blogger::db::models::BackfillResponse;
use blogger::media::backfill::copy_remote_urls;
use blogger::storage::cloudinary::{AssetStore, CloudinaryClient};
use blogger::storage::local::LocalMediaStore;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "blogger", about = "Blog backend with CDN-synced media")]
struct Cli {
    /// Config file name, without extension. Missing files are ignored.
    #[arg(long, default_value = "blogger")]
    config: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Copy CDN URLs into the url field of every media record, then exit
    FixMedia,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "blogger=info,tower_http=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config)?;

    let mongo_client = mongodb::Client::with_uri_str(&config.mongodb_uri)
        .await
        .context("Failed to connect to MongoDB")?;
    let mongo_db = mongo_client.database(&config.mongodb_database);
    let repos = Repositories::mongo(&mongo_db);

    tracing::info!("Connected to MongoDB at {}", config.mongodb_uri_redacted());

    match cli.command.unwrap_or(Command::Serve) {
        Command::FixMedia => {
            let report = copy_remote_urls(repos.media.as_ref()).await?;
            let response = BackfillResponse::from(report);
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        Command::Serve => serve(config, repos).await,
    }
}

async fn serve(config: AppConfig, repos: Repositories) -> anyhow::Result<()> {
    let cloudinary = config.cloudinary();
    if !cloudinary.is_complete() {
        tracing::warn!("Cloudinary credentials are incomplete; uploads will fail and only local copies will be kept");
    }
    let assets: Arc<dyn AssetStore> = Arc::new(CloudinaryClient::new(cloudinary)?);

    let local = LocalMediaStore::new(&config.media_dir);
    local
        .ensure_root()
        .await
        .with_context(|| format!("Failed to create media directory {}", config.media_dir.display()))?;

    let state = AppState::new(
        repos,
        assets,
        local.clone(),
        &config.cloudinary_folder,
        config.service_token.clone(),
    )?;
    let app = router(state, &local, config.max_upload_bytes);

    tracing::info!("Listening on http://{}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}
