use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use media_browser::backends::{FileServer, FileServerClient};
use media_browser::config::Config;
use media_browser::core::FetchState;
use media_browser::core::viewmodels::{BrowseScope, BrowserViewModel};
use media_browser::models::{MediaCategory, ThumbnailState};
use media_browser::services::FfmpegThumbnailGenerator;
use media_browser::state::FilterStore;
use media_browser::workers::{GridSync, PipelineSettings, ThumbnailPipeline};

#[derive(Parser, Debug)]
#[command(author, version, about = "Browse and filter files on a media file server", long_about = None)]
struct Cli {
    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Server base URL, overrides the config file
    #[arg(long, global = true)]
    server: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List every tag known to the server
    Tags,
    /// List files matching the given filters
    Files {
        /// all, images, videos, documents or other
        #[arg(long, default_value = "all", conflicts_with = "file_type")]
        category: MediaCategory,
        /// Raw server type, e.g. mp4
        #[arg(long = "type")]
        file_type: Option<String>,
        /// Required tag; repeat for more
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Case-insensitive substring of the file name
        #[arg(long)]
        search: Option<String>,
    },
    /// Generate previews for the matching videos and report each result
    Thumbnails {
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long)]
        search: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("media_browser=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(server) = cli.server {
        config.server.base_url = server;
    }
    debug!("Using server {}", config.server.base_url);

    let client = FileServerClient::new(&config.server.base_url, config.network.request_timeout())
        .context("Invalid server URL")?;
    let server: Arc<dyn FileServer> = Arc::new(client);

    match cli.command {
        Commands::Tags => {
            for tag in server.tags().await? {
                println!("{}", tag);
            }
        }
        Commands::Files {
            category,
            file_type,
            tags,
            search,
        } => {
            let scope = match file_type {
                Some(ty) => BrowseScope::Type(ty),
                None => BrowseScope::Category(category),
            };
            let vm = browse(server, scope, tags, search).await?;
            for file in vm.files().loaded().into_iter().flatten() {
                println!("{}\t{}\t{}", file.id, file.file_type, file.name);
            }
        }
        Commands::Thumbnails { tags, search } => {
            let vm = browse(server, BrowseScope::Category(MediaCategory::Videos), tags, search).await?;

            let generator = Arc::new(FfmpegThumbnailGenerator::from_config(&config.thumbnails));
            let pipeline = Arc::new(ThumbnailPipeline::new(
                generator,
                PipelineSettings::from(&config.thumbnails),
            ));
            GridSync::new(vm, pipeline.clone()).apply();
            info!("Generating thumbnails for {} videos", pipeline.items().len());

            for item in pipeline.settled().await {
                let state = match &item.thumbnail {
                    ThumbnailState::Ready { uri } => uri.as_str(),
                    ThumbnailState::Failed => "failed",
                    ThumbnailState::Pending => "pending",
                };
                println!("{}\t{}\t{}", item.id(), item.metadata.name, state);
            }
        }
    }

    Ok(())
}

/// Apply the filters and run one fetch cycle.
async fn browse(
    server: Arc<dyn FileServer>,
    scope: BrowseScope,
    tags: Vec<String>,
    search: Option<String>,
) -> Result<BrowserViewModel> {
    let filters = FilterStore::new();
    for tag in tags {
        filters.select_tag(tag);
    }
    if let Some(search) = search {
        filters.set_search(search);
    }

    let vm = BrowserViewModel::new(server, filters, scope);
    vm.sync().await;
    if let FetchState::Failed(e) = vm.files() {
        return Err(e).context("Failed to list files");
    }
    Ok(vm)
}
