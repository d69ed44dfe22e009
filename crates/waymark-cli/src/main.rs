//! Waymark CLI - place and sync geolocated content from the terminal
//!
//! Mutations work fully offline; `waymark sync` reconciles with the remote
//! content service when connectivity is available.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use thiserror::Error;
use waymark_core::config::EngineConfig;
use waymark_core::models::{ContentPayload, GeoPosition, NewContent};
use waymark_core::remote::{IdentityProvider, RemoteContentService, StaticIdentity};
use waymark_core::store::LocalStore;
use waymark_core::{ContentId, ContentItem, SyncEngine};

#[derive(Parser)]
#[command(name = "waymark")]
#[command(about = "Place, browse, and sync geolocated content")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Optional path to local database file
    #[arg(long, value_name = "PATH")]
    db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new content item at the given position
    #[command(alias = "new")]
    Add {
        /// Item title
        title: String,
        /// Latitude in decimal degrees
        #[arg(long)]
        lat: f64,
        /// Longitude in decimal degrees
        #[arg(long)]
        lng: f64,
        /// Item kind
        #[arg(long, value_enum, default_value_t = AddKind::Marker)]
        kind: AddKind,
        /// Text body (required for --kind text)
        #[arg(long)]
        body: Option<String>,
        /// Optional description
        #[arg(long)]
        description: Option<String>,
        /// Make the item visible to other users
        #[arg(long)]
        public: bool,
    },
    /// List available content (own items plus cached public content)
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a content item
    Delete {
        /// Content id
        id: String,
    },
    /// Reconcile local changes with the remote service
    Sync {
        /// Refresh nearby public content around this latitude
        #[arg(long, requires = "lng")]
        lat: Option<f64>,
        /// Refresh nearby public content around this longitude
        #[arg(long, requires = "lat")]
        lng: Option<f64>,
    },
    /// Show connectivity, queue, and last-sync state
    Status,
    /// Clear sync metadata (queues and last-sync stamp)
    Reset,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
enum AddKind {
    Marker,
    Text,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Core(#[from] waymark_core::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("--kind text requires --body")]
    MissingTextBody,
    #[error(
        "Remote sync is not configured. Set {}, {} and {}.",
        EngineConfig::ENV_API_URL,
        EngineConfig::ENV_API_TOKEN,
        EngineConfig::ENV_USER_ID
    )]
    RemoteNotConfigured,
}

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("waymark=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let config = resolve_config(cli.db_path);
    if matches!(cli.command, Commands::Sync { .. }) && !config.is_remote_configured() {
        return Err(CliError::RemoteNotConfigured);
    }
    let engine = build_engine(&config).await?;

    match cli.command {
        Commands::Add {
            title,
            lat,
            lng,
            kind,
            body,
            description,
            public,
        } => run_add(&engine, title, lat, lng, kind, body, description, public).await?,
        Commands::List { json } => run_list(&engine, json).await?,
        Commands::Delete { id } => {
            engine.delete_local(&ContentId::from(id.as_str())).await?;
            println!("Queued deletion of {id}");
        }
        Commands::Sync { lat, lng } => run_sync(&engine, lat, lng).await,
        Commands::Status => run_status(&engine).await,
        Commands::Reset => {
            engine.reset().await?;
            println!("Sync metadata cleared");
        }
    }

    Ok(())
}

/// Build the full engine when the remote API is configured; otherwise fall
/// back to a local-only engine so offline commands keep working.
async fn build_engine(config: &EngineConfig) -> Result<SyncEngine, CliError> {
    if config.is_remote_configured() {
        return Ok(config.build_engine().await?);
    }

    tracing::info!("Running in local-only mode (no remote config)");
    let store = LocalStore::open_path(&config.db_path).await?;
    let identity: Arc<dyn IdentityProvider> = match &config.user_id {
        Some(user_id) => Arc::new(StaticIdentity(user_id.clone())),
        None => Arc::new(SignedOut),
    };
    Ok(SyncEngine::new(store, Arc::new(UnconfiguredRemote), identity).await)
}

/// Identity source when no user id is configured; mutations are refused
struct SignedOut;

impl IdentityProvider for SignedOut {
    fn current_user_id(&self) -> Option<String> {
        None
    }
}

/// Remote stub for local-only mode; every call fails fast
struct UnconfiguredRemote;

impl UnconfiguredRemote {
    fn error<T>() -> waymark_core::Result<T> {
        Err(waymark_core::Error::Remote(
            "remote sync is not configured".to_string(),
        ))
    }
}

#[async_trait]
impl RemoteContentService for UnconfiguredRemote {
    async fn create_item(&self, _item: &ContentItem) -> waymark_core::Result<ContentItem> {
        Self::error()
    }

    async fn list_user_items(&self) -> waymark_core::Result<Vec<ContentItem>> {
        Self::error()
    }

    async fn list_nearby_public_items(
        &self,
        _latitude: f64,
        _longitude: f64,
        _radius_km: f64,
    ) -> waymark_core::Result<Vec<ContentItem>> {
        Self::error()
    }

    async fn update_item(
        &self,
        _id: &ContentId,
        _item: &ContentItem,
    ) -> waymark_core::Result<ContentItem> {
        Self::error()
    }

    async fn delete_item(&self, _id: &ContentId) -> waymark_core::Result<()> {
        Self::error()
    }
}

fn resolve_config(db_path_override: Option<PathBuf>) -> EngineConfig {
    let default_db_path = dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("waymark")
        .join("waymark.db");

    let mut config = EngineConfig::from_env(default_db_path);
    if let Some(path) = db_path_override {
        config.db_path = path;
    }
    config
}

#[allow(clippy::too_many_arguments, clippy::fn_params_excessive_bools)]
async fn run_add(
    engine: &SyncEngine,
    title: String,
    lat: f64,
    lng: f64,
    kind: AddKind,
    body: Option<String>,
    description: Option<String>,
    public: bool,
) -> Result<(), CliError> {
    let payload = match kind {
        AddKind::Marker => ContentPayload::Marker,
        AddKind::Text => ContentPayload::Text {
            body: body.ok_or(CliError::MissingTextBody)?,
        },
    };

    let item = engine
        .create_local(NewContent {
            title,
            description,
            payload,
            position: GeoPosition::new(lat, lng),
            is_public: public,
        })
        .await?;

    println!("{}", item.id);
    Ok(())
}

#[derive(Debug, Serialize)]
struct ListRow {
    id: String,
    title: String,
    kind: String,
    latitude: f64,
    longitude: f64,
    is_public: bool,
    sync_status: String,
    updated_at: i64,
}

fn to_row(item: &ContentItem) -> ListRow {
    ListRow {
        id: item.id.to_string(),
        title: item.title.clone(),
        kind: format!("{:?}", item.kind()).to_lowercase(),
        latitude: item.position.latitude,
        longitude: item.position.longitude,
        is_public: item.is_public,
        sync_status: item.sync_status.as_str().to_string(),
        updated_at: item.updated_at,
    }
}

async fn run_list(engine: &SyncEngine, as_json: bool) -> Result<(), CliError> {
    let items = engine.list_available().await;

    if as_json {
        let rows: Vec<ListRow> = items.iter().map(to_row).collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if items.is_empty() {
        println!("No content yet. Try `waymark add`.");
        return Ok(());
    }
    for item in &items {
        let row = to_row(item);
        println!(
            "{}  [{}] {} ({:.5}, {:.5}) {}",
            row.id, row.sync_status, row.title, row.latitude, row.longitude, row.kind
        );
    }
    Ok(())
}

async fn run_sync(engine: &SyncEngine, lat: Option<f64>, lng: Option<f64>) {
    if let (Some(lat), Some(lng)) = (lat, lng) {
        engine.update_location(GeoPosition::new(lat, lng));
    }

    // One-shot process: invoking sync asserts we are reachable right now
    engine.set_online(true).await;
    let result = engine.sync().await;

    println!(
        "uploaded={} downloaded={} failed={}",
        result.uploaded, result.downloaded, result.failed
    );
    if result.success {
        println!("Sync complete");
    } else {
        for error in &result.errors {
            eprintln!("sync: {error}");
        }
    }
}

async fn run_status(engine: &SyncEngine) {
    let status = engine.status();
    let metadata = engine.store().load_metadata().await;

    println!(
        "online: {}  syncing: {}",
        status.is_online, status.is_syncing
    );
    println!(
        "pending uploads: {}  pending deletions: {}",
        metadata.pending_uploads.len(),
        metadata.pending_deletions.len()
    );
    match metadata.last_sync_at {
        Some(ms) => {
            let when = chrono::DateTime::from_timestamp_millis(ms)
                .map_or_else(|| ms.to_string(), |dt| dt.to_rfc3339());
            println!("last sync: {when}");
        }
        None => println!("last sync: never"),
    }
}
