// crates/server/src/main.rs
//! statfrance binary: serve the API, or import CSV files into the database.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use statfrance_core::{AppConfig, Dataset, Level};
use statfrance_db::Database;
use statfrance_server::{create_app_with_static, metrics::init_metrics};
use tracing_subscriber::EnvFilter;

const DEFAULT_PORT: u16 = 47810;
const DEFAULT_LOG: &str =
    "warn,statfrance=info,statfrance_server=info,statfrance_db=info,statfrance_core=info";

#[derive(Parser, Debug)]
#[command(name = "statfrance", version, about = "French public statistics, aligned by year")]
struct Cli {
    /// Config file (default: <config_dir>/statfrance/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database path
    #[arg(long, global = true, env = "STATFRANCE_DB")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP server (default)
    Serve {
        #[arg(long, env = "STATFRANCE_PORT")]
        port: Option<u16>,

        /// Address to bind (default: 127.0.0.1)
        #[arg(long)]
        bind: Option<IpAddr>,

        /// Built frontend to serve (default: ./dist when present)
        #[arg(long, env = "STATIC_DIR")]
        static_dir: Option<PathBuf>,
    },

    /// Import a stats CSV for one dataset and level
    Import {
        dataset: Dataset,
        level: Level,
        file: PathBuf,
    },

    /// Import a `code,name[,parent_code]` CSV of locations
    ImportLocations { level: Level, file: PathBuf },
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::load_default()?,
    };
    Ok(config)
}

fn init_tracing(config: &AppConfig) {
    let default = config.log.as_deref().unwrap_or(DEFAULT_LOG);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .compact()
        .init();
}

fn env_port(name: &str) -> Option<u16> {
    std::env::var(name).ok().and_then(|p| p.parse().ok())
}

/// Port priority: `--port` / `STATFRANCE_PORT`, then `PORT`, then config.
fn resolve_port(flag: Option<u16>, generic_env: Option<u16>, config: &AppConfig) -> u16 {
    flag.or(generic_env)
        .or(config.port)
        .unwrap_or(DEFAULT_PORT)
}

/// `--static-dir` / `STATIC_DIR`, then config, then `./dist` if it exists.
fn resolve_static_dir(flag: Option<PathBuf>, config: &AppConfig) -> Option<PathBuf> {
    flag.or_else(|| config.static_dir.clone()).or_else(|| {
        let dist = PathBuf::from("dist");
        dist.exists().then_some(dist)
    })
}

async fn open_db(flag: Option<PathBuf>, config: &AppConfig) -> Result<Database> {
    let db = match flag.or_else(|| config.db_path.clone()) {
        Some(path) => Database::new(&path).await,
        None => Database::open_default().await,
    };
    db.context("Failed to open database")
}

async fn serve(
    db: Database,
    port: u16,
    bind: IpAddr,
    static_dir: Option<PathBuf>,
) -> Result<()> {
    init_metrics();

    match &static_dir {
        Some(dir) => tracing::info!(static_dir = %dir.display(), "Serving frontend"),
        None => tracing::info!("No frontend found, API-only mode"),
    }
    let app = create_app_with_static(db, static_dir.as_deref());

    let addr = SocketAddr::new(bind, port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(%addr, version = env!("CARGO_PKG_VERSION"), "statfrance listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    init_tracing(&config);

    let db = open_db(cli.db, &config).await?;
    tracing::debug!(db_path = %db.db_path().display(), "Database ready");

    let command = cli.command.unwrap_or_else(|| Command::Serve {
        port: env_port("STATFRANCE_PORT"),
        bind: None,
        static_dir: std::env::var_os("STATIC_DIR").map(PathBuf::from),
    });

    match command {
        Command::Serve {
            port,
            bind,
            static_dir,
        } => {
            let port = resolve_port(port, env_port("PORT"), &config);
            let bind = bind
                .or(config.bind)
                .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST));
            let static_dir = resolve_static_dir(static_dir, &config);
            serve(db, port, bind, static_dir).await
        }
        Command::Import {
            dataset,
            level,
            file,
        } => {
            let summary = db.import_observations_csv(dataset, level, &file).await?;
            eprintln!(
                "Imported {} rows ({} values) into {}/{} in {}ms",
                summary.rows_read, summary.rows_written, dataset, level, summary.duration_ms
            );
            Ok(())
        }
        Command::ImportLocations { level, file } => {
            let summary = db.import_locations_csv(level, &file).await?;
            eprintln!(
                "Imported {} {} locations in {}ms",
                summary.rows_written, level, summary.duration_ms
            );
            Ok(())
        }
    }
}
