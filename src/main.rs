use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::sync::oneshot;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use mapit_tracker::auth::{
    CLIENT_ID_VAR, Credentials, IDENTITY_POOL_VAR, PASSWORD_VAR, USER_POOL_VAR, USERNAME_VAR,
};
use mapit_tracker::cache::FileTokenStore;
use mapit_tracker::config;
use mapit_tracker::export::{write_geojson, write_kml};
use mapit_tracker::rest::MapitClient;
use mapit_tracker::runner::{Runner, Session};
use mapit_tracker::sink::{DocumentSink, LogSink, OnPositionChange, ReadingSink, SqliteSink};

#[derive(Parser)]
#[command(name = "mapit-tracker", version, about = "Track a vehicle through the Mapit cloud API")]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Token cache file
    #[arg(long, env = "MAPIT_TOKEN_CACHE", global = true)]
    tokens: Option<PathBuf>,

    #[command(flatten)]
    credentials: CredentialArgs,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Args)]
struct CredentialArgs {
    /// Account e-mail
    #[arg(long, env = USERNAME_VAR, global = true)]
    username: Option<String>,

    /// Account password
    #[arg(long, env = PASSWORD_VAR, hide_env_values = true, global = true)]
    password: Option<String>,

    /// Cognito identity pool id
    #[arg(long, env = IDENTITY_POOL_VAR, global = true)]
    identity_pool_id: Option<String>,

    /// Cognito user pool id
    #[arg(long, env = USER_POOL_VAR, global = true)]
    user_pool_id: Option<String>,

    /// Cognito app client id
    #[arg(long, env = CLIENT_ID_VAR, global = true)]
    client_id: Option<String>,
}

impl CredentialArgs {
    fn resolve(self) -> Result<Credentials> {
        Ok(Credentials::new(
            required(self.identity_pool_id, IDENTITY_POOL_VAR)?,
            required(self.user_pool_id, USER_POOL_VAR)?,
            required(self.client_id, CLIENT_ID_VAR)?,
            required(self.username, USERNAME_VAR)?,
            required(self.password, PASSWORD_VAR)?,
        ))
    }
}

fn required(value: Option<String>, var: &str) -> Result<String> {
    value
        .filter(|v| !v.is_empty())
        .with_context(|| format!("{var} is not set"))
}

#[derive(Subcommand)]
enum Command {
    /// Fetch the current status once and print it as JSON (default)
    Once,
    /// Poll continuously and log every reading
    Watch {
        /// Seconds between polls
        #[arg(long, default_value_t = config::WATCH_INTERVAL.as_secs())]
        interval: u64,
        /// Also record readings in this SQLite database
        #[arg(long)]
        database: Option<PathBuf>,
        /// Also append readings to this JSON-lines file
        #[arg(long)]
        documents: Option<PathBuf>,
    },
    /// Poll continuously and record a reading only when the vehicle moved
    Checker {
        /// Seconds between polls
        #[arg(long, default_value_t = config::CHECKER_INTERVAL.as_secs())]
        interval: u64,
        /// SQLite database (defaults to the data directory)
        #[arg(long)]
        database: Option<PathBuf>,
    },
    /// Write recorded history as a GeoJSON feature collection
    ExportGeojson(ExportArgs),
    /// Write recorded history as a KML document
    ExportKml(ExportArgs),
}

#[derive(Args)]
struct ExportArgs {
    /// Output file
    file: PathBuf,
    /// Most recent records to export
    #[arg(long, default_value_t = config::EXPORT_LIMIT)]
    limit: usize,
    /// SQLite database (defaults to the data directory)
    #[arg(long)]
    database: Option<PathBuf>,
}

#[derive(Clone, Copy)]
enum ExportFormat {
    GeoJson,
    Kml,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.debug);

    match cli.command.unwrap_or(Command::Once) {
        Command::Once => {
            let mut runner = build_runner(cli.tokens, cli.credentials, LogSink::new())?;
            let reading = runner.run_once().await.context("Failed to fetch status")?;
            println!("{}", serde_json::to_string_pretty(&reading)?);
        }
        Command::Watch {
            interval,
            database,
            documents,
        } => {
            let mut sinks: Vec<Box<dyn ReadingSink>> = vec![Box::new(LogSink::new())];
            if let Some(path) = database {
                sinks.push(Box::new(SqliteSink::new(path)));
            }
            if let Some(path) = documents {
                sinks.push(Box::new(DocumentSink::new(path)));
            }
            let runner = build_runner(cli.tokens, cli.credentials, sinks)?
                .with_interval(Duration::from_secs(interval));
            watch(runner).await?;
        }
        Command::Checker { interval, database } => {
            let database = match database {
                Some(path) => path,
                None => config::database_path()?,
            };
            info!(database = %database.display(), "Recording position changes");
            let sink = OnPositionChange::new(SqliteSink::new(database));
            let runner = build_runner(cli.tokens, cli.credentials, sink)?
                .with_interval(Duration::from_secs(interval));
            watch(runner).await?;
        }
        Command::ExportGeojson(args) => export(args, ExportFormat::GeoJson)?,
        Command::ExportKml(args) => export(args, ExportFormat::Kml)?,
    }

    Ok(())
}

fn export(args: ExportArgs, format: ExportFormat) -> Result<()> {
    let database = match args.database {
        Some(path) => path,
        None => config::database_path()?,
    };
    let mut store = SqliteSink::open(&database)
        .with_context(|| format!("Failed to open {}", database.display()))?;
    let history = store.history(args.limit)?;
    match format {
        ExportFormat::GeoJson => write_geojson(&args.file, &history),
        ExportFormat::Kml => write_kml(&args.file, &history),
    }
    .with_context(|| format!("Failed to write {}", args.file.display()))?;
    Ok(())
}

fn init_tracing(debug: bool) {
    let default_filter = if debug {
        "mapit_tracker=debug"
    } else {
        "mapit_tracker=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn build_runner<K: ReadingSink>(
    tokens: Option<PathBuf>,
    credentials: CredentialArgs,
    sink: K,
) -> Result<Runner<MapitClient, FileTokenStore, K>> {
    let credentials = credentials.resolve()?;
    let tokens = match tokens {
        Some(path) => path,
        None => config::token_cache_path()?,
    };
    debug!(tokens = %tokens.display(), "Token cache");

    let client = MapitClient::builder().build()?;
    let session = Session::restore(credentials, FileTokenStore::new(tokens));
    Ok(Runner::new(client, session, sink))
}

async fn watch<K: ReadingSink>(mut runner: Runner<MapitClient, FileTokenStore, K>) -> Result<()> {
    let (tx, rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = tx.send(());
        }
    });

    let shutdown = async move {
        if rx.await.is_err() {
            // No signal handler; run until a fatal error.
            std::future::pending::<()>().await;
        }
    };

    runner.run(shutdown).await.context("Polling stopped")?;
    Ok(())
}
