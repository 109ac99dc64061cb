mod client;
mod debounce;
mod sync;

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use scene::SceneDocument;
use serde_json::Value;
use tokio::time::MissedTickBehavior;

use client::{CanvasClient, ClientError};
use debounce::Debouncer;
use sync::{Phase, SnapshotWatcher, SyncStatus};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("missing password; pass --password or set CANVAS_PASSWORD")]
    MissingPassword,
    #[error("session rejected; pass --password or run `login` and export FOLIO_SESSION")]
    NotAuthenticated,
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("invalid scene: {0}")]
    InvalidScene(#[from] scene::SceneError),
}

#[derive(Parser, Debug)]
#[command(name = "folio-canvas", about = "Sync a local scene file with the gated canvas")]
struct Cli {
    #[arg(long, env = "FOLIO_BASE_URL", default_value = "http://127.0.0.1:3000")]
    base_url: String,

    /// Session cookie value printed by `login`.
    #[arg(long, env = "FOLIO_SESSION")]
    session: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Ping,
    /// Report whether the session is accepted.
    Check,
    Login {
        #[arg(long, env = "CANVAS_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    Logout,
    /// Fetch the scene as JSON.
    Load {
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Replace the scene with a JSON file.
    Save {
        #[arg(long)]
        input: PathBuf,
    },
    /// Save a scene file whenever it changes, debounced.
    Watch(WatchArgs),
}

#[derive(Args, Debug)]
struct WatchArgs {
    /// Scene file; overwritten with the loaded scene on start.
    #[arg(long)]
    input: PathBuf,

    /// Used to log in when the session is missing or rejected.
    #[arg(long, env = "CANVAS_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Quiet window before an edit is saved.
    #[arg(long, default_value_t = 1500)]
    debounce_ms: u64,

    #[arg(long, default_value_t = 250)]
    poll_ms: u64,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let client = CanvasClient::new(&cli.base_url, cli.session)?;

    match cli.command {
        Command::Ping => run_ping(&client).await,
        Command::Check => run_check(&client).await,
        Command::Login { password } => run_login(client, password).await,
        Command::Logout => run_logout(client).await,
        Command::Load { output } => run_load(&client, output.as_deref()).await,
        Command::Save { input } => run_save(&client, &input).await,
        Command::Watch(args) => run_watch(client, args, ctrl_c()).await,
    }
}

async fn run_ping(client: &CanvasClient) -> Result<(), CliError> {
    client.ping().await?;
    println!("ok");
    Ok(())
}

async fn run_check(client: &CanvasClient) -> Result<(), CliError> {
    let authenticated = client.check().await?;
    print_json(&serde_json::json!({ "authenticated": authenticated }))
}

async fn run_login(mut client: CanvasClient, password: Option<String>) -> Result<(), CliError> {
    let password = password.filter(|p| !p.is_empty()).ok_or(CliError::MissingPassword)?;
    let session = client.login(&password).await?;
    println!("FOLIO_SESSION={session}");
    Ok(())
}

async fn run_logout(mut client: CanvasClient) -> Result<(), CliError> {
    client.logout().await?;
    println!("ok");
    Ok(())
}

async fn run_load(client: &CanvasClient, output: Option<&Path>) -> Result<(), CliError> {
    let scene = client.load().await?;
    let rendered = serde_json::to_string_pretty(&scene)?;
    match output {
        Some(path) => {
            tokio::fs::write(path, rendered)
                .await
                .map_err(|source| CliError::Io { path: path.to_owned(), source })?;
            tracing::info!(path = %path.display(), elements = scene.elements.len(), "scene written");
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

async fn run_save(client: &CanvasClient, input: &Path) -> Result<(), CliError> {
    let document = read_document(input).await?;
    let response = client.save(&document).await?;
    print_json(&serde_json::to_value(&response)?)
}

/// Log in if needed, load the scene into `input`, then push every changed
/// snapshot of `input` through the debouncer until `shutdown` resolves or the
/// session is rejected. Saves run in the background; a failed save is logged
/// and dropped.
async fn run_watch(
    mut client: CanvasClient,
    args: WatchArgs,
    shutdown: impl Future<Output = ()>,
) -> Result<(), CliError> {
    let status = SyncStatus::new();
    let accepted = client.session().is_some() && client.check().await?;
    if !accepted {
        let password = args.password.as_deref().filter(|p| !p.is_empty()).ok_or(CliError::NotAuthenticated)?;
        client.login(password).await?;
        tracing::info!("logged in");
    }

    status.begin_loading();
    let scene = client.load().await?;
    let elements = scene.elements.len();
    let baseline = serde_json::to_string_pretty(&scene.into_document().to_value())?;
    tokio::fs::write(&args.input, &baseline)
        .await
        .map_err(|source| CliError::Io { path: args.input.clone(), source })?;
    status.loaded();
    tracing::info!(elements, input = %args.input.display(), "canvas loaded");

    let client = Arc::new(client);
    let debouncer = Debouncer::spawn(Duration::from_millis(args.debounce_ms), {
        let client = Arc::clone(&client);
        let status = status.clone();
        move |document: SceneDocument| {
            let guard = status.begin_save();
            let client = Arc::clone(&client);
            let status = status.clone();
            tokio::spawn(async move {
                let _guard = guard;
                match client.save(&document).await {
                    Ok(saved) => tracing::info!(saved_at = %saved.saved_at, elements = document.elements.len(), "scene saved"),
                    Err(ClientError::Unauthorized) => {
                        tracing::warn!("session rejected during save; edit dropped");
                        status.signed_out();
                    }
                    Err(e) => tracing::warn!(error = %e, "background save failed; edit dropped"),
                }
            });
        }
    });

    let mut watcher = SnapshotWatcher::new(&args.input, Some(baseline));
    let mut ticker = tokio::time::interval(Duration::from_millis(args.poll_ms.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    tracing::info!(input = %args.input.display(), debounce_ms = args.debounce_ms, "watching scene file");
    let mut result = Ok(());
    loop {
        if status.phase() == Phase::Unauthenticated {
            result = Err(CliError::NotAuthenticated);
            break;
        }
        tokio::select! {
            _ = ticker.tick() => match watcher.poll().await {
                Ok(Some(document)) => debouncer.push(document),
                Ok(None) => {}
                Err(e) => tracing::debug!(error = %e, "scene file not readable"),
            },
            () = &mut shutdown => break,
        }
    }

    debouncer.shutdown().await;
    status.wait_idle().await;
    tracing::info!("watch stopped");
    result
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "cannot listen for Ctrl-C; stop with a signal instead");
        std::future::pending::<()>().await;
    }
}

async fn read_document(path: &Path) -> Result<SceneDocument, CliError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CliError::Io { path: path.to_owned(), source })?;
    let value = serde_json::from_str::<Value>(&raw)?;
    Ok(SceneDocument::from_value(value)?)
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
