//! aad-session - command-line driver for the session bootstrapper.
//!
//! Runs the session against an exported browser-storage snapshot, so a page
//! load can be replayed outside the browser.

#![deny(clippy::all)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use url::Url;

use aad_session::config::Config;
use aad_session::navigator::BrowserNavigator;
use aad_session::settings;
use aad_session::storage::StorageSnapshot;
use aad_session::{AppError, AuthSession, FrameEmbedding, Navigation, SnapshotContext};

type Session = AuthSession<SnapshotContext<BrowserNavigator>>;

#[derive(Parser, Debug)]
#[command(name = "aad-session", version, about = "Replay Azure AD session bootstrapping")]
struct Cli {
    /// Exported localStorage/sessionStorage JSON.
    #[arg(long, env = "AAD_SNAPSHOT")]
    snapshot: Option<PathBuf>,

    /// Current page URL, including any fragment.
    #[arg(long)]
    url: Option<Url>,

    /// Treat the page as loaded inside a frame.
    #[arg(long)]
    framed: bool,

    /// Log navigations instead of opening the browser.
    #[arg(long)]
    dry_run: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decide the session state for the page load.
    Init,
    /// Report whether a valid token is cached.
    Status,
    /// Print an access token for the configured resource.
    Token,
    /// Print the signed-in user's profile as JSON.
    Profile,
    /// Start interactive sign-in.
    SignIn,
    /// Sign out at the identity provider.
    SignOut,
    /// Start an interactive redirect for an access token.
    TokenRedirect,
}

fn main() {
    // Load .env file (if present) before anything else
    if let Err(e) = dotenvy::dotenv() {
        if !e.to_string().contains("not found") {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    let cli = Cli::parse();

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            eprintln!("\nPlease set the following environment variables:");
            eprintln!("  AZURE_CLIENT_ID=<your-azure-ad-client-id>");
            eprintln!("  AZURE_TENANT_ID=<your-tenant-id>");
            eprintln!("  AZURE_RESOURCE_ID=<resource-to-request-tokens-for>");
            std::process::exit(1);
        }
    };

    init_logging(&config.logging.level);
    info!("Starting {} v{}", config.app.name, env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(cli, config) {
        error!("{:#}", e);
        eprintln!("{}", failure_message(&e));
        std::process::exit(1);
    }
}

/// User-facing text for a failed command, with a sign-in hint when it helps.
fn failure_message(err: &anyhow::Error) -> String {
    match err.downcast_ref::<AppError>() {
        Some(app_err) if app_err.requires_sign_in() => format!(
            "{}\nRun `aad-session sign-in` to start a new session.",
            app_err.user_message()
        ),
        Some(app_err) => app_err.user_message().to_string(),
        None => "An error occurred. Please try again.".to_string(),
    }
}

/// Initialize tracing/logging.
fn init_logging(default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli, config: Config) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create Tokio runtime")?;

    let snapshot = load_snapshot(cli.snapshot.unwrap_or_else(settings::default_snapshot_path))?;

    let page = match cli.url {
        Some(url) => url,
        None => Url::parse(&config.adal.redirect_uri)
            .map_err(|e| AppError::Config(format!("Invalid redirect_uri: {e}")))?,
    };
    let embedding = if cli.framed {
        FrameEmbedding::Embedded
    } else {
        FrameEmbedding::TopLevel
    };
    let navigation = Navigation::new(page, embedding);

    let navigator = if cli.dry_run {
        BrowserNavigator::dry_run()
    } else {
        BrowserNavigator::new()
    };
    let options = config.session_options();
    let session: Arc<Session> = Arc::new(AuthSession::new(
        SnapshotContext::new(config, snapshot, navigator),
        options,
    ));

    runtime.block_on(execute(cli.command, &session, &navigation))
}

fn load_snapshot(path: PathBuf) -> Result<StorageSnapshot> {
    if !path.exists() {
        warn!("No storage snapshot at {}, starting empty", path.display());
        return Ok(StorageSnapshot::default());
    }

    StorageSnapshot::load(&path)
        .map_err(AppError::from)
        .with_context(|| format!("Failed to load snapshot {}", path.display()))
}

async fn execute(command: Command, session: &Session, navigation: &Navigation) -> Result<()> {
    match command {
        Command::Init => {
            let outcome = session.initialize(navigation).await;
            println!("{:?}", outcome);
        }
        Command::Status => {
            let authenticated = session.is_authenticated();
            println!(
                "{}",
                if authenticated {
                    "authenticated"
                } else {
                    "not authenticated"
                }
            );
            if let Some(profile) = session.user_profile() {
                println!(
                    "{} <{}>",
                    profile.display_name_or_upn(),
                    profile.email()
                );
            }
        }
        Command::Token => {
            let token = session.acquire_token().await.map_err(AppError::from)?;
            println!("{}", token.as_str());
        }
        Command::Profile => match session.profile(navigation).await {
            Some(profile) => {
                let json = serde_json::to_string_pretty(&profile).map_err(AppError::from)?;
                println!("{}", json);
            }
            None => println!("no cached user"),
        },
        Command::SignIn => session.sign_in(),
        Command::SignOut => session.sign_out(),
        Command::TokenRedirect => session.acquire_token_redirect(),
    }

    Ok(())
}
