use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use reqwest::Method;
use sessionctl::{
    api::{ApiClient, ApiError},
    config::ClientConfig,
    session::{KeyringStore, MemoryStore, SessionEvent, SessionEvents, TokenStore, TOKEN_KEY},
};
use std::{path::PathBuf, sync::Arc};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sessionctl")]
#[command(about = "Issue requests against the configured backend with the stored session")]
#[command(version)]
struct Cli {
    /// Configuration file to layer over the built-in defaults
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Keep the session token in memory instead of the OS keyring
    #[arg(long, global = true)]
    memory: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Send a request relative to the backend origin
    Request {
        /// HTTP method, e.g. GET or POST
        #[arg(value_parser = parse_method)]
        method: Method,
        /// Path relative to the backend origin
        path: String,
        /// JSON body to send
        #[arg(short, long)]
        data: Option<String>,
    },
    /// Manage the stored session token
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },
}

#[derive(Subcommand)]
enum TokenAction {
    /// Store a session token
    Set { value: String },
    /// Print the stored session token
    Show,
    /// Remove the stored session token
    Clear,
}

fn parse_method(raw: &str) -> Result<Method, String> {
    Method::from_bytes(raw.to_ascii_uppercase().as_bytes()).map_err(|err| err.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sessionctl=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config =
        ClientConfig::load(cli.config.as_deref()).context("unable to load configuration")?;

    let store: Arc<dyn TokenStore> = if cli.memory {
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(KeyringStore::new(config.token_service.clone()))
    };

    match cli.command {
        Command::Token { action } => manage_token(store.as_ref(), action),
        Command::Request { method, path, data } => {
            let events = SessionEvents::default();
            let mut expired = events.subscribe();
            let client = ApiClient::with_session(config, store, Arc::new(events))?;
            tracing::debug!(?client, "client ready");

            let result = send(&client, method, &path, data.as_deref()).await;

            // Stand in for the application shell: follow any redirect we were asked to make.
            while let Ok(SessionEvent::Expired { location, navigation }) = expired.try_recv() {
                eprintln!("Session expired; redirecting to {location} ({navigation:?} navigation)");
            }

            result
        }
    }
}

async fn send(client: &ApiClient, method: Method, path: &str, data: Option<&str>) -> Result<()> {
    let mut request = client.request(method, path)?;
    if let Some(data) = data {
        let body: serde_json::Value =
            serde_json::from_str(data).context("request body must be valid JSON")?;
        request = request.json(&body);
    }

    match client.execute(request).await {
        Ok(response) => {
            println!("{}", response.status());
            println!("{}", response.text().await?);
            Ok(())
        }
        Err(ApiError::Status { status, body }) => {
            println!("{status}");
            println!("{body}");
            bail!("request failed with {status}")
        }
        Err(err) => Err(err.into()),
    }
}

fn manage_token(store: &dyn TokenStore, action: TokenAction) -> Result<()> {
    match action {
        TokenAction::Set { value } => store.set(TOKEN_KEY, &value)?,
        TokenAction::Show => match store.get(TOKEN_KEY)? {
            Some(token) => println!("{token}"),
            None => bail!("no session token stored"),
        },
        TokenAction::Clear => store.delete(TOKEN_KEY)?,
    }
    Ok(())
}
