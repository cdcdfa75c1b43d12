use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// The backend origin used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "https://api.example.com";

/// The keyring service our session token lives under.
pub const DEFAULT_TOKEN_SERVICE: &str = "sessionctl";

/// Environment variables prefixed with this override file settings,
/// e.g. `SESSIONCTL_BASE_URL`.
const ENV_PREFIX: &str = "SESSIONCTL";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unable to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid base URL {url:?}: {source}")]
    InvalidBaseUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("base URL must be http or https, got {0:?}")]
    UnsupportedScheme(String),
}

/// The raw, deserialized form of our configuration sources.
#[derive(Deserialize)]
struct RawConfig {
    base_url: String,
    user_agent: String,
    timeout_secs: Option<u64>,
    token_service: String,
}

/// Settings shared by every request issued through an `ApiClient`.
///
/// This is loaded once at startup. Nothing mutates it afterwards: the client
/// keeps its own copy behind an `Arc`, so the origin stays fixed for as long
/// as the process runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// The origin every relative request path is resolved against.
    pub base_url: Url,
    pub user_agent: String,
    /// Per-request timeout. `None` leaves it to the caller; zero is treated as `None`.
    pub timeout_secs: Option<u64>,
    /// Keyring service name for the session token.
    pub token_service: String,
}

impl ClientConfig {
    /// Creates a configuration around the given origin, with defaults for everything else.
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            user_agent: default_user_agent(),
            timeout_secs: None,
            token_service: DEFAULT_TOKEN_SERVICE.to_string(),
        })
    }

    /// Loads configuration from built-in defaults, an optional file,
    /// and finally `SESSIONCTL_*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder()
            .set_default("base_url", DEFAULT_BASE_URL)?
            .set_default("user_agent", default_user_agent())?
            .set_default("token_service", DEFAULT_TOKEN_SERVICE)?;

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        let settings = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;
        let raw: RawConfig = settings.try_deserialize()?;

        Ok(Self {
            base_url: parse_base_url(&raw.base_url)?,
            user_agent: raw.user_agent,
            timeout_secs: raw.timeout_secs.filter(|&secs| secs > 0),
            token_service: raw.token_service,
        })
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs
            .filter(|&secs| secs > 0)
            .map(Duration::from_secs)
    }
}

fn default_user_agent() -> String {
    format!("sessionctl/{}", env!("CARGO_PKG_VERSION"))
}

/// Validates our origin. We only accept absolute HTTP(S) URLs,
/// and normalize the path so relative joins behave.
fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(raw).map_err(|source| ConfigError::InvalidBaseUrl {
        url: raw.to_string(),
        source,
    })?;

    match url.scheme() {
        "http" | "https" => {}
        other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
    }

    // `Url::join` drops the last path segment unless it ends with a slash.
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}
