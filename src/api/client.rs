use reqwest::{Method, RequestBuilder};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tracing::Instrument;
use url::Url;
use uuid::Uuid;

use super::{ApiError, InterceptorChain, Outcome, ResponseInterceptor};
use crate::config::ClientConfig;
use crate::session::{Navigator, SessionExpiry, TokenStore, TOKEN_KEY};

/// The shared handle every part of the application issues requests through.
///
/// Cloning is cheap, and all clones share the same connection pool, configuration
/// and interceptors. None of these can be changed once built.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: reqwest::Client,
    config: ClientConfig,
    interceptors: InterceptorChain,
    token_store: Option<Arc<dyn TokenStore>>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.config.base_url.as_str())
            .field("interceptors", &self.inner.interceptors.len())
            .field("token_store", &self.inner.token_store.is_some())
            .finish()
    }
}

impl ApiClient {
    /// Creates a bare client around the given configuration, with no interceptors.
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        Self::builder(config).build()
    }

    /// Creates the client the application shares: requests carry the stored
    /// session token, and a `401 Unauthorized` ends the session.
    pub fn with_session(
        config: ClientConfig,
        store: Arc<dyn TokenStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ApiError> {
        Self::builder(config)
            .token_store(store.clone())
            .interceptor(SessionExpiry::new(store, navigator))
            .build()
    }

    pub fn builder(config: ClientConfig) -> ApiClientBuilder {
        ApiClientBuilder {
            config,
            interceptors: InterceptorChain::default(),
            token_store: None,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.inner.config.base_url
    }

    /// Resolves a path relative to our origin.
    ///
    /// Leading slashes are relative to the configured base path rather than
    /// the host root. Anything resolving outside of the base is refused.
    pub fn url(&self, path: &str) -> Result<Url, ApiError> {
        let base = &self.inner.config.base_url;
        let url = base.join(path.trim_start_matches('/'))?;

        if !self.within_base(&url) {
            return Err(ApiError::ForeignOrigin(path.to_string()));
        }
        Ok(url)
    }

    /// Whether `url` lives on our origin, at or below the base path.
    fn within_base(&self, url: &Url) -> bool {
        let base = &self.inner.config.base_url;
        url.origin() == base.origin() && url.path().starts_with(base.path())
    }

    /// Creates a request against our origin.
    /// If we have a session token stored, it's attached as a bearer token.
    pub fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        let mut request = self.inner.http.request(method, self.url(path)?);

        if let Some(store) = &self.inner.token_store {
            match store.get(TOKEN_KEY) {
                Ok(Some(token)) => request = request.bearer_auth(token),
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(error = %err, "unable to read session token, sending without it")
                }
            }
        }

        Ok(request)
    }

    pub fn get(&self, path: &str) -> Result<RequestBuilder, ApiError> {
        self.request(Method::GET, path)
    }

    pub fn post(&self, path: &str) -> Result<RequestBuilder, ApiError> {
        self.request(Method::POST, path)
    }

    pub fn put(&self, path: &str) -> Result<RequestBuilder, ApiError> {
        self.request(Method::PUT, path)
    }

    pub fn patch(&self, path: &str) -> Result<RequestBuilder, ApiError> {
        self.request(Method::PATCH, path)
    }

    pub fn delete(&self, path: &str) -> Result<RequestBuilder, ApiError> {
        self.request(Method::DELETE, path)
    }

    /// Sends the request and runs its outcome through our interceptors.
    ///
    /// Any non-2xx response becomes `ApiError::Status` with the body kept intact.
    /// Callers receive whatever the interceptors hand back.
    pub async fn execute(&self, request: RequestBuilder) -> Outcome {
        let request_id = Uuid::new_v4();
        let span = tracing::debug_span!("request", %request_id);

        async move {
            let outcome = self.send(request).await;
            self.inner.interceptors.apply(outcome)
        }
        .instrument(span)
        .await
    }

    async fn send(&self, request: RequestBuilder) -> Outcome {
        let request = request.build()?;
        // Builders can come from any `reqwest::Client`.
        if !self.within_base(request.url()) {
            tracing::warn!(url = %request.url(), "refusing request outside of the configured origin");
            return Err(ApiError::ForeignOrigin(request.url().to_string()));
        }
        tracing::debug!(method = %request.method(), url = %request.url(), "sending request");

        let response = match self.inner.http.execute(request).await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(error = %err, "request failed without a response");
                return Err(ApiError::Transport(err));
            }
        };

        let status = response.status();
        if status.is_success() {
            tracing::debug!(%status, "request succeeded");
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| status.to_string());
        tracing::warn!(%status, "server rejected request");
        Err(ApiError::Status { status, body })
    }

    /// Issues a `GET` and decodes the JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.execute(self.get(path)?).await?;
        decode(response).await
    }

    /// Sends `body` as JSON and decodes the JSON response.
    pub async fn send_json<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.request(method, path)?.json(body);
        let response = self.execute(request).await?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let text = response.text().await?;
    Ok(serde_json::from_str(&text)?)
}

pub struct ApiClientBuilder {
    config: ClientConfig,
    interceptors: InterceptorChain,
    token_store: Option<Arc<dyn TokenStore>>,
}

impl ApiClientBuilder {
    /// Appends an interceptor. They run in the order they were added.
    pub fn interceptor(mut self, interceptor: impl ResponseInterceptor + 'static) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    /// Attaches the stored session token to every request.
    pub fn token_store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.token_store = Some(store);
        self
    }

    pub fn build(self) -> Result<ApiClient, ApiError> {
        let mut http = reqwest::Client::builder().user_agent(self.config.user_agent.clone());
        if let Some(timeout) = self.config.timeout() {
            http = http.timeout(timeout);
        }

        Ok(ApiClient {
            inner: Arc::new(ClientInner {
                http: http.build()?,
                config: self.config,
                interceptors: self.interceptors,
                token_store: self.token_store,
            }),
        })
    }
}
