mod client;
mod error;
mod interceptor;

pub use client::{ApiClient, ApiClientBuilder};
pub use error::{ApiError, Outcome};
pub use interceptor::{InterceptorChain, ResponseInterceptor};
