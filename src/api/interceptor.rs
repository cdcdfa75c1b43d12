use std::sync::Arc;

use super::Outcome;

/// A hook observing every outcome flowing through an `ApiClient`.
///
/// Interceptors receive the outcome of a request before the caller does,
/// and return what the caller should see instead. Most simply forward it.
pub trait ResponseInterceptor: Send + Sync {
    fn intercept(&self, outcome: Outcome) -> Outcome;
}

impl<F> ResponseInterceptor for F
where
    F: Fn(Outcome) -> Outcome + Send + Sync,
{
    fn intercept(&self, outcome: Outcome) -> Outcome {
        self(outcome)
    }
}

/// Interceptors in the order they were registered.
#[derive(Clone, Default)]
pub struct InterceptorChain {
    interceptors: Vec<Arc<dyn ResponseInterceptor>>,
}

impl InterceptorChain {
    pub fn push(&mut self, interceptor: Arc<dyn ResponseInterceptor>) {
        self.interceptors.push(interceptor);
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    /// Threads the outcome through every interceptor in turn.
    /// An empty chain hands it back untouched.
    pub fn apply(&self, outcome: Outcome) -> Outcome {
        self.interceptors
            .iter()
            .fold(outcome, |outcome, interceptor| interceptor.intercept(outcome))
    }
}
