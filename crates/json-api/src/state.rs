//! State

use std::sync::Arc;

use ranksync_app::{
    context::AppContext,
    ingress::{RateLimit, RateLimiter},
};

/// Per-process request policy that is not owned by the app services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RequestPolicy {
    /// Mutating `/sync` requests must carry a valid signature.
    pub require_signed_mutations: bool,

    /// Ceiling for submissions per tenant, resource and subject.
    pub submit_limit: RateLimit,
}

impl Default for RequestPolicy {
    fn default() -> Self {
        Self {
            require_signed_mutations: true,
            submit_limit: RateLimit::new(3, 600),
        }
    }
}

#[derive(Debug)]
pub(crate) struct State {
    pub(crate) app: AppContext,
    pub(crate) policy: RequestPolicy,

    /// Per tenant and resource request buckets.
    pub(crate) limiter: RateLimiter,

    /// Per tenant, resource and subject submission buckets.
    pub(crate) submit_limiter: RateLimiter,
}

impl State {
    #[must_use]
    pub(crate) fn new(app: AppContext, policy: RequestPolicy) -> Self {
        Self {
            app,
            policy,
            limiter: RateLimiter::new(),
            submit_limiter: RateLimiter::new(),
        }
    }

    #[must_use]
    pub(crate) fn from_app_context(app: AppContext, policy: RequestPolicy) -> Arc<Self> {
        Arc::new(Self::new(app, policy))
    }
}
