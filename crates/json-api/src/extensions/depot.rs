//! Depot helper extensions.

use std::any::Any;

use ranksync_app::ingress::{AuthorizedContext, GatewayRejection};
use salvo::prelude::Depot;

use crate::envelope::ApiError;

/// Helpers for mapping depot extraction failures to API errors.
pub(crate) trait DepotExt {
    fn obtain_or_500<T: Any + Send + Sync>(&self) -> Result<&T, ApiError>;

    /// The context the gateway attached to this request.
    fn authorized_or_401(&self) -> Result<&AuthorizedContext, ApiError>;
}

impl DepotExt for Depot {
    fn obtain_or_500<T: Any + Send + Sync>(&self) -> Result<&T, ApiError> {
        self.obtain::<T>().map_err(|_missing| {
            ApiError::internal("depot value missing", &std::any::type_name::<T>())
        })
    }

    fn authorized_or_401(&self) -> Result<&AuthorizedContext, ApiError> {
        self.obtain::<AuthorizedContext>()
            .map_err(|_missing| GatewayRejection::NoCredential.into())
    }
}
