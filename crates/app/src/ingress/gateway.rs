//! Auth gateway.

use std::{fmt, sync::Arc};

use jiff::{SignedDuration, Timestamp};
use tracing::{info, warn};

use crate::{
    credentials::CredentialStore,
    domain::{
        identifiers::{ResourceId, TenantId},
        links::records::LinkRecord,
    },
    ingress::{
        limiter::RateLimit,
        rejection::{GatewayError, GatewayRejection},
        signature::{mask_secret, signature_matches},
    },
};

/// Shortest string accepted as a credential before any lookup.
pub const MIN_CREDENTIAL_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Accepted distance between the claimed timestamp and server time.
    pub timestamp_drift: SignedDuration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            timestamp_drift: SignedDuration::from_secs(300),
        }
    }
}

/// The parts of an inbound request the gateway inspects.
#[derive(Clone, Copy)]
pub struct InboundRequest<'a> {
    pub method: &'a str,
    pub path: &'a str,
    pub body: &'a [u8],
    pub token: Option<&'a str>,
    pub signature: Option<&'a str>,

    /// Claimed send time in unix seconds.
    pub timestamp: Option<i64>,

    pub resource: Option<ResourceId>,

    /// Reject unsigned requests instead of skipping the signature check.
    pub require_signature: bool,
}

impl fmt::Debug for InboundRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InboundRequest")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("token", &self.token.map(mask_secret))
            .field("signed", &self.signature.is_some())
            .field("timestamp", &self.timestamp)
            .field("resource", &self.resource)
            .finish_non_exhaustive()
    }
}

/// Identity and scope established for an authorized request.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorizedContext {
    pub link: LinkRecord,
    pub resource: Option<ResourceId>,
}

impl AuthorizedContext {
    #[must_use]
    pub fn tenant_id(&self) -> &TenantId {
        &self.link.tenant_id
    }

    /// Limiter key for the request: one bucket per tenant and resource.
    #[must_use]
    pub fn bucket_key(&self) -> String {
        match self.resource {
            Some(resource) => format!("{}:{resource}", self.link.tenant_id),
            None => format!("{}:*", self.link.tenant_id),
        }
    }

    /// The tenant's configured request ceiling.
    #[must_use]
    pub fn rate_limit(&self) -> RateLimit {
        RateLimit::new(
            self.link.tunables.rate_limit_max_requests,
            self.link.tunables.rate_limit_window_seconds,
        )
    }
}

pub struct AuthGateway {
    credentials: Arc<dyn CredentialStore>,
    config: GatewayConfig,
}

impl fmt::Debug for AuthGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthGateway")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AuthGateway {
    #[must_use]
    pub fn new(credentials: Arc<dyn CredentialStore>, config: GatewayConfig) -> Self {
        Self {
            credentials,
            config,
        }
    }

    /// Authorize an inbound request, short-circuiting on the first failed check.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Rejected`] with the reason the request was refused,
    /// or [`GatewayError::Store`] when the credential store could not be queried.
    pub async fn authorize(
        &self,
        request: &InboundRequest<'_>,
        now: Timestamp,
    ) -> Result<AuthorizedContext, GatewayError> {
        let mut tenant = None;
        let outcome = self.evaluate(request, now, &mut tenant).await;

        match &outcome {
            Ok(context) => info!(
                tenant = %context.tenant_id(),
                path = request.path,
                resource = ?context.resource,
                "request authorized"
            ),
            Err(GatewayError::Rejected(rejection)) => warn!(
                tenant = %tenant.as_ref().map_or("unknown", TenantId::as_str),
                credential = %request.token.map_or_else(String::new, mask_secret),
                path = request.path,
                code = rejection.code(),
                reason = %rejection,
                "request rejected"
            ),
            Err(GatewayError::Store(error)) => warn!(
                path = request.path,
                credential = %request.token.map_or_else(String::new, mask_secret),
                error = %error,
                "credential lookup failed"
            ),
        }

        outcome
    }

    async fn evaluate(
        &self,
        request: &InboundRequest<'_>,
        now: Timestamp,
        tenant: &mut Option<TenantId>,
    ) -> Result<AuthorizedContext, GatewayError> {
        let token = request
            .token
            .map(str::trim)
            .filter(|token| token.len() >= MIN_CREDENTIAL_LEN)
            .ok_or(GatewayRejection::NoCredential)?;

        let link = self
            .credentials
            .validate(token)
            .await?
            .ok_or(GatewayRejection::InvalidCredential)?;

        *tenant = Some(link.tenant_id.clone());

        if !link.is_verified() {
            return Err(GatewayRejection::NotVerified.into());
        }

        let timestamp = request
            .timestamp
            .ok_or(GatewayRejection::MissingParams("timestamp"))?;

        if !self.within_drift(timestamp, now) {
            return Err(GatewayRejection::StaleOrFutureTimestamp.into());
        }

        match request.signature {
            Some(signature) => {
                if !signature_matches(
                    token,
                    request.method,
                    request.path,
                    request.body,
                    timestamp,
                    signature,
                ) {
                    return Err(GatewayRejection::BadSignature.into());
                }
            }
            None if request.require_signature => {
                return Err(GatewayRejection::BadSignature.into());
            }
            None => {}
        }

        if let Some(resource) = request.resource
            && !link.authorizes_resource(resource)
        {
            return Err(GatewayRejection::ResourceNotAuthorized(resource).into());
        }

        if let Err(error) = self.credentials.touch_last_used(&link.tenant_id, now).await {
            warn!(tenant = %link.tenant_id, error = %error, "failed to record credential use");
        }

        Ok(AuthorizedContext {
            link,
            resource: request.resource,
        })
    }

    fn within_drift(&self, timestamp: i64, now: Timestamp) -> bool {
        let drift = now.as_second().abs_diff(timestamp);

        drift <= self.config.timestamp_drift.as_secs().unsigned_abs()
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::{
        credentials::{CredentialStoreError, MockCredentialStore},
        domain::{
            identifiers::GroupId,
            links::records::{LinkTunables, SyncCounters, VerificationStatus},
        },
        ingress::signature::sign_request,
    };

    use super::*;

    const TOKEN: &str = "rsk_v1_0190f2a8c3a97c3b8f1e2d4c5b6a7980.00112233445566778899aabbccddeeff";

    fn link(status: VerificationStatus) -> LinkRecord {
        let now = Timestamp::now();

        LinkRecord {
            tenant_id: TenantId::from("guild-1"),
            group_id: GroupId(77),
            resource_ids: vec![ResourceId(1), ResourceId(2)],
            credential: None,
            verification_status: status,
            verified_at: None,
            enabled_templates: Vec::new(),
            tunables: LinkTunables::default(),
            counters: SyncCounters::default(),
            created_at: now,
            updated_at: now,
        }
    }

    fn store_returning(status: VerificationStatus) -> MockCredentialStore {
        let mut store = MockCredentialStore::new();

        store
            .expect_validate()
            .returning(move |_token| Ok(Some(link(status))));
        store.expect_touch_last_used().returning(|_, _| Ok(()));

        store
    }

    fn gateway(store: MockCredentialStore) -> AuthGateway {
        AuthGateway::new(Arc::new(store), GatewayConfig::default())
    }

    fn request<'a>(now: Timestamp) -> InboundRequest<'a> {
        InboundRequest {
            method: "POST",
            path: "/validate",
            body: b"{}",
            token: Some(TOKEN),
            signature: None,
            timestamp: Some(now.as_second()),
            resource: Some(ResourceId(1)),
            require_signature: false,
        }
    }

    async fn rejection(
        gateway: &AuthGateway,
        request: &InboundRequest<'_>,
        now: Timestamp,
    ) -> Option<GatewayRejection> {
        match gateway.authorize(request, now).await {
            Err(GatewayError::Rejected(rejection)) => Some(rejection),
            Ok(_) | Err(GatewayError::Store(_)) => None,
        }
    }

    #[tokio::test]
    async fn authorizes_verified_tenant_within_scope() -> TestResult {
        let now = Timestamp::now();
        let mut store = MockCredentialStore::new();
        store
            .expect_validate()
            .once()
            .withf(|token| token == TOKEN)
            .returning(|_token| Ok(Some(link(VerificationStatus::Verified))));
        store
            .expect_touch_last_used()
            .once()
            .returning(|_, _| Ok(()));

        let context = gateway(store).authorize(&request(now), now).await?;

        assert_eq!(context.tenant_id(), &TenantId::from("guild-1"));
        assert_eq!(context.bucket_key(), "guild-1:1");

        Ok(())
    }

    #[tokio::test]
    async fn short_or_missing_tokens_never_reach_the_store() {
        let now = Timestamp::now();
        let mut store = MockCredentialStore::new();
        store.expect_validate().never();
        let gateway = gateway(store);

        let mut missing = request(now);
        missing.token = None;

        let mut short = request(now);
        short.token = Some("rsk_v1_short");

        assert_eq!(
            rejection(&gateway, &missing, now).await,
            Some(GatewayRejection::NoCredential)
        );
        assert_eq!(
            rejection(&gateway, &short, now).await,
            Some(GatewayRejection::NoCredential)
        );
    }

    #[tokio::test]
    async fn unknown_credentials_are_invalid() {
        let now = Timestamp::now();
        let mut store = MockCredentialStore::new();
        store.expect_validate().returning(|_token| Ok(None));
        store.expect_touch_last_used().never();

        assert_eq!(
            rejection(&gateway(store), &request(now), now).await,
            Some(GatewayRejection::InvalidCredential)
        );
    }

    #[tokio::test]
    async fn unverified_links_are_rejected() {
        let now = Timestamp::now();

        for status in [VerificationStatus::Pending, VerificationStatus::VerificationFailed] {
            assert_eq!(
                rejection(&gateway(store_returning(status)), &request(now), now).await,
                Some(GatewayRejection::NotVerified)
            );
        }
    }

    #[tokio::test]
    async fn timestamps_outside_the_window_are_rejected() -> TestResult {
        let now = Timestamp::now();
        let gateway = gateway(store_returning(VerificationStatus::Verified));

        let mut stale = request(now);
        stale.timestamp = Some(now.checked_sub(SignedDuration::from_secs(400))?.as_second());

        let mut future = request(now);
        future.timestamp = Some(now.checked_add(SignedDuration::from_secs(400))?.as_second());

        let mut recent = request(now);
        recent.timestamp = Some(now.checked_sub(SignedDuration::from_secs(100))?.as_second());

        let mut missing = request(now);
        missing.timestamp = None;

        assert_eq!(
            rejection(&gateway, &stale, now).await,
            Some(GatewayRejection::StaleOrFutureTimestamp)
        );
        assert_eq!(
            rejection(&gateway, &future, now).await,
            Some(GatewayRejection::StaleOrFutureTimestamp)
        );
        assert_eq!(
            rejection(&gateway, &missing, now).await,
            Some(GatewayRejection::MissingParams("timestamp"))
        );
        assert!(gateway.authorize(&recent, now).await.is_ok());

        Ok(())
    }

    #[tokio::test]
    async fn signatures_are_checked_when_present_or_required() -> TestResult {
        let now = Timestamp::now();
        let gateway = gateway(store_returning(VerificationStatus::Verified));

        let signature = sign_request(TOKEN, "POST", "/validate", b"{}", now.as_second())?;

        let mut signed = request(now);
        signed.signature = Some(&signature);
        signed.require_signature = true;

        let mut tampered = signed;
        tampered.body = b"{\"resource_id\":2}";

        let mut unsigned = request(now);
        unsigned.require_signature = true;

        assert!(gateway.authorize(&signed, now).await.is_ok());
        assert_eq!(
            rejection(&gateway, &tampered, now).await,
            Some(GatewayRejection::BadSignature)
        );
        assert_eq!(
            rejection(&gateway, &unsigned, now).await,
            Some(GatewayRejection::BadSignature)
        );

        Ok(())
    }

    #[tokio::test]
    async fn resources_outside_scope_are_rejected() {
        let now = Timestamp::now();
        let gateway = gateway(store_returning(VerificationStatus::Verified));

        let mut foreign = request(now);
        foreign.resource = Some(ResourceId(3));

        assert_eq!(
            rejection(&gateway, &foreign, now).await,
            Some(GatewayRejection::ResourceNotAuthorized(ResourceId(3)))
        );
    }

    #[tokio::test]
    async fn failed_last_used_touch_does_not_reject() -> TestResult {
        let now = Timestamp::now();
        let mut store = MockCredentialStore::new();
        store
            .expect_validate()
            .returning(|_token| Ok(Some(link(VerificationStatus::Verified))));
        store
            .expect_touch_last_used()
            .once()
            .returning(|_, _| Err(CredentialStoreError::LinkNotFound));

        gateway(store).authorize(&request(now), now).await?;

        Ok(())
    }

    #[test]
    fn debug_output_masks_the_token() {
        let rendered = format!("{:?}", request(Timestamp::now()));

        assert!(!rendered.contains(TOKEN));
        assert!(rendered.contains("rsk_v1_0…"));
    }
}
