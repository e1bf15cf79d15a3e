//! Test helpers.

use std::sync::Arc;

use jiff::Timestamp;
use ranksync_app::{
    context::AppContext,
    credentials::MockCredentialStore,
    directory::MockDirectoryService,
    domain::{
        identifiers::{GroupId, ResourceId, TenantId},
        links::{
            MockLinksService,
            records::{LinkRecord, LinkTunables, SyncCounters, VerificationStatus},
        },
        submissions::MockSubmissionsService,
        sync::MockSyncQueue,
        templates::MockTemplatesService,
        verification::MockOwnershipVerifier,
    },
    ingress::{AuthGateway, AuthorizedContext, GatewayConfig},
    worker::{RoleSyncWorker, WorkerConfig},
};
use salvo::{affix_state::inject, prelude::*};

use crate::state::{RequestPolicy, State};

/// A syntactically valid credential for `guild-1`.
pub(crate) const TOKEN: &str =
    "rsk_v1_0190f2a8c3a97c3b8f1e2d4c5b6a7980.00112233445566778899aabbccddeeff";

pub(crate) fn tenant() -> TenantId {
    TenantId::from("guild-1")
}

/// Verified link for `guild-1`, group 77, scoped to resources 1 and 2.
pub(crate) fn link() -> LinkRecord {
    LinkRecord {
        tenant_id: tenant(),
        group_id: GroupId(77),
        resource_ids: vec![ResourceId(1), ResourceId(2)],
        credential: None,
        verification_status: VerificationStatus::Verified,
        verified_at: Some(Timestamp::UNIX_EPOCH),
        enabled_templates: Vec::new(),
        tunables: LinkTunables::default(),
        counters: SyncCounters::default(),
        created_at: Timestamp::UNIX_EPOCH,
        updated_at: Timestamp::UNIX_EPOCH,
    }
}

pub(crate) fn authorized(link: LinkRecord, resource: Option<u64>) -> AuthorizedContext {
    AuthorizedContext {
        link,
        resource: resource.map(ResourceId),
    }
}

/// Service mocks. Any call without a matching expectation fails the test.
#[derive(Default)]
pub(crate) struct Mocks {
    pub links: MockLinksService,
    pub credentials: MockCredentialStore,
    pub verifier: MockOwnershipVerifier,
    pub queue: MockSyncQueue,
    pub templates: MockTemplatesService,
    pub submissions: MockSubmissionsService,
    pub directory: MockDirectoryService,
}

impl Mocks {
    pub(crate) fn into_state(self, policy: RequestPolicy) -> Arc<State> {
        let links: Arc<MockLinksService> = Arc::new(self.links);
        let queue: Arc<MockSyncQueue> = Arc::new(self.queue);
        let directory: Arc<MockDirectoryService> = Arc::new(self.directory);
        let credentials: Arc<MockCredentialStore> = Arc::new(self.credentials);

        let app = AppContext {
            gateway: Arc::new(AuthGateway::new(
                credentials.clone(),
                GatewayConfig::default(),
            )),
            worker: Arc::new(RoleSyncWorker::new(
                queue.clone(),
                links.clone(),
                directory.clone(),
                WorkerConfig::default(),
            )),
            links,
            credentials,
            verifier: Arc::new(self.verifier),
            queue,
            templates: Arc::new(self.templates),
            submissions: Arc::new(self.submissions),
            directory,
        };

        State::from_app_context(app, policy)
    }
}

/// Stands in for the gateway by attaching a fixed context.
#[derive(Debug)]
pub(crate) struct InjectContext(pub AuthorizedContext);

#[handler]
impl InjectContext {
    async fn handle(&self, req: &mut Request, depot: &mut Depot, res: &mut Response, ctrl: &mut FlowCtrl) {
        depot.inject(self.0.clone());
        ctrl.call_next(req, depot, res).await;
    }
}

/// Serve `route` as an authorized request from `context`.
pub(crate) fn service(mocks: Mocks, context: AuthorizedContext, route: Router) -> Service {
    Service::new(
        Router::new()
            .hoop(inject(mocks.into_state(RequestPolicy::default())))
            .hoop(InjectContext(context))
            .push(route),
    )
}
