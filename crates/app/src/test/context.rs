//! Test context for service-level integration tests.

use std::sync::Arc;

use crate::{
    credentials::PgCredentialStore,
    database::Db,
    directory::MockDirectoryService,
    domain::{
        links::PgLinksService,
        submissions::PgSubmissionsService,
        sync::{PgSyncQueue, backoff::RetryPolicy},
        templates::PgTemplatesService,
        verification::{PgOwnershipVerifier, data::ChallengePolicy},
    },
};

use super::db::TestDb;

pub(crate) struct TestContext {
    pub db: TestDb,
    pub links: PgLinksService,
    pub templates: PgTemplatesService,
    pub queue: PgSyncQueue,
    pub credentials: PgCredentialStore,
    pub submissions: PgSubmissionsService,
}

impl TestContext {
    pub(crate) async fn new() -> Self {
        let test_db = TestDb::new().await;
        let db = Db::new(test_db.pool().clone());

        Self {
            links: PgLinksService::new(db.clone()),
            templates: PgTemplatesService::new(db.clone()),
            queue: PgSyncQueue::new(db.clone(), RetryPolicy::default()),
            credentials: PgCredentialStore::new(db.clone()),
            submissions: PgSubmissionsService::new(db, RetryPolicy::default()),
            db: test_db,
        }
    }

    /// Ownership verifier talking to the given directory double.
    pub(crate) fn verifier(&self, directory: MockDirectoryService) -> PgOwnershipVerifier {
        PgOwnershipVerifier::new(
            Db::new(self.db.pool().clone()),
            Arc::new(directory),
            ChallengePolicy::default(),
        )
    }
}
