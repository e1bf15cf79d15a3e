//! App Context

use std::sync::Arc;

use thiserror::Error;

use crate::{
    credentials::{CredentialStore, PgCredentialStore},
    database::{self, Db},
    directory::{DirectoryConfig, DirectoryError, DirectoryService, HttpDirectoryClient},
    domain::{
        links::{LinksService, PgLinksService},
        submissions::{PgSubmissionsService, SubmissionsService},
        sync::{PgSyncQueue, SyncQueue, backoff::RetryPolicy},
        templates::{PgTemplatesService, TemplatesService},
        verification::{OwnershipVerifier, PgOwnershipVerifier, data::ChallengePolicy},
    },
    ingress::{AuthGateway, GatewayConfig},
    worker::{RoleSyncWorker, WorkerConfig},
};

#[derive(Debug, Error)]
pub enum AppInitError {
    #[error("failed to connect to database")]
    Database(#[source] sqlx::Error),

    #[error("failed to apply database migrations")]
    Migrations(#[source] sqlx::migrate::MigrateError),

    #[error("failed to build directory client")]
    Directory(#[source] DirectoryError),
}

/// Everything the services need besides the database URL.
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub directory: DirectoryConfig,
    pub retry: RetryPolicy,
    pub challenge: ChallengePolicy,
    pub gateway: GatewayConfig,
    pub worker: WorkerConfig,
}

/// Services wired once at start-up and shared behind trait objects.
#[derive(Clone)]
pub struct AppContext {
    pub links: Arc<dyn LinksService>,
    pub credentials: Arc<dyn CredentialStore>,
    pub verifier: Arc<dyn OwnershipVerifier>,
    pub queue: Arc<dyn SyncQueue>,
    pub templates: Arc<dyn TemplatesService>,
    pub submissions: Arc<dyn SubmissionsService>,
    pub directory: Arc<dyn DirectoryService>,
    pub gateway: Arc<AuthGateway>,
    pub worker: Arc<RoleSyncWorker>,
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("gateway", &self.gateway)
            .field("worker", &self.worker)
            .finish_non_exhaustive()
    }
}

impl AppContext {
    /// Connect, migrate and wire every service.
    ///
    /// # Errors
    ///
    /// Returns an error when the database is unreachable, a migration fails or
    /// the directory client cannot be built.
    pub async fn from_database_url(url: &str, settings: AppSettings) -> Result<Self, AppInitError> {
        let pool = database::connect(url)
            .await
            .map_err(AppInitError::Database)?;

        database::migrate(&pool)
            .await
            .map_err(AppInitError::Migrations)?;

        let directory: Arc<dyn DirectoryService> = Arc::new(
            HttpDirectoryClient::new(settings.directory.clone()).map_err(AppInitError::Directory)?,
        );

        Ok(Self::from_parts(Db::new(pool), directory, &settings))
    }

    /// Wire services over an existing database handle and directory.
    #[must_use]
    pub fn from_parts(
        db: Db,
        directory: Arc<dyn DirectoryService>,
        settings: &AppSettings,
    ) -> Self {
        let links: Arc<dyn LinksService> = Arc::new(PgLinksService::new(db.clone()));
        let credentials: Arc<dyn CredentialStore> = Arc::new(PgCredentialStore::new(db.clone()));
        let queue: Arc<dyn SyncQueue> = Arc::new(PgSyncQueue::new(db.clone(), settings.retry));

        let worker = Arc::new(RoleSyncWorker::new(
            Arc::clone(&queue),
            Arc::clone(&links),
            Arc::clone(&directory),
            settings.worker,
        ));

        Self {
            verifier: Arc::new(PgOwnershipVerifier::new(
                db.clone(),
                Arc::clone(&directory),
                settings.challenge,
            )),
            templates: Arc::new(PgTemplatesService::new(db.clone())),
            submissions: Arc::new(PgSubmissionsService::new(db, settings.retry)),
            gateway: Arc::new(AuthGateway::new(Arc::clone(&credentials), settings.gateway)),
            links,
            credentials,
            queue,
            directory,
            worker,
        }
    }
}
