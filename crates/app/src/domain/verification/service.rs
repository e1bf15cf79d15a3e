//! Ownership verification service.

use std::sync::Arc;

use async_trait::async_trait;
use jiff::{SignedDuration, Timestamp};
use mockall::automock;
use tracing::{info, warn};

use crate::{
    database::Db,
    directory::{DirectoryService, Freshness},
    domain::{
        identifiers::{GroupId, TenantId},
        links::{records::VerificationStatus, repository::PgLinksRepository},
        verification::{
            code::generate_code,
            data::{ChallengePolicy, CheckOutcome, StartedChallenge},
            errors::VerificationError,
            records::VerificationChallenge,
            repository::PgChallengesRepository,
        },
    },
};

pub struct PgOwnershipVerifier {
    db: Db,
    links: PgLinksRepository,
    challenges: PgChallengesRepository,
    directory: Arc<dyn DirectoryService>,
    policy: ChallengePolicy,
}

impl std::fmt::Debug for PgOwnershipVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgOwnershipVerifier")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl PgOwnershipVerifier {
    #[must_use]
    pub fn new(db: Db, directory: Arc<dyn DirectoryService>, policy: ChallengePolicy) -> Self {
        Self {
            db,
            links: PgLinksRepository::new(),
            challenges: PgChallengesRepository::new(),
            directory,
            policy,
        }
    }

    fn instructions(challenge: &VerificationChallenge, lifetime: SignedDuration) -> String {
        format!(
            "Add {code} anywhere in the description of group {group}, then run the \
             verification check within {minutes} minutes.",
            code = challenge.code,
            group = challenge.group_id,
            minutes = lifetime.as_mins(),
        )
    }
}

#[async_trait]
impl OwnershipVerifier for PgOwnershipVerifier {
    async fn start(
        &self,
        tenant: &TenantId,
        group: GroupId,
        initiator: String,
        now: Timestamp,
    ) -> Result<StartedChallenge, VerificationError> {
        let mut tx = self.db.begin().await?;

        let link = self
            .links
            .lock_link(&mut tx, tenant)
            .await?
            .ok_or(VerificationError::LinkNotFound)?;

        if link.is_verified() {
            return Err(VerificationError::AlreadyVerified);
        }

        if link.group_id != group {
            return Err(VerificationError::GroupMismatch);
        }

        if let Some(existing) = self.challenges.lock_challenge(&mut tx, tenant).await? {
            if !existing.is_expired(now) && !existing.is_exhausted() {
                return Err(VerificationError::AlreadyPending);
            }

            self.challenges.delete_challenge(&mut tx, tenant).await?;
        }

        let code = generate_code(&mut rand::thread_rng());

        let challenge = VerificationChallenge {
            tenant_id: tenant.clone(),
            group_id: group,
            code,
            initiator,
            created_at: now,
            expires_at: now.checked_add(self.policy.lifetime)?,
            attempts: 0,
            max_attempts: self.policy.max_attempts,
            verified: false,
        };

        let challenge = self.challenges.insert_challenge(&mut tx, &challenge).await?;

        self.links
            .set_verification_status(&mut tx, tenant, VerificationStatus::Pending, None)
            .await?;

        tx.commit().await?;

        info!(
            tenant = %tenant,
            group = %group,
            initiator = %challenge.initiator,
            "ownership verification started"
        );

        let instructions = Self::instructions(&challenge, self.policy.lifetime);

        Ok(StartedChallenge {
            challenge,
            instructions,
        })
    }

    async fn check(
        &self,
        tenant: &TenantId,
        now: Timestamp,
    ) -> Result<CheckOutcome, VerificationError> {
        let mut tx = self.db.begin().await?;

        let challenge = self
            .challenges
            .lock_challenge(&mut tx, tenant)
            .await?
            .ok_or(VerificationError::NoVerification)?;

        if challenge.is_exhausted() {
            return Ok(CheckOutcome::MaxAttempts);
        }

        if challenge.is_expired(now) {
            self.challenges.delete_challenge(&mut tx, tenant).await?;

            let link = self.links.get_link(&mut tx, tenant).await?;

            if !link.is_verified() {
                self.links
                    .set_verification_status(
                        &mut tx,
                        tenant,
                        VerificationStatus::VerificationFailed,
                        None,
                    )
                    .await?;
            }

            tx.commit().await?;

            info!(tenant = %tenant, "ownership verification expired");

            return Ok(CheckOutcome::Expired);
        }

        let challenge = self.challenges.record_attempt(&mut tx, tenant).await?;

        let description = self
            .directory
            .get_description(challenge.group_id, Freshness::Live)
            .await?;

        if description.contains(&challenge.code) {
            self.challenges.delete_challenge(&mut tx, tenant).await?;
            self.links
                .set_verification_status(&mut tx, tenant, VerificationStatus::Verified, Some(now))
                .await?;

            tx.commit().await?;

            info!(tenant = %tenant, attempts = challenge.attempts, "ownership verified");

            return Ok(CheckOutcome::Verified);
        }

        if challenge.is_exhausted() {
            self.links
                .set_verification_status(
                    &mut tx,
                    tenant,
                    VerificationStatus::VerificationFailed,
                    None,
                )
                .await?;

            tx.commit().await?;

            warn!(tenant = %tenant, "ownership verification out of attempts");

            return Ok(CheckOutcome::MaxAttempts);
        }

        tx.commit().await?;

        Ok(CheckOutcome::CodeNotFound {
            attempts_remaining: challenge.attempts_remaining(),
        })
    }

    async fn extend(
        &self,
        tenant: &TenantId,
        minutes: u32,
        now: Timestamp,
    ) -> Result<VerificationChallenge, VerificationError> {
        if minutes == 0 || minutes > self.policy.max_extension_minutes {
            return Err(VerificationError::InvalidExtension {
                max: self.policy.max_extension_minutes,
            });
        }

        let mut tx = self.db.begin().await?;

        let challenge = self
            .challenges
            .lock_challenge(&mut tx, tenant)
            .await?
            .ok_or(VerificationError::NoVerification)?;

        if challenge.verified || challenge.is_expired(now) || challenge.is_exhausted() {
            return Err(VerificationError::NotPending);
        }

        let expires_at = challenge
            .expires_at
            .checked_add(SignedDuration::from_mins(i64::from(minutes)))?;

        let extended = self
            .challenges
            .extend_challenge(&mut tx, tenant, expires_at)
            .await?;

        tx.commit().await?;

        Ok(extended)
    }

    async fn cancel(&self, tenant: &TenantId) -> Result<bool, VerificationError> {
        let mut tx = self.db.begin().await?;

        let deleted = self.challenges.delete_challenge(&mut tx, tenant).await?;

        tx.commit().await?;

        Ok(deleted > 0)
    }

    async fn status(
        &self,
        tenant: &TenantId,
    ) -> Result<Option<VerificationChallenge>, VerificationError> {
        let mut tx = self.db.begin().await?;

        let challenge = self.challenges.get_challenge(&mut tx, tenant).await?;

        tx.commit().await?;

        Ok(challenge)
    }
}

#[automock]
#[async_trait]
pub trait OwnershipVerifier: Send + Sync {
    /// Issue a new challenge for the tenant's group and reset the link to pending.
    async fn start(
        &self,
        tenant: &TenantId,
        group: GroupId,
        initiator: String,
        now: Timestamp,
    ) -> Result<StartedChallenge, VerificationError>;

    /// Look for the challenge code in the live group description.
    async fn check(
        &self,
        tenant: &TenantId,
        now: Timestamp,
    ) -> Result<CheckOutcome, VerificationError>;

    /// Push the expiry of a pending challenge back. Attempts are kept.
    async fn extend(
        &self,
        tenant: &TenantId,
        minutes: u32,
        now: Timestamp,
    ) -> Result<VerificationChallenge, VerificationError>;

    /// Drop the pending challenge, if any.
    async fn cancel(&self, tenant: &TenantId) -> Result<bool, VerificationError>;

    async fn status(
        &self,
        tenant: &TenantId,
    ) -> Result<Option<VerificationChallenge>, VerificationError>;
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use testresult::TestResult;

    use crate::{
        directory::{DirectoryError, MockDirectoryService},
        domain::links::LinksService,
        test::{TestContext, helpers::new_link},
    };

    use super::*;

    const GROUP: GroupId = GroupId(77);

    async fn setup(ctx: &TestContext) -> TestResult<TenantId> {
        ctx.links.create_link(new_link("guild-1", 77, &[1001])).await?;

        Ok(TenantId::from("guild-1"))
    }

    /// Directory whose description is whatever the shared cell holds.
    fn directory_with(description: Arc<Mutex<String>>) -> MockDirectoryService {
        let mut directory = MockDirectoryService::new();

        directory
            .expect_get_description()
            .withf(|group, freshness| *group == GROUP && *freshness == Freshness::Live)
            .returning(move |_, _| {
                Ok(description
                    .lock()
                    .map(|text| text.clone())
                    .unwrap_or_default())
            });

        directory
    }

    #[tokio::test]
    async fn check_finds_code_and_verifies_link() -> TestResult {
        let ctx = TestContext::new().await;
        let tenant = setup(&ctx).await?;
        let description = Arc::new(Mutex::new(String::new()));
        let verifier = ctx.verifier(directory_with(description.clone()));
        let now = Timestamp::now();

        let started = verifier
            .start(&tenant, GROUP, "owner#1".to_string(), now)
            .await?;

        assert!(started.challenge.code.starts_with("RSV-"));
        assert!(started.instructions.contains(&started.challenge.code));

        assert_eq!(
            verifier.check(&tenant, now).await?,
            CheckOutcome::CodeNotFound {
                attempts_remaining: 4
            }
        );

        if let Ok(mut text) = description.lock() {
            *text = format!("Welcome! {}", started.challenge.code);
        }

        assert_eq!(verifier.check(&tenant, now).await?, CheckOutcome::Verified);

        let link = ctx.links.get_link(&tenant).await?;

        assert!(link.is_verified());
        assert!(link.verified_at.is_some());
        assert!(verifier.status(&tenant).await?.is_none(), "challenge retired");

        Ok(())
    }

    #[tokio::test]
    async fn check_after_expiry_fails_even_when_code_is_present() -> TestResult {
        let ctx = TestContext::new().await;
        let tenant = setup(&ctx).await?;
        let mut directory = MockDirectoryService::new();
        directory.expect_get_description().never();
        let verifier = ctx.verifier(directory);
        let now = Timestamp::now();

        verifier
            .start(&tenant, GROUP, "owner#1".to_string(), now)
            .await?;

        let later = now.checked_add(SignedDuration::from_mins(11))?;

        assert_eq!(verifier.check(&tenant, later).await?, CheckOutcome::Expired);
        assert!(verifier.status(&tenant).await?.is_none(), "challenge cleared");
        assert_eq!(
            ctx.links.get_link(&tenant).await?.verification_status,
            VerificationStatus::VerificationFailed
        );
        assert!(matches!(
            verifier.check(&tenant, later).await,
            Err(VerificationError::NoVerification)
        ));

        Ok(())
    }

    #[tokio::test]
    async fn five_failed_checks_exhaust_the_challenge() -> TestResult {
        let ctx = TestContext::new().await;
        let tenant = setup(&ctx).await?;
        let verifier = ctx.verifier(directory_with(Arc::new(Mutex::new(
            "nothing here".to_string(),
        ))));
        let now = Timestamp::now();

        verifier
            .start(&tenant, GROUP, "owner#1".to_string(), now)
            .await?;

        let mut outcomes = Vec::new();

        for _ in 0..6 {
            outcomes.push(verifier.check(&tenant, now).await?);
        }

        assert_eq!(
            outcomes,
            vec![
                CheckOutcome::CodeNotFound {
                    attempts_remaining: 4
                },
                CheckOutcome::CodeNotFound {
                    attempts_remaining: 3
                },
                CheckOutcome::CodeNotFound {
                    attempts_remaining: 2
                },
                CheckOutcome::CodeNotFound {
                    attempts_remaining: 1
                },
                CheckOutcome::MaxAttempts,
                CheckOutcome::MaxAttempts,
            ]
        );
        assert_eq!(
            ctx.links.get_link(&tenant).await?.verification_status,
            VerificationStatus::VerificationFailed
        );

        // An exhausted challenge can be replaced.
        verifier
            .start(&tenant, GROUP, "owner#1".to_string(), now)
            .await?;

        Ok(())
    }

    #[tokio::test]
    async fn exhausted_challenge_reports_max_attempts_after_expiry() -> TestResult {
        let ctx = TestContext::new().await;
        let tenant = setup(&ctx).await?;
        let mut directory = MockDirectoryService::new();
        directory
            .expect_get_description()
            .times(5)
            .returning(|_, _| Ok("nothing here".to_string()));
        let verifier = ctx.verifier(directory);
        let now = Timestamp::now();

        verifier
            .start(&tenant, GROUP, "owner#1".to_string(), now)
            .await?;

        for _ in 0..5 {
            verifier.check(&tenant, now).await?;
        }

        let later = now.checked_add(SignedDuration::from_mins(11))?;

        assert_eq!(verifier.check(&tenant, later).await?, CheckOutcome::MaxAttempts);
        assert_eq!(verifier.check(&tenant, later).await?, CheckOutcome::MaxAttempts);
        assert!(
            verifier.status(&tenant).await?.is_some(),
            "exhausted challenge is kept until restarted or cancelled"
        );
        assert_eq!(
            ctx.links.get_link(&tenant).await?.verification_status,
            VerificationStatus::VerificationFailed
        );

        Ok(())
    }

    #[tokio::test]
    async fn start_rejects_second_pending_challenge_and_unknown_links() -> TestResult {
        let ctx = TestContext::new().await;
        let tenant = setup(&ctx).await?;
        let verifier = ctx.verifier(MockDirectoryService::new());
        let now = Timestamp::now();

        verifier
            .start(&tenant, GROUP, "owner#1".to_string(), now)
            .await?;

        assert!(matches!(
            verifier
                .start(&tenant, GROUP, "owner#1".to_string(), now)
                .await,
            Err(VerificationError::AlreadyPending)
        ));
        assert!(matches!(
            verifier
                .start(&TenantId::from("other"), GROUP, "x".to_string(), now)
                .await,
            Err(VerificationError::LinkNotFound)
        ));
        assert!(matches!(
            verifier.start(&tenant, GroupId(1), "x".to_string(), now).await,
            Err(VerificationError::GroupMismatch)
        ));

        Ok(())
    }

    #[tokio::test]
    async fn extend_pushes_expiry_without_resetting_attempts() -> TestResult {
        let ctx = TestContext::new().await;
        let tenant = setup(&ctx).await?;
        let verifier = ctx.verifier(directory_with(Arc::new(Mutex::new(String::new()))));
        let now = Timestamp::now();

        let started = verifier
            .start(&tenant, GROUP, "owner#1".to_string(), now)
            .await?;
        verifier.check(&tenant, now).await?;

        let extended = verifier.extend(&tenant, 15, now).await?;

        assert_eq!(
            extended.expires_at.duration_since(started.challenge.expires_at),
            SignedDuration::from_mins(15)
        );
        assert_eq!(extended.attempts, 1);

        assert!(matches!(
            verifier.extend(&tenant, 31, now).await,
            Err(VerificationError::InvalidExtension { max: 30 })
        ));
        assert!(matches!(
            verifier.extend(&tenant, 0, now).await,
            Err(VerificationError::InvalidExtension { .. })
        ));

        // 10 + 15 minutes have not passed at minute 20.
        let later = now.checked_add(SignedDuration::from_mins(20))?;

        assert_eq!(
            verifier.check(&tenant, later).await?,
            CheckOutcome::CodeNotFound {
                attempts_remaining: 3
            }
        );

        Ok(())
    }

    #[tokio::test]
    async fn directory_failure_does_not_consume_an_attempt() -> TestResult {
        let ctx = TestContext::new().await;
        let tenant = setup(&ctx).await?;
        let mut directory = MockDirectoryService::new();
        directory
            .expect_get_description()
            .once()
            .return_once(|_, _| Err(DirectoryError::Timeout));
        let verifier = ctx.verifier(directory);
        let now = Timestamp::now();

        verifier
            .start(&tenant, GROUP, "owner#1".to_string(), now)
            .await?;

        assert!(matches!(
            verifier.check(&tenant, now).await,
            Err(VerificationError::Directory(DirectoryError::Timeout))
        ));
        assert_eq!(
            verifier.status(&tenant).await?.map(|challenge| challenge.attempts),
            Some(0)
        );

        Ok(())
    }

    #[tokio::test]
    async fn cancel_removes_pending_challenge() -> TestResult {
        let ctx = TestContext::new().await;
        let tenant = setup(&ctx).await?;
        let verifier = ctx.verifier(MockDirectoryService::new());

        verifier
            .start(&tenant, GROUP, "owner#1".to_string(), Timestamp::now())
            .await?;

        assert!(verifier.cancel(&tenant).await?);
        assert!(!verifier.cancel(&tenant).await?);
        assert!(matches!(
            verifier.check(&tenant, Timestamp::now()).await,
            Err(VerificationError::NoVerification)
        ));

        Ok(())
    }
}
