//! Verification Challenges Repository

use jiff::Timestamp;
use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as};

use crate::domain::{
    identifiers::{GroupId, TenantId, decode_error},
    verification::records::VerificationChallenge,
};

const LOCK_CHALLENGE_SQL: &str = include_str!("sql/lock_challenge.sql");
const GET_CHALLENGE_SQL: &str = include_str!("sql/get_challenge.sql");
const INSERT_CHALLENGE_SQL: &str = include_str!("sql/insert_challenge.sql");
const RECORD_ATTEMPT_SQL: &str = include_str!("sql/record_attempt.sql");
const EXTEND_CHALLENGE_SQL: &str = include_str!("sql/extend_challenge.sql");
const DELETE_CHALLENGE_SQL: &str = include_str!("sql/delete_challenge.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgChallengesRepository;

impl PgChallengesRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn lock_challenge(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant: &TenantId,
    ) -> Result<Option<VerificationChallenge>, sqlx::Error> {
        query_as::<Postgres, VerificationChallenge>(LOCK_CHALLENGE_SQL)
            .bind(tenant.as_str())
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn get_challenge(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant: &TenantId,
    ) -> Result<Option<VerificationChallenge>, sqlx::Error> {
        query_as::<Postgres, VerificationChallenge>(GET_CHALLENGE_SQL)
            .bind(tenant.as_str())
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn insert_challenge(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        challenge: &VerificationChallenge,
    ) -> Result<VerificationChallenge, sqlx::Error> {
        let max_attempts = i32::try_from(challenge.max_attempts)
            .map_err(|e| decode_error("max_attempts", e))?;

        query_as::<Postgres, VerificationChallenge>(INSERT_CHALLENGE_SQL)
            .bind(challenge.tenant_id.as_str())
            .bind(
                challenge
                    .group_id
                    .to_i64()
                    .map_err(|e| decode_error("group_id", e))?,
            )
            .bind(&challenge.code)
            .bind(&challenge.initiator)
            .bind(SqlxTimestamp::from(challenge.created_at))
            .bind(SqlxTimestamp::from(challenge.expires_at))
            .bind(max_attempts)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn record_attempt(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant: &TenantId,
    ) -> Result<VerificationChallenge, sqlx::Error> {
        query_as::<Postgres, VerificationChallenge>(RECORD_ATTEMPT_SQL)
            .bind(tenant.as_str())
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn extend_challenge(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant: &TenantId,
        expires_at: Timestamp,
    ) -> Result<VerificationChallenge, sqlx::Error> {
        query_as::<Postgres, VerificationChallenge>(EXTEND_CHALLENGE_SQL)
            .bind(tenant.as_str())
            .bind(SqlxTimestamp::from(expires_at))
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn delete_challenge(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant: &TenantId,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(DELETE_CHALLENGE_SQL)
            .bind(tenant.as_str())
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }
}

impl<'r> FromRow<'r, PgRow> for VerificationChallenge {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let attempts: i32 = row.try_get("attempts")?;
        let max_attempts: i32 = row.try_get("max_attempts")?;

        Ok(Self {
            tenant_id: TenantId::new(row.try_get::<String, _>("tenant_id")?),
            group_id: GroupId::from_i64(row.try_get("group_id")?)
                .map_err(|e| decode_error("group_id", e))?,
            code: row.try_get("code")?,
            initiator: row.try_get("initiator")?,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            expires_at: row.try_get::<SqlxTimestamp, _>("expires_at")?.to_jiff(),
            attempts: u32::try_from(attempts).map_err(|e| decode_error("attempts", e))?,
            max_attempts: u32::try_from(max_attempts)
                .map_err(|e| decode_error("max_attempts", e))?,
            verified: row.try_get("verified")?,
        })
    }
}
