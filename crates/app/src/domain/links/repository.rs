//! Links Repository

use jiff::Timestamp;
use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as};
use uuid::Uuid;

use crate::domain::{
    identifiers::{GroupId, ResourceId, TenantId, decode_error},
    links::{
        data::NewLink,
        records::{
            CredentialMetadata, LinkRecord, LinkTunables, StoredCredential, SyncCounters,
            VerificationStatus,
        },
    },
    templates::records::TemplateUuid,
};

const CREATE_LINK_SQL: &str = include_str!("sql/create_link.sql");
const GET_LINK_SQL: &str = include_str!("sql/get_link.sql");
const LOCK_LINK_SQL: &str = include_str!("sql/lock_link.sql");
const FIND_LINK_BY_CREDENTIAL_KEY_SQL: &str = include_str!("sql/find_link_by_credential_key.sql");
const SET_RESOURCES_SQL: &str = include_str!("sql/set_resources.sql");
const SET_ENABLED_TEMPLATES_SQL: &str = include_str!("sql/set_enabled_templates.sql");
const UPDATE_TUNABLES_SQL: &str = include_str!("sql/update_tunables.sql");
const SET_CREDENTIAL_SQL: &str = include_str!("sql/set_credential.sql");
const TOUCH_CREDENTIAL_SQL: &str = include_str!("sql/touch_credential.sql");
const SET_VERIFICATION_STATUS_SQL: &str = include_str!("sql/set_verification_status.sql");
const RECORD_SYNC_SUCCESS_SQL: &str = include_str!("sql/record_sync_success.sql");
const RECORD_SYNC_FAILURE_SQL: &str = include_str!("sql/record_sync_failure.sql");
const DELETE_LINK_SQL: &str = include_str!("sql/delete_link.sql");

/// A link together with the stored credential it was found by.
#[derive(Debug, Clone)]
pub(crate) struct CredentialLookup {
    pub link: LinkRecord,
    pub stored: StoredCredential,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct PgLinksRepository;

impl PgLinksRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn create_link(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        link: &NewLink,
    ) -> Result<LinkRecord, sqlx::Error> {
        let resource_ids = encode_resources(&link.resource_ids)?;

        query_as::<Postgres, LinkRecord>(CREATE_LINK_SQL)
            .bind(link.tenant_id.as_str())
            .bind(
                link.group_id
                    .to_i64()
                    .map_err(|source| decode_error("group_id", source))?,
            )
            .bind(resource_ids)
            .bind(encode_u32("rate_limit_window_seconds", link.tunables.rate_limit_window_seconds)?)
            .bind(encode_u32("rate_limit_max_requests", link.tunables.rate_limit_max_requests)?)
            .bind(link.tunables.auto_sync)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn get_link(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant: &TenantId,
    ) -> Result<LinkRecord, sqlx::Error> {
        query_as::<Postgres, LinkRecord>(GET_LINK_SQL)
            .bind(tenant.as_str())
            .fetch_one(&mut **tx)
            .await
    }

    /// Fetch the link and hold its row lock until the transaction ends.
    pub(crate) async fn lock_link(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant: &TenantId,
    ) -> Result<Option<LinkRecord>, sqlx::Error> {
        query_as::<Postgres, LinkRecord>(LOCK_LINK_SQL)
            .bind(tenant.as_str())
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn find_by_credential_key(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        key_id: Uuid,
    ) -> Result<Option<CredentialLookup>, sqlx::Error> {
        query_as::<Postgres, CredentialLookup>(FIND_LINK_BY_CREDENTIAL_KEY_SQL)
            .bind(key_id)
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn set_resources(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant: &TenantId,
        resources: &[ResourceId],
    ) -> Result<LinkRecord, sqlx::Error> {
        query_as::<Postgres, LinkRecord>(SET_RESOURCES_SQL)
            .bind(tenant.as_str())
            .bind(encode_resources(resources)?)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn set_enabled_templates(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant: &TenantId,
        templates: &[TemplateUuid],
    ) -> Result<LinkRecord, sqlx::Error> {
        let templates: Vec<Uuid> = templates.iter().map(|uuid| uuid.into_uuid()).collect();

        query_as::<Postgres, LinkRecord>(SET_ENABLED_TEMPLATES_SQL)
            .bind(tenant.as_str())
            .bind(templates)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn update_tunables(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant: &TenantId,
        tunables: LinkTunables,
    ) -> Result<LinkRecord, sqlx::Error> {
        query_as::<Postgres, LinkRecord>(UPDATE_TUNABLES_SQL)
            .bind(tenant.as_str())
            .bind(encode_u32("rate_limit_window_seconds", tunables.rate_limit_window_seconds)?)
            .bind(encode_u32("rate_limit_max_requests", tunables.rate_limit_max_requests)?)
            .bind(tunables.auto_sync)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn set_credential(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant: &TenantId,
        credential: &StoredCredential,
        issued_at: Timestamp,
    ) -> Result<LinkRecord, sqlx::Error> {
        query_as::<Postgres, LinkRecord>(SET_CREDENTIAL_SQL)
            .bind(tenant.as_str())
            .bind(credential.key_id)
            .bind(&credential.salt)
            .bind(&credential.hash)
            .bind(SqlxTimestamp::from(issued_at))
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn touch_credential(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant: &TenantId,
        used_at: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(TOUCH_CREDENTIAL_SQL)
            .bind(tenant.as_str())
            .bind(SqlxTimestamp::from(used_at))
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    pub(crate) async fn set_verification_status(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant: &TenantId,
        status: VerificationStatus,
        verified_at: Option<Timestamp>,
    ) -> Result<LinkRecord, sqlx::Error> {
        query_as::<Postgres, LinkRecord>(SET_VERIFICATION_STATUS_SQL)
            .bind(tenant.as_str())
            .bind(status.as_str())
            .bind(verified_at.map(SqlxTimestamp::from))
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn record_sync_success(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant: &TenantId,
        at: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(RECORD_SYNC_SUCCESS_SQL)
            .bind(tenant.as_str())
            .bind(SqlxTimestamp::from(at))
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    pub(crate) async fn record_sync_failure(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant: &TenantId,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(RECORD_SYNC_FAILURE_SQL)
            .bind(tenant.as_str())
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    pub(crate) async fn delete_link(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant: &TenantId,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(DELETE_LINK_SQL)
            .bind(tenant.as_str())
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }
}

fn encode_resources(resources: &[ResourceId]) -> Result<Vec<i64>, sqlx::Error> {
    resources
        .iter()
        .map(|resource| {
            resource
                .to_i64()
                .map_err(|source| decode_error("resource_ids", source))
        })
        .collect()
}

fn encode_u32(column: &str, value: u32) -> Result<i32, sqlx::Error> {
    i32::try_from(value).map_err(|source| decode_error(column, source))
}

fn decode_u32(row: &PgRow, column: &str) -> sqlx::Result<u32> {
    let value: i32 = row.try_get(column)?;

    u32::try_from(value).map_err(|source| decode_error(column, source))
}

fn decode_u64(row: &PgRow, column: &str) -> sqlx::Result<u64> {
    let value: i64 = row.try_get(column)?;

    u64::try_from(value).map_err(|source| decode_error(column, source))
}

impl<'r> FromRow<'r, PgRow> for LinkRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let status: String = row.try_get("verification_status")?;

        let verification_status =
            status
                .parse::<VerificationStatus>()
                .map_err(|message| sqlx::Error::ColumnDecode {
                    index: "verification_status".to_string(),
                    source: message.into(),
                })?;

        let resource_ids = row
            .try_get::<Vec<i64>, _>("resource_ids")?
            .into_iter()
            .map(|value| ResourceId::from_i64(value).map_err(|e| decode_error("resource_ids", e)))
            .collect::<sqlx::Result<Vec<_>>>()?;

        let credential = match (
            row.try_get::<Option<Uuid>, _>("credential_key_id")?,
            row.try_get::<Option<SqlxTimestamp>, _>("credential_issued_at")?,
        ) {
            (Some(key_id), Some(issued_at)) => Some(CredentialMetadata {
                key_id,
                issued_at: issued_at.to_jiff(),
                last_used_at: row
                    .try_get::<Option<SqlxTimestamp>, _>("credential_last_used_at")?
                    .map(SqlxTimestamp::to_jiff),
            }),
            _ => None,
        };

        Ok(Self {
            tenant_id: TenantId::new(row.try_get::<String, _>("tenant_id")?),
            group_id: GroupId::from_i64(row.try_get("group_id")?)
                .map_err(|e| decode_error("group_id", e))?,
            resource_ids,
            credential,
            verification_status,
            verified_at: row
                .try_get::<Option<SqlxTimestamp>, _>("verified_at")?
                .map(SqlxTimestamp::to_jiff),
            enabled_templates: row
                .try_get::<Vec<Uuid>, _>("enabled_templates")?
                .into_iter()
                .map(TemplateUuid::from_uuid)
                .collect(),
            tunables: LinkTunables {
                rate_limit_window_seconds: decode_u32(row, "rate_limit_window_seconds")?,
                rate_limit_max_requests: decode_u32(row, "rate_limit_max_requests")?,
                auto_sync: row.try_get("auto_sync")?,
            },
            counters: SyncCounters {
                total_syncs: decode_u64(row, "total_syncs")?,
                failed_syncs: decode_u64(row, "failed_syncs")?,
                last_sync_at: row
                    .try_get::<Option<SqlxTimestamp>, _>("last_sync_at")?
                    .map(SqlxTimestamp::to_jiff),
            },
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}

impl<'r> FromRow<'r, PgRow> for CredentialLookup {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            link: LinkRecord::from_row(row)?,
            stored: StoredCredential {
                key_id: row.try_get("credential_key_id")?,
                salt: row.try_get("credential_salt")?,
                hash: row.try_get("credential_hash")?,
            },
        })
    }
}
