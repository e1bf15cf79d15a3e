//! Templates Repository

use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query_as};
use uuid::Uuid;

use crate::domain::{
    identifiers::{Rank, TenantId, decode_error},
    templates::{
        data::NewTemplate,
        records::{DecisionTemplate, TemplateUuid},
    },
};

const CREATE_TEMPLATE_SQL: &str = include_str!("sql/create_template.sql");
const GET_TEMPLATE_SQL: &str = include_str!("sql/get_template.sql");
const LIST_TEMPLATES_SQL: &str = include_str!("sql/list_templates.sql");
const LIST_ENABLED_TEMPLATES_SQL: &str = include_str!("sql/list_enabled_templates.sql");
const SET_ACTIVE_SQL: &str = include_str!("sql/set_active.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgTemplatesRepository;

impl PgTemplatesRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn create_template(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant: &TenantId,
        template: &NewTemplate,
        cooldown_minutes: i32,
    ) -> Result<DecisionTemplate, sqlx::Error> {
        query_as::<Postgres, DecisionTemplate>(CREATE_TEMPLATE_SQL)
            .bind(template.uuid.into_uuid())
            .bind(tenant.as_str())
            .bind(&template.name)
            .bind(&template.description)
            .bind(&template.questions)
            .bind(template.approval_rank.map(Rank::to_i16))
            .bind(cooldown_minutes)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn get_template(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant: &TenantId,
        template: TemplateUuid,
    ) -> Result<DecisionTemplate, sqlx::Error> {
        query_as::<Postgres, DecisionTemplate>(GET_TEMPLATE_SQL)
            .bind(tenant.as_str())
            .bind(template.into_uuid())
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn find_template(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant: &TenantId,
        template: TemplateUuid,
    ) -> Result<Option<DecisionTemplate>, sqlx::Error> {
        query_as::<Postgres, DecisionTemplate>(GET_TEMPLATE_SQL)
            .bind(tenant.as_str())
            .bind(template.into_uuid())
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn list_templates(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant: &TenantId,
    ) -> Result<Vec<DecisionTemplate>, sqlx::Error> {
        query_as::<Postgres, DecisionTemplate>(LIST_TEMPLATES_SQL)
            .bind(tenant.as_str())
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn list_enabled_templates(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant: &TenantId,
        enabled: &[TemplateUuid],
    ) -> Result<Vec<DecisionTemplate>, sqlx::Error> {
        let enabled: Vec<Uuid> = enabled.iter().map(|uuid| uuid.into_uuid()).collect();

        query_as::<Postgres, DecisionTemplate>(LIST_ENABLED_TEMPLATES_SQL)
            .bind(tenant.as_str())
            .bind(enabled)
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn set_active(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant: &TenantId,
        template: TemplateUuid,
        active: bool,
    ) -> Result<DecisionTemplate, sqlx::Error> {
        query_as::<Postgres, DecisionTemplate>(SET_ACTIVE_SQL)
            .bind(tenant.as_str())
            .bind(template.into_uuid())
            .bind(active)
            .fetch_one(&mut **tx)
            .await
    }
}

impl<'r> FromRow<'r, PgRow> for DecisionTemplate {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let cooldown_minutes: i32 = row.try_get("cooldown_minutes")?;

        Ok(Self {
            uuid: TemplateUuid::from_uuid(row.try_get("uuid")?),
            tenant_id: TenantId::new(row.try_get::<String, _>("tenant_id")?),
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            questions: row.try_get("questions")?,
            approval_rank: row
                .try_get::<Option<i16>, _>("approval_rank")?
                .map(Rank::from_i16)
                .transpose()
                .map_err(|e| decode_error("approval_rank", e))?,
            cooldown_minutes: u32::try_from(cooldown_minutes)
                .map_err(|e| decode_error("cooldown_minutes", e))?,
            active: row.try_get("active")?,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}
