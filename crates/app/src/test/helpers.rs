//! Test Helpers

use std::collections::BTreeMap;

use jiff::Timestamp;

use crate::domain::{
    identifiers::{GroupId, Rank, ResourceId, SubjectId, TenantId},
    links::{data::NewLink, records::LinkTunables},
    submissions::{data::NewSubmission, records::SubmissionUuid},
    sync::{data::NewSyncJob, records::JobOrigin},
    templates::{data::NewTemplate, records::TemplateUuid},
};

/// Current time at the microsecond precision Postgres stores.
pub(crate) fn db_now() -> Result<Timestamp, jiff::Error> {
    Timestamp::from_microsecond(Timestamp::now().as_microsecond())
}

pub(crate) fn new_link(tenant: &str, group: u64, resources: &[u64]) -> NewLink {
    NewLink {
        tenant_id: TenantId::from(tenant),
        group_id: GroupId(group),
        resource_ids: resources.iter().copied().map(ResourceId).collect(),
        tunables: LinkTunables::default(),
    }
}

pub(crate) fn new_template(name: &str, approval_rank: Option<Rank>, cooldown: u32) -> NewTemplate {
    NewTemplate {
        uuid: TemplateUuid::new(),
        name: name.to_string(),
        description: format!("{name} requests"),
        questions: vec!["Why?".to_string(), "How long?".to_string()],
        approval_rank,
        cooldown_minutes: cooldown,
    }
}

pub(crate) fn new_job(tenant: &str, subject: u64, rank: u8, priority: i32) -> NewSyncJob {
    NewSyncJob {
        tenant_id: TenantId::from(tenant),
        subject_id: SubjectId(subject),
        target_rank: Rank(rank),
        priority,
        origin: JobOrigin::manual("test"),
    }
}

/// Submission answering every question of [`new_template`].
pub(crate) fn new_submission(template: TemplateUuid, subject: u64) -> NewSubmission {
    NewSubmission {
        uuid: SubmissionUuid::new(),
        template_uuid: template,
        resource_id: ResourceId(1),
        subject_id: SubjectId(subject),
        subject_name: format!("subject-{subject}"),
        answers: BTreeMap::from([
            ("Why?".to_string(), "Because".to_string()),
            ("How long?".to_string(), "Two years".to_string()),
        ]),
    }
}
