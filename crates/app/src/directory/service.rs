//! Directory service trait.

use async_trait::async_trait;
use mockall::automock;

use crate::{
    directory::{
        errors::DirectoryError,
        models::{DirectoryRole, Freshness},
    },
    domain::identifiers::{GroupId, RoleId, SubjectId},
};

#[automock]
#[async_trait]
pub trait DirectoryService: Send + Sync {
    /// Role catalog of the group.
    async fn list_roles(
        &self,
        group: GroupId,
        freshness: Freshness,
    ) -> Result<Vec<DirectoryRole>, DirectoryError>;

    /// Current role of a member. Fails with `NotMember` for non-members.
    async fn get_user_role(
        &self,
        group: GroupId,
        subject: SubjectId,
    ) -> Result<DirectoryRole, DirectoryError>;

    async fn set_user_role(
        &self,
        group: GroupId,
        subject: SubjectId,
        role: RoleId,
    ) -> Result<(), DirectoryError>;

    /// Free-text description of the group.
    async fn get_description(
        &self,
        group: GroupId,
        freshness: Freshness,
    ) -> Result<String, DirectoryError>;

    async fn set_description(&self, group: GroupId, description: String)
    -> Result<(), DirectoryError>;
}
