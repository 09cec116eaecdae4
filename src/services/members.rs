//! Member management service

use validator::Validate;

use super::{optional_text, required_text};
use crate::{
    error::AppResult,
    models::member::{CreateMember, Member, MemberChanges, NewMember, UpdateMember},
    repository::Repository,
};

#[derive(Clone)]
pub struct MembersService {
    repository: Repository,
}

impl MembersService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list_members(&self) -> AppResult<Vec<Member>> {
        let mut tx = self.repository.begin().await?;
        let members = tx.list_members().await?;
        tx.commit().await?;
        Ok(members)
    }

    pub async fn get_member(&self, id: i32) -> AppResult<Member> {
        let mut tx = self.repository.begin().await?;
        let member = tx.get_member(id).await?;
        tx.commit().await?;
        Ok(member)
    }

    /// Register a member. Duplicate names and emails are allowed.
    pub async fn create_member(&self, data: CreateMember) -> AppResult<Member> {
        data.validate()?;
        let member = NewMember {
            name: required_text(data.name, "name")?,
            email: optional_text(data.email),
            phone: optional_text(data.phone),
        };

        let mut tx = self.repository.begin().await?;
        let created = tx.create_member(&member).await?;
        tx.commit().await?;

        tracing::info!(member_id = created.id, "Member created");
        Ok(created)
    }

    pub async fn update_member(&self, id: i32, data: UpdateMember) -> AppResult<Member> {
        data.validate()?;
        let changes = MemberChanges {
            name: data.name.map(|n| required_text(Some(n), "name")).transpose()?,
            email: data.email.map(optional_text),
            phone: data.phone.map(optional_text),
        };

        let mut tx = self.repository.begin().await?;
        let member = tx.update_member(id, &changes).await?;
        tx.commit().await?;

        tracing::info!(member_id = id, "Member updated");
        Ok(member)
    }

    /// Remove a member. Loans referencing them are kept.
    pub async fn delete_member(&self, id: i32) -> AppResult<()> {
        let mut tx = self.repository.begin().await?;
        tx.delete_member(id).await?;
        tx.commit().await?;

        tracing::info!(member_id = id, "Member deleted");
        Ok(())
    }
}
