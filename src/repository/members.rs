//! Member store

use async_trait::async_trait;

use super::postgres::PgTx;
use crate::{
    error::{AppError, AppResult},
    models::member::{Member, MemberChanges, NewMember},
};

pub(crate) fn member_not_found(id: i32) -> AppError {
    AppError::NotFound(format!("Member with id {} not found", id))
}

#[async_trait]
pub trait MemberStore: Send {
    async fn list_members(&mut self) -> AppResult<Vec<Member>>;

    async fn get_member(&mut self, id: i32) -> AppResult<Member>;

    async fn create_member(&mut self, member: &NewMember) -> AppResult<Member>;

    async fn update_member(&mut self, id: i32, changes: &MemberChanges) -> AppResult<Member>;

    async fn delete_member(&mut self, id: i32) -> AppResult<()>;
}

#[async_trait]
impl MemberStore for PgTx {
    async fn list_members(&mut self) -> AppResult<Vec<Member>> {
        let members = sqlx::query_as::<_, Member>("SELECT * FROM members ORDER BY id")
            .fetch_all(self.conn()?)
            .await?;
        Ok(members)
    }

    async fn get_member(&mut self, id: i32) -> AppResult<Member> {
        sqlx::query_as::<_, Member>("SELECT * FROM members WHERE id = $1")
            .bind(id)
            .fetch_optional(self.conn()?)
            .await?
            .ok_or_else(|| member_not_found(id))
    }

    async fn create_member(&mut self, member: &NewMember) -> AppResult<Member> {
        let row = sqlx::query_as::<_, Member>(
            "INSERT INTO members (name, email, phone) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(&member.name)
        .bind(&member.email)
        .bind(&member.phone)
        .fetch_one(self.conn()?)
        .await?;
        Ok(row)
    }

    async fn update_member(&mut self, id: i32, changes: &MemberChanges) -> AppResult<Member> {
        sqlx::query_as::<_, Member>(
            r#"
            UPDATE members SET
                name = COALESCE($2, name),
                email = CASE WHEN $3 THEN $4 ELSE email END,
                phone = CASE WHEN $5 THEN $6 ELSE phone END
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&changes.name)
        .bind(changes.email.is_some())
        .bind(changes.email.clone().flatten())
        .bind(changes.phone.is_some())
        .bind(changes.phone.clone().flatten())
        .fetch_optional(self.conn()?)
        .await?
        .ok_or_else(|| member_not_found(id))
    }

    async fn delete_member(&mut self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM members WHERE id = $1")
            .bind(id)
            .execute(self.conn()?)
            .await?;
        if result.rows_affected() == 0 {
            return Err(member_not_found(id));
        }
        Ok(())
    }
}
