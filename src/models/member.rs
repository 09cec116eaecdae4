//! Library member model

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Member record. Names and emails are not unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Member {
    pub id: i32,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Create member request
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct CreateMember {
    #[validate(length(max = 255, message = "name must be at most 255 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 255, message = "email must be at most 255 characters"))]
    pub email: Option<String>,
    #[validate(length(max = 64, message = "phone must be at most 64 characters"))]
    pub phone: Option<String>,
}

/// Update member request; absent fields are left unchanged, `null` clears email/phone
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateMember {
    #[validate(length(max = 255, message = "name must be at most 255 characters"))]
    pub name: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    #[validate(length(max = 255, message = "email must be at most 255 characters"))]
    pub email: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    #[validate(length(max = 64, message = "phone must be at most 64 characters"))]
    pub phone: Option<Option<String>>,
}

/// Validated member ready for insertion
#[derive(Debug, Clone)]
pub struct NewMember {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct MemberChanges {
    pub name: Option<String>,
    pub email: Option<Option<String>>,
    pub phone: Option<Option<String>>,
}

impl MemberChanges {
    pub fn apply(&self, member: &mut Member) {
        if let Some(ref name) = self.name {
            member.name = name.clone();
        }
        if let Some(ref email) = self.email {
            member.email = email.clone();
        }
        if let Some(ref phone) = self.phone {
            member.phone = phone.clone();
        }
    }
}
