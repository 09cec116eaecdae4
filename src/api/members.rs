//! Member endpoints

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};

use super::{DeleteResponse, JsonBody, PathParam};
use crate::{
    error::AppResult,
    models::member::{CreateMember, Member, UpdateMember},
    AppState,
};

/// List all members
#[utoipa::path(
    get,
    path = "/members",
    tag = "members",
    responses(
        (status = 200, description = "All members", body = Vec<Member>)
    )
)]
pub async fn list_members(State(state): State<AppState>) -> AppResult<Json<Vec<Member>>> {
    let members = state.services.members.list_members().await?;
    Ok(Json(members))
}

#[utoipa::path(
    get,
    path = "/members/{id}",
    tag = "members",
    params(("id" = i32, Path, description = "Member ID")),
    responses(
        (status = 200, description = "Member details", body = Member),
        (status = 404, description = "Member not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_member(
    State(state): State<AppState>,
    PathParam(id): PathParam<i32>,
) -> AppResult<Json<Member>> {
    let member = state.services.members.get_member(id).await?;
    Ok(Json(member))
}

#[utoipa::path(
    post,
    path = "/members",
    tag = "members",
    request_body = CreateMember,
    responses(
        (status = 201, description = "Member created", body = Member),
        (status = 400, description = "Missing name", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_member(
    State(state): State<AppState>,
    JsonBody(data): JsonBody<CreateMember>,
) -> AppResult<(StatusCode, Json<Member>)> {
    let member = state.services.members.create_member(data).await?;
    Ok((StatusCode::CREATED, Json(member)))
}

#[utoipa::path(
    put,
    path = "/members/{id}",
    tag = "members",
    params(("id" = i32, Path, description = "Member ID")),
    request_body = UpdateMember,
    responses(
        (status = 200, description = "Member updated", body = Member),
        (status = 404, description = "Member not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_member(
    State(state): State<AppState>,
    PathParam(id): PathParam<i32>,
    JsonBody(data): JsonBody<UpdateMember>,
) -> AppResult<Json<Member>> {
    let member = state.services.members.update_member(id, data).await?;
    Ok(Json(member))
}

#[utoipa::path(
    delete,
    path = "/members/{id}",
    tag = "members",
    params(("id" = i32, Path, description = "Member ID")),
    responses(
        (status = 200, description = "Member deleted", body = DeleteResponse),
        (status = 404, description = "Member not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_member(
    State(state): State<AppState>,
    PathParam(id): PathParam<i32>,
) -> AppResult<Json<DeleteResponse>> {
    state.services.members.delete_member(id).await?;
    Ok(Json(DeleteResponse { success: true }))
}
