//! Member roster endpoints (administrators only)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::member::{CreateMember, Member, MemberQuery, UpdateMember},
    AppState,
};

use super::{AdminUser, PaginatedResponse};

/// List members
#[utoipa::path(
    get,
    path = "/members",
    tag = "members",
    security(("bearer_auth" = [])),
    params(MemberQuery),
    responses(
        (status = 200, description = "Members, ordered by id", body = PaginatedResponse<Member>),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Administrator privileges required")
    )
)]
pub async fn list_members(
    State(state): State<AppState>,
    AdminUser(_session): AdminUser,
    Query(query): Query<MemberQuery>,
) -> AppResult<Json<PaginatedResponse<Member>>> {
    let (members, total) = state.services.members.list_members(&query).await?;

    Ok(Json(PaginatedResponse {
        items: members,
        total,
        page: query.page(),
        per_page: query.per_page(),
    }))
}

/// Get member details by ID
#[utoipa::path(
    get,
    path = "/members/{id}",
    tag = "members",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Member ID")
    ),
    responses(
        (status = 200, description = "Member details", body = Member),
        (status = 404, description = "Member not found")
    )
)]
pub async fn get_member(
    State(state): State<AppState>,
    AdminUser(_session): AdminUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Member>> {
    let member = state.services.members.get_member(id).await?;
    Ok(Json(member))
}

/// Add a member
#[utoipa::path(
    post,
    path = "/members",
    tag = "members",
    security(("bearer_auth" = [])),
    request_body = CreateMember,
    responses(
        (status = 201, description = "Member added", body = Member),
        (status = 400, description = "Invalid form, every problem listed in details"),
        (status = 409, description = "A member with this name already exists")
    )
)]
pub async fn create_member(
    State(state): State<AppState>,
    AdminUser(_session): AdminUser,
    Json(member): Json<CreateMember>,
) -> AppResult<(StatusCode, Json<Member>)> {
    let created = state.services.members.add_member(member).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Edit a member
#[utoipa::path(
    put,
    path = "/members/{id}",
    tag = "members",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Member ID")
    ),
    request_body = UpdateMember,
    responses(
        (status = 200, description = "Member updated", body = Member),
        (status = 400, description = "Invalid form"),
        (status = 404, description = "Member not found"),
        (status = 422, description = "Would leave no administrator")
    )
)]
pub async fn update_member(
    State(state): State<AppState>,
    AdminUser(session): AdminUser,
    Path(id): Path<i32>,
    Json(member): Json<UpdateMember>,
) -> AppResult<Json<Member>> {
    let updated = state.services.members.edit_member(id, member, &session).await?;
    Ok(Json(updated))
}

/// Delete a member
#[utoipa::path(
    delete,
    path = "/members/{id}",
    tag = "members",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Member ID")
    ),
    responses(
        (status = 204, description = "Member deleted"),
        (status = 404, description = "Member not found"),
        (status = 422, description = "Own account or last administrator")
    )
)]
pub async fn delete_member(
    State(state): State<AppState>,
    AdminUser(session): AdminUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.members.delete_member(id, &session).await?;
    Ok(StatusCode::NO_CONTENT)
}
