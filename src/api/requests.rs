//! Item-request endpoints

use axum::{extract::State, http::StatusCode, Json};

use crate::{
    error::AppResult,
    models::request::{CreateItemRequest, ItemRequestDetails},
    pagination::PageParams,
};

use super::{ApiPath, ApiQuery, SharerUserId, ValidatedJson};

const REQUESTS_PAGE_SIZE: i64 = 10;

/// Post a request for an item nobody lists yet
#[utoipa::path(
    post,
    path = "/requests",
    tag = "requests",
    params(
        ("X-Sharer-User-Id" = i64, Header, description = "Acting user")
    ),
    request_body = CreateItemRequest,
    responses(
        (status = 201, description = "Request created", body = ItemRequestDetails),
        (status = 400, description = "Blank description", body = crate::error::ErrorResponse),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_request(
    State(state): State<crate::AppState>,
    SharerUserId(user_id): SharerUserId,
    ValidatedJson(request): ValidatedJson<CreateItemRequest>,
) -> AppResult<(StatusCode, Json<ItemRequestDetails>)> {
    let created = state.services.requests.create_request(user_id, request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// The caller's own requests with the items listed in answer
#[utoipa::path(
    get,
    path = "/requests",
    tag = "requests",
    params(
        ("X-Sharer-User-Id" = i64, Header, description = "Acting user")
    ),
    responses(
        (status = 200, description = "Own requests", body = Vec<ItemRequestDetails>),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_my_requests(
    State(state): State<crate::AppState>,
    SharerUserId(user_id): SharerUserId,
) -> AppResult<Json<Vec<ItemRequestDetails>>> {
    let requests = state.services.requests.list_mine(user_id).await?;
    Ok(Json(requests))
}

/// Requests posted by other users
#[utoipa::path(
    get,
    path = "/requests/all",
    tag = "requests",
    params(
        ("X-Sharer-User-Id" = i64, Header, description = "Acting user"),
        PageParams
    ),
    responses(
        (status = 200, description = "Other users' requests", body = Vec<ItemRequestDetails>),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Invalid pagination", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_other_requests(
    State(state): State<crate::AppState>,
    SharerUserId(user_id): SharerUserId,
    ApiQuery(params): ApiQuery<PageParams>,
) -> AppResult<Json<Vec<ItemRequestDetails>>> {
    let page = params.page(REQUESTS_PAGE_SIZE)?;
    let requests = state.services.requests.list_others(user_id, page).await?;
    Ok(Json(requests))
}

/// Get one request with its answering items
#[utoipa::path(
    get,
    path = "/requests/{id}",
    tag = "requests",
    params(
        ("id" = i64, Path, description = "Item request ID"),
        ("X-Sharer-User-Id" = i64, Header, description = "Acting user")
    ),
    responses(
        (status = 200, description = "Item request", body = ItemRequestDetails),
        (status = 404, description = "Request or user not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_request(
    State(state): State<crate::AppState>,
    SharerUserId(user_id): SharerUserId,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<ItemRequestDetails>> {
    let request = state.services.requests.get_request(id, user_id).await?;
    Ok(Json(request))
}
