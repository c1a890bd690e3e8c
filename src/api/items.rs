//! Item catalog endpoints

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    error::AppResult,
    models::{
        comment::{Comment, CreateComment},
        item::{CreateItem, Item, ItemDetails, UpdateItem},
    },
    pagination::PageParams,
};

use super::{ApiPath, ApiQuery, SharerUserId, ValidatedJson};

/// Default page length of the item listings
const ITEMS_PAGE_SIZE: i64 = 20;

/// Text search query
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Text to look for in names and descriptions
    pub text: Option<String>,
    pub from: Option<i64>,
    pub size: Option<i64>,
}

/// List the caller's items with their bookings and comments
#[utoipa::path(
    get,
    path = "/items",
    tag = "items",
    params(
        ("X-Sharer-User-Id" = i64, Header, description = "Acting user"),
        PageParams
    ),
    responses(
        (status = 200, description = "Owned items", body = Vec<ItemDetails>),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Invalid pagination", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_items(
    State(state): State<crate::AppState>,
    SharerUserId(user_id): SharerUserId,
    ApiQuery(params): ApiQuery<PageParams>,
) -> AppResult<Json<Vec<ItemDetails>>> {
    let page = params.page(ITEMS_PAGE_SIZE)?;
    let items = state.services.catalog.list_by_owner(user_id, page).await?;
    Ok(Json(items))
}

/// Search available items by text
#[utoipa::path(
    get,
    path = "/items/search",
    tag = "items",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching items", body = Vec<Item>),
        (status = 409, description = "Invalid pagination", body = crate::error::ErrorResponse)
    )
)]
pub async fn search_items(
    State(state): State<crate::AppState>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> AppResult<Json<Vec<Item>>> {
    let page = PageParams {
        from: query.from,
        size: query.size,
    }
    .page(ITEMS_PAGE_SIZE)?;
    let text = query.text.unwrap_or_default();
    let items = state.services.catalog.search(&text, page).await?;
    Ok(Json(items))
}

/// Get an item; bookings are only shown to its owner
#[utoipa::path(
    get,
    path = "/items/{id}",
    tag = "items",
    params(
        ("id" = i64, Path, description = "Item ID"),
        ("X-Sharer-User-Id" = i64, Header, description = "Acting user")
    ),
    responses(
        (status = 200, description = "Item details", body = ItemDetails),
        (status = 404, description = "Item not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_item(
    State(state): State<crate::AppState>,
    SharerUserId(user_id): SharerUserId,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<ItemDetails>> {
    let item = state.services.catalog.get_item(id, user_id).await?;
    Ok(Json(item))
}

/// List a new item
#[utoipa::path(
    post,
    path = "/items",
    tag = "items",
    params(
        ("X-Sharer-User-Id" = i64, Header, description = "Acting user")
    ),
    request_body = CreateItem,
    responses(
        (status = 201, description = "Item created", body = Item),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 404, description = "Owner or request not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_item(
    State(state): State<crate::AppState>,
    SharerUserId(user_id): SharerUserId,
    ValidatedJson(item): ValidatedJson<CreateItem>,
) -> AppResult<(StatusCode, Json<Item>)> {
    let created = state.services.catalog.create_item(user_id, item).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update the fields present in the body
#[utoipa::path(
    patch,
    path = "/items/{id}",
    tag = "items",
    params(
        ("id" = i64, Path, description = "Item ID"),
        ("X-Sharer-User-Id" = i64, Header, description = "Acting user")
    ),
    request_body = UpdateItem,
    responses(
        (status = 200, description = "Item updated", body = Item),
        (status = 403, description = "Not the owner", body = crate::error::ErrorResponse),
        (status = 404, description = "Item not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_item(
    State(state): State<crate::AppState>,
    SharerUserId(user_id): SharerUserId,
    ApiPath(id): ApiPath<i64>,
    ValidatedJson(patch): ValidatedJson<UpdateItem>,
) -> AppResult<Json<Item>> {
    let updated = state.services.catalog.update_item(user_id, id, patch).await?;
    Ok(Json(updated))
}

/// Delete an item with its bookings and comments
#[utoipa::path(
    delete,
    path = "/items/{id}",
    tag = "items",
    params(
        ("id" = i64, Path, description = "Item ID"),
        ("X-Sharer-User-Id" = i64, Header, description = "Acting user")
    ),
    responses(
        (status = 200, description = "Item deleted"),
        (status = 403, description = "Not the owner", body = crate::error::ErrorResponse),
        (status = 404, description = "Item not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_item(
    State(state): State<crate::AppState>,
    SharerUserId(user_id): SharerUserId,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<StatusCode> {
    state.services.catalog.delete_item(user_id, id).await?;
    Ok(StatusCode::OK)
}

/// Comment on an item after a completed booking
#[utoipa::path(
    post,
    path = "/items/{id}/comment",
    tag = "items",
    params(
        ("id" = i64, Path, description = "Item ID"),
        ("X-Sharer-User-Id" = i64, Header, description = "Acting user")
    ),
    request_body = CreateComment,
    responses(
        (status = 201, description = "Comment added", body = Comment),
        (status = 400, description = "No completed booking or blank text", body = crate::error::ErrorResponse),
        (status = 404, description = "Item or user not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn add_comment(
    State(state): State<crate::AppState>,
    SharerUserId(user_id): SharerUserId,
    ApiPath(id): ApiPath<i64>,
    ValidatedJson(comment): ValidatedJson<CreateComment>,
) -> AppResult<(StatusCode, Json<Comment>)> {
    let created = state.services.catalog.add_comment(user_id, id, comment).await?;
    Ok((StatusCode::CREATED, Json(created)))
}
