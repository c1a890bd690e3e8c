//! Booking endpoints

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    error::{AppError, AppResult},
    models::booking::{BookingResponse, BookingState, CreateBooking},
    pagination::PageParams,
};

use super::{ApiPath, ApiQuery, SharerUserId, ValidatedJson};

const BOOKINGS_PAGE_SIZE: i64 = 10;

/// Booking listing query
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BookingListQuery {
    /// ALL, CURRENT, PAST, FUTURE, WAITING or REJECTED (default ALL)
    pub state: Option<String>,
    pub from: Option<i64>,
    pub size: Option<i64>,
}

impl BookingListQuery {
    fn state(&self) -> AppResult<BookingState> {
        match &self.state {
            Some(raw) => raw.parse(),
            None => Ok(BookingState::All),
        }
    }

    fn page_params(&self) -> PageParams {
        PageParams {
            from: self.from,
            size: self.size,
        }
    }
}

/// Approval decision query
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ApprovalQuery {
    pub approved: bool,
}

/// Request a booking
#[utoipa::path(
    post,
    path = "/bookings",
    tag = "bookings",
    params(
        ("X-Sharer-User-Id" = i64, Header, description = "Acting user")
    ),
    request_body = CreateBooking,
    responses(
        (status = 201, description = "Booking created", body = BookingResponse),
        (status = 400, description = "Invalid dates or unavailable item", body = crate::error::ErrorResponse),
        (status = 403, description = "Owner cannot book own item", body = crate::error::ErrorResponse),
        (status = 404, description = "User or item not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_booking(
    State(state): State<crate::AppState>,
    SharerUserId(user_id): SharerUserId,
    ValidatedJson(booking): ValidatedJson<CreateBooking>,
) -> AppResult<(StatusCode, Json<BookingResponse>)> {
    let (Some(item_id), Some(start), Some(end)) = (booking.item_id, booking.start, booking.end)
    else {
        return Err(AppError::Validation(
            "itemId, start and end must be set".to_string(),
        ));
    };

    let created = state
        .services
        .bookings
        .create_booking(user_id, item_id, start, end)
        .await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

/// Approve or reject a waiting booking
#[utoipa::path(
    patch,
    path = "/bookings/{id}",
    tag = "bookings",
    params(
        ("id" = i64, Path, description = "Booking ID"),
        ("X-Sharer-User-Id" = i64, Header, description = "Acting user"),
        ApprovalQuery
    ),
    responses(
        (status = 200, description = "Booking decided", body = BookingResponse),
        (status = 403, description = "Not the item owner", body = crate::error::ErrorResponse),
        (status = 404, description = "Booking not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Booking already decided", body = crate::error::ErrorResponse)
    )
)]
pub async fn confirm_booking(
    State(state): State<crate::AppState>,
    SharerUserId(user_id): SharerUserId,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(query): ApiQuery<ApprovalQuery>,
) -> AppResult<Json<BookingResponse>> {
    let booking = state
        .services
        .bookings
        .confirm_booking(user_id, id, query.approved)
        .await?;
    Ok(Json(booking.into()))
}

/// Get a booking as its booker or item owner
#[utoipa::path(
    get,
    path = "/bookings/{id}",
    tag = "bookings",
    params(
        ("id" = i64, Path, description = "Booking ID"),
        ("X-Sharer-User-Id" = i64, Header, description = "Acting user")
    ),
    responses(
        (status = 200, description = "Booking", body = BookingResponse),
        (status = 403, description = "Neither booker nor owner", body = crate::error::ErrorResponse),
        (status = 404, description = "Booking not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_booking(
    State(state): State<crate::AppState>,
    SharerUserId(user_id): SharerUserId,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<BookingResponse>> {
    let booking = state.services.bookings.get_booking(user_id, id).await?;
    Ok(Json(booking.into()))
}

/// Bookings made by the caller, newest start first
#[utoipa::path(
    get,
    path = "/bookings",
    tag = "bookings",
    params(
        ("X-Sharer-User-Id" = i64, Header, description = "Acting user"),
        BookingListQuery
    ),
    responses(
        (status = 200, description = "Bookings", body = Vec<BookingResponse>),
        (status = 400, description = "Unknown state", body = crate::error::ErrorResponse),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_bookings(
    State(state): State<crate::AppState>,
    SharerUserId(user_id): SharerUserId,
    ApiQuery(query): ApiQuery<BookingListQuery>,
) -> AppResult<Json<Vec<BookingResponse>>> {
    let booking_state = query.state()?;
    let page = query.page_params().page(BOOKINGS_PAGE_SIZE)?;
    let bookings = state
        .services
        .bookings
        .list_for_booker(user_id, booking_state, page)
        .await?;
    Ok(Json(bookings.into_iter().map(Into::into).collect()))
}

/// Bookings of the caller's items, newest start first
#[utoipa::path(
    get,
    path = "/bookings/owner",
    tag = "bookings",
    params(
        ("X-Sharer-User-Id" = i64, Header, description = "Acting user"),
        BookingListQuery
    ),
    responses(
        (status = 200, description = "Bookings", body = Vec<BookingResponse>),
        (status = 400, description = "Unknown state", body = crate::error::ErrorResponse),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_owner_bookings(
    State(state): State<crate::AppState>,
    SharerUserId(user_id): SharerUserId,
    ApiQuery(query): ApiQuery<BookingListQuery>,
) -> AppResult<Json<Vec<BookingResponse>>> {
    let booking_state = query.state()?;
    let page = query.page_params().page(BOOKINGS_PAGE_SIZE)?;
    let bookings = state
        .services
        .bookings
        .list_for_owner(user_id, booking_state, page)
        .await?;
    Ok(Json(bookings.into_iter().map(Into::into).collect()))
}
