//! Item (catalog entry) model and related types

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::booking::{Booking, BookingShort};
use super::comment::Comment;
use super::not_blank;

/// Rentable item listed by its owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    pub description: String,
    /// Only available items can be booked or found by search
    pub available: bool,
    /// Item request this item was listed in answer to
    pub request_id: Option<i64>,
}

/// Create item request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateItem {
    #[validate(custom(function = "not_blank"))]
    pub name: String,
    #[validate(custom(function = "not_blank"))]
    pub description: String,
    #[validate(required(message = "available must be set"))]
    pub available: Option<bool>,
    pub request_id: Option<i64>,
}

/// Sparse item patch: absent fields keep their current value
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItem {
    #[validate(custom(function = "not_blank"))]
    pub name: Option<String>,
    #[validate(custom(function = "not_blank"))]
    pub description: Option<String>,
    pub available: Option<bool>,
    pub request_id: Option<i64>,
}

/// Item ready to be inserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    pub owner_id: i64,
    pub name: String,
    pub description: String,
    pub available: bool,
    pub request_id: Option<i64>,
}

impl Item {
    /// Apply a sparse patch, returning the updated item
    pub fn patched(mut self, patch: UpdateItem) -> Self {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(available) = patch.available {
            self.available = available;
        }
        if let Some(request_id) = patch.request_id {
            self.request_id = Some(request_id);
        }
        self
    }
}

/// Item with its comments and, for the owner, its surrounding bookings
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemDetails {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    pub description: String,
    pub available: bool,
    pub request_id: Option<i64>,
    pub comments: Vec<Comment>,
    pub last_booking: Option<BookingShort>,
    pub next_booking: Option<BookingShort>,
}

impl ItemDetails {
    pub fn new(
        item: Item,
        comments: Vec<Comment>,
        last_booking: Option<&Booking>,
        next_booking: Option<&Booking>,
    ) -> Self {
        Self {
            id: item.id,
            owner_id: item.owner_id,
            name: item.name,
            description: item.description,
            available: item.available,
            request_id: item.request_id,
            comments,
            last_booking: last_booking.map(BookingShort::from),
            next_booking: next_booking.map(BookingShort::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drill() -> Item {
        Item {
            id: 7,
            owner_id: 1,
            name: "Drill".into(),
            description: "Cordless drill".into(),
            available: true,
            request_id: None,
        }
    }

    #[test]
    fn patch_only_touches_present_fields() {
        let item = drill().patched(UpdateItem {
            available: Some(false),
            ..Default::default()
        });
        assert_eq!(item.name, "Drill");
        assert_eq!(item.description, "Cordless drill");
        assert!(!item.available);
        assert_eq!(item.request_id, None);
    }

    #[test]
    fn create_requires_availability_flag() {
        let draft: CreateItem =
            serde_json::from_str(r#"{"name":"Drill","description":"Cordless drill"}"#).unwrap();
        assert!(draft.validate().is_err());

        let draft: CreateItem = serde_json::from_str(
            r#"{"name":"Drill","description":"Cordless drill","available":true,"requestId":3}"#,
        )
        .unwrap();
        assert!(draft.validate().is_ok());
        assert_eq!(draft.request_id, Some(3));
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(drill()).unwrap();
        assert_eq!(json["ownerId"], 1);
        assert!(json["requestId"].is_null());
    }
}
