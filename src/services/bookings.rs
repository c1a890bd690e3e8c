//! Booking engine: creation, approval and state-filtered listings

use chrono::NaiveDateTime;

use crate::{
    error::{AppError, AppResult},
    models::{
        booking::{Booking, BookingState, BookingStatus, NewBooking},
        now,
    },
    pagination::PageRequest,
    repository::Repository,
};

use super::users::UsersService;

#[derive(Clone)]
pub struct BookingsService {
    repository: Repository,
    users: UsersService,
}

impl BookingsService {
    pub fn new(repository: Repository) -> Self {
        Self {
            users: UsersService::new(repository.clone()),
            repository,
        }
    }

    async fn load(&self, booking_id: i64) -> AppResult<Booking> {
        self.repository
            .bookings
            .get_by_id(booking_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Booking with id {} not found", booking_id)))
    }

    /// Request a booking of someone else's available item.
    ///
    /// Both dates being in the future is checked by the API layer; here only
    /// their order matters.
    pub async fn create_booking(
        &self,
        booker_id: i64,
        item_id: i64,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> AppResult<Booking> {
        self.users.get_by_id(booker_id).await?;
        let item = self
            .repository
            .items
            .get_by_id(item_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Item with id {} not found", item_id)))?;

        if start > end {
            return Err(AppError::BadRequest(
                "Booking start must be before its end".to_string(),
            ));
        }
        if start == end {
            return Err(AppError::BadRequest(
                "Booking start must differ from its end".to_string(),
            ));
        }
        if item.owner_id == booker_id {
            tracing::warn!(user_id = booker_id, item_id, "Owner tried to book own item");
            return Err(AppError::AccessDenied(format!(
                "User {} cannot book their own item {}",
                booker_id, item_id
            )));
        }
        if !item.available {
            return Err(AppError::BadRequest(format!("Item {} is not available", item_id)));
        }

        let booking = self
            .repository
            .bookings
            .create(&NewBooking {
                item_id,
                booker_id,
                start,
                end,
            })
            .await?;
        tracing::info!(booking_id = booking.id, item_id, booker_id, "Booking requested");
        Ok(booking)
    }

    /// Approve or reject a waiting booking. Only the item owner may decide,
    /// and a decision is final.
    pub async fn confirm_booking(
        &self,
        owner_id: i64,
        booking_id: i64,
        approved: bool,
    ) -> AppResult<Booking> {
        let booking = self.load(booking_id).await?;

        if booking.status != BookingStatus::Waiting {
            return Err(AppError::Conflict(format!(
                "Booking {} is already {}",
                booking_id, booking.status
            )));
        }
        if booking.item_owner_id != owner_id {
            return Err(AppError::AccessDenied(format!(
                "User {} does not own item {}",
                owner_id, booking.item_id
            )));
        }

        let target = if approved {
            BookingStatus::Approved
        } else {
            BookingStatus::Rejected
        };

        // A concurrent decision may have landed since the load above
        let updated = self
            .repository
            .bookings
            .transition(booking_id, BookingStatus::Waiting, target)
            .await?
            .ok_or_else(|| {
                AppError::Conflict(format!("Booking {} has already been decided", booking_id))
            })?;

        tracing::info!(booking_id, status = %target, "Booking decided");
        Ok(updated)
    }

    /// A booking is visible to its booker and to the item owner
    pub async fn get_booking(&self, user_id: i64, booking_id: i64) -> AppResult<Booking> {
        let booking = self.load(booking_id).await?;
        if booking.booker_id != user_id && booking.item_owner_id != user_id {
            return Err(AppError::AccessDenied(format!(
                "User {} is neither the booker nor the owner of booking {}",
                user_id, booking_id
            )));
        }
        Ok(booking)
    }

    /// Bookings made by a user
    pub async fn list_for_booker(
        &self,
        booker_id: i64,
        state: BookingState,
        page: PageRequest,
    ) -> AppResult<Vec<Booking>> {
        self.users.get_by_id(booker_id).await?;
        self.repository
            .bookings
            .list_by_booker(booker_id, state, now(), page)
            .await
    }

    /// Bookings of the items a user owns
    pub async fn list_for_owner(
        &self,
        owner_id: i64,
        state: BookingState,
        page: PageRequest,
    ) -> AppResult<Vec<Booking>> {
        self.users.get_by_id(owner_id).await?;
        self.repository
            .bookings
            .list_by_owner(owner_id, state, now(), page)
            .await
    }

    pub async fn last_booking(&self, item_id: i64) -> AppResult<Option<Booking>> {
        self.repository.bookings.last_for_item(item_id, now()).await
    }

    pub async fn next_booking(&self, item_id: i64) -> AppResult<Option<Booking>> {
        self.repository.bookings.next_for_item(item_id, now()).await
    }

    /// Gate for comments: an approved booking of the item that has ended
    pub async fn has_completed_approved_booking(
        &self,
        user_id: i64,
        item_id: i64,
    ) -> AppResult<bool> {
        self.repository
            .bookings
            .has_completed_approved(user_id, item_id, now())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{item::{Item, NewItem}, user::{CreateUser, User}};
    use chrono::Duration;
    use tokio_test::assert_err;

    struct Fixture {
        repository: Repository,
        service: BookingsService,
        owner: User,
        booker: User,
        drill: Item,
    }

    async fn fixture() -> Fixture {
        let repository = Repository::in_memory();
        let owner = repository
            .users
            .create(&CreateUser {
                name: "Owner".into(),
                email: "owner@example.com".into(),
            })
            .await
            .unwrap();
        let booker = repository
            .users
            .create(&CreateUser {
                name: "Booker".into(),
                email: "booker@example.com".into(),
            })
            .await
            .unwrap();
        let drill = repository
            .items
            .create(&NewItem {
                owner_id: owner.id,
                name: "Drill".into(),
                description: "Cordless drill".into(),
                available: true,
                request_id: None,
            })
            .await
            .unwrap();

        Fixture {
            service: BookingsService::new(repository.clone()),
            repository,
            owner,
            booker,
            drill,
        }
    }

    fn days(n: i64) -> NaiveDateTime {
        now() + Duration::days(n)
    }

    fn first_page() -> PageRequest {
        PageRequest::new(0, 10).unwrap()
    }

    #[tokio::test]
    async fn new_bookings_wait_for_approval() {
        let f = fixture().await;
        let booking = f
            .service
            .create_booking(f.booker.id, f.drill.id, days(1), days(2))
            .await
            .unwrap();

        assert_eq!(booking.status, BookingStatus::Waiting);
        assert_eq!(booking.item_owner_id, f.owner.id);
        assert_eq!(booking.item_name, "Drill");
    }

    #[tokio::test]
    async fn owner_cannot_book_own_item() {
        let f = fixture().await;
        let err = f
            .service
            .create_booking(f.owner.id, f.drill.id, days(1), days(2))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AccessDenied(_)));
    }

    #[tokio::test]
    async fn rejects_inverted_and_empty_ranges() {
        let f = fixture().await;
        let inverted = f
            .service
            .create_booking(f.booker.id, f.drill.id, days(3), days(2))
            .await;
        assert!(matches!(inverted, Err(AppError::BadRequest(_))));

        let start = days(1);
        let empty = f.service.create_booking(f.booker.id, f.drill.id, start, start).await;
        assert!(matches!(empty, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn unavailable_items_cannot_be_booked() {
        let f = fixture().await;
        let mut drill = f.drill.clone();
        drill.available = false;
        f.repository.items.update(&drill).await.unwrap();

        let err = f
            .service
            .create_booking(f.booker.id, f.drill.id, days(1), days(2))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn unknown_item_or_user_is_not_found() {
        let f = fixture().await;
        assert_err!(f.service.create_booking(f.booker.id, 999, days(1), days(2)).await);
        assert!(matches!(
            f.service.create_booking(999, f.drill.id, days(1), days(2)).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            f.service.get_booking(f.booker.id, 999).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn approval_is_final() {
        let f = fixture().await;
        let booking = f
            .service
            .create_booking(f.booker.id, f.drill.id, days(1), days(2))
            .await
            .unwrap();

        let approved = f.service.confirm_booking(f.owner.id, booking.id, true).await.unwrap();
        assert_eq!(approved.status, BookingStatus::Approved);

        for approve in [true, false] {
            let err = f
                .service
                .confirm_booking(f.owner.id, booking.id, approve)
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Conflict(_)));
        }
    }

    #[tokio::test]
    async fn only_the_owner_decides() {
        let f = fixture().await;
        let booking = f
            .service
            .create_booking(f.booker.id, f.drill.id, days(1), days(2))
            .await
            .unwrap();

        let err = f
            .service
            .confirm_booking(f.booker.id, booking.id, true)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AccessDenied(_)));

        let rejected = f.service.confirm_booking(f.owner.id, booking.id, false).await.unwrap();
        assert_eq!(rejected.status, BookingStatus::Rejected);
    }

    #[tokio::test]
    async fn bookings_are_visible_to_booker_and_owner_only() {
        let f = fixture().await;
        let stranger = f
            .repository
            .users
            .create(&CreateUser {
                name: "Stranger".into(),
                email: "stranger@example.com".into(),
            })
            .await
            .unwrap();
        let booking = f
            .service
            .create_booking(f.booker.id, f.drill.id, days(1), days(2))
            .await
            .unwrap();

        assert!(f.service.get_booking(f.booker.id, booking.id).await.is_ok());
        assert!(f.service.get_booking(f.owner.id, booking.id).await.is_ok());
        assert!(matches!(
            f.service.get_booking(stranger.id, booking.id).await,
            Err(AppError::AccessDenied(_))
        ));
    }

    #[tokio::test]
    async fn listings_filter_before_paginating() {
        let f = fixture().await;
        let past = f
            .service
            .create_booking(f.booker.id, f.drill.id, days(-5), days(-4))
            .await
            .unwrap();
        let current = f
            .service
            .create_booking(f.booker.id, f.drill.id, days(-1), days(1))
            .await
            .unwrap();
        let future = f
            .service
            .create_booking(f.booker.id, f.drill.id, days(3), days(4))
            .await
            .unwrap();
        let later = f
            .service
            .create_booking(f.booker.id, f.drill.id, days(6), days(7))
            .await
            .unwrap();
        f.service.confirm_booking(f.owner.id, later.id, false).await.unwrap();

        let all = f
            .service
            .list_for_booker(f.booker.id, BookingState::All, first_page())
            .await
            .unwrap();
        let ids: Vec<i64> = all.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![later.id, future.id, current.id, past.id]);

        let one = PageRequest::new(0, 1).unwrap();
        let past_only = f
            .service
            .list_for_booker(f.booker.id, BookingState::Past, one)
            .await
            .unwrap();
        assert_eq!(past_only.len(), 1);
        assert_eq!(past_only[0].id, past.id);

        let current_only = f
            .service
            .list_for_owner(f.owner.id, BookingState::Current, first_page())
            .await
            .unwrap();
        assert_eq!(current_only.iter().map(|b| b.id).collect::<Vec<_>>(), vec![current.id]);

        let future_ids: Vec<i64> = f
            .service
            .list_for_owner(f.owner.id, BookingState::Future, first_page())
            .await
            .unwrap()
            .iter()
            .map(|b| b.id)
            .collect();
        assert_eq!(future_ids, vec![later.id, future.id]);

        let waiting = f
            .service
            .list_for_booker(f.booker.id, BookingState::Waiting, first_page())
            .await
            .unwrap();
        assert_eq!(waiting.len(), 3);

        let rejected = f
            .service
            .list_for_owner(f.owner.id, BookingState::Rejected, first_page())
            .await
            .unwrap();
        assert_eq!(rejected.iter().map(|b| b.id).collect::<Vec<_>>(), vec![later.id]);

        // The booker owns nothing
        assert!(f
            .service
            .list_for_owner(f.booker.id, BookingState::All, first_page())
            .await
            .unwrap()
            .is_empty());
        assert!(matches!(
            f.service.list_for_booker(999, BookingState::All, first_page()).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn equal_starts_list_newest_booking_first() {
        let f = fixture().await;
        let start = days(2);
        let mut ids = Vec::new();
        for _ in 0..3 {
            let booking = f
                .service
                .create_booking(f.booker.id, f.drill.id, start, days(3))
                .await
                .unwrap();
            ids.push(booking.id);
        }
        ids.reverse();

        for listed in [
            f.service
                .list_for_booker(f.booker.id, BookingState::All, first_page())
                .await
                .unwrap(),
            f.service
                .list_for_owner(f.owner.id, BookingState::Future, first_page())
                .await
                .unwrap(),
        ] {
            assert_eq!(listed.iter().map(|b| b.id).collect::<Vec<_>>(), ids);
        }

        let second = f
            .service
            .list_for_booker(f.booker.id, BookingState::All, PageRequest::new(1, 1).unwrap())
            .await
            .unwrap();
        assert_eq!(second[0].id, ids[1]);
    }

    #[tokio::test]
    async fn last_and_next_bookings_around_now() {
        let f = fixture().await;
        assert!(f.service.last_booking(f.drill.id).await.unwrap().is_none());
        assert!(f.service.next_booking(f.drill.id).await.unwrap().is_none());

        let older = f
            .service
            .create_booking(f.booker.id, f.drill.id, days(-10), days(-8))
            .await
            .unwrap();
        let last = f
            .service
            .create_booking(f.booker.id, f.drill.id, days(-2), days(-1))
            .await
            .unwrap();
        f.service.confirm_booking(f.owner.id, last.id, true).await.unwrap();
        let next = f
            .service
            .create_booking(f.booker.id, f.drill.id, days(2), days(3))
            .await
            .unwrap();
        f.service.confirm_booking(f.owner.id, next.id, true).await.unwrap();
        f.service
            .create_booking(f.booker.id, f.drill.id, days(5), days(6))
            .await
            .unwrap();

        assert_eq!(f.service.last_booking(f.drill.id).await.unwrap().unwrap().id, last.id);
        assert_eq!(f.service.next_booking(f.drill.id).await.unwrap().unwrap().id, next.id);
        assert_ne!(older.id, last.id);
    }

    #[tokio::test]
    async fn completed_approved_booking_gate() {
        let f = fixture().await;
        let ongoing = f
            .service
            .create_booking(f.booker.id, f.drill.id, days(-1), days(1))
            .await
            .unwrap();
        f.service.confirm_booking(f.owner.id, ongoing.id, true).await.unwrap();
        assert!(!f
            .service
            .has_completed_approved_booking(f.booker.id, f.drill.id)
            .await
            .unwrap());

        let finished_rejected = f
            .service
            .create_booking(f.booker.id, f.drill.id, days(-4), days(-3))
            .await
            .unwrap();
        f.service
            .confirm_booking(f.owner.id, finished_rejected.id, false)
            .await
            .unwrap();
        assert!(!f
            .service
            .has_completed_approved_booking(f.booker.id, f.drill.id)
            .await
            .unwrap());

        let finished = f
            .service
            .create_booking(f.booker.id, f.drill.id, days(-3), days(-2))
            .await
            .unwrap();
        f.service.confirm_booking(f.owner.id, finished.id, true).await.unwrap();
        assert!(f
            .service
            .has_completed_approved_booking(f.booker.id, f.drill.id)
            .await
            .unwrap());
    }
}
