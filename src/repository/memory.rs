//! In-process storage implementing every repository trait
//!
//! Mirrors the Postgres schema closely enough for development and tests:
//! IDs come from one shared sequence, email uniqueness is case-insensitive,
//! and deletes cascade the same way the foreign keys do.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use tokio::sync::RwLock;

use super::{
    BookingRepository, CommentRepository, ItemRepository, ItemRequestRepository, UserRepository,
};
use crate::{
    error::{AppError, AppResult},
    models::{
        booking::{Booking, BookingState, BookingStatus, NewBooking},
        comment::{Comment, NewComment},
        item::{Item, NewItem},
        request::{ItemRequest, NewItemRequest},
        user::{CreateUser, User},
    },
    pagination::PageRequest,
};

#[derive(Debug, Clone)]
struct StoredBooking {
    id: i64,
    item_id: i64,
    booker_id: i64,
    start: NaiveDateTime,
    end: NaiveDateTime,
    status: BookingStatus,
}

#[derive(Debug, Clone)]
struct StoredComment {
    id: i64,
    text: String,
    item_id: i64,
    author_id: i64,
    created: NaiveDateTime,
}

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    items: BTreeMap<i64, Item>,
    bookings: BTreeMap<i64, StoredBooking>,
    comments: BTreeMap<i64, StoredComment>,
    requests: BTreeMap<i64, ItemRequest>,
    last_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn email_taken(&self, email: &str, exclude_id: Option<i64>) -> bool {
        self.users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(email) && Some(u.id) != exclude_id)
    }

    fn booking(&self, stored: &StoredBooking) -> AppResult<Booking> {
        let item = self.items.get(&stored.item_id).ok_or_else(|| {
            AppError::Internal(format!(
                "Booking {} references missing item {}",
                stored.id, stored.item_id
            ))
        })?;
        Ok(Booking {
            id: stored.id,
            item_id: stored.item_id,
            item_name: item.name.clone(),
            item_owner_id: item.owner_id,
            booker_id: stored.booker_id,
            start: stored.start,
            end: stored.end,
            status: stored.status,
        })
    }

    fn bookings_where<F>(&self, keep: F) -> AppResult<Vec<Booking>>
    where
        F: Fn(&Booking) -> bool,
    {
        let mut bookings = Vec::new();
        for stored in self.bookings.values() {
            let booking = self.booking(stored)?;
            if keep(&booking) {
                bookings.push(booking);
            }
        }
        Ok(bookings)
    }

    fn comment(&self, stored: &StoredComment) -> AppResult<Comment> {
        let author = self.users.get(&stored.author_id).ok_or_else(|| {
            AppError::Internal(format!(
                "Comment {} references missing user {}",
                stored.id, stored.author_id
            ))
        })?;
        Ok(Comment {
            id: stored.id,
            text: stored.text.clone(),
            item_id: stored.item_id,
            author_id: stored.author_id,
            author_name: author.name.clone(),
            created: stored.created,
        })
    }

    fn remove_item(&mut self, id: i64) -> bool {
        if self.items.remove(&id).is_none() {
            return false;
        }
        self.bookings.retain(|_, b| b.item_id != id);
        self.comments.retain(|_, c| c.item_id != id);
        true
    }

    fn remove_user(&mut self, id: i64) -> bool {
        if self.users.remove(&id).is_none() {
            return false;
        }

        let owned: Vec<i64> = self
            .items
            .values()
            .filter(|i| i.owner_id == id)
            .map(|i| i.id)
            .collect();
        for item_id in owned {
            self.remove_item(item_id);
        }

        self.bookings.retain(|_, b| b.booker_id != id);
        self.comments.retain(|_, c| c.author_id != id);

        let requests: Vec<i64> = self
            .requests
            .values()
            .filter(|r| r.requestor_id == id)
            .map(|r| r.id)
            .collect();
        for request_id in requests {
            self.requests.remove(&request_id);
            for item in self.items.values_mut() {
                if item.request_id == Some(request_id) {
                    item.request_id = None;
                }
            }
        }
        true
    }
}

/// Whole data set behind a single lock
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

fn duplicate_email(email: &str) -> AppError {
    AppError::Conflict(format!("Email {} is already registered", email))
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn get_by_id(&self, id: i64) -> AppResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn list(&self) -> AppResult<Vec<User>> {
        Ok(self.tables.read().await.users.values().cloned().collect())
    }

    async fn create(&self, user: &CreateUser) -> AppResult<User> {
        let mut tables = self.tables.write().await;
        if tables.email_taken(&user.email, None) {
            return Err(duplicate_email(&user.email));
        }
        let created = User {
            id: tables.next_id(),
            name: user.name.clone(),
            email: user.email.clone(),
        };
        tables.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update(&self, user: &User) -> AppResult<User> {
        let mut tables = self.tables.write().await;
        if tables.email_taken(&user.email, Some(user.id)) {
            return Err(duplicate_email(&user.email));
        }
        match tables.users.get_mut(&user.id) {
            Some(existing) => {
                *existing = user.clone();
                Ok(user.clone())
            }
            None => Err(AppError::NotFound(format!("User with id {} not found", user.id))),
        }
    }

    async fn delete(&self, id: i64) -> AppResult<bool> {
        Ok(self.tables.write().await.remove_user(id))
    }

    async fn email_exists(&self, email: &str, exclude_id: Option<i64>) -> AppResult<bool> {
        Ok(self.tables.read().await.email_taken(email, exclude_id))
    }
}

#[async_trait]
impl ItemRepository for MemoryStore {
    async fn get_by_id(&self, id: i64) -> AppResult<Option<Item>> {
        Ok(self.tables.read().await.items.get(&id).cloned())
    }

    async fn create(&self, item: &NewItem) -> AppResult<Item> {
        let mut tables = self.tables.write().await;
        let created = Item {
            id: tables.next_id(),
            owner_id: item.owner_id,
            name: item.name.clone(),
            description: item.description.clone(),
            available: item.available,
            request_id: item.request_id,
        };
        tables.items.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update(&self, item: &Item) -> AppResult<Item> {
        let mut tables = self.tables.write().await;
        match tables.items.get_mut(&item.id) {
            Some(existing) => {
                *existing = item.clone();
                Ok(item.clone())
            }
            None => Err(AppError::NotFound(format!("Item with id {} not found", item.id))),
        }
    }

    async fn delete(&self, id: i64) -> AppResult<bool> {
        Ok(self.tables.write().await.remove_item(id))
    }

    async fn list_by_owner(&self, owner_id: i64, page: PageRequest) -> AppResult<Vec<Item>> {
        let tables = self.tables.read().await;
        Ok(page.apply(
            tables
                .items
                .values()
                .filter(|i| i.owner_id == owner_id)
                .cloned(),
        ))
    }

    async fn search_available(&self, text: &str, page: PageRequest) -> AppResult<Vec<Item>> {
        let needle = text.to_lowercase();
        let tables = self.tables.read().await;
        Ok(page.apply(
            tables
                .items
                .values()
                .filter(|i| {
                    i.available
                        && (i.name.to_lowercase().contains(&needle)
                            || i.description.to_lowercase().contains(&needle))
                })
                .cloned(),
        ))
    }

    async fn list_by_request(&self, request_id: i64) -> AppResult<Vec<Item>> {
        let tables = self.tables.read().await;
        Ok(tables
            .items
            .values()
            .filter(|i| i.request_id == Some(request_id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl BookingRepository for MemoryStore {
    async fn get_by_id(&self, id: i64) -> AppResult<Option<Booking>> {
        let tables = self.tables.read().await;
        tables
            .bookings
            .get(&id)
            .map(|stored| tables.booking(stored))
            .transpose()
    }

    async fn create(&self, booking: &NewBooking) -> AppResult<Booking> {
        let mut tables = self.tables.write().await;
        let stored = StoredBooking {
            id: tables.next_id(),
            item_id: booking.item_id,
            booker_id: booking.booker_id,
            start: booking.start,
            end: booking.end,
            status: BookingStatus::Waiting,
        };
        let created = tables.booking(&stored)?;
        tables.bookings.insert(stored.id, stored);
        Ok(created)
    }

    async fn transition(
        &self,
        id: i64,
        from: BookingStatus,
        to: BookingStatus,
    ) -> AppResult<Option<Booking>> {
        let mut tables = self.tables.write().await;
        let stored = match tables.bookings.get_mut(&id) {
            Some(stored) if stored.status == from => {
                stored.status = to;
                stored.clone()
            }
            _ => return Ok(None),
        };
        tables.booking(&stored).map(Some)
    }

    async fn list_by_booker(
        &self,
        booker_id: i64,
        state: BookingState,
        now: NaiveDateTime,
        page: PageRequest,
    ) -> AppResult<Vec<Booking>> {
        let tables = self.tables.read().await;
        let mut bookings =
            tables.bookings_where(|b| b.booker_id == booker_id && state.matches(b, now))?;
        bookings.sort_by(|a, b| b.start.cmp(&a.start).then(b.id.cmp(&a.id)));
        Ok(page.apply(bookings))
    }

    async fn list_by_owner(
        &self,
        owner_id: i64,
        state: BookingState,
        now: NaiveDateTime,
        page: PageRequest,
    ) -> AppResult<Vec<Booking>> {
        let tables = self.tables.read().await;
        let mut bookings =
            tables.bookings_where(|b| b.item_owner_id == owner_id && state.matches(b, now))?;
        bookings.sort_by(|a, b| b.start.cmp(&a.start).then(b.id.cmp(&a.id)));
        Ok(page.apply(bookings))
    }

    async fn last_for_item(&self, item_id: i64, now: NaiveDateTime) -> AppResult<Option<Booking>> {
        let tables = self.tables.read().await;
        let bookings = tables.bookings_where(|b| b.item_id == item_id && b.end < now)?;
        Ok(bookings.into_iter().max_by_key(|b| b.end))
    }

    async fn next_for_item(&self, item_id: i64, now: NaiveDateTime) -> AppResult<Option<Booking>> {
        let tables = self.tables.read().await;
        let bookings = tables.bookings_where(|b| b.item_id == item_id && b.start > now)?;
        Ok(bookings.into_iter().min_by_key(|b| b.start))
    }

    async fn has_completed_approved(
        &self,
        booker_id: i64,
        item_id: i64,
        now: NaiveDateTime,
    ) -> AppResult<bool> {
        let tables = self.tables.read().await;
        Ok(tables.bookings.values().any(|b| {
            b.booker_id == booker_id
                && b.item_id == item_id
                && b.status == BookingStatus::Approved
                && b.end < now
        }))
    }
}

#[async_trait]
impl CommentRepository for MemoryStore {
    async fn create(&self, comment: &NewComment) -> AppResult<Comment> {
        let mut tables = self.tables.write().await;
        let stored = StoredComment {
            id: tables.next_id(),
            text: comment.text.clone(),
            item_id: comment.item_id,
            author_id: comment.author_id,
            created: comment.created,
        };
        let created = tables.comment(&stored)?;
        tables.comments.insert(stored.id, stored);
        Ok(created)
    }

    async fn list_by_item(&self, item_id: i64) -> AppResult<Vec<Comment>> {
        let tables = self.tables.read().await;
        tables
            .comments
            .values()
            .filter(|c| c.item_id == item_id)
            .map(|c| tables.comment(c))
            .collect()
    }
}

#[async_trait]
impl ItemRequestRepository for MemoryStore {
    async fn get_by_id(&self, id: i64) -> AppResult<Option<ItemRequest>> {
        Ok(self.tables.read().await.requests.get(&id).cloned())
    }

    async fn create(&self, request: &NewItemRequest) -> AppResult<ItemRequest> {
        let mut tables = self.tables.write().await;
        let created = ItemRequest {
            id: tables.next_id(),
            description: request.description.clone(),
            requestor_id: request.requestor_id,
            created: request.created,
        };
        tables.requests.insert(created.id, created.clone());
        Ok(created)
    }

    async fn list_by_requestor(&self, requestor_id: i64) -> AppResult<Vec<ItemRequest>> {
        let tables = self.tables.read().await;
        let mut requests: Vec<ItemRequest> = tables
            .requests
            .values()
            .filter(|r| r.requestor_id == requestor_id)
            .cloned()
            .collect();
        requests.sort_by(|a, b| b.created.cmp(&a.created).then(b.id.cmp(&a.id)));
        Ok(requests)
    }

    async fn list_others(&self, user_id: i64, page: PageRequest) -> AppResult<Vec<ItemRequest>> {
        let tables = self.tables.read().await;
        let mut requests: Vec<ItemRequest> = tables
            .requests
            .values()
            .filter(|r| r.requestor_id != user_id)
            .cloned()
            .collect();
        requests.sort_by(|a, b| b.created.cmp(&a.created).then(b.id.cmp(&a.id)));
        Ok(page.apply(requests))
    }
}
