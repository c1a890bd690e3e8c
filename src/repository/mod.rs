//! Repository layer for persistence
//!
//! Every table is accessed through an async trait so services can run
//! against Postgres in production and against [`memory::MemoryStore`] in
//! development and tests.

pub mod bookings;
pub mod comments;
pub mod items;
pub mod memory;
pub mod requests;
pub mod users;

use std::sync::Arc;

use sqlx::{Pool, Postgres};

pub use bookings::BookingRepository;
pub use comments::CommentRepository;
pub use items::ItemRepository;
pub use requests::ItemRequestRepository;
pub use users::UserRepository;

use crate::error::AppResult;

/// Main repository struct holding one handle per table
#[derive(Clone)]
pub struct Repository {
    pub users: Arc<dyn UserRepository>,
    pub items: Arc<dyn ItemRepository>,
    pub bookings: Arc<dyn BookingRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub requests: Arc<dyn ItemRequestRepository>,
    pool: Option<Pool<Postgres>>,
}

impl Repository {
    /// Create a repository backed by the given database pool
    pub fn postgres(pool: Pool<Postgres>) -> Self {
        Self {
            users: Arc::new(users::PgUserRepository::new(pool.clone())),
            items: Arc::new(items::PgItemRepository::new(pool.clone())),
            bookings: Arc::new(bookings::PgBookingRepository::new(pool.clone())),
            comments: Arc::new(comments::PgCommentRepository::new(pool.clone())),
            requests: Arc::new(requests::PgItemRequestRepository::new(pool.clone())),
            pool: Some(pool),
        }
    }

    /// Create a repository keeping everything in process memory
    pub fn in_memory() -> Self {
        let store = Arc::new(memory::MemoryStore::default());
        Self {
            users: store.clone(),
            items: store.clone(),
            bookings: store.clone(),
            comments: store.clone(),
            requests: store,
            pool: None,
        }
    }

    /// Assemble a repository from individual table handles
    pub fn from_parts(
        users: Arc<dyn UserRepository>,
        items: Arc<dyn ItemRepository>,
        bookings: Arc<dyn BookingRepository>,
        comments: Arc<dyn CommentRepository>,
        requests: Arc<dyn ItemRequestRepository>,
    ) -> Self {
        Self {
            users,
            items,
            bookings,
            comments,
            requests,
            pool: None,
        }
    }

    /// Check that the backing store answers
    pub async fn ping(&self) -> AppResult<()> {
        if let Some(pool) = &self.pool {
            sqlx::query("SELECT 1").execute(pool).await?;
        }
        Ok(())
    }
}
