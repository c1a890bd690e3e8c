//! Item requests repository

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::request::{ItemRequest, NewItemRequest},
    pagination::PageRequest,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ItemRequestRepository: Send + Sync {
    async fn get_by_id(&self, id: i64) -> AppResult<Option<ItemRequest>>;

    async fn create(&self, request: &NewItemRequest) -> AppResult<ItemRequest>;

    /// Requests authored by a user, newest first
    async fn list_by_requestor(&self, requestor_id: i64) -> AppResult<Vec<ItemRequest>>;

    /// Requests authored by anyone but `user_id`, newest first
    async fn list_others(&self, user_id: i64, page: PageRequest) -> AppResult<Vec<ItemRequest>>;
}

#[derive(Clone)]
pub struct PgItemRequestRepository {
    pool: Pool<Postgres>,
}

impl PgItemRequestRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ItemRequestRepository for PgItemRequestRepository {
    async fn get_by_id(&self, id: i64) -> AppResult<Option<ItemRequest>> {
        let request = sqlx::query_as::<_, ItemRequest>(
            "SELECT id, description, requestor_id, created FROM requests WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(request)
    }

    async fn create(&self, request: &NewItemRequest) -> AppResult<ItemRequest> {
        let created = sqlx::query_as::<_, ItemRequest>(
            r#"
            INSERT INTO requests (description, requestor_id, created)
            VALUES ($1, $2, $3)
            RETURNING id, description, requestor_id, created
            "#,
        )
        .bind(&request.description)
        .bind(request.requestor_id)
        .bind(request.created)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn list_by_requestor(&self, requestor_id: i64) -> AppResult<Vec<ItemRequest>> {
        let requests = sqlx::query_as::<_, ItemRequest>(
            r#"
            SELECT id, description, requestor_id, created FROM requests
            WHERE requestor_id = $1
            ORDER BY created DESC, id DESC
            "#,
        )
        .bind(requestor_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(requests)
    }

    async fn list_others(&self, user_id: i64, page: PageRequest) -> AppResult<Vec<ItemRequest>> {
        let requests = sqlx::query_as::<_, ItemRequest>(
            r#"
            SELECT id, description, requestor_id, created FROM requests
            WHERE requestor_id != $1
            ORDER BY created DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(requests)
    }
}
