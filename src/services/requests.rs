//! Item-request board

use crate::{
    error::{AppError, AppResult},
    models::{
        now,
        request::{CreateItemRequest, ItemRequest, ItemRequestDetails, NewItemRequest},
    },
    pagination::PageRequest,
    repository::Repository,
};

use super::users::UsersService;

#[derive(Clone)]
pub struct RequestsService {
    repository: Repository,
    users: UsersService,
}

impl RequestsService {
    pub fn new(repository: Repository) -> Self {
        Self {
            users: UsersService::new(repository.clone()),
            repository,
        }
    }

    async fn with_items(&self, request: ItemRequest) -> AppResult<ItemRequestDetails> {
        let items = self.repository.items.list_by_request(request.id).await?;
        Ok(ItemRequestDetails::new(request, items))
    }

    async fn all_with_items(&self, requests: Vec<ItemRequest>) -> AppResult<Vec<ItemRequestDetails>> {
        let mut details = Vec::with_capacity(requests.len());
        for request in requests {
            details.push(self.with_items(request).await?);
        }
        Ok(details)
    }

    pub async fn create_request(
        &self,
        requestor_id: i64,
        draft: CreateItemRequest,
    ) -> AppResult<ItemRequestDetails> {
        self.users.get_by_id(requestor_id).await?;
        let request = self
            .repository
            .requests
            .create(&NewItemRequest {
                description: draft.description,
                requestor_id,
                created: now(),
            })
            .await?;
        tracing::info!(request_id = request.id, requestor_id, "Item request posted");
        Ok(ItemRequestDetails::new(request, Vec::new()))
    }

    /// The caller's own requests, newest first
    pub async fn list_mine(&self, user_id: i64) -> AppResult<Vec<ItemRequestDetails>> {
        self.users.get_by_id(user_id).await?;
        let requests = self.repository.requests.list_by_requestor(user_id).await?;
        self.all_with_items(requests).await
    }

    /// Requests posted by everyone else, newest first
    pub async fn list_others(
        &self,
        user_id: i64,
        page: PageRequest,
    ) -> AppResult<Vec<ItemRequestDetails>> {
        self.users.get_by_id(user_id).await?;
        let requests = self.repository.requests.list_others(user_id, page).await?;
        self.all_with_items(requests).await
    }

    pub async fn get_request(
        &self,
        request_id: i64,
        viewer_id: i64,
    ) -> AppResult<ItemRequestDetails> {
        self.users.get_by_id(viewer_id).await?;
        let request = self
            .repository
            .requests
            .get_by_id(request_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Item request with id {} not found", request_id))
            })?;
        self.with_items(request).await
    }
}
