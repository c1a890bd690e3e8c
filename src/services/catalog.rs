//! Item catalog service: items, text search and comments

use crate::{
    error::{AppError, AppResult},
    models::{
        comment::{Comment, CreateComment, NewComment},
        item::{CreateItem, Item, ItemDetails, NewItem, UpdateItem},
        now,
    },
    pagination::PageRequest,
    repository::Repository,
};

use super::{bookings::BookingsService, users::UsersService};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
    users: UsersService,
    bookings: BookingsService,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self {
            users: UsersService::new(repository.clone()),
            bookings: BookingsService::new(repository.clone()),
            repository,
        }
    }

    async fn ensure_request(&self, request_id: i64) -> AppResult<()> {
        match self.repository.requests.get_by_id(request_id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::NotFound(format!(
                "Item request with id {} not found",
                request_id
            ))),
        }
    }

    async fn load(&self, item_id: i64) -> AppResult<Item> {
        self.repository
            .items
            .get_by_id(item_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Item with id {} not found", item_id)))
    }

    async fn load_owned(&self, owner_id: i64, item_id: i64) -> AppResult<Item> {
        let item = self.load(item_id).await?;
        if item.owner_id != owner_id {
            tracing::warn!(user_id = owner_id, item_id, "Item access denied");
            return Err(AppError::AccessDenied(format!(
                "User {} does not own item {}",
                owner_id, item_id
            )));
        }
        Ok(item)
    }

    /// Attach comments, and for the owner the surrounding bookings
    async fn details(&self, item: Item, viewer_id: i64) -> AppResult<ItemDetails> {
        let comments = self.repository.comments.list_by_item(item.id).await?;
        if item.owner_id != viewer_id {
            return Ok(ItemDetails::new(item, comments, None, None));
        }

        let last = self.bookings.last_booking(item.id).await?;
        let next = self.bookings.next_booking(item.id).await?;
        Ok(ItemDetails::new(item, comments, last.as_ref(), next.as_ref()))
    }

    /// List a new item, optionally in answer to an item request
    pub async fn create_item(&self, owner_id: i64, draft: CreateItem) -> AppResult<Item> {
        self.users.get_by_id(owner_id).await?;
        if let Some(request_id) = draft.request_id {
            self.ensure_request(request_id).await?;
        }

        let item = self
            .repository
            .items
            .create(&NewItem {
                owner_id,
                name: draft.name,
                description: draft.description,
                available: draft.available.unwrap_or_default(),
                request_id: draft.request_id,
            })
            .await?;
        tracing::info!(item_id = item.id, owner_id, "Item created");
        Ok(item)
    }

    /// Apply a sparse patch to an item the caller owns
    pub async fn update_item(
        &self,
        owner_id: i64,
        item_id: i64,
        patch: UpdateItem,
    ) -> AppResult<Item> {
        let item = self.load_owned(owner_id, item_id).await?;
        if let Some(request_id) = patch.request_id {
            self.ensure_request(request_id).await?;
        }

        let updated = self.repository.items.update(&item.patched(patch)).await?;
        tracing::info!(item_id, "Item updated");
        Ok(updated)
    }

    pub async fn get_item(&self, item_id: i64, viewer_id: i64) -> AppResult<ItemDetails> {
        let item = self.load(item_id).await?;
        self.details(item, viewer_id).await
    }

    /// Items of one owner, sorted by id
    pub async fn list_by_owner(
        &self,
        owner_id: i64,
        page: PageRequest,
    ) -> AppResult<Vec<ItemDetails>> {
        self.users.get_by_id(owner_id).await?;
        let items = self.repository.items.list_by_owner(owner_id, page).await?;

        let mut details = Vec::with_capacity(items.len());
        for item in items {
            details.push(self.details(item, owner_id).await?);
        }
        Ok(details)
    }

    /// Available items whose name or description contains `text`
    pub async fn search(&self, text: &str, page: PageRequest) -> AppResult<Vec<Item>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        self.repository.items.search_available(text, page).await
    }

    /// Remove an item together with its bookings and comments
    pub async fn delete_item(&self, owner_id: i64, item_id: i64) -> AppResult<()> {
        self.load_owned(owner_id, item_id).await?;
        if !self.repository.items.delete(item_id).await? {
            return Err(AppError::NotFound(format!("Item with id {} not found", item_id)));
        }
        tracing::info!(item_id, "Item deleted");
        Ok(())
    }

    /// Comment on an item; only after an approved booking of it has ended
    pub async fn add_comment(
        &self,
        author_id: i64,
        item_id: i64,
        comment: CreateComment,
    ) -> AppResult<Comment> {
        self.load(item_id).await?;
        self.users.get_by_id(author_id).await?;

        if !self
            .bookings
            .has_completed_approved_booking(author_id, item_id)
            .await?
        {
            tracing::debug!(user_id = author_id, item_id, "Comment without completed booking");
            return Err(AppError::BadRequest(format!(
                "User {} has no completed booking of item {}",
                author_id, item_id
            )));
        }

        let created = self
            .repository
            .comments
            .create(&NewComment {
                text: comment.text,
                item_id,
                author_id,
                created: now(),
            })
            .await?;
        tracing::info!(comment_id = created.id, item_id, author_id, "Comment added");
        Ok(created)
    }
}
