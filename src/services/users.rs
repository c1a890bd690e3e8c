//! User registry service

use crate::{
    error::{AppError, AppResult},
    models::user::{CreateUser, UpdateUser, User},
    repository::Repository,
};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
}

impl UsersService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i64) -> AppResult<User> {
        self.repository
            .users
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// List every registered user
    pub async fn list(&self) -> AppResult<Vec<User>> {
        self.repository.users.list().await
    }

    /// Register a new user; the email must not be taken
    pub async fn create_user(&self, user: CreateUser) -> AppResult<User> {
        if self.repository.users.email_exists(&user.email, None).await? {
            return Err(AppError::Conflict(format!(
                "Email {} is already registered",
                user.email
            )));
        }

        let created = self.repository.users.create(&user).await?;
        tracing::info!(user_id = created.id, "User created");
        Ok(created)
    }

    /// Apply a sparse patch to a user
    pub async fn update_user(&self, id: i64, patch: UpdateUser) -> AppResult<User> {
        let existing = self.get_by_id(id).await?;

        if let Some(ref email) = patch.email {
            if self.repository.users.email_exists(email, Some(id)).await? {
                return Err(AppError::Conflict(format!(
                    "Email {} is already registered",
                    email
                )));
            }
        }

        let updated = self.repository.users.update(&existing.patched(patch)).await?;
        tracing::info!(user_id = id, "User updated");
        Ok(updated)
    }

    /// Delete a user together with their items, bookings, comments and requests
    pub async fn delete_user(&self, id: i64) -> AppResult<()> {
        if !self.repository.users.delete(id).await? {
            return Err(AppError::NotFound(format!("User with id {} not found", id)));
        }
        tracing::info!(user_id = id, "User deleted");
        Ok(())
    }
}
