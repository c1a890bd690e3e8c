//! `from`/`size` pagination as accepted by the list endpoints

use serde::Deserialize;
use utoipa::IntoParams;

use crate::error::{AppError, AppResult};

/// Raw pagination query parameters
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    /// Index of the first element (default 0)
    pub from: Option<i64>,
    /// Page length
    pub size: Option<i64>,
}

impl PageParams {
    /// Validate the parameters and turn them into a page window
    pub fn page(&self, default_size: i64) -> AppResult<PageRequest> {
        PageRequest::new(self.from.unwrap_or(0), self.size.unwrap_or(default_size))
    }
}

/// A validated page window, aligned on page boundaries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub offset: i64,
    pub limit: i64,
}

impl PageRequest {
    pub fn new(from: i64, size: i64) -> AppResult<Self> {
        if from < 0 {
            return Err(AppError::Conflict(
                "Pagination start must not be negative".to_string(),
            ));
        }
        if size <= 0 {
            return Err(AppError::Conflict(
                "Page size must be greater than zero".to_string(),
            ));
        }

        let page = from / size;
        Ok(Self {
            offset: page * size,
            limit: size,
        })
    }

    /// Slice an already ordered collection
    pub fn apply<T>(&self, items: impl IntoIterator<Item = T>) -> Vec<T> {
        items
            .into_iter()
            .skip(self.offset as usize)
            .take(self.limit as usize)
            .collect()
    }
}
