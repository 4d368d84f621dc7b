//! Article model
//!
//! This module provides:
//! - `Article` entity owned by exactly one author
//! - Input types for creating and updating articles
//! - Pagination types for list queries
//!
//! The slug is generated once at creation time and never changes afterwards,
//! even when the title is edited.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Article entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    /// Unique identifier
    pub id: i64,
    /// URL-safe unique slug (immutable after creation)
    pub slug: String,
    /// Article title
    pub title: String,
    /// Short description / teaser
    pub description: String,
    /// Full article body
    pub body: String,
    /// Optional cover image URL
    pub image_url: Option<String>,
    /// Author user id
    pub author_id: i64,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Article {
    /// Create a new article with the given parameters
    pub fn new(
        slug: String,
        title: String,
        description: String,
        body: String,
        image_url: Option<String>,
        author_id: i64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: 0, // Set by the database
            slug,
            title,
            description,
            body,
            image_url,
            author_id,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Input for creating a new article
#[derive(Debug, Clone, Deserialize)]
pub struct CreateArticleInput {
    /// Article title (slug source)
    pub title: String,
    /// Short description
    pub description: String,
    /// Full body
    pub body: String,
    /// Optional cover image URL
    pub image_url: Option<String>,
}

/// Input for updating an existing article.
///
/// There is deliberately no slug field here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateArticleInput {
    /// New title (optional; does not regenerate the slug)
    pub title: Option<String>,
    /// New description (optional)
    pub description: Option<String>,
    /// New body (optional)
    pub body: Option<String>,
    /// New cover image URL (optional)
    pub image_url: Option<String>,
}

impl UpdateArticleInput {
    /// Check if any field is set
    pub fn has_changes(&self) -> bool {
        self.title.is_some()
            || self.description.is_some()
            || self.body.is_some()
            || self.image_url.is_some()
    }
}

/// Pagination parameters for list queries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListParams {
    /// Page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 20,
        }
    }
}

impl ListParams {
    /// Create new pagination parameters, clamped to sane bounds
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, 100),
        }
    }

    /// Calculate the offset for database queries
    ///
    /// Widened to i64 before multiplying; `page` comes straight from the
    /// query string and can be u32::MAX.
    pub fn offset(&self) -> i64 {
        (i64::from(self.page.max(1)) - 1) * i64::from(self.per_page)
    }

    /// Get the limit for database queries
    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }
}

/// Paginated result container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResult<T> {
    /// Items in the current page
    pub items: Vec<T>,
    /// Total number of items across all pages
    pub total: i64,
    /// Current page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl<T> PagedResult<T> {
    /// Create a new paginated result
    pub fn new(items: Vec<T>, total: i64, params: &ListParams) -> Self {
        Self {
            items,
            total,
            page: params.page,
            per_page: params.per_page,
        }
    }

    /// Calculate the total number of pages
    pub fn total_pages(&self) -> u32 {
        if self.per_page == 0 {
            return 0;
        }
        let pages = (self.total.max(0) as u64).div_ceil(u64::from(self.per_page));
        pages.min(u64::from(u32::MAX)) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_params_clamping() {
        let params = ListParams::new(0, 1000);
        assert_eq!(params.page, 1);
        assert_eq!(params.per_page, 100);
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn test_list_params_offset() {
        let params = ListParams::new(3, 20);
        assert_eq!(params.offset(), 40);
        assert_eq!(params.limit(), 20);
    }

    #[test]
    fn test_paged_result_total_pages() {
        let params = ListParams::new(1, 10);
        let result: PagedResult<i32> = PagedResult::new(vec![], 25, &params);
        assert_eq!(result.total_pages(), 3);
    }

    #[test]
    fn test_offset_does_not_overflow_for_huge_pages() {
        let params = ListParams::new(u32::MAX, 100);
        assert_eq!(params.offset(), (i64::from(u32::MAX) - 1) * 100);
    }

    #[test]
    fn test_total_pages_handles_totals_beyond_u32() {
        let params = ListParams::new(1, 100);
        let result: PagedResult<i32> = PagedResult::new(vec![], 5_000_000_000, &params);
        assert_eq!(result.total_pages(), 50_000_000);
    }
}
