//! Data models for the pinmap backend.
//!
//! - `User`, `MemberResponse`: member profile
//! - `LoginRequest`, `LoginResponse`, `SignupRequest`: credential payloads
//! - `Pin`, `Post`: map content
//! - `Page`: Spring-style paged list wrapper
//! - `ErrorResponse`: error body shared by every failing endpoint

pub mod error_response;
pub mod member;
pub mod pin;
pub mod post;

use serde::{Deserialize, Serialize};

pub use error_response::{ErrorResponse, FieldError, DUPLICATE_EMAIL_CODE, VALIDATION_ERROR_CODE};
pub use member::{LoginRequest, LoginResponse, MemberResponse, SignupRequest, User};
pub use pin::{NearbyQuery, Pin, PinCreateRequest, DEFAULT_RADIUS_KM};
pub use post::Post;

/// Page size used when the caller does not pick one.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// One page of a paged listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub content: Vec<T>,
    #[serde(rename = "totalElements", default)]
    pub total_elements: u64,
    #[serde(rename = "totalPages", default)]
    pub total_pages: u32,
    #[serde(default)]
    pub number: u32,
    #[serde(default)]
    pub size: u32,
    #[serde(default)]
    pub last: bool,
}

impl<T> Page<T> {
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn has_next(&self) -> bool {
        !self.last && self.number + 1 < self.total_pages
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    pub fn new(page: u32, size: u32) -> Self {
        Self { page, size }
    }

    pub fn to_query(&self) -> Vec<(String, String)> {
        vec![
            ("page".to_string(), self.page.to_string()),
            ("size".to_string(), self.size.to_string()),
        ]
    }
}
