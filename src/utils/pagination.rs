use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    api::admin::AdminAttendanceRow,
    model::{attendance::AttendanceEntry, user::User},
};

pub const DEFAULT_LIMIT: u64 = 10;
pub const MAX_LIMIT: u64 = 100;

/// 1-based page number and page size, already clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl PageRequest {
    pub fn new(page: Option<u64>, limit: Option<u64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
        }
    }

    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[aliases(
    AttendancePage = Page<AttendanceEntry>,
    AdminAttendancePage = Page<AdminAttendanceRow>,
    UserPage = Page<User>
)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub data: Vec<T>,
    pub current_page: u64,
    pub total_pages: u64,
    pub total_items: u64,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, request: PageRequest, total_items: u64) -> Self {
        Self {
            data,
            current_page: request.page,
            total_pages: total_items.div_ceil(request.limit),
            total_items,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            data: self.data.into_iter().map(f).collect(),
            current_page: self.current_page,
            total_pages: self.total_pages,
            total_items: self.total_items,
        }
    }
}
