use chrono::NaiveDate;
use serde::Serialize;

use super::enums::{AgeBand, TrendStatus, UserRole};

pub const DEFAULT_PER_PAGE: u32 = 20;
pub const MAX_PER_PAGE: u32 = 100;

/// Filters applied in SQL when listing patients.
#[derive(Debug, Default)]
pub struct PatientFilter {
    pub search: Option<String>,
    pub insulin: Option<String>,
    pub gender: Option<String>,
    pub doctor_id: Option<i64>,
}

/// Filters that depend on computed values and run after loading.
#[derive(Debug, Default)]
pub struct PatientTrendFilter {
    pub status: Option<TrendStatus>,
    pub age_band: Option<AgeBand>,
}

#[derive(Debug, Default)]
pub struct AppointmentFilter {
    pub doctor_id: Option<i64>,
    pub patient_id: Option<i64>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub search: Option<String>,
}

#[derive(Debug, Default)]
pub struct UserFilter {
    pub role: Option<UserRole>,
}

/// 1-based page request with a clamped page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl PageRequest {
    pub fn new(page: Option<u32>, per_page: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE),
        }
    }

    pub fn offset(&self) -> usize {
        (self.page as usize - 1) * self.per_page as usize
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: u32,
    pub per_page: u32,
    pub last_page: u32,
}

impl<T> Page<T> {
    /// Slice an already-filtered list into the requested page.
    pub fn from_items(items: Vec<T>, request: PageRequest) -> Self {
        let total = items.len();
        let per_page = request.per_page as usize;
        let last_page = total.div_ceil(per_page).max(1) as u32;
        let items = items
            .into_iter()
            .skip(request.offset())
            .take(per_page)
            .collect();
        Page {
            items,
            total,
            page: request.page,
            per_page: request.per_page,
            last_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_request_clamps_inputs() {
        let req = PageRequest::new(Some(0), Some(10_000));
        assert_eq!(req.page, 1);
        assert_eq!(req.per_page, MAX_PER_PAGE);
        assert_eq!(PageRequest::default().per_page, DEFAULT_PER_PAGE);
    }

    #[test]
    fn page_slices_items() {
        let page = Page::from_items((1..=7).collect::<Vec<_>>(), PageRequest::new(Some(2), Some(3)));
        assert_eq!(page.items, vec![4, 5, 6]);
        assert_eq!(page.total, 7);
        assert_eq!(page.last_page, 3);
    }

    #[test]
    fn page_past_end_is_empty() {
        let page = Page::from_items(vec![1, 2], PageRequest::new(Some(5), Some(10)));
        assert!(page.items.is_empty());
        assert_eq!(page.last_page, 1);
    }
}
