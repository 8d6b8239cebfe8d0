use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Page window requested through `page`/`limit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: u64,
    pub limit: u64,
}

impl Page {
    /// Active only when at least one of `page`/`limit` was supplied; the
    /// missing one defaults to 1. Values that are not positive integers are
    /// coerced to 1.
    pub fn from_raw(page: Option<&str>, limit: Option<&str>) -> Option<Self> {
        if page.is_none() && limit.is_none() {
            return None;
        }
        Some(Self {
            number: positive_or_one(page),
            limit: positive_or_one(limit),
        })
    }

    pub fn skip(&self) -> u64 {
        (self.number - 1).saturating_mul(self.limit)
    }

    pub fn result(&self, count: u64) -> PaginationResult {
        let end = self.number.saturating_mul(self.limit);
        let skip = self.skip();
        PaginationResult {
            current_page: self.number,
            limit: Some(self.limit),
            num_of_pages: count.div_ceil(self.limit),
            next: (end < count).then_some(self.number + 1),
            prev: (skip > 0).then_some(self.number - 1),
        }
    }
}

fn positive_or_one(raw: Option<&str>) -> u64 {
    raw.and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(1)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginationResult {
    pub current_page: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    pub num_of_pages: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev: Option<u64>,
}

impl Default for PaginationResult {
    /// Reported when no page window was requested.
    fn default() -> Self {
        Self {
            current_page: 1,
            limit: None,
            num_of_pages: 1,
            next: None,
            prev: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inactive_without_page_or_limit() {
        assert_eq!(Page::from_raw(None, None), None);
    }

    #[test]
    fn missing_half_defaults_to_one() {
        assert_eq!(
            Page::from_raw(Some("3"), None),
            Some(Page { number: 3, limit: 1 })
        );
        assert_eq!(
            Page::from_raw(None, Some("20")),
            Some(Page { number: 1, limit: 20 })
        );
    }

    #[test]
    fn invalid_values_are_coerced_to_one() {
        for raw in ["0", "-4", "abc", ""] {
            assert_eq!(
                Page::from_raw(Some(raw), Some(raw)),
                Some(Page { number: 1, limit: 1 })
            );
        }
    }

    #[test]
    fn middle_page_links_both_ways() {
        let result = Page { number: 2, limit: 5 }.result(12);
        assert_eq!(
            result,
            PaginationResult {
                current_page: 2,
                limit: Some(5),
                num_of_pages: 3,
                next: Some(3),
                prev: Some(1),
            }
        );
    }

    #[test]
    fn link_presence_matches_window_bounds() {
        for count in 0..25_u64 {
            for number in 1..6_u64 {
                for limit in 1..6_u64 {
                    let page = Page { number, limit };
                    let result = page.result(count);
                    assert_eq!(result.num_of_pages, count.div_ceil(limit));
                    assert_eq!(result.next.is_some(), number * limit < count);
                    assert_eq!(result.prev.is_some(), (number - 1) * limit > 0);
                }
            }
        }
    }
}
