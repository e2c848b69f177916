use serde::Serialize;
use rocket_okapi::okapi::schemars::JsonSchema;

const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 100;

/// Page/limit pair clamped to sane bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: i64,
    pub limit: i64,
}

impl Page {
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        Page {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
        }
    }

    pub fn skip(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit).max(0) as u64
    }

    pub fn info(&self, total: u64) -> Pagination {
        Pagination {
            page: self.page,
            limit: self.limit,
            total,
            pages: (total as f64 / self.limit as f64).ceil() as i64,
        }
    }
}

#[derive(Debug, Serialize, JsonSchema, PartialEq)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: u64,
    pub pages: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_inputs() {
        assert_eq!(Page::new(None, None), Page { page: 1, limit: 20 });
        assert_eq!(Page::new(Some(0), Some(500)), Page { page: 1, limit: 100 });
        assert_eq!(Page::new(Some(-3), Some(0)), Page { page: 1, limit: 1 });
    }

    #[test]
    fn skip_and_pages() {
        let page = Page::new(Some(3), Some(10));
        assert_eq!(page.skip(), 20);
        assert_eq!(page.info(21).pages, 3);
        assert_eq!(page.info(0).pages, 0);

        let far = Page::new(Some(i64::MAX), Some(100));
        assert_eq!(far.skip(), i64::MAX as u64);
    }
}
