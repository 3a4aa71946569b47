use serde::Deserialize;
use utoipa::IntoParams;

const DEFAULT_PER_PAGE: u32 = 20;
const MAX_PER_PAGE: u32 = 100;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct PageQuery {
    /// Page number, starting with 1
    pub page: Option<u32>,
    /// Items per page (max 100)
    pub per_page: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Page {
    pub page: u32,
    pub per_page: u32,
    pub offset: u64,
}

impl PageQuery {
    pub fn page(&self) -> Page {
        Page::new(self.page, self.per_page)
    }
}

impl Page {
    pub fn new(page: Option<u32>, per_page: Option<u32>) -> Self {
        let page = page.unwrap_or(1).max(1);
        let per_page = per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE);
        let offset = (page as u64 - 1) * per_page as u64;
        Self { page, per_page, offset }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_first_page() {
        assert_eq!(
            Page::new(None, None),
            Page { page: 1, per_page: 20, offset: 0 }
        );
    }

    #[test]
    fn clamps_out_of_range_values() {
        let page = Page::new(Some(0), Some(1000));
        assert_eq!(page.page, 1);
        assert_eq!(page.per_page, 100);

        assert_eq!(Page::new(Some(3), Some(0)).per_page, 1);
    }

    #[test]
    fn offset_does_not_overflow_u32() {
        let page = Page::new(Some(u32::MAX), Some(100));
        assert_eq!(page.offset, (u32::MAX as u64 - 1) * 100);
    }
}
