//! Slicing ordered listings into fixed-size pages.
//!
//! Resolution of the requested page is lenient: a missing or garbled page number yields the
//! first page and a number past the end yields the last one, so a listing never 404s because
//! of its `page` parameter.

use std::num::NonZeroU32;

pub const DEFAULT_PER_PAGE: NonZeroU32 = NonZeroU32::new(10).unwrap();

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct Paginator {
    per_page: NonZeroU32,
}

/// The slice of a listing that has to be fetched for one page.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct PageWindow {
    pub number: u32,
    pub num_pages: u32,
    pub count: u64,
    pub limit: u32,
    pub offset: u64,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: u32,
    pub num_pages: u32,
    pub count: u64,
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(DEFAULT_PER_PAGE)
    }
}

impl Paginator {
    #[must_use]
    pub fn new(per_page: NonZeroU32) -> Self {
        Self { per_page }
    }

    /// Number of pages for `count` items. Never less than one.
    #[must_use]
    pub fn num_pages(self, count: u64) -> u32 {
        let pages = count.div_ceil(u64::from(self.per_page.get())).max(1);
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    /// Picks the page to show for a raw `page` query value.
    #[must_use]
    pub fn window(self, requested: Option<&str>, count: u64) -> PageWindow {
        let num_pages = self.num_pages(count);
        let number = match requested.map(str::trim).map(str::parse::<i64>) {
            Some(Ok(n)) if n > i64::from(num_pages) => num_pages,
            Some(Ok(n)) if n >= 1 => u32::try_from(n).unwrap_or(num_pages),
            _ => 1,
        };

        PageWindow {
            number,
            num_pages,
            count,
            limit: self.per_page.get(),
            offset: u64::from(number - 1) * u64::from(self.per_page.get()),
        }
    }
}

impl PageWindow {
    #[must_use]
    pub fn into_page<T>(self, items: Vec<T>) -> Page<T> {
        Page {
            items,
            number: self.number,
            num_pages: self.num_pages,
            count: self.count,
        }
    }
}

impl<T> Page<T> {
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    #[must_use]
    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    #[must_use]
    pub fn next_page_number(&self) -> Option<u32> {
        self.has_next().then_some(self.number + 1)
    }

    #[must_use]
    pub fn previous_page_number(&self) -> Option<u32> {
        self.has_previous().then(|| self.number - 1)
    }
}

impl<'a, T> IntoIterator for &'a Page<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use crate::pagination::{PageWindow, Paginator};
    use std::num::NonZeroU32;

    fn paginator() -> Paginator {
        Paginator::new(NonZeroU32::new(10).unwrap())
    }

    #[test]
    fn page_count() {
        assert_eq!(paginator().num_pages(0), 1);
        assert_eq!(paginator().num_pages(10), 1);
        assert_eq!(paginator().num_pages(11), 2);
        assert_eq!(paginator().num_pages(13), 2);
    }

    #[test]
    fn windows_over_thirteen_items() {
        assert_eq!(
            paginator().window(None, 13),
            PageWindow {
                number: 1,
                num_pages: 2,
                count: 13,
                limit: 10,
                offset: 0,
            }
        );

        let second = paginator().window(Some("2"), 13);
        assert_eq!(second.number, 2);
        assert_eq!(second.offset, 10);
    }

    #[test]
    fn lenient_page_numbers() {
        let paginator = paginator();

        assert_eq!(paginator.window(Some("abc"), 13).number, 1);
        assert_eq!(paginator.window(Some(""), 13).number, 1);
        assert_eq!(paginator.window(Some("0"), 13).number, 1);
        assert_eq!(paginator.window(Some("-4"), 13).number, 1);
        assert_eq!(paginator.window(Some("99"), 13).number, 2);
        assert_eq!(paginator.window(Some("99999999999999"), 13).number, 2);
        assert_eq!(paginator.window(Some("3"), 0).number, 1);
    }

    #[test]
    fn page_navigation() {
        let paginator = paginator();

        let first = paginator.window(Some("1"), 25).into_page(vec![(); 10]);
        assert_eq!(first.previous_page_number(), None);
        assert_eq!(first.next_page_number(), Some(2));

        let last = paginator.window(Some("3"), 25).into_page(vec![(); 5]);
        assert_eq!(last.len(), 5);
        assert_eq!(last.previous_page_number(), Some(2));
        assert_eq!(last.next_page_number(), None);

        let empty = paginator.window(None, 0).into_page(Vec::<()>::new());
        assert!(empty.is_empty());
        assert!(!empty.has_next());
        assert!(!empty.has_previous());
    }
}
