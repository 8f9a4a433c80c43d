//! Client-side filtering, sorting and paging of the message list

use msgdesk_core::Message;
use serde::{Deserialize, Serialize};

/// Most page links shown at once
pub const MAX_VISIBLE_PAGES: usize = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    #[default]
    Id,
    Code,
    Content,
}

impl std::fmt::Display for SortField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortField::Id => write!(f, "id"),
            SortField::Code => write!(f, "code"),
            SortField::Content => write!(f, "content"),
        }
    }
}

impl std::str::FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "id" => Ok(SortField::Id),
            "code" => Ok(SortField::Code),
            "content" => Ok(SortField::Content),
            _ => Err(format!("Unknown sort field: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn reversed(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

/// What the list view currently shows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListQuery {
    pub search: String,
    pub sort_field: SortField,
    pub sort_direction: SortDirection,
    /// 1-based
    pub page: usize,
    pub page_size: usize,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            search: String::new(),
            sort_field: SortField::default(),
            sort_direction: SortDirection::default(),
            page: 1,
            page_size: 10,
        }
    }
}

impl ListQuery {
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            page_size,
            ..Default::default()
        }
    }

    /// Sort by `field`; picking the current field again flips the direction
    pub fn toggle_sort(&mut self, field: SortField) {
        if self.sort_field == field {
            self.sort_direction = self.sort_direction.reversed();
        } else {
            self.sort_field = field;
            self.sort_direction = SortDirection::Asc;
        }
    }

    /// Change the search text and go back to the first page
    pub fn set_search(&mut self, search: impl Into<String>) {
        self.search = search.into();
        self.page = 1;
    }

    /// Change the page size and go back to the first page
    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size;
        self.page = 1;
    }

    fn matches(&self, message: &Message) -> bool {
        let needle = self.search.trim().to_lowercase();
        needle.is_empty()
            || message.code.to_lowercase().contains(&needle)
            || message.content.to_lowercase().contains(&needle)
    }

    /// Filter, sort and cut out the requested page
    pub fn apply(&self, messages: &[Message]) -> ListPage {
        let mut items: Vec<Message> = messages
            .iter()
            .filter(|m| self.matches(m))
            .cloned()
            .collect();

        items.sort_by(|a, b| {
            let ordering = match self.sort_field {
                SortField::Id => a.id.cmp(&b.id),
                SortField::Code => a.code.cmp(&b.code),
                SortField::Content => a.content.cmp(&b.content),
            };
            match self.sort_direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });

        let page_size = self.page_size.max(1);
        let total_items = items.len();
        let total_pages = total_items.div_ceil(page_size).max(1);
        let page = self.page.clamp(1, total_pages);

        let start = (page - 1) * page_size;
        let end = (start + page_size).min(total_items);
        let items: Vec<Message> = items.drain(start.min(end)..end).collect();

        ListPage {
            start_item: if total_items == 0 { 0 } else { start + 1 },
            end_item: end,
            items,
            page,
            page_size,
            total_items,
            total_pages,
        }
    }
}

/// One page of the list plus what the footer needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListPage {
    pub items: Vec<Message>,
    pub page: usize,
    pub page_size: usize,
    pub total_items: usize,
    pub total_pages: usize,
    /// 1-based index of the first item shown, 0 when nothing matches
    pub start_item: usize,
    pub end_item: usize,
}

impl ListPage {
    pub fn page_window(&self) -> Vec<PageItem> {
        page_window(self.page, self.total_pages)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageItem {
    Page(usize),
    Ellipsis,
}

impl std::fmt::Display for PageItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PageItem::Page(n) => write!(f, "{}", n),
            PageItem::Ellipsis => write!(f, "..."),
        }
    }
}

/// Page links around `current`, first and last always included
pub fn page_window(current: usize, total: usize) -> Vec<PageItem> {
    use PageItem::{Ellipsis, Page};

    if total <= MAX_VISIBLE_PAGES {
        return (1..=total).map(Page).collect();
    }

    let current = current.clamp(1, total);
    if current <= 3 {
        let mut items: Vec<PageItem> = (1..=4).map(Page).collect();
        items.extend([Ellipsis, Page(total)]);
        items
    } else if current >= total - 2 {
        let mut items = vec![Page(1), Ellipsis];
        items.extend((total - 3..=total).map(Page));
        items
    } else {
        vec![
            Page(1),
            Ellipsis,
            Page(current - 1),
            Page(current),
            Page(current + 1),
            Ellipsis,
            Page(total),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::PageItem::{Ellipsis, Page};
    use super::*;

    fn message(id: i64, code: &str, content: &str) -> Message {
        Message {
            id,
            code: code.to_string(),
            content: content.to_string(),
            created_at: None,
            updated_at: None,
        }
    }

    fn sample() -> Vec<Message> {
        vec![
            message(3, "GREETING", "Hello world"),
            message(1, "FAREWELL", "Goodbye"),
            message(2, "ERR_404", "Page not found"),
            message(4, "WELCOME", "hello again"),
        ]
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let mut query = ListQuery::default();
        query.set_search("HELLO");
        let page = query.apply(&sample());
        let ids: Vec<i64> = page.items.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![3, 4]);

        query.set_search("err");
        assert_eq!(query.apply(&sample()).total_items, 1);
    }

    #[test]
    fn test_sort_and_toggle() {
        let mut query = ListQuery::default();
        let ids = |q: &ListQuery| q.apply(&sample()).items.iter().map(|m| m.id).collect::<Vec<_>>();
        assert_eq!(ids(&query), vec![1, 2, 3, 4]);

        query.toggle_sort(SortField::Id);
        assert_eq!(query.sort_direction, SortDirection::Desc);
        assert_eq!(ids(&query), vec![4, 3, 2, 1]);

        query.toggle_sort(SortField::Code);
        assert_eq!(query.sort_direction, SortDirection::Asc);
        assert_eq!(ids(&query), vec![2, 1, 3, 4]);
    }

    #[test]
    fn test_paging_clamps() {
        let mut query = ListQuery::with_page_size(3);
        query.page = 9;
        let page = query.apply(&sample());
        assert_eq!(page.page, 2);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.items.len(), 1);
        assert_eq!((page.start_item, page.end_item), (4, 4));
    }

    #[test]
    fn test_empty_list() {
        let page = ListQuery::default().apply(&[]);
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.page, 1);
        assert_eq!((page.start_item, page.end_item), (0, 0));
        assert!(page.items.is_empty());
    }

    #[test]
    fn test_page_window() {
        assert_eq!(page_window(2, 3), vec![Page(1), Page(2), Page(3)]);
        assert_eq!(
            page_window(2, 10),
            vec![Page(1), Page(2), Page(3), Page(4), Ellipsis, Page(10)]
        );
        assert_eq!(
            page_window(9, 10),
            vec![Page(1), Ellipsis, Page(7), Page(8), Page(9), Page(10)]
        );
        assert_eq!(
            page_window(5, 10),
            vec![Page(1), Ellipsis, Page(4), Page(5), Page(6), Ellipsis, Page(10)]
        );
    }
}
