//! Sorted, windowed listing of object sets.
//!
//! Summaries are the costly part of a listing, so sorting by token formats
//! only the entries that land on the requested page. Sorting by summary has
//! to format everything before it can order the entries.

use crate::token::ObjectToken;
use serde::{Deserialize, Serialize};

/// Number of entries per page.
pub const PAGE_SIZE: usize = 500;

/// Column a listing is sorted on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    /// Identity token, numeric.
    #[default]
    Token,
    /// Summary text, lexicographic.
    Summary,
}

impl SortField {
    /// Maps the panel's numeric column index; anything but `1` is `Token`.
    pub fn from_index(index: i64) -> Self {
        match index {
            1 => Self::Summary,
            _ => Self::Token,
        }
    }

    /// Numeric column index used by the panel.
    pub fn index(self) -> u8 {
        match self {
            Self::Token => 0,
            Self::Summary => 1,
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDir {
    /// Smallest first.
    #[default]
    Asc,
    /// Largest first.
    Desc,
}

impl SortDir {
    /// Maps the panel's numeric flag: zero is ascending, anything else
    /// descending.
    pub fn from_flag(flag: i64) -> Self {
        if flag == 0 {
            Self::Asc
        } else {
            Self::Desc
        }
    }

    /// Numeric flag used by the panel.
    pub fn flag(self) -> u8 {
        match self {
            Self::Asc => 0,
            Self::Desc => 1,
        }
    }

    /// The other direction.
    pub fn reversed(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

/// How the total page count treats a final partial page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageRounding {
    /// A partial last page counts as a page.
    #[default]
    Ceil,
    /// Only full pages are counted; a trailing partial page is still
    /// reachable by index but not included in the count.
    Floor,
}

impl PageRounding {
    /// Number of pages needed for `total` items.
    pub fn pages(self, total: usize, page_size: usize) -> usize {
        match self {
            Self::Ceil => total.div_ceil(page_size),
            Self::Floor => total / page_size,
        }
    }
}

/// Which window of a listing to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Sort column.
    pub sort: SortField,
    /// Sort direction.
    pub dir: SortDir,
    /// Zero-based page index.
    pub page: usize,
    /// Entries per page. Always at least 1.
    pub page_size: usize,
    /// Page count rounding.
    pub rounding: PageRounding,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            sort: SortField::Token,
            dir: SortDir::Asc,
            page: 0,
            page_size: PAGE_SIZE,
            rounding: PageRounding::Ceil,
        }
    }
}

impl PageRequest {
    /// First page sorted by `sort` in `dir`.
    pub fn new(sort: SortField, dir: SortDir) -> Self {
        Self {
            sort,
            dir,
            ..Default::default()
        }
    }

    /// Selects a page.
    pub fn page(mut self, page: usize) -> Self {
        self.page = page;
        self
    }

    /// Overrides the page size (clamped to at least 1).
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Overrides the page count rounding.
    pub fn with_rounding(mut self, rounding: PageRounding) -> Self {
        self.rounding = rounding;
        self
    }

    fn window(&self, len: usize) -> std::ops::Range<usize> {
        let size = self.page_size.max(1);
        let start = self.page.saturating_mul(size).min(len);
        let end = start.saturating_add(size).min(len);
        start..end
    }
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// `(token, summary)` pairs on this page.
    pub entries: Vec<(ObjectToken, String)>,
    /// Index of this page.
    pub page: usize,
    /// Number of pages in the listing.
    pub total_pages: usize,
    /// Number of entries across all pages.
    pub total_items: usize,
    /// Sort column.
    pub sort: SortField,
    /// Sort direction.
    pub dir: SortDir,
}

impl Page {
    /// True when this page has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Tokens on this page, in order.
    pub fn tokens(&self) -> Vec<ObjectToken> {
        self.entries.iter().map(|(token, _)| *token).collect()
    }
}

/// Sorts `tokens` as requested and returns one window of them, formatting
/// summaries with `summarize`.
///
/// With [`SortField::Token`] only the entries on the returned page are
/// summarized. An out-of-range page is empty, never an error.
pub fn paginate<I, F>(tokens: I, request: &PageRequest, mut summarize: F) -> Page
where
    I: IntoIterator<Item = ObjectToken>,
    F: FnMut(ObjectToken) -> String,
{
    let mut tokens: Vec<ObjectToken> = tokens.into_iter().collect();
    let total_items = tokens.len();

    let entries: Vec<(ObjectToken, String)> = match request.sort {
        SortField::Token => {
            tokens.sort_unstable();
            if request.dir == SortDir::Desc {
                tokens.reverse();
            }
            tokens[request.window(total_items)]
                .iter()
                .map(|&token| (token, summarize(token)))
                .collect()
        }
        SortField::Summary => {
            let mut all: Vec<(ObjectToken, String)> = tokens
                .into_iter()
                .map(|token| (token, summarize(token)))
                .collect();
            all.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
            if request.dir == SortDir::Desc {
                all.reverse();
            }
            let window = request.window(total_items);
            all.drain(window).collect()
        }
    };

    Page {
        entries,
        page: request.page,
        total_pages: request.rounding.pages(total_items, request.page_size.max(1)),
        total_items,
        sort: request.sort,
        dir: request.dir,
    }
}
