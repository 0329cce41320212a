//! Translation of raw query parameters into list and search requests.

use serde::Deserialize;

use super::error::{BookError, BookResult};
use super::models::Book;

pub const DEFAULT_SORT: &str = "id";
pub const DEFAULT_ORDER: &str = "asc";
pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PER_PAGE: u32 = 10;

/// Columns a listing may be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Id,
    Title,
    Author,
    Year,
    Isbn,
    CreatedAt,
}

impl SortField {
    /// Resolve a field name; unknown names yield `None`.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "id" => Some(Self::Id),
            "title" => Some(Self::Title),
            "author" => Some(Self::Author),
            "year" => Some(Self::Year),
            "isbn" => Some(Self::Isbn),
            "created_at" => Some(Self::CreatedAt),
            _ => None,
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Title => "title",
            Self::Author => "author",
            Self::Year => "year",
            Self::Isbn => "isbn",
            Self::CreatedAt => "created_at",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// Anything other than `desc` (any case) sorts ascending.
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("desc") {
            Self::Desc
        } else {
            Self::Asc
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Raw `GET /api/books` query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub sort: Option<String>,
    pub order: Option<String>,
    pub page: Option<String>,
    pub per_page: Option<String>,
}

/// A sorted, paginated listing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    /// `None` keeps storage order
    pub sort: Option<SortField>,
    pub order: SortOrder,
    pub page: u32,
    pub per_page: u32,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            sort: Some(SortField::Id),
            order: SortOrder::Asc,
            page: DEFAULT_PAGE,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl ListQuery {
    /// Lenient parse: bad numbers fall back to defaults, unknown sort fields
    /// disable sorting.
    pub fn from_params(params: &ListParams) -> Self {
        let sort = params.sort.as_deref().unwrap_or(DEFAULT_SORT);
        let order = params.order.as_deref().unwrap_or(DEFAULT_ORDER);

        let page = parse_number(params.page.as_deref())
            .map(|page| page.clamp(1, i64::from(u32::MAX)) as u32)
            .unwrap_or(DEFAULT_PAGE);
        let per_page = parse_number(params.per_page.as_deref())
            .filter(|per_page| *per_page >= 1)
            .map(|per_page| per_page.min(i64::from(u32::MAX)) as u32)
            .unwrap_or(DEFAULT_PER_PAGE);

        Self {
            sort: SortField::parse(sort),
            order: SortOrder::parse(order),
            page,
            per_page,
        }
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.per_page)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)).saturating_mul(i64::from(self.per_page))
    }
}

fn parse_number(value: Option<&str>) -> Option<i64> {
    value.and_then(|v| v.trim().parse().ok())
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq)]
pub struct BookPage {
    pub books: Vec<Book>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
}

impl BookPage {
    pub fn total_pages(&self) -> i64 {
        if self.total <= 0 || self.per_page == 0 {
            return 0;
        }
        let per_page = i64::from(self.per_page);
        (self.total + per_page - 1) / per_page
    }
}

/// Raw `GET /api/books/search` query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub author: Option<String>,
    pub year: Option<String>,
}

/// Conjunctive search filters; `None` means unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilter {
    /// Partial, case-insensitive match on title
    pub title: Option<String>,
    /// Partial, case-insensitive match on author
    pub author: Option<String>,
    pub year: Option<i64>,
}

impl SearchFilter {
    /// Empty parameters are ignored; a non-numeric year is rejected.
    pub fn from_params(params: SearchParams) -> BookResult<Self> {
        let year = match params.year.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(raw.parse().map_err(|_| BookError::InvalidYear)?),
        };

        Ok(Self {
            title: params.q.filter(|q| !q.is_empty()),
            author: params.author.filter(|a| !a.is_empty()),
            year,
        })
    }
}
