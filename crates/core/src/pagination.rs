use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl Default for SortOrder {
    fn default() -> Self {
        Self::Asc
    }
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

fn default_page() -> u32 {
    1
}

fn default_size() -> u32 {
    50
}

pub const MAX_PAGE_SIZE: u32 = 100;

/// Query-string parameters shared by every listing route.
#[derive(Debug, Clone, Deserialize)]
pub struct PageParams {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_size")]
    pub size: u32,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub order_by: Option<String>,
    #[serde(default)]
    pub order: SortOrder,
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            size: default_size(),
            search: None,
            order_by: None,
            order: SortOrder::default(),
        }
    }
}

impl PageParams {
    /// Clamps `size` into `1..=MAX_PAGE_SIZE` and `page` to at least 1.
    pub fn normalized(&self) -> Self {
        Self {
            page: self.page.max(1),
            size: self.size.clamp(1, MAX_PAGE_SIZE),
            search: self.search.clone(),
            order_by: self.order_by.clone(),
            order: self.order,
        }
    }

    pub fn offset(&self) -> i64 {
        let normalized = self.normalized();
        ((normalized.page - 1) * normalized.size) as i64
    }

    pub fn limit(&self) -> i64 {
        self.normalized().size as i64
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub size: u32,
    pub pages: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, params: &PageParams) -> Self {
        let normalized = params.normalized();
        let pages = if total <= 0 {
            0
        } else {
            ((total as u64).div_ceil(normalized.size as u64)) as u32
        };
        Self {
            items,
            total,
            page: normalized.page,
            size: normalized.size,
            pages,
        }
    }
}
