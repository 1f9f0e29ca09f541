use serde::Serialize;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    pub count: i64,
    pub per_page: i64,
    pub num_pages: i64,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: i64,
    pub has_next: bool,
    pub has_previous: bool,
    #[serde(skip)]
    pub offset: i64,
    #[serde(skip)]
    pub limit: i64,
}

impl Paginator {
    pub fn new(count: i64, per_page: i64) -> Self {
        let per_page = per_page.max(1);
        let num_pages = if count <= 0 {
            1 // an empty listing still has one (empty) page
        } else {
            (count + per_page - 1) / per_page
        };
        Self {
            count: count.max(0),
            per_page,
            num_pages,
        }
    }

    /// Resolves a raw `page` parameter: garbage means the first page, numbers
    /// past the end mean the last one.
    pub fn page(&self, requested: Option<&str>) -> Page {
        let number = match requested.map(str::trim).map(str::parse::<i64>) {
            Some(Ok(n)) if n > self.num_pages => self.num_pages,
            Some(Ok(n)) if n >= 1 => n,
            _ => 1,
        };
        Page {
            number,
            has_next: number < self.num_pages,
            has_previous: number > 1,
            offset: (number - 1) * self.per_page,
            limit: self.per_page,
        }
    }
}
