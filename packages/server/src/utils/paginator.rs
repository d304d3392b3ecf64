use sea_orm::{ConnectionTrait, DbErr, EntityTrait, PaginatorTrait, Select};
use serde::Serialize;

/// Position of one page within a paginated collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageMeta {
    /// 1-based page number actually served.
    pub number: u64,
    /// Total number of pages, at least 1 even for an empty collection.
    pub num_pages: u64,
    /// Total number of items across all pages.
    pub count: u64,
}

impl PageMeta {
    /// Resolve a raw `?page=` value against a collection of `count` items.
    ///
    /// Anything that is not an integer serves the first page; integers outside
    /// `1..=num_pages` serve the last page.
    pub fn resolve(requested: Option<&str>, count: u64, per_page: u64) -> Self {
        let num_pages = count.div_ceil(per_page.max(1)).max(1);
        let number = match requested.map(str::trim) {
            None | Some("") => 1,
            Some(raw) => match raw.parse::<i64>() {
                Ok(n) if n >= 1 && (n as u64) <= num_pages => n as u64,
                Ok(_) => num_pages,
                // Integer syntax that overflows is still just out of range.
                Err(_) if is_integer_literal(raw) => num_pages,
                Err(_) => 1,
            },
        };
        Self {
            number,
            num_pages,
            count,
        }
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }
}

fn is_integer_literal(raw: &str) -> bool {
    let digits = raw.strip_prefix(['-', '+']).unwrap_or(raw);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

/// One page of items plus the metadata listing templates need.
#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    pub object_list: Vec<T>,
    pub number: u64,
    pub num_pages: u64,
    pub count: u64,
    pub has_next: bool,
    pub has_previous: bool,
    pub next_page_number: Option<u64>,
    pub previous_page_number: Option<u64>,
}

impl<T> Paginated<T> {
    pub fn new(object_list: Vec<T>, meta: PageMeta) -> Self {
        Self {
            object_list,
            number: meta.number,
            num_pages: meta.num_pages,
            count: meta.count,
            has_next: meta.has_next(),
            has_previous: meta.has_previous(),
            next_page_number: meta.has_next().then(|| meta.number + 1),
            previous_page_number: meta.has_previous().then(|| meta.number - 1),
        }
    }

    /// Replace the items while keeping the page position.
    pub fn with_items<U>(self, object_list: Vec<U>) -> Paginated<U> {
        Paginated {
            object_list,
            number: self.number,
            num_pages: self.num_pages,
            count: self.count,
            has_next: self.has_next,
            has_previous: self.has_previous,
            next_page_number: self.next_page_number,
            previous_page_number: self.previous_page_number,
        }
    }
}

/// Count an ordered query and resolve a raw `?page=` value against it.
pub async fn resolve_page<'db, C, E>(
    db: &'db C,
    select: Select<E>,
    per_page: u64,
    requested: Option<&str>,
) -> Result<PageMeta, DbErr>
where
    C: ConnectionTrait,
    E: EntityTrait,
    E::Model: Send + Sync + 'db,
{
    let count = select.count(db).await?;
    Ok(PageMeta::resolve(requested, count, per_page))
}

/// Fetch the page `meta` points at.
pub async fn fetch_page<'db, C, E>(
    db: &'db C,
    select: Select<E>,
    per_page: u64,
    meta: PageMeta,
) -> Result<Paginated<E::Model>, DbErr>
where
    C: ConnectionTrait,
    E: EntityTrait,
    E::Model: Send + Sync + 'db,
{
    let items = select
        .paginate(db, per_page.max(1))
        .fetch_page(meta.number - 1)
        .await?;
    Ok(Paginated::new(items, meta))
}
