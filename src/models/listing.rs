use serde::Deserialize;
use std::future::Future;

use crate::client::RedditClientError;

/// Reddit's generic listing envelope (`{"kind": "Listing", "data": {...}}`)
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Listing<C> {
    pub kind: String,
    pub data: ListingData<C>,
}

/// Page of children plus the cursors around it
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ListingData<C> {
    pub after: Option<String>,
    pub before: Option<String>,
    #[serde(default)]
    pub dist: Option<i32>,
    #[serde(default)]
    pub modhash: Option<String>,
    #[serde(default = "Vec::new")]
    pub children: Vec<C>,
}

/// A single thing with its type prefix (`t1`, `t3`, `t4`, ...)
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Thing<T> {
    pub kind: String,
    pub data: T,
}

impl<C> Listing<C> {
    /// Cursor for the next page, if Reddit returned one
    pub fn after(&self) -> Option<&str> {
        self.data.after.as_deref().filter(|a| !a.is_empty())
    }

    pub fn len(&self) -> usize {
        self.data.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.children.is_empty()
    }
}

impl<T> Listing<Thing<T>> {
    /// Unwrap the children in listing order
    pub fn into_items(self) -> Vec<T> {
        self.data.children.into_iter().map(|t| t.data).collect()
    }
}

/// Query parameters shared by every listing endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct ListingQuery {
    /// Maximum number of items per page (Reddit caps this at 100)
    pub limit: u32,
    pub after: Option<String>,
    pub before: Option<String>,
    /// Number of items already seen, used by Reddit for numbering
    pub count: u32,
    /// Send `show=all`, which disables hide filters
    pub show_all: bool,
    /// Mark messages as read when fetched (message endpoints only)
    pub mark: Option<bool>,
}

impl Default for ListingQuery {
    fn default() -> Self {
        Self {
            limit: 25,
            after: None,
            before: None,
            count: 0,
            show_all: false,
            mark: None,
        }
    }
}

impl ListingQuery {
    pub fn with_limit(limit: u32) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    /// Render as URL query pairs
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("limit", self.limit.min(100).to_string()),
            ("raw_json", "1".to_string()),
        ];
        if let Some(after) = &self.after {
            pairs.push(("after", after.clone()));
        }
        if let Some(before) = &self.before {
            pairs.push(("before", before.clone()));
        }
        if self.count > 0 {
            pairs.push(("count", self.count.to_string()));
        }
        if self.show_all {
            pairs.push(("show", "all".to_string()));
        }
        if let Some(mark) = self.mark {
            pairs.push(("mark", mark.to_string()));
        }
        pairs
    }
}

/// Follow `after` cursors until the listing is exhausted or `max_items` have been collected.
///
/// `fetch` is called once per page with the query for that page. Stops on a missing
/// cursor, an empty page, or a cursor that repeats the previous one.
pub async fn collect_pages<T, F, Fut>(
    mut query: ListingQuery,
    max_items: usize,
    mut fetch: F,
) -> Result<Vec<T>, RedditClientError>
where
    F: FnMut(ListingQuery) -> Fut,
    Fut: Future<Output = Result<Listing<Thing<T>>, RedditClientError>>,
{
    let mut items = Vec::new();

    while items.len() < max_items {
        let page = fetch(query.clone()).await?;
        let next = page.after().map(str::to_string);
        let page_items = page.into_items();
        if page_items.is_empty() {
            break;
        }

        query.count += page_items.len() as u32;
        let remaining = max_items - items.len();
        items.extend(page_items.into_iter().take(remaining));

        match next {
            Some(cursor) if query.after.as_deref() != Some(cursor.as_str()) => {
                query.after = Some(cursor);
            }
            _ => break,
        }
    }

    Ok(items)
}
