//! Marker-based pagination
//!
//! [`Pager`] presents any number of server pages as one forward-only
//! sequence. It is an explicit state machine: it holds the undelivered
//! entries of the current page plus the marker for the next one, and only
//! replaces that state once a new page has been fetched and parsed.

use crate::api::client::{with_query, BoxClient};
use crate::api::error::{Error, Result};
use futures::stream::{self, Stream};
use serde::Deserialize;
use serde_json::Value;
use std::collections::VecDeque;
use std::future::Future;
use std::marker::PhantomData;

/// One page of a paginated response
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub entries: Vec<Value>,
    #[serde(default)]
    pub next_marker: Option<String>,
}

impl Page {
    pub fn new(entries: Vec<Value>, next_marker: Option<&str>) -> Self {
        Self {
            entries,
            next_marker: next_marker.map(|s| s.to_string()),
        }
    }

    /// Parse a page from a response body
    /// An empty `next_marker` is treated the same as a missing one
    pub fn from_response(response: Value) -> Result<Self> {
        if !response.is_object() {
            return Err(Error::Decode(
                "Expected a page object with an 'entries' array".to_string(),
            ));
        }

        let mut page: Page = serde_json::from_value(response)?;
        if page.next_marker.as_deref().is_some_and(|m| m.is_empty()) {
            page.next_marker = None;
        }
        Ok(page)
    }
}

/// Decodes one raw page entry into a typed value
pub trait PageEntry: Sized {
    fn from_entry(entry: Value) -> Result<Self>;
}

impl PageEntry for Value {
    fn from_entry(entry: Value) -> Result<Self> {
        Ok(entry)
    }
}

/// Fetches a page for a given marker (`None` for the first page)
///
/// Implementations reissue the original request with only the marker
/// substituted.
pub trait PageSource {
    fn fetch_page(&self, marker: Option<&str>) -> impl Future<Output = Result<Page>> + Send;
}

enum State {
    Holding {
        entries: VecDeque<Value>,
        marker: Option<String>,
    },
    Exhausted,
}

impl State {
    fn holding(page: Page) -> Self {
        State::Holding {
            entries: page.entries.into(),
            marker: page.next_marker,
        }
    }
}

/// Forward-only lazy sequence over paginated results
///
/// Not restartable. `next` takes `&mut self`, so concurrent consumers must
/// serialize access themselves.
pub struct Pager<T, S> {
    source: S,
    state: State,
    pages_fetched: usize,
    _entry: PhantomData<fn() -> T>,
}

impl<T, S> Pager<T, S>
where
    T: PageEntry,
    S: PageSource,
{
    /// Wrap an already fetched first page
    pub fn new(source: S, first_page: Page) -> Self {
        Self {
            source,
            state: State::holding(first_page),
            pages_fetched: 1,
            _entry: PhantomData,
        }
    }

    /// Fetch the first page (starting from `marker`, if given) and wrap it
    pub async fn start(source: S, marker: Option<&str>) -> Result<Self> {
        let first_page = source.fetch_page(marker).await?;
        Ok(Self::new(source, first_page))
    }

    /// Next decoded entry, fetching the next page when the current one runs out
    ///
    /// Returns `None` once the last page (no marker) is drained; no request is
    /// made at that point. A failed fetch leaves the pager untouched, so
    /// calling `next` again retries the same page. An entry that fails to
    /// decode is reported and skipped. An empty page that hands back the
    /// marker it was requested with is a `Decode` error, since following it
    /// would never advance.
    pub async fn next(&mut self) -> Option<Result<T>> {
        loop {
            let marker = match &mut self.state {
                State::Exhausted => return None,
                State::Holding { entries, marker } => {
                    if let Some(entry) = entries.pop_front() {
                        return Some(T::from_entry(entry));
                    }
                    marker.clone()
                }
            };

            let Some(marker) = marker else {
                tracing::debug!("Pager exhausted after {} page(s)", self.pages_fetched);
                self.state = State::Exhausted;
                return None;
            };

            tracing::debug!("Fetching page {}", self.pages_fetched + 1);
            match self.source.fetch_page(Some(&marker)).await {
                Ok(page)
                    if page.entries.is_empty()
                        && page.next_marker.as_deref() == Some(marker.as_str()) =>
                {
                    tracing::warn!("Empty page repeated marker {}, not following it", marker);
                    return Some(Err(Error::Decode(format!(
                        "Empty page returned its own marker '{}'",
                        marker
                    ))));
                }
                Ok(page) => {
                    self.pages_fetched += 1;
                    self.state = State::holding(page);
                }
                Err(e) => {
                    tracing::warn!("Page fetch failed, marker retained: {}", e);
                    return Some(Err(e));
                }
            }
        }
    }

    /// Drain every remaining entry, stopping at the first error
    pub async fn collect_all(mut self) -> Result<Vec<T>> {
        let mut items = Vec::new();
        while let Some(item) = self.next().await {
            items.push(item?);
        }
        Ok(items)
    }

    /// Adapt into a `Stream` of results
    pub fn into_stream(self) -> impl Stream<Item = Result<T>> {
        stream::unfold(self, |mut pager| async move {
            pager.next().await.map(|item| (item, pager))
        })
    }

    /// Marker for the page after the current one, if any
    pub fn next_marker(&self) -> Option<&str> {
        match &self.state {
            State::Holding { marker, .. } => marker.as_deref(),
            State::Exhausted => None,
        }
    }

    /// Entries of the current page not yet returned
    pub fn buffered(&self) -> usize {
        match &self.state {
            State::Holding { entries, .. } => entries.len(),
            State::Exhausted => 0,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self.state, State::Exhausted)
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }
}

/// GET listing paginated with `limit` and `marker` query parameters
#[derive(Clone, Debug)]
pub struct ListSource {
    client: BoxClient,
    url: String,
    limit: Option<u32>,
    params: Vec<(String, String)>,
}

impl ListSource {
    pub fn new(client: &BoxClient, url: String, limit: Option<u32>) -> Self {
        Self {
            client: client.clone(),
            url,
            limit,
            params: Vec::new(),
        }
    }

    /// Add a fixed query parameter sent with every page request
    pub fn with_param(mut self, key: &str, value: &str) -> Self {
        self.params.push((key.to_string(), value.to_string()));
        self
    }

    fn page_url(&self, marker: Option<&str>) -> String {
        let mut params: Vec<(&str, String)> = self
            .params
            .iter()
            .map(|(k, v)| (k.as_str(), v.clone()))
            .collect();

        if let Some(limit) = self.limit {
            params.push(("limit", limit.to_string()));
        }
        if let Some(marker) = marker {
            params.push(("marker", marker.to_string()));
        }

        with_query(&self.url, &params)
    }
}

impl PageSource for ListSource {
    async fn fetch_page(&self, marker: Option<&str>) -> Result<Page> {
        let response = self.client.get(&self.page_url(marker)).await?;
        Page::from_response(response)
    }
}
