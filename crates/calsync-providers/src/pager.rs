//! Paginated calendar listing.
//!
//! A [`CalendarListSource`] fetches one page of the calendar list. The
//! [`CalendarPager`] walks the pages lazily, strictly one after another, and
//! [`list_calendars`] drains it into a single vector.

use calsync_core::{CalendarEntry, PageToken};
use tracing::debug;

use crate::credential::Credential;
use crate::error::ProviderResult;
use crate::flow::BoxFuture;

/// One page of the calendar list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalendarListPage {
    /// Entries in provider order.
    pub items: Vec<CalendarEntry>,
    /// Cursor for the following page; `None` on the last page.
    pub next_page_token: Option<PageToken>,
}

/// Fetches single pages of the user's calendar list.
pub trait CalendarListSource {
    /// Fetches the page identified by `page_token`, or the first page.
    ///
    /// # Errors
    ///
    /// Returns an API error for non-success responses, failed requests, or
    /// payloads without an item list.
    fn fetch_page<'a>(
        &'a self,
        credential: &'a Credential,
        page_token: Option<&'a PageToken>,
    ) -> BoxFuture<'a, ProviderResult<CalendarListPage>>;
}

impl<S: CalendarListSource + ?Sized> CalendarListSource for &S {
    fn fetch_page<'a>(
        &'a self,
        credential: &'a Credential,
        page_token: Option<&'a PageToken>,
    ) -> BoxFuture<'a, ProviderResult<CalendarListPage>> {
        (**self).fetch_page(credential, page_token)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum PagerState {
    Start,
    Next(PageToken),
    Done,
}

/// A lazy, restartable walk over the calendar list.
///
/// Each call to [`next_page`](Self::next_page) issues exactly one request.
/// After the last page, or after an error, the pager stays finished until
/// [`reset`](Self::reset) is called.
#[derive(Debug)]
pub struct CalendarPager<'a, S> {
    source: S,
    credential: &'a Credential,
    state: PagerState,
    pages_fetched: usize,
}

impl<'a, S: CalendarListSource> CalendarPager<'a, S> {
    pub fn new(source: S, credential: &'a Credential) -> Self {
        Self {
            source,
            credential,
            state: PagerState::Start,
            pages_fetched: 0,
        }
    }

    /// Fetches the next page.
    ///
    /// Returns `Ok(None)` once the list is exhausted.
    pub async fn next_page(&mut self) -> ProviderResult<Option<Vec<CalendarEntry>>> {
        let token = match &self.state {
            PagerState::Done => return Ok(None),
            PagerState::Start => None,
            PagerState::Next(token) => Some(token.clone()),
        };

        let result = self
            .source
            .fetch_page(self.credential, token.as_ref())
            .await;

        let page = match result {
            Ok(page) => page,
            Err(e) => {
                self.state = PagerState::Done;
                return Err(e);
            }
        };

        self.pages_fetched += 1;
        debug!(
            page = self.pages_fetched,
            items = page.items.len(),
            has_more = page.next_page_token.is_some(),
            "fetched calendar list page"
        );

        self.state = match page.next_page_token {
            Some(next) => PagerState::Next(next),
            None => PagerState::Done,
        };

        Ok(Some(page.items))
    }

    /// Restarts from the first page.
    pub fn reset(&mut self) {
        self.state = PagerState::Start;
        self.pages_fetched = 0;
    }

    /// Returns true once the last page has been fetched or a fetch failed.
    pub fn is_done(&self) -> bool {
        self.state == PagerState::Done
    }

    /// Number of pages fetched since creation or the last reset.
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }
}

/// Lists every calendar, following continuation cursors until none is left.
///
/// Nothing is returned unless every page succeeds.
pub async fn list_calendars<S: CalendarListSource>(
    source: S,
    credential: &Credential,
) -> ProviderResult<Vec<CalendarEntry>> {
    let mut pager = CalendarPager::new(source, credential);
    let mut calendars = Vec::new();

    while let Some(items) = pager.next_page().await? {
        calendars.extend(items);
    }

    debug!(
        "listed {} calendars in {} pages",
        calendars.len(),
        pager.pages_fetched()
    );
    Ok(calendars)
}
