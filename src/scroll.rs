//! Scroll cursors: page through a result set with server-held continuation
//! tokens.
//!
//! A [`ScrollCursor`] owns the token of its scroll. Each distinct token the
//! engine hands out is released exactly once: when it is superseded by a
//! different one, when the scroll runs dry, when the cursor is closed or
//! cancelled, or (as a last resort) when the cursor is dropped.

use crate::client::{SearchEngine, SearchRequest};
use crate::error::{EsgenError, Result};
use crate::model::SearchResultPage;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;

static DURATION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+[smh]$").expect("Invalid scroll duration pattern"));

/// Keep-alive for a scroll context, e.g. `30s`, `1m`, `2h`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ScrollDuration(String);

impl ScrollDuration {
    pub fn parse(s: &str) -> Result<Self> {
        if DURATION_PATTERN.is_match(s) {
            Ok(ScrollDuration(s.to_string()))
        } else {
            Err(EsgenError::InvalidScrollDuration(s.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ScrollDuration {
    fn default() -> Self {
        ScrollDuration("1m".to_string())
    }
}

impl fmt::Display for ScrollDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ScrollDuration {
    type Error = EsgenError;

    fn try_from(s: String) -> Result<Self> {
        ScrollDuration::parse(&s)
    }
}

impl From<ScrollDuration> for String {
    fn from(d: ScrollDuration) -> String {
        d.0
    }
}

/// Fires a [`CancelSignal`].
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

/// Observed by a cursor to stop early.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    pub fn pair() -> (CancelHandle, CancelSignal) {
        let (tx, rx) = watch::channel(false);
        (CancelHandle { tx: Arc::new(tx) }, CancelSignal { rx })
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancelled. Never resolves if every handle is dropped
    /// without cancelling.
    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CursorState {
    /// Initial query not yet issued.
    Pending,
    Open,
    Done,
}

/// Totals of a drained cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ScrollSummary {
    pub pages: usize,
    pub items: usize,
}

pub struct ScrollCursor<E: SearchEngine + 'static> {
    engine: Arc<E>,
    request: SearchRequest,
    keep_alive: ScrollDuration,
    state: CursorState,
    token: Option<String>,
    released: HashSet<String>,
    cancel: Option<CancelSignal>,
    pages: usize,
}

impl<E: SearchEngine + 'static> ScrollCursor<E> {
    /// Prepare a cursor. No request is made until [`Self::next_page`].
    pub fn open(engine: Arc<E>, request: SearchRequest, keep_alive: ScrollDuration) -> Self {
        ScrollCursor {
            engine,
            request: request.scroll(keep_alive.clone()),
            keep_alive,
            state: CursorState::Pending,
            token: None,
            released: HashSet::new(),
            cancel: None,
            pages: 0,
        }
    }

    pub fn with_cancel(mut self, signal: CancelSignal) -> Self {
        self.cancel = Some(signal);
        self
    }

    pub fn is_done(&self) -> bool {
        self.state == CursorState::Done
    }

    /// The continuation token currently held, if any.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Fetch the next non-empty page, or `Ok(None)` once the scroll is
    /// exhausted or cancelled. The held token has been released by the time
    /// `None` or an error is returned.
    pub async fn next_page(&mut self) -> Result<Option<SearchResultPage>> {
        if self.state == CursorState::Done {
            return Ok(None);
        }
        if self.cancel.as_ref().is_some_and(CancelSignal::is_cancelled) {
            tracing::info!("[scroll] cancelled after {} pages", self.pages);
            self.finish().await;
            return Ok(None);
        }

        let fetched = {
            let fetch = fetch_page(
                self.engine.as_ref(),
                &self.request,
                &self.keep_alive,
                self.token.as_deref(),
            );
            match self.cancel.as_mut() {
                Some(signal) => tokio::select! {
                    biased;
                    _ = signal.cancelled() => None,
                    page = fetch => Some(page),
                },
                None => Some(fetch.await),
            }
        };

        let page = match fetched {
            None => {
                tracing::info!("[scroll] cancelled after {} pages", self.pages);
                self.finish().await;
                return Ok(None);
            }
            Some(Err(e)) => {
                tracing::warn!("[scroll] request failed after {} pages: {}", self.pages, e);
                self.finish().await;
                return Err(e);
            }
            Some(Ok(page)) => page,
        };

        self.state = CursorState::Open;
        if let Some(new_token) = page.scroll_id.clone() {
            if let Some(old) = self.token.replace(new_token.clone()) {
                if old != new_token {
                    self.release(old).await;
                }
            }
        }

        if self.token.is_none() && !page.is_empty() {
            tracing::warn!("[scroll] page {} carried no scroll id", self.pages + 1);
            self.finish().await;
            return Err(EsgenError::Http(
                "search response has hits but no _scroll_id to continue from".into(),
            ));
        }

        if page.is_empty() {
            tracing::debug!("[scroll] exhausted after {} pages", self.pages);
            self.finish().await;
            return Ok(None);
        }

        self.pages += 1;
        tracing::debug!(
            "[scroll] page {} with {} items",
            self.pages,
            page.items.len()
        );
        Ok(Some(page))
    }

    /// Stop early and release the held token.
    pub async fn close(&mut self) {
        self.finish().await;
    }

    /// Run `f` on every page, then close the cursor whether or not `f`
    /// succeeded.
    pub async fn drain<F, Fut>(mut self, mut f: F) -> Result<ScrollSummary>
    where
        F: FnMut(SearchResultPage) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let mut summary = ScrollSummary::default();
        let outcome = loop {
            match self.next_page().await {
                Ok(Some(page)) => {
                    summary.pages += 1;
                    summary.items += page.items.len();
                    if let Err(e) = f(page).await {
                        break Err(e);
                    }
                }
                Ok(None) => break Ok(()),
                Err(e) => break Err(e),
            }
        };
        self.close().await;
        outcome.map(|()| summary)
    }

    async fn finish(&mut self) {
        self.state = CursorState::Done;
        if let Some(token) = self.token.take() {
            self.release(token).await;
        }
    }

    async fn release(&mut self, token: String) {
        if !self.released.insert(token.clone()) {
            return;
        }
        if let Err(e) = self.engine.clear_scroll(&token).await {
            tracing::warn!("[scroll] failed to release cursor {}: {}", token, e);
        }
    }
}

async fn fetch_page<E: SearchEngine>(
    engine: &E,
    request: &SearchRequest,
    keep_alive: &ScrollDuration,
    token: Option<&str>,
) -> Result<SearchResultPage> {
    match token {
        None => engine.search(request).await,
        Some(token) => engine.scroll(token, keep_alive).await,
    }
}

impl<E: SearchEngine + 'static> Drop for ScrollCursor<E> {
    fn drop(&mut self) {
        let Some(token) = self.token.take() else {
            return;
        };
        if self.released.contains(&token) {
            return;
        }
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let engine = Arc::clone(&self.engine);
                handle.spawn(async move {
                    if let Err(e) = engine.clear_scroll(&token).await {
                        tracing::warn!("[scroll] failed to release dropped cursor {}: {}", token, e);
                    }
                });
            }
            Err(_) => {
                tracing::warn!("[scroll] cursor {} dropped outside a runtime, not released", token);
            }
        }
    }
}
