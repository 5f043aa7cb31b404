// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Cursor pagination over recipe records.
//!
//! A page request is resolved with several store round-trips that are
//! assembled into one [`Connection`]:
//!
//! ```text
//!  total ────────────────────────────────────────────────┐
//!  [window count, only for `last`] ─► window fetch ─┬─► before(from) ─┤
//!                                                   └─► after(to) ────┴─► join
//! ```
//!
//! The total runs alongside the window chain. The two boundary probes need
//! the edge identifiers of the fetched page and therefore start after it,
//! concurrently with each other. The sub-queries are not snapshot-consistent:
//! a write landing between them can leave a flag stale by that one write.
//!
//! `before`/`after` narrow the window only. The total and both probes see the
//! caller's filter, so a page reached through `after` reports
//! `has_previous_page = true`.
//!
//! # Failure handling
//!
//! The window fetch must succeed. Failures of the total, the `last` window
//! count or either probe are settled by [`ErrorPolicy`]: `Lenient` (the
//! default) substitutes zero/false and records the failure in
//! [`Connection::degraded`]; `Strict` fails the whole request.

use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use tracing::{debug, warn};

use crate::boundary::BoundaryProbe;
use crate::error::{StoreError, ValidationError};
use crate::filter::{Filter, Predicate};
use crate::model::{Recipe, RecipeId};
use crate::store::{RecipeStore, Window};

/// Pagination boundary: the identifier of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cursor(RecipeId);

impl Cursor {
    /// Cursor pointing at a record identifier.
    pub fn new(id: RecipeId) -> Self {
        Self(id)
    }

    /// The record identifier.
    pub fn id(self) -> RecipeId {
        self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Cursor {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<RecipeId>()
            .ok()
            .filter(|id| *id > 0)
            .map(Cursor)
            .ok_or_else(|| ValidationError::InvalidCursor(s.to_string()))
    }
}

impl Serialize for Cursor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Cursor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Window selection for a list request.
///
/// `first`/`after` page forward, `last`/`before` page backward. When both
/// `first` and `last` are present, `last` decides the page size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageArgs {
    /// Page size counted from the start of the window.
    pub first: Option<u32>,
    /// Page size counted from the end of the window.
    pub last: Option<u32>,
    /// Only records strictly before this cursor.
    pub before: Option<Cursor>,
    /// Only records strictly after this cursor.
    pub after: Option<Cursor>,
}

impl PageArgs {
    /// The first `n` records.
    pub fn first(n: u32) -> Self {
        Self {
            first: Some(n),
            ..Self::default()
        }
    }

    /// The last `n` records.
    pub fn last(n: u32) -> Self {
        Self {
            last: Some(n),
            ..Self::default()
        }
    }

    /// Restrict to records after a cursor.
    pub fn after(mut self, cursor: Cursor) -> Self {
        self.after = Some(cursor);
        self
    }

    /// Restrict to records before a cursor.
    pub fn before(mut self, cursor: Cursor) -> Self {
        self.before = Some(cursor);
        self
    }

    /// Build arguments from raw request values.
    pub fn parse(
        first: Option<i64>,
        last: Option<i64>,
        before: Option<&str>,
        after: Option<&str>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            first: first.map(|n| page_size("first", n)).transpose()?,
            last: last.map(|n| page_size("last", n)).transpose()?,
            before: before.map(str::parse::<Cursor>).transpose()?,
            after: after.map(str::parse::<Cursor>).transpose()?,
        })
    }

    /// The caller's filter narrowed by the `before`/`after` cursors.
    fn window_filter(&self, filter: &Filter) -> Filter {
        let mut narrowed = filter.clone();
        if let Some(after) = self.after {
            narrowed = narrowed.and(Predicate::IdAfter(after.id()));
        }
        if let Some(before) = self.before {
            narrowed = narrowed.and(Predicate::IdBefore(before.id()));
        }
        narrowed
    }
}

fn page_size(field: &'static str, n: i64) -> Result<u32, ValidationError> {
    u32::try_from(n).map_err(|_| ValidationError::InvalidField {
        field,
        message: format!("must be a non-negative page size (got {n})"),
    })
}

/// How failures of non-essential sub-queries are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Substitute zero/false and report the failure in the connection.
    #[default]
    Lenient,
    /// Fail the request.
    Strict,
}

/// The individual store round-trips of a page resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubQuery {
    /// Count of all records matching the filter.
    Total,
    /// Count of the narrowed window, needed to place a `last` page.
    WindowCount,
    /// The page fetch itself.
    Window,
    /// Existence of a record before the page.
    HasPreviousPage,
    /// Existence of a record after the page.
    HasNextPage,
}

impl SubQuery {
    /// Stable name used in logs and error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Total => "total",
            Self::WindowCount => "window_count",
            Self::Window => "window",
            Self::HasPreviousPage => "has_previous_page",
            Self::HasNextPage => "has_next_page",
        }
    }
}

impl fmt::Display for SubQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sub-query whose value was defaulted because it failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Degraded {
    /// Which sub-query failed.
    pub query: SubQuery,
    /// The failure.
    pub error: String,
}

/// A resolved page plus its boundary and count metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection<T> {
    /// Records matching the filter, ignoring the window.
    pub total: u64,
    /// Identifier of the first item; `None` for an empty page.
    pub from: Option<Cursor>,
    /// Identifier of the last item; `None` for an empty page.
    pub to: Option<Cursor>,
    /// A matching record exists after `to`.
    pub has_next_page: bool,
    /// A matching record exists before `from`.
    pub has_previous_page: bool,
    /// Page contents in ascending identifier order.
    pub items: Vec<T>,
    /// Sub-queries whose values are defaults rather than answers.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub degraded: Vec<Degraded>,
}

impl<T> Connection<T> {
    /// Whether any field holds a substituted default.
    pub fn is_degraded(&self) -> bool {
        !self.degraded.is_empty()
    }

    /// Whether the given sub-query fell back to its default.
    pub fn is_unknown(&self, query: SubQuery) -> bool {
        self.degraded.iter().any(|d| d.query == query)
    }
}

/// Pagination errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PaginationError {
    /// The request arguments were malformed.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A sub-query failed and could not be defaulted.
    #[error("Pagination sub-query '{query}' failed: {source}")]
    Store {
        /// The failing sub-query.
        query: SubQuery,
        /// The store error.
        #[source]
        source: StoreError,
    },
}

/// Tuning for the pagination engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct PaginationConfig {
    /// Failure handling for count and probe sub-queries.
    pub policy: ErrorPolicy,
    /// Upper bound for each sub-query; `None` waits indefinitely.
    pub query_timeout: Option<Duration>,
}

struct Page {
    items: Vec<Recipe>,
    from: Option<Cursor>,
    to: Option<Cursor>,
    has_previous_page: bool,
    has_next_page: bool,
    degraded: Vec<Degraded>,
}

/// Resolves [`PageArgs`] against a [`RecipeStore`].
#[derive(Clone)]
pub struct PaginationEngine {
    store: Arc<dyn RecipeStore>,
    probe: BoundaryProbe,
    config: PaginationConfig,
}

impl PaginationEngine {
    /// Create an engine with lenient error handling and no timeout.
    pub fn new(store: Arc<dyn RecipeStore>) -> Self {
        Self::with_config(store, PaginationConfig::default())
    }

    /// Create an engine with explicit configuration.
    pub fn with_config(store: Arc<dyn RecipeStore>, config: PaginationConfig) -> Self {
        let probe = BoundaryProbe::new(store.clone());
        Self {
            store,
            probe,
            config,
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &PaginationConfig {
        &self.config
    }

    /// Resolve one page.
    pub async fn resolve(
        &self,
        filter: &Filter,
        args: &PageArgs,
    ) -> Result<Connection<Recipe>, PaginationError> {
        let window_filter = args.window_filter(filter);

        let (total, page) = tokio::join!(
            self.bounded(SubQuery::Total, self.store.count(filter)),
            self.resolve_page(filter, &window_filter, args),
        );
        let mut page = page?;
        let total = self.settle(SubQuery::Total, total, 0, &mut page.degraded)?;

        debug!(
            total,
            items = page.items.len(),
            degraded = page.degraded.len(),
            "Resolved page"
        );

        Ok(Connection {
            total,
            from: page.from,
            to: page.to,
            has_next_page: page.has_next_page,
            has_previous_page: page.has_previous_page,
            items: page.items,
            degraded: page.degraded,
        })
    }

    async fn resolve_page(
        &self,
        filter: &Filter,
        window_filter: &Filter,
        args: &PageArgs,
    ) -> Result<Page, PaginationError> {
        let mut degraded = Vec::new();
        let window = self.window(window_filter, args, &mut degraded).await?;

        let items = self
            .bounded(SubQuery::Window, self.store.list(window_filter, window))
            .await
            .map_err(|source| PaginationError::Store {
                query: SubQuery::Window,
                source,
            })?;

        let (from, to) = match (items.first(), items.last()) {
            (Some(first), Some(last)) => (Some(Cursor(first.id)), Some(Cursor(last.id))),
            _ => (None, None),
        };

        let (has_previous_page, has_next_page) = match (from, to) {
            (Some(from), Some(to)) => {
                let (before, after) = tokio::join!(
                    self.bounded(
                        SubQuery::HasPreviousPage,
                        self.probe.exists_before(filter, from.id())
                    ),
                    self.bounded(
                        SubQuery::HasNextPage,
                        self.probe.exists_after(filter, to.id())
                    ),
                );
                (
                    self.settle(SubQuery::HasPreviousPage, before, false, &mut degraded)?,
                    self.settle(SubQuery::HasNextPage, after, false, &mut degraded)?,
                )
            }
            // Nothing to anchor a probe on.
            _ => (false, false),
        };

        Ok(Page {
            items,
            from,
            to,
            has_previous_page,
            has_next_page,
            degraded,
        })
    }

    /// Compute skip/limit for the narrowed filter.
    async fn window(
        &self,
        window_filter: &Filter,
        args: &PageArgs,
        degraded: &mut Vec<Degraded>,
    ) -> Result<Window, PaginationError> {
        if let Some(last) = args.last {
            let matching = self
                .bounded(SubQuery::WindowCount, self.store.count(window_filter))
                .await;
            // A defaulted count of zero places the page at the start of the window.
            let matching = self.settle(SubQuery::WindowCount, matching, 0, degraded)?;
            let limit = u64::from(last);
            return Ok(Window {
                skip: matching.saturating_sub(limit),
                limit: Some(limit),
            });
        }

        Ok(Window {
            skip: 0,
            limit: args.first.map(u64::from),
        })
    }

    async fn bounded<T>(
        &self,
        query: SubQuery,
        operation: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        match self.config.query_timeout {
            Some(limit) => tokio::time::timeout(limit, operation)
                .await
                .unwrap_or_else(|_| {
                    Err(StoreError::Timeout {
                        operation: query.as_str(),
                        timeout_ms: limit.as_millis() as u64,
                    })
                }),
            None => operation.await,
        }
    }

    fn settle<T>(
        &self,
        query: SubQuery,
        outcome: Result<T, StoreError>,
        default: T,
        degraded: &mut Vec<Degraded>,
    ) -> Result<T, PaginationError> {
        match outcome {
            Ok(value) => Ok(value),
            Err(source) => match self.config.policy {
                ErrorPolicy::Strict => Err(PaginationError::Store { query, source }),
                ErrorPolicy::Lenient => {
                    warn!(query = %query, error = %source, "Pagination sub-query failed, using default");
                    degraded.push(Degraded {
                        query,
                        error: source.to_string(),
                    });
                    Ok(default)
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LineItem, RecipeInput};
    use crate::store::MemoryRecipeStore;

    fn input(item: &str) -> RecipeInput {
        RecipeInput {
            inputs: vec![LineItem::new(item, 1)],
            outputs: vec![LineItem::new("product", 1)],
            ..Default::default()
        }
    }

    async fn store_with(n: usize) -> Arc<MemoryRecipeStore> {
        Arc::new(MemoryRecipeStore::seeded((0..n).map(|_| input("ore"))).await)
    }

    fn ids(connection: &Connection<Recipe>) -> Vec<RecipeId> {
        connection.items.iter().map(|r| r.id).collect()
    }

    #[tokio::test]
    async fn test_first_k_of_n() {
        let engine = PaginationEngine::new(store_with(10).await);

        let page = engine
            .resolve(&Filter::new(), &PageArgs::first(3))
            .await
            .unwrap();

        assert_eq!(ids(&page), vec![1, 2, 3]);
        assert_eq!(page.total, 10);
        assert!(page.has_next_page);
        assert!(!page.has_previous_page);
        assert_eq!(page.from, Some(Cursor::new(1)));
        assert_eq!(page.to, Some(Cursor::new(3)));
        assert!(!page.is_degraded());
    }

    #[tokio::test]
    async fn test_last_k_returns_largest_ids_ascending() {
        let engine = PaginationEngine::new(store_with(10).await);

        let page = engine
            .resolve(&Filter::new(), &PageArgs::last(4))
            .await
            .unwrap();

        assert_eq!(ids(&page), vec![7, 8, 9, 10]);
        assert!(page.has_previous_page);
        assert!(!page.has_next_page);
    }

    #[tokio::test]
    async fn test_full_page_has_no_next() {
        let engine = PaginationEngine::new(store_with(5).await);

        let page = engine
            .resolve(&Filter::new(), &PageArgs::first(5))
            .await
            .unwrap();

        assert_eq!(page.items.len(), 5);
        assert!(!page.has_next_page);
        assert!(!page.has_previous_page);
    }

    #[tokio::test]
    async fn test_forward_cursor_pages_are_contiguous_and_disjoint() {
        let engine = PaginationEngine::new(store_with(11).await);

        for size in 1..=6u32 {
            let mut seen = Vec::new();
            let mut args = PageArgs::first(size);
            loop {
                let page = engine.resolve(&Filter::new(), &args).await.unwrap();
                seen.extend(ids(&page));
                if !page.has_next_page {
                    break;
                }
                args = PageArgs::first(size).after(page.to.unwrap());
            }
            assert_eq!(seen, (1..=11).collect::<Vec<_>>(), "page size {size}");
        }
    }

    #[tokio::test]
    async fn test_after_cursor_sets_previous_flag_and_keeps_total() {
        let engine = PaginationEngine::new(store_with(6).await);

        let page = engine
            .resolve(&Filter::new(), &PageArgs::first(2).after(Cursor::new(2)))
            .await
            .unwrap();

        assert_eq!(ids(&page), vec![3, 4]);
        assert_eq!(page.total, 6);
        assert!(page.has_previous_page);
        assert!(page.has_next_page);
    }

    #[tokio::test]
    async fn test_last_with_before_cursor_pages_backward() {
        let engine = PaginationEngine::new(store_with(8).await);

        let page = engine
            .resolve(&Filter::new(), &PageArgs::last(3).before(Cursor::new(6)))
            .await
            .unwrap();

        assert_eq!(ids(&page), vec![3, 4, 5]);
        assert!(page.has_previous_page);
        assert!(page.has_next_page);
    }

    #[tokio::test]
    async fn test_before_and_after_both_narrow_the_window() {
        let engine = PaginationEngine::new(store_with(10).await);
        let args = PageArgs::default()
            .after(Cursor::new(2))
            .before(Cursor::new(6));

        let page = engine.resolve(&Filter::new(), &args).await.unwrap();

        assert_eq!(ids(&page), vec![3, 4, 5]);
    }

    #[tokio::test]
    async fn test_last_wins_over_first() {
        let engine = PaginationEngine::new(store_with(10).await);
        let args = PageArgs {
            first: Some(2),
            last: Some(3),
            ..PageArgs::default()
        };

        let page = engine.resolve(&Filter::new(), &args).await.unwrap();

        assert_eq!(ids(&page), vec![8, 9, 10]);
    }

    #[tokio::test]
    async fn test_last_larger_than_window_returns_everything() {
        let engine = PaginationEngine::new(store_with(3).await);

        let page = engine
            .resolve(&Filter::new(), &PageArgs::last(10))
            .await
            .unwrap();

        assert_eq!(ids(&page), vec![1, 2, 3]);
        assert!(!page.has_previous_page);
    }

    #[tokio::test]
    async fn test_no_size_returns_whole_window() {
        let engine = PaginationEngine::new(store_with(4).await);

        let page = engine
            .resolve(&Filter::new(), &PageArgs::default())
            .await
            .unwrap();

        assert_eq!(page.items.len(), 4);
    }

    #[tokio::test]
    async fn test_filter_applies_to_every_sub_query() {
        let store = Arc::new(
            MemoryRecipeStore::seeded(
                ["ore", "wood", "ore", "wood", "ore", "wood"]
                    .into_iter()
                    .map(input),
            )
            .await,
        );
        let engine = PaginationEngine::new(store);
        let wood = Filter::new().and(Predicate::InputItem("wood".to_string()));

        let page = engine.resolve(&wood, &PageArgs::first(2)).await.unwrap();

        assert_eq!(ids(&page), vec![2, 4]);
        assert_eq!(page.total, 3);
        assert!(page.has_next_page);
        assert!(!page.has_previous_page);
    }

    #[tokio::test]
    async fn test_empty_page_skips_probes() {
        let store = store_with(0).await;
        let engine = PaginationEngine::new(store.clone());

        let page = engine
            .resolve(&Filter::new(), &PageArgs::first(5))
            .await
            .unwrap();

        assert!(page.items.is_empty());
        assert_eq!(page.from, None);
        assert_eq!(page.to, None);
        assert!(!page.has_next_page);
        assert!(!page.has_previous_page);
        assert_eq!(store.exists_calls(), 0);
    }

    #[tokio::test]
    async fn test_lenient_count_failure_defaults_to_zero() {
        let store = store_with(5).await;
        store.fail_count(true);
        let engine = PaginationEngine::new(store);

        let page = engine
            .resolve(&Filter::new(), &PageArgs::first(2))
            .await
            .unwrap();

        assert_eq!(page.total, 0);
        assert_eq!(page.items.len(), 2);
        assert!(page.is_unknown(SubQuery::Total));
        assert!(!page.is_unknown(SubQuery::HasNextPage));
    }

    #[tokio::test]
    async fn test_lenient_probe_failure_defaults_to_false() {
        let store = store_with(5).await;
        store.fail_exists(true);
        let engine = PaginationEngine::new(store);

        let page = engine
            .resolve(&Filter::new(), &PageArgs::first(2))
            .await
            .unwrap();

        assert!(!page.has_next_page);
        assert!(page.is_unknown(SubQuery::HasNextPage));
        assert!(page.is_unknown(SubQuery::HasPreviousPage));
        assert_eq!(page.total, 5);
    }

    #[tokio::test]
    async fn test_lenient_window_count_failure_falls_back_to_window_start() {
        let store = store_with(6).await;
        store.fail_count(true);
        let engine = PaginationEngine::new(store);

        let page = engine
            .resolve(&Filter::new(), &PageArgs::last(2))
            .await
            .unwrap();

        assert_eq!(ids(&page), vec![1, 2]);
        assert!(page.is_unknown(SubQuery::WindowCount));
    }

    #[tokio::test]
    async fn test_strict_policy_surfaces_probe_failure() {
        let store = store_with(5).await;
        store.fail_exists(true);
        let engine = PaginationEngine::with_config(
            store,
            PaginationConfig {
                policy: ErrorPolicy::Strict,
                query_timeout: None,
            },
        );

        let err = engine
            .resolve(&Filter::new(), &PageArgs::first(2))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PaginationError::Store {
                query: SubQuery::HasPreviousPage | SubQuery::HasNextPage,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_strict_policy_surfaces_count_failure() {
        let store = store_with(5).await;
        store.fail_count(true);
        let engine = PaginationEngine::with_config(
            store,
            PaginationConfig {
                policy: ErrorPolicy::Strict,
                query_timeout: None,
            },
        );

        let err = engine
            .resolve(&Filter::new(), &PageArgs::first(2))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PaginationError::Store {
                query: SubQuery::Total,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_window_fetch_failure_is_always_an_error() {
        let store = store_with(5).await;
        store.fail_list(true);
        let engine = PaginationEngine::new(store);

        let err = engine
            .resolve(&Filter::new(), &PageArgs::first(2))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PaginationError::Store {
                query: SubQuery::Window,
                ..
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_total_overlaps_window_chain() {
        let latency = Duration::from_millis(100);

        // Total alongside list, then both boundary checks together.
        let store = store_with(10).await;
        store.set_latency(latency);
        let engine = PaginationEngine::new(store.clone());
        let started = tokio::time::Instant::now();
        let page = engine
            .resolve(&Filter::new(), &PageArgs::first(3))
            .await
            .unwrap();
        assert_eq!(started.elapsed(), latency * 2);
        assert!(page.has_next_page);
        assert_eq!(store.count_calls(), 1);
        assert_eq!(store.list_calls(), 1);
        assert_eq!(store.exists_calls(), 2);

        // `last` adds the window count ahead of the list.
        let store = store_with(10).await;
        store.set_latency(latency);
        let engine = PaginationEngine::new(store.clone());
        let started = tokio::time::Instant::now();
        let page = engine
            .resolve(&Filter::new(), &PageArgs::last(3))
            .await
            .unwrap();
        assert_eq!(started.elapsed(), latency * 3);
        assert_eq!(ids(&page), vec![8, 9, 10]);
        assert_eq!(store.count_calls(), 2);
        assert_eq!(store.list_calls(), 1);
        assert_eq!(store.exists_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_bounds_a_hung_store() {
        let store = store_with(3).await;
        store.set_latency(Duration::from_secs(60));
        let engine = PaginationEngine::with_config(
            store,
            PaginationConfig {
                policy: ErrorPolicy::Lenient,
                query_timeout: Some(Duration::from_millis(100)),
            },
        );

        let err = engine
            .resolve(&Filter::new(), &PageArgs::first(2))
            .await
            .unwrap_err();

        match err {
            PaginationError::Store { query, source } => {
                assert_eq!(query, SubQuery::Window);
                assert!(matches!(source, StoreError::Timeout { .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_bad_cursor_and_negative_size() {
        assert!(matches!(
            PageArgs::parse(None, None, Some("abc"), None),
            Err(ValidationError::InvalidCursor(_))
        ));
        assert!(matches!(
            PageArgs::parse(Some(-1), None, None, None),
            Err(ValidationError::InvalidField { field: "first", .. })
        ));

        let args = PageArgs::parse(Some(5), None, None, Some("12")).unwrap();
        assert_eq!(args.first, Some(5));
        assert_eq!(args.after, Some(Cursor::new(12)));
    }

    #[test]
    fn test_connection_serializes_cursors_as_strings() {
        let connection: Connection<Recipe> = Connection {
            total: 0,
            from: Some(Cursor::new(3)),
            to: None,
            has_next_page: false,
            has_previous_page: true,
            items: vec![],
            degraded: vec![],
        };

        let json = serde_json::to_value(&connection).unwrap();
        assert_eq!(json["from"], "3");
        assert!(json["to"].is_null());
        assert_eq!(json["hasPreviousPage"], true);
        assert!(json.get("degraded").is_none());
    }
}
